use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::Result;

/// One delivery request for a single recipient.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
	pub notification_id: Uuid,
	pub recipient_id: Uuid,
	pub payload: Value,
}

/// Posts a notification; any 2xx response counts as delivered.
pub async fn notify(cfg: &lnf_config::NotifierConfig, notification: &Notification) -> Result<()> {
	let url = format!("{}{}", cfg.api_base, cfg.path);

	crate::client(cfg.timeout_ms)?
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(notification)
		.send()
		.await?
		.error_for_status()?;

	Ok(())
}
