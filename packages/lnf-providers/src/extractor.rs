use serde_json::Value;

use crate::{Error, Result};

/// Requests one embedding for a canonical JPEG. The vector is returned as received; callers
/// normalize and validate its dimension.
pub async fn extract(cfg: &lnf_config::FeatureExtractorConfig, jpeg: &[u8]) -> Result<Vec<f32>> {
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"image": crate::encode_image(jpeg),
		"dimensions": cfg.dimensions,
	});
	let res = crate::client(cfg.timeout_ms)?
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_extraction_response(&json)
}

fn parse_extraction_response(json: &Value) -> Result<Vec<f32>> {
	let embedding = json
		.get("embedding")
		.or_else(|| {
			json.get("data")
				.and_then(|v| v.as_array())
				.and_then(|data| data.first())
				.and_then(|item| item.get("embedding"))
		})
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Extraction response is missing an embedding array.".to_string(),
		})?;
	let mut vec = Vec::with_capacity(embedding.len());

	for value in embedding {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding value must be numeric.".to_string(),
		})?;

		vec.push(number as f32);
	}

	Ok(vec)
}
