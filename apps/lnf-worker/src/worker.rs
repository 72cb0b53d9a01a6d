use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use crate::Result;
use lnf_config::NotifierConfig;
use lnf_providers::notifier::{self, Notification};
use lnf_storage::{db::Db, models::MatchNotification, outbox};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub notifier: NotifierConfig,
	pub settings: lnf_config::Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Idle,
	Delivered,
	Failed,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	let poll_interval = StdDuration::from_millis(state.settings.poll_interval_ms);

	loop {
		match process_notification_once(&state).await {
			Ok(Outcome::Delivered | Outcome::Failed) => continue,
			Ok(Outcome::Idle) => {},
			Err(err) => {
				tracing::error!(error = %err, "Notification outbox processing failed.");
			},
		}

		tokio_time::sleep(poll_interval).await;
	}
}

/// Processes due notifications until none are left and returns how many were delivered.
///
/// Failed deliveries are rescheduled into the future, so they do not keep the drain running.
pub async fn drain(state: &WorkerState) -> Result<u64> {
	let mut delivered = 0;

	loop {
		match process_notification_once(state).await? {
			Outcome::Idle => return Ok(delivered),
			Outcome::Delivered => delivered += 1,
			Outcome::Failed => {},
		}
	}
}

pub async fn process_notification_once(state: &WorkerState) -> Result<Outcome> {
	let now = OffsetDateTime::now_utc();
	let Some(job) =
		outbox::claim_next_notification(&state.db, now, state.settings.claim_lease_seconds)
			.await?
	else {
		return Ok(Outcome::Idle);
	};
	let notification = Notification {
		notification_id: job.notification_id,
		recipient_id: job.recipient_id,
		payload: job.payload.clone(),
	};

	match notifier::notify(&state.notifier, &notification).await {
		Ok(()) => {
			let done_at = OffsetDateTime::now_utc();

			outbox::mark_notification_done(&state.db, job.notification_id, done_at).await?;

			tracing::info!(
				notification_id = %job.notification_id,
				match_id = %job.match_id,
				provider_id = state.notifier.provider_id.as_str(),
				"Match notification delivered."
			);

			Ok(Outcome::Delivered)
		},
		Err(err) => {
			mark_failed(&state.db, &job, &err.to_string()).await?;

			tracing::error!(
				error = %err,
				notification_id = %job.notification_id,
				provider_id = state.notifier.provider_id.as_str(),
				attempts = job.attempts.saturating_add(1),
				"Match notification delivery failed."
			);

			Ok(Outcome::Failed)
		},
	}
}

async fn mark_failed(db: &Db, job: &MatchNotification, error: &str) -> Result<()> {
	let next_attempts = job.attempts.saturating_add(1);
	let now = OffsetDateTime::now_utc();
	let available_at = now + backoff_for_attempt(next_attempts);
	let error_text = sanitize_outbox_error(error);

	outbox::mark_notification_failed(
		db,
		job.notification_id,
		next_attempts,
		&error_text,
		available_at,
		now,
	)
	.await?;

	Ok(())
}

fn sanitize_outbox_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_OUTBOX_ERROR_CHARS {
		out = out.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_doubles_then_caps() {
		assert_eq!(backoff_for_attempt(0), Duration::milliseconds(500));
		assert_eq!(backoff_for_attempt(1), Duration::milliseconds(500));
		assert_eq!(backoff_for_attempt(2), Duration::milliseconds(1_000));
		assert_eq!(backoff_for_attempt(6), Duration::milliseconds(16_000));
		assert_eq!(backoff_for_attempt(7), Duration::milliseconds(30_000));
		assert_eq!(backoff_for_attempt(40), Duration::milliseconds(30_000));
	}

	#[test]
	fn sanitizer_redacts_credentials() {
		let text = "POST failed Authorization: Bearer sk-live-123 api_key=abc password:hunter2";
		let sanitized = sanitize_outbox_error(text);

		assert!(!sanitized.contains("sk-live-123"));
		assert!(!sanitized.contains("abc"));
		assert!(!sanitized.contains("hunter2"));
		assert!(sanitized.contains("Bearer [REDACTED]"));
		assert!(sanitized.contains("api_key=[REDACTED]"));
		assert!(sanitized.contains("password:[REDACTED]"));
	}

	#[test]
	fn sanitizer_truncates_long_errors() {
		let sanitized = sanitize_outbox_error(&"x".repeat(2_000));

		assert_eq!(sanitized.chars().count(), MAX_OUTBOX_ERROR_CHARS + 3);
		assert!(sanitized.ends_with("..."));
	}
}
