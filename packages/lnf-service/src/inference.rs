use std::{fmt, time::Duration};

use serde::Serialize;

use crate::LnfService;
use lnf_domain::{
	detection::{self, DetectionResult},
	vector,
};

/// Outcome of one inference stage. A degraded stage contributes no AI data and is never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Inference<T> {
	Ready(T),
	Degraded(DegradeReason),
}
impl<T> Inference<T> {
	pub fn ready(self) -> Option<T> {
		match self {
			Self::Ready(value) => Some(value),
			Self::Degraded(_) => None,
		}
	}

	pub fn status(&self) -> StageStatus {
		match self {
			Self::Ready(_) => StageStatus::Completed,
			Self::Degraded(reason) => StageStatus::Degraded { reason: reason.clone() },
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradeReason {
	Unavailable { message: String },
	Timeout { timeout_ms: u64 },
	InvalidOutput { message: String },
}
impl fmt::Display for DegradeReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unavailable { message } => write!(f, "model unavailable: {message}"),
			Self::Timeout { timeout_ms } => write!(f, "timed out after {timeout_ms} ms"),
			Self::InvalidOutput { message } => write!(f, "invalid model output: {message}"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
	Completed,
	Degraded { reason: DegradeReason },
}

impl LnfService {
	pub(crate) async fn run_detection(&self, jpeg: &[u8]) -> Inference<DetectionResult> {
		let cfg = &self.cfg.providers.object_detector;
		let timeout_ms = self.cfg.matching.inference_timeout_ms;
		let outcome = tokio::time::timeout(
			Duration::from_millis(timeout_ms),
			self.providers.detector.detect(cfg, jpeg),
		)
		.await
		.ok();
		let inference = match settle(outcome, timeout_ms) {
			Inference::Ready(raw) =>
				Inference::Ready(detection::post_process(raw, cfg.confidence_threshold)),
			Inference::Degraded(reason) => Inference::Degraded(reason),
		};

		if let Inference::Degraded(reason) = &inference {
			tracing::warn!(
				stage = "detection",
				provider_id = cfg.provider_id.as_str(),
				reason = %reason,
				"Inference stage degraded."
			);
		}

		inference
	}

	pub(crate) async fn run_extraction(&self, jpeg: &[u8]) -> Inference<Vec<f32>> {
		let cfg = &self.cfg.providers.feature_extractor;
		let timeout_ms = self.cfg.matching.inference_timeout_ms;
		let outcome = tokio::time::timeout(
			Duration::from_millis(timeout_ms),
			self.providers.extractor.extract(cfg, jpeg),
		)
		.await
		.ok();
		let inference = match settle(outcome, timeout_ms) {
			Inference::Ready(raw) => normalize_embedding(&raw, cfg.dimensions as usize),
			Inference::Degraded(reason) => Inference::Degraded(reason),
		};

		if let Inference::Degraded(reason) = &inference {
			tracing::warn!(
				stage = "extraction",
				provider_id = cfg.provider_id.as_str(),
				reason = %reason,
				"Inference stage degraded."
			);
		}

		inference
	}
}

/// `None` means the call did not finish within `timeout_ms`.
fn settle<T>(outcome: Option<lnf_providers::Result<T>>, timeout_ms: u64) -> Inference<T> {
	match outcome {
		Some(Ok(value)) => Inference::Ready(value),
		Some(Err(err)) =>
			Inference::Degraded(DegradeReason::Unavailable { message: err.to_string() }),
		None => Inference::Degraded(DegradeReason::Timeout { timeout_ms }),
	}
}

fn normalize_embedding(raw: &[f32], dimensions: usize) -> Inference<Vec<f32>> {
	if raw.len() != dimensions {
		return Inference::Degraded(DegradeReason::InvalidOutput {
			message: format!("expected {dimensions} dimensions, got {}", raw.len()),
		});
	}

	match vector::l2_normalize(raw) {
		Some(vec) => Inference::Ready(vec),
		None => Inference::Degraded(DegradeReason::InvalidOutput {
			message: "embedding is zero or non-finite".to_string(),
		}),
	}
}
