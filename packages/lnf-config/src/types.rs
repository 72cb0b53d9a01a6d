use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub imaging: Imaging,
	#[serde(default)]
	pub matching: Matching,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub feature_extractor: FeatureExtractorConfig,
	pub object_detector: ObjectDetectorConfig,
	pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureExtractorConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectDetectorConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	#[serde(default = "default_confidence_threshold")]
	pub confidence_threshold: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Endpoint of the downstream notification dispatcher that alerts item owners.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Imaging {
	pub max_upload_bytes: u64,
	pub max_dimension: u32,
	pub thumbnail_small: u32,
	pub thumbnail_large: u32,
	pub jpeg_quality: u8,
}
impl Default for Imaging {
	fn default() -> Self {
		Self {
			max_upload_bytes: 10 * 1_024 * 1_024,
			max_dimension: 1_920,
			thumbnail_small: 200,
			thumbnail_large: 400,
			jpeg_quality: 85,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Matching {
	/// Minimum composite score a candidate must reach to become a match.
	pub min_score: f64,
	pub max_results: u32,
	/// Upper bound on candidate rows scanned per processing run.
	pub candidate_scan_limit: u32,
	pub inference_timeout_ms: u64,
	pub rematch_batch_size: u32,
}
impl Default for Matching {
	fn default() -> Self {
		Self {
			min_score: 0.25,
			max_results: 20,
			candidate_scan_limit: 500,
			inference_timeout_ms: 30_000,
			rematch_batch_size: 100,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub claim_lease_seconds: i64,
}
impl Default for Worker {
	fn default() -> Self {
		Self { poll_interval_ms: 500, claim_lease_seconds: 30 }
	}
}

fn default_confidence_threshold() -> f32 {
	0.25
}
