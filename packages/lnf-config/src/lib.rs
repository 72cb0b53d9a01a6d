mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, FeatureExtractorConfig, Imaging, Matching, NotifierConfig, ObjectDetectorConfig,
	Postgres, Providers, Service, Storage, Worker,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.feature_extractor.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.feature_extractor.dimensions must be greater than zero."
				.to_string(),
		});
	}

	check_unit_interval(
		"providers.object_detector.confidence_threshold",
		f64::from(cfg.providers.object_detector.confidence_threshold),
	)?;

	for (label, key) in [
		("feature_extractor", &cfg.providers.feature_extractor.api_key),
		("object_detector", &cfg.providers.object_detector.api_key),
		("notifier", &cfg.providers.notifier.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("feature_extractor", cfg.providers.feature_extractor.timeout_ms),
		("object_detector", cfg.providers.object_detector.timeout_ms),
		("notifier", cfg.providers.notifier.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	validate_imaging(cfg)?;
	validate_matching(cfg)?;

	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_imaging(cfg: &Config) -> Result<()> {
	let imaging = &cfg.imaging;

	if imaging.max_upload_bytes == 0 {
		return Err(Error::Validation {
			message: "imaging.max_upload_bytes must be greater than zero.".to_string(),
		});
	}
	if imaging.max_dimension == 0 {
		return Err(Error::Validation {
			message: "imaging.max_dimension must be greater than zero.".to_string(),
		});
	}
	if imaging.thumbnail_small == 0 || imaging.thumbnail_large == 0 {
		return Err(Error::Validation {
			message: "imaging thumbnail sizes must be greater than zero.".to_string(),
		});
	}
	if imaging.thumbnail_small > imaging.thumbnail_large {
		return Err(Error::Validation {
			message: "imaging.thumbnail_small must not exceed imaging.thumbnail_large."
				.to_string(),
		});
	}
	if imaging.thumbnail_large > imaging.max_dimension {
		return Err(Error::Validation {
			message: "imaging.thumbnail_large must not exceed imaging.max_dimension.".to_string(),
		});
	}
	if !(1..=100).contains(&imaging.jpeg_quality) {
		return Err(Error::Validation {
			message: "imaging.jpeg_quality must be in the range 1-100.".to_string(),
		});
	}

	Ok(())
}

fn validate_matching(cfg: &Config) -> Result<()> {
	let matching = &cfg.matching;

	check_unit_interval("matching.min_score", matching.min_score)?;

	if matching.max_results == 0 {
		return Err(Error::Validation {
			message: "matching.max_results must be greater than zero.".to_string(),
		});
	}
	if matching.candidate_scan_limit == 0 {
		return Err(Error::Validation {
			message: "matching.candidate_scan_limit must be greater than zero.".to_string(),
		});
	}
	if matching.inference_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "matching.inference_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if matching.rematch_batch_size == 0 {
		return Err(Error::Validation {
			message: "matching.rematch_batch_size must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn check_unit_interval(label: &str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let providers = &mut cfg.providers;

	for api_base in [
		&mut providers.feature_extractor.api_base,
		&mut providers.object_detector.api_base,
		&mut providers.notifier.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
