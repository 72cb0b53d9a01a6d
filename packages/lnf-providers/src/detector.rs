use serde_json::Value;

use crate::{Error, Result};
use lnf_domain::detection::RawDetection;

pub async fn detect(
	cfg: &lnf_config::ObjectDetectorConfig,
	jpeg: &[u8],
) -> Result<Vec<RawDetection>> {
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"image": crate::encode_image(jpeg),
		"confidence_threshold": cfg.confidence_threshold,
	});
	let res = crate::client(cfg.timeout_ms)?
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_detection_response(&json)
}

fn parse_detection_response(json: &Value) -> Result<Vec<RawDetection>> {
	let items = json
		.get("detections")
		.or_else(|| json.get("predictions"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Detection response is missing detections array.".to_string(),
		})?;
	let mut detections = Vec::with_capacity(items.len());

	for item in items {
		let class_name = item
			.get("class")
			.or_else(|| item.get("label"))
			.and_then(|v| v.as_str())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Detection is missing a class name.".to_string(),
			})?;
		let confidence = item
			.get("confidence")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Detection is missing a confidence.".to_string(),
			})? as f32;

		detections.push(RawDetection {
			class_name: class_name.to_string(),
			confidence,
			bbox: parse_bbox(item.get("bbox"))?,
		});
	}

	Ok(detections)
}

fn parse_bbox(value: Option<&Value>) -> Result<[f32; 4]> {
	let Some(value) = value else {
		return Ok([0.0; 4]);
	};
	let coords = value
		.as_array()
		.filter(|coords| coords.len() == 4)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Detection bbox must have four coordinates.".to_string(),
		})?;
	let mut bbox = [0.0_f32; 4];

	for (slot, coord) in bbox.iter_mut().zip(coords) {
		*slot = coord.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Detection bbox coordinates must be numeric.".to_string(),
		})? as f32;
	}

	Ok(bbox)
}
