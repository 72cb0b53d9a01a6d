use serde::{Deserialize, Serialize};

use crate::item::Category;

const CLASS_CATEGORIES: &[(&str, Category)] = &[
	("cell phone", Category::Phone),
	("laptop", Category::Electronics),
	("keyboard", Category::Electronics),
	("mouse", Category::Electronics),
	("remote", Category::Electronics),
	("tv", Category::Electronics),
	("backpack", Category::Bag),
	("handbag", Category::Bag),
	("suitcase", Category::Bag),
	("umbrella", Category::Accessories),
	("glasses", Category::Accessories),
	("sunglasses", Category::Accessories),
	("tie", Category::Clothing),
	("hat", Category::Clothing),
	("shoe", Category::Clothing),
	("boot", Category::Clothing),
	("watch", Category::Jewelry),
	("ring", Category::Jewelry),
	("necklace", Category::Jewelry),
	("book", Category::Documents),
	("wallet", Category::Wallet),
	("purse", Category::Wallet),
	("credit card", Category::Wallet),
	("key", Category::Keys),
	("keys", Category::Keys),
	("passport", Category::Id),
	("id card", Category::Id),
	("bottle", Category::Other),
	("cup", Category::Other),
	("scissors", Category::Other),
	("teddy bear", Category::Other),
];

/// One detection as returned by the detector, before thresholding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
	#[serde(rename = "class")]
	pub class_name: String,
	pub confidence: f32,
	pub bbox: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
	#[serde(rename = "class")]
	pub class_name: String,
	pub confidence: f32,
	pub bbox: [f32; 4],
	pub category: Category,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
	pub detections: Vec<DetectedObject>,
	pub primary_class: Option<String>,
	pub primary_confidence: f32,
}
impl DetectionResult {
	pub fn is_empty(&self) -> bool {
		self.detections.is_empty()
	}
}

/// Looks a detector class up in the category table, ignoring case and surrounding whitespace.
pub fn map_class(class_name: &str) -> Option<Category> {
	let needle = class_name.trim().to_ascii_lowercase();

	CLASS_CATEGORIES.iter().find(|(class, _)| *class == needle).map(|(_, category)| *category)
}

/// Thresholds, sorts and categorizes raw detections.
///
/// Detections below `threshold` or with a non-finite confidence are dropped. The primary class is
/// the mapped category of the most confident detection that has one, falling back to the raw class
/// name of the most confident detection overall.
pub fn post_process(raw: Vec<RawDetection>, threshold: f32) -> DetectionResult {
	let mut kept = raw
		.into_iter()
		.filter(|det| det.confidence.is_finite() && det.confidence >= threshold)
		.filter(|det| !det.class_name.trim().is_empty())
		.collect::<Vec<_>>();

	kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

	let detections = kept
		.into_iter()
		.map(|det| DetectedObject {
			category: map_class(&det.class_name).unwrap_or(Category::Other),
			class_name: det.class_name.trim().to_string(),
			confidence: round_to(det.confidence, 4),
			bbox: det.bbox.map(|coord| if coord.is_finite() { round_to(coord, 2) } else { 0.0 }),
		})
		.collect::<Vec<_>>();
	let Some(top) = detections.first() else {
		return DetectionResult::default();
	};
	let primary = detections
		.iter()
		.find_map(|det| map_class(&det.class_name).map(|category| (category, det.confidence)));
	let (primary_class, primary_confidence) = match primary {
		Some((category, confidence)) => (category.as_str().to_string(), confidence),
		None => (top.class_name.clone(), top.confidence),
	};

	DetectionResult { primary_class: Some(primary_class), primary_confidence, detections }
}

fn round_to(value: f32, places: i32) -> f32 {
	let factor = 10_f64.powi(places);

	((value as f64 * factor).round() / factor) as f32
}
