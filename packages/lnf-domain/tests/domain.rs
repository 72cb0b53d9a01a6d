use std::str::FromStr;

use lnf_domain::{
	detection::{self, RawDetection},
	geo::{self, Coordinates},
	item::{Category, ItemStatus, ItemType, MatchConfidence, MatchStatus},
	vector,
};

fn raw(class_name: &str, confidence: f32) -> RawDetection {
	RawDetection {
		class_name: class_name.to_string(),
		confidence,
		bbox: [1.234, 5.678, 90.0, 120.5],
	}
}

fn point(latitude: f64, longitude: f64) -> Coordinates {
	Coordinates::new(latitude, longitude).expect("Test coordinates must be valid.")
}

#[test]
fn mapped_lower_confidence_detection_wins_primary() {
	let result = detection::post_process(
		vec![raw("person", 0.95), raw("Cell Phone", 0.6), raw("cup", 0.5)],
		0.25,
	);

	assert_eq!(result.primary_class.as_deref(), Some("phone"));
	assert!((result.primary_confidence - 0.6).abs() < 1e-6);
	assert_eq!(result.detections[0].class_name, "person");
	assert_eq!(result.detections[0].category, Category::Other);
	assert_eq!(result.detections[1].category, Category::Phone);
}

#[test]
fn unmapped_top_detection_is_fallback_primary() {
	let result = detection::post_process(vec![raw("person", 0.4), raw("dog", 0.9)], 0.25);

	assert_eq!(result.primary_class.as_deref(), Some("dog"));
	assert!((result.primary_confidence - 0.9).abs() < 1e-6);
}

#[test]
fn detections_below_threshold_are_dropped_and_sorted() {
	let result = detection::post_process(
		vec![
			raw("backpack", 0.3),
			raw("laptop", 0.2),
			raw("wallet", 0.812_345),
			raw("key", f32::NAN),
		],
		0.25,
	);
	let classes =
		result.detections.iter().map(|det| det.class_name.as_str()).collect::<Vec<_>>();

	assert_eq!(classes, vec!["wallet", "backpack"]);
	assert_eq!(result.detections[0].confidence, 0.8123);
	assert_eq!(result.detections[0].bbox, [1.23, 5.68, 90.0, 120.5]);
	assert_eq!(result.primary_class.as_deref(), Some("wallet"));
}

#[test]
fn empty_detections_have_no_primary() {
	let result = detection::post_process(vec![raw("laptop", 0.1)], 0.25);

	assert!(result.is_empty());
	assert_eq!(result.primary_class, None);
	assert_eq!(result.primary_confidence, 0.0);
}

#[test]
fn detected_object_serializes_class_key() {
	let result = detection::post_process(vec![raw("handbag", 0.7)], 0.25);
	let json = serde_json::to_value(&result.detections).expect("Detections must serialize.");

	assert_eq!(json[0]["class"], serde_json::json!("handbag"));
	assert_eq!(json[0]["category"], serde_json::json!("bag"));
}

#[test]
fn class_table_covers_documented_vocabulary() {
	assert_eq!(detection::map_class("  SUNGLASSES "), Some(Category::Accessories));
	assert_eq!(detection::map_class("credit card"), Some(Category::Wallet));
	assert_eq!(detection::map_class("passport"), Some(Category::Id));
	assert_eq!(detection::map_class("teddy bear"), Some(Category::Other));
	assert_eq!(detection::map_class("giraffe"), None);
}

#[test]
fn similarity_stays_in_unit_interval() {
	let a = vector::l2_normalize(&[0.2, -0.7, 0.4]).expect("Vector must normalize.");
	let b = vector::l2_normalize(&[-0.2, 0.7, -0.4]).expect("Vector must normalize.");
	let c = vector::l2_normalize(&[0.1, 0.3, 0.9]).expect("Vector must normalize.");

	assert!((vector::similarity(&a, &a) - 1.0).abs() < 1e-6);
	assert!(vector::similarity(&a, &a) <= 1.0);
	assert_eq!(vector::similarity(&a, &b), 0.0);

	let ac = vector::similarity(&a, &c);

	assert!((0.0..=1.0).contains(&ac));
	assert_eq!(ac, vector::similarity(&c, &a));
}

#[test]
fn haversine_is_zero_for_same_point_and_symmetric() {
	let a = point(25.2048, 55.2708);
	let b = point(24.4539, 54.3773);

	assert_eq!(geo::haversine_km(a, a), 0.0);
	assert!((geo::haversine_km(a, b) - geo::haversine_km(b, a)).abs() < 1e-9);
}

#[test]
fn one_degree_of_latitude_is_about_111_km() {
	let distance = geo::haversine_km(point(10.0, 20.0), point(11.0, 20.0));

	assert!((distance - 111.19).abs() < 0.1, "Got {distance}.");
}

#[test]
fn enums_parse_their_storage_text() {
	assert_eq!(ItemType::from_str("lost"), Ok(ItemType::Lost));
	assert_eq!(ItemType::Found.opposite(), ItemType::Lost);
	assert_eq!(ItemStatus::from_str("OPEN"), Ok(ItemStatus::Open));
	assert_eq!(Category::from_str("Electronics"), Ok(Category::Electronics));
	assert_eq!(MatchConfidence::from_str("HIGH"), Ok(MatchConfidence::High));
	assert_eq!(MatchStatus::from_str("pending"), Ok(MatchStatus::Pending));
	assert!(Category::from_str("vehicle").is_err());

	for category in Category::ALL {
		assert_eq!(Category::from_str(category.as_str()), Ok(category));
	}
}
