use time::{Duration, macros::datetime};
use uuid::Uuid;

use lnf_domain::{
	geo::Coordinates,
	item::{Category, ItemMetadata, ItemType, MatchConfidence},
	matcher::{self, CandidateItem, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE},
	vector,
};

fn metadata(item_type: ItemType) -> ItemMetadata {
	ItemMetadata {
		item_id: Uuid::new_v4(),
		item_type,
		category: Category::Phone,
		title: "Black phone".to_string(),
		brand: Some("Acme".to_string()),
		color: Some("black".to_string()),
		location_name: "Central Station".to_string(),
		coordinates: Coordinates::new(25.2048, 55.2708),
		occurred_at: Some(datetime!(2026-03-01 10:00 UTC)),
	}
}

fn unit(values: &[f32]) -> Vec<f32> {
	vector::l2_normalize(values).expect("Test vector must normalize.")
}

/// A unit vector whose dot product with `[1, 0]` equals `cos`.
fn at_similarity(cos: f32) -> Vec<f32> {
	vec![cos, (1.0 - cos * cos).max(0.0).sqrt()]
}

#[test]
fn tier_boundaries_are_inclusive() {
	assert_eq!(matcher::classify(0.70), MatchConfidence::High);
	assert_eq!(matcher::classify(0.6999), MatchConfidence::Medium);
	assert_eq!(matcher::classify(0.45), MatchConfidence::Medium);
	assert_eq!(matcher::classify(0.4499), MatchConfidence::Low);
}

/// Same place within the hour, different category, no color or brand: metadata adds 0.245.
fn category_mismatch_pair() -> (ItemMetadata, ItemMetadata) {
	let source = ItemMetadata {
		brand: None,
		color: None,
		occurred_at: Some(datetime!(2026-03-01 10:00 UTC)),
		..metadata(ItemType::Lost)
	};
	let target = ItemMetadata {
		category: Category::Wallet,
		brand: None,
		color: None,
		occurred_at: Some(datetime!(2026-03-01 10:45 UTC)),
		..metadata(ItemType::Found)
	};

	(source, target)
}

#[test]
fn composite_tiers_use_the_unrounded_score() {
	let (source, target) = category_mismatch_pair();
	let below_high = matcher::calculate_match_score(0.6994, &source, &target);

	assert!(below_high.scores.weighted_sum() < 0.70);
	assert!((below_high.final_score - 0.70).abs() < 1e-9, "Got {}.", below_high.final_score);
	assert_eq!(below_high.confidence, MatchConfidence::Medium);

	let below_medium = matcher::calculate_match_score(0.3148, &source, &target);

	assert!(below_medium.scores.weighted_sum() < 0.45);
	assert!((below_medium.final_score - 0.45).abs() < 1e-9, "Got {}.", below_medium.final_score);
	assert_eq!(below_medium.confidence, MatchConfidence::Low);

	let at_high = matcher::calculate_match_score(0.71, &source, &target);

	assert!(at_high.scores.weighted_sum() >= 0.70);
	assert_eq!(at_high.confidence, MatchConfidence::High);
}

#[test]
fn candidate_at_the_threshold_is_kept() {
	let source = metadata(ItemType::Lost);
	let target = ItemMetadata {
		category: Category::Wallet,
		brand: Some("Other".to_string()),
		color: Some("red".to_string()),
		location_name: "Airport".to_string(),
		coordinates: Coordinates::new(40.7128, -74.0060),
		occurred_at: source.occurred_at.map(|at| at + Duration::hours(2_000)),
		..metadata(ItemType::Found)
	};
	let candidates = vec![CandidateItem { metadata: target, embedding: at_similarity(0.2846) }];
	let found = matcher::find_matches(&[1.0, 0.0], &source, &candidates, 0.3, 20);

	assert_eq!(found.len(), 1);
	assert_eq!(found[0].final_score, 0.3);

	let stricter = matcher::find_matches(&[1.0, 0.0], &source, &candidates, 0.301, 20);

	assert!(stricter.is_empty());
}

#[test]
fn category_mismatch_only_scores_high() {
	let (source, target) = category_mismatch_pair();
	let scored = matcher::calculate_match_score(0.9, &source, &target);

	assert_eq!(scored.scores.category, 0.5);
	assert_eq!(scored.scores.color, 0.7);
	assert_eq!(scored.scores.brand, 0.7);
	assert_eq!(scored.scores.location, 1.0);
	assert_eq!(scored.scores.time, 1.0);
	assert!((scored.final_score - 0.83).abs() < 1e-9, "Got {}.", scored.final_score);
	assert_eq!(scored.confidence, MatchConfidence::High);
	assert!(!scored.features.category_match);
	assert!(scored.features.location_nearby);
	assert_eq!(scored.features.color_match, None);
}

#[test]
fn identical_image_self_match_is_high() {
	let source = metadata(ItemType::Lost);
	let target = ItemMetadata { item_id: Uuid::new_v4(), ..metadata(ItemType::Found) };
	let embedding = unit(&[0.3, -0.2, 0.9, 0.1]);
	let candidates = vec![CandidateItem { metadata: target.clone(), embedding: embedding.clone() }];
	let found = matcher::find_matches(
		&embedding,
		&source,
		&candidates,
		DEFAULT_MIN_SCORE,
		DEFAULT_MAX_RESULTS,
	);

	assert_eq!(found.len(), 1);
	assert_eq!(found[0].item_id, target.item_id);
	assert!(found[0].final_score >= 0.95, "Got {}.", found[0].final_score);
	assert_eq!(found[0].confidence, MatchConfidence::High);
}

#[test]
fn low_visual_similarity_is_prefiltered() {
	let source = metadata(ItemType::Lost);
	let target = metadata(ItemType::Found);
	let candidates =
		vec![CandidateItem { metadata: target.clone(), embedding: at_similarity(0.05) }];
	let found = matcher::find_matches(&[1.0, 0.0], &source, &candidates, 0.0, DEFAULT_MAX_RESULTS);

	// Perfect metadata alone would clear the default threshold.
	let unfiltered = matcher::calculate_match_score(0.05, &source, &target);

	assert!(unfiltered.final_score >= DEFAULT_MIN_SCORE);
	assert!(found.is_empty());
}

#[test]
fn empty_candidates_return_empty() {
	let source = metadata(ItemType::Lost);
	let found = matcher::find_matches(&[1.0, 0.0], &source, &[], DEFAULT_MIN_SCORE, 20);

	assert!(found.is_empty());
}

#[test]
fn visual_similarity_is_monotonic() {
	let source = metadata(ItemType::Lost);
	let target = ItemMetadata { category: Category::Bag, ..metadata(ItemType::Found) };
	let mut previous = None;

	for step in 0..=10 {
		let visual = step as f64 / 10.0;
		let scored = matcher::calculate_match_score(visual, &source, &target);

		if let Some((raw, rounded)) = previous {
			assert!(scored.scores.weighted_sum() > raw);
			assert!(scored.final_score > rounded);
		}

		previous = Some((scored.scores.weighted_sum(), scored.final_score));
	}
}

#[test]
fn results_are_ranked_filtered_and_truncated() {
	let source = metadata(ItemType::Lost);
	let candidates = [0.95_f32, 0.4, 0.8, 0.6, 0.2]
		.into_iter()
		.map(|cos| CandidateItem {
			metadata: ItemMetadata { item_id: Uuid::new_v4(), ..metadata(ItemType::Found) },
			embedding: at_similarity(cos),
		})
		.collect::<Vec<_>>();
	let found = matcher::find_matches(&[1.0, 0.0], &source, &candidates, 0.5, 3);

	assert_eq!(found.len(), 3);
	assert!(found.windows(2).all(|pair| pair[0].final_score >= pair[1].final_score));
	assert!(found.iter().all(|candidate| candidate.final_score >= 0.5));
	assert_eq!(found[0].item_id, candidates[0].metadata.item_id);
	assert_eq!(found[1].item_id, candidates[2].metadata.item_id);
}

#[test]
fn equal_scores_rank_by_candidate_id() {
	let source = metadata(ItemType::Lost);
	let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
	let candidates = ids
		.iter()
		.map(|id| CandidateItem {
			metadata: ItemMetadata { item_id: *id, ..metadata(ItemType::Found) },
			embedding: at_similarity(0.8),
		})
		.collect::<Vec<_>>();
	let found = matcher::find_matches(&[1.0, 0.0], &source, &candidates, 0.0, 20);

	ids.sort();

	assert_eq!(found.iter().map(|candidate| candidate.item_id).collect::<Vec<_>>(), ids);
}

#[test]
fn location_falls_back_to_names_without_coordinates() {
	let source = ItemMetadata { coordinates: None, ..metadata(ItemType::Lost) };
	let exact = ItemMetadata { location_name: "central station".to_string(), ..source.clone() };
	let contained =
		ItemMetadata { location_name: "Central Station Mall".to_string(), ..source.clone() };
	let unrelated = ItemMetadata { location_name: "Airport".to_string(), ..source.clone() };

	assert_eq!(matcher::calculate_match_score(0.5, &source, &exact).scores.location, 1.0);
	assert_eq!(matcher::calculate_match_score(0.5, &source, &contained).scores.location, 0.8);
	assert_eq!(matcher::calculate_match_score(0.5, &source, &unrelated).scores.location, 0.5);
	assert_eq!(
		matcher::calculate_match_score(0.5, &source, &exact).features.location_distance_km,
		None
	);
}

#[test]
fn distance_decays_to_floor_then_far() {
	assert_eq!(matcher::distance_score(0.5), 1.0);
	assert!((matcher::distance_score(40.0) - 0.6).abs() < 1e-9);
	assert_eq!(matcher::distance_score(90.0), 0.3);
	assert_eq!(matcher::distance_score(150.0), 0.1);
}

#[test]
fn time_decays_and_missing_is_neutral() {
	let source = metadata(ItemType::Lost);
	let later = |hours: i64| ItemMetadata {
		occurred_at: source.occurred_at.map(|at| at + Duration::hours(hours)),
		..metadata(ItemType::Found)
	};

	assert_eq!(matcher::calculate_match_score(0.5, &source, &later(-20)).scores.time, 1.0);

	let month = matcher::calculate_match_score(0.5, &source, &later(720));

	assert!((month.scores.time - 0.5).abs() < 1e-9);
	assert_eq!(matcher::calculate_match_score(0.5, &source, &later(1_400)).scores.time, 0.3);
	assert_eq!(matcher::calculate_match_score(0.5, &source, &later(2_000)).scores.time, 0.1);

	let undated = ItemMetadata { occurred_at: None, ..metadata(ItemType::Found) };
	let scored = matcher::calculate_match_score(0.5, &source, &undated);

	assert_eq!(scored.scores.time, 0.5);
	assert_eq!(scored.features.time_proximity_hours, None);
}

#[test]
fn color_and_brand_compare_case_insensitively() {
	let source = metadata(ItemType::Lost);
	let same = ItemMetadata { color: Some(" BLACK ".to_string()), ..metadata(ItemType::Found) };
	let different = ItemMetadata {
		color: Some("red".to_string()),
		brand: Some("Other".to_string()),
		..same.clone()
	};
	let scored_same = matcher::calculate_match_score(0.5, &source, &same);
	let scored_different = matcher::calculate_match_score(0.5, &source, &different);

	assert_eq!(scored_same.scores.color, 1.0);
	assert_eq!(scored_same.features.color_match, Some(true));
	assert_eq!(scored_different.scores.color, 0.3);
	assert_eq!(scored_different.scores.brand, 0.3);
	assert_eq!(scored_different.features.brand_match, Some(false));
}

#[test]
fn features_serialize_for_storage() {
	let source = metadata(ItemType::Lost);
	let target = metadata(ItemType::Found);
	let scored = matcher::calculate_match_score(0.87654, &source, &target);
	let json = serde_json::to_value(&scored.features).expect("Features must serialize.");

	assert_eq!(json["visual_similarity"], serde_json::json!(0.877));
	assert_eq!(json["category_match"], serde_json::json!(true));
	assert_eq!(json["location_distance_km"], serde_json::json!(0.0));
}
