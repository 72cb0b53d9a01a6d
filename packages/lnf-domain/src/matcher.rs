use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	geo,
	item::{ItemMetadata, MatchConfidence},
	vector,
};

pub const VISUAL_WEIGHT: f64 = 0.65;
pub const CATEGORY_WEIGHT: f64 = 0.15;
pub const COLOR_WEIGHT: f64 = 0.08;
pub const BRAND_WEIGHT: f64 = 0.02;
pub const LOCATION_WEIGHT: f64 = 0.07;
pub const TIME_WEIGHT: f64 = 0.03;

/// Candidates below this visual similarity are dropped before composite scoring.
pub const MIN_VISUAL_SIMILARITY: f64 = 0.10;
pub const DEFAULT_MIN_SCORE: f64 = 0.25;
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const HIGH_CONFIDENCE: f64 = 0.70;
pub const MEDIUM_CONFIDENCE: f64 = 0.45;
/// Location scores at or above this count as "nearby" in the stored feature breakdown.
pub const NEARBY_LOCATION_SCORE: f64 = 0.7;

const NEUTRAL_SCORE: f64 = 0.7;
const MISMATCH_SCORE: f64 = 0.3;
const CATEGORY_MISMATCH_SCORE: f64 = 0.5;
const UNKNOWN_SCORE: f64 = 0.5;
const FAR_SCORE: f64 = 0.1;
const DECAY_FLOOR: f64 = 0.3;
const SAME_PLACE_KM: f64 = 1.0;
const LOCATION_DECAY_KM: f64 = 100.0;
const SAME_DAY_HOURS: f64 = 24.0;
const TIME_DECAY_HOURS: f64 = 60.0 * 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
	pub visual: f64,
	pub category: f64,
	pub color: f64,
	pub brand: f64,
	pub location: f64,
	pub time: f64,
}
impl ComponentScores {
	/// Unrounded weighted sum.
	pub fn weighted_sum(&self) -> f64 {
		self.visual * VISUAL_WEIGHT
			+ self.category * CATEGORY_WEIGHT
			+ self.color * COLOR_WEIGHT
			+ self.brand * BRAND_WEIGHT
			+ self.location * LOCATION_WEIGHT
			+ self.time * TIME_WEIGHT
	}
}

/// Structured breakdown persisted alongside each match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFeatures {
	pub visual_similarity: f64,
	pub category_match: bool,
	pub color_match: Option<bool>,
	pub brand_match: Option<bool>,
	pub location_nearby: bool,
	pub location_distance_km: Option<f64>,
	pub time_proximity_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
	pub item_id: Uuid,
	pub scores: ComponentScores,
	pub final_score: f64,
	pub confidence: MatchConfidence,
	pub features: MatchFeatures,
}

/// A stored item eligible for matching together with its normalized embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
	pub metadata: ItemMetadata,
	pub embedding: Vec<f32>,
}

pub fn classify(final_score: f64) -> MatchConfidence {
	if final_score >= HIGH_CONFIDENCE {
		MatchConfidence::High
	} else if final_score >= MEDIUM_CONFIDENCE {
		MatchConfidence::Medium
	} else {
		MatchConfidence::Low
	}
}

pub fn calculate_match_score(
	visual_similarity: f64,
	source: &ItemMetadata,
	target: &ItemMetadata,
) -> MatchCandidate {
	let visual =
		if visual_similarity.is_finite() { visual_similarity.clamp(0.0, 1.0) } else { 0.0 };
	let category_match = source.category == target.category;
	let category = if category_match { 1.0 } else { CATEGORY_MISMATCH_SCORE };
	let color_match = attribute_match(source.color.as_deref(), target.color.as_deref());
	let brand_match = attribute_match(source.brand.as_deref(), target.brand.as_deref());
	let distance_km = match (source.coordinates, target.coordinates) {
		(Some(a), Some(b)) => Some(geo::haversine_km(a, b)),
		_ => None,
	};
	let location = match distance_km {
		Some(distance_km) => distance_score(distance_km),
		None => location_name_score(&source.location_name, &target.location_name),
	};
	let hours = match (source.occurred_at, target.occurred_at) {
		(Some(a), Some(b)) => Some((a - b).abs().as_seconds_f64() / 3_600.0),
		_ => None,
	};
	let time = hours.map(hours_score).unwrap_or(UNKNOWN_SCORE);
	let scores = ComponentScores {
		visual,
		category,
		color: attribute_score(color_match),
		brand: attribute_score(brand_match),
		location,
		time,
	};
	let weighted_sum = scores.weighted_sum();

	MatchCandidate {
		item_id: target.item_id,
		scores,
		final_score: round_to(weighted_sum, 3),
		// Tiers come from the unrounded sum; 0.6996 stays MEDIUM although it rounds to 0.700.
		confidence: classify(weighted_sum),
		features: MatchFeatures {
			visual_similarity: round_to(visual, 3),
			category_match,
			color_match,
			brand_match,
			location_nearby: location >= NEARBY_LOCATION_SCORE,
			location_distance_km: distance_km.map(|km| round_to(km, 2)),
			time_proximity_hours: hours.map(|hours| round_to(hours, 1)),
		},
	}
}

/// Scores every candidate against the query and returns the best `max_results`.
///
/// Ordering is by final score, then visual similarity, then candidate id, so equal inputs always
/// rank the same way.
pub fn find_matches(
	query_embedding: &[f32],
	query: &ItemMetadata,
	candidates: &[CandidateItem],
	min_score: f64,
	max_results: usize,
) -> Vec<MatchCandidate> {
	let mut matches = candidates
		.iter()
		.filter(|candidate| candidate.metadata.item_id != query.item_id)
		.filter_map(|candidate| {
			let visual = vector::similarity(query_embedding, &candidate.embedding) as f64;

			if visual < MIN_VISUAL_SIMILARITY {
				return None;
			}

			let scored = calculate_match_score(visual, query, &candidate.metadata);

			(scored.final_score >= min_score).then_some(scored)
		})
		.collect::<Vec<_>>();

	matches.sort_by(rank_order);
	matches.truncate(max_results);

	matches
}

pub fn distance_score(distance_km: f64) -> f64 {
	if !distance_km.is_finite() {
		return FAR_SCORE;
	}
	if distance_km <= SAME_PLACE_KM {
		1.0
	} else if distance_km <= LOCATION_DECAY_KM {
		(1.0 - distance_km / LOCATION_DECAY_KM).max(DECAY_FLOOR)
	} else {
		FAR_SCORE
	}
}

pub fn hours_score(hours: f64) -> f64 {
	if !hours.is_finite() {
		return UNKNOWN_SCORE;
	}
	if hours <= SAME_DAY_HOURS {
		1.0
	} else if hours <= TIME_DECAY_HOURS {
		(1.0 - hours / TIME_DECAY_HOURS).max(DECAY_FLOOR)
	} else {
		FAR_SCORE
	}
}

pub fn location_name_score(a: &str, b: &str) -> f64 {
	let a = a.trim().to_lowercase();
	let b = b.trim().to_lowercase();

	if a.is_empty() || b.is_empty() {
		return UNKNOWN_SCORE;
	}
	if a == b {
		1.0
	} else if a.contains(&b) || b.contains(&a) {
		0.8
	} else {
		UNKNOWN_SCORE
	}
}

fn attribute_match(a: Option<&str>, b: Option<&str>) -> Option<bool> {
	let a = a.map(str::trim).filter(|value| !value.is_empty())?;
	let b = b.map(str::trim).filter(|value| !value.is_empty())?;

	Some(a.to_lowercase() == b.to_lowercase())
}

fn attribute_score(matched: Option<bool>) -> f64 {
	match matched {
		Some(true) => 1.0,
		Some(false) => MISMATCH_SCORE,
		None => NEUTRAL_SCORE,
	}
}

fn rank_order(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
	b.final_score
		.total_cmp(&a.final_score)
		.then_with(|| b.scores.visual.total_cmp(&a.scores.visual))
		.then_with(|| a.item_id.cmp(&b.item_id))
}

fn round_to(value: f64, places: i32) -> f64 {
	let factor = 10_f64.powi(places);

	(value * factor).round() / factor
}
