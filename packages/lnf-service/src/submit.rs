use std::time::Instant;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, LnfService, ProcessingResult, Result};
use lnf_domain::{
	geo::Coordinates,
	item::{Category, ItemType},
};
use lnf_storage::{models::NewItem, queries};

#[derive(Debug, Clone)]
pub struct SubmitItemRequest {
	pub owner_id: Uuid,
	pub item_type: ItemType,
	pub category: Category,
	pub title: String,
	pub description: Option<String>,
	pub brand: Option<String>,
	pub color: Option<String>,
	pub location_name: String,
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub occurred_at: OffsetDateTime,
	pub image: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitItemResponse {
	pub item_id: Uuid,
	pub ai_processed: bool,
	pub processing: Option<ProcessingResult>,
	pub matches: Vec<MatchSummary>,
	/// Set when the item was stored but processing, or listing its matches, failed.
	pub ai_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
	pub match_id: Uuid,
	pub matched_item_id: Uuid,
	pub similarity_score: f64,
	pub confidence: String,
	pub status: String,
}

impl LnfService {
	/// Stores a new report and processes its image.
	///
	/// An invalid image or invalid fields reject the submission before anything is written.
	/// Once the item is stored, processing errors are reported in the response instead.
	pub async fn submit_item(&self, req: SubmitItemRequest) -> Result<SubmitItemResponse> {
		let started = Instant::now();
		let prepared = self.prepare_image(&req.image).await?;
		let new_item = build_new_item(&req)?;
		let item_id = new_item.item_id;

		queries::insert_item(&self.db, &new_item).await?;

		tracing::info!(
			item_id = %item_id,
			item_type = new_item.item_type.as_str(),
			category = new_item.category.as_str(),
			"Item submitted."
		);

		match self.process_prepared(item_id, prepared, started).await {
			Ok(processing) => {
				let summaries = self.match_summaries(item_id).await;

				Ok(processed_response(item_id, processing, summaries))
			},
			Err(err) => {
				tracing::error!(item_id = %item_id, error = %err, "Item processing failed.");

				let ai_processed = queries::fetch_item(&self.db, item_id)
					.await
					.ok()
					.flatten()
					.is_some_and(|row| row.ai_processed);

				Ok(SubmitItemResponse {
					item_id,
					ai_processed,
					processing: None,
					matches: Vec::new(),
					ai_error: Some(err.to_string()),
				})
			},
		}
	}

	async fn match_summaries(&self, item_id: Uuid) -> Result<Vec<MatchSummary>> {
		let rows = queries::list_matches_for_item(&self.db, item_id).await?;

		Ok(rows
			.into_iter()
			.map(|row| MatchSummary {
				match_id: row.match_id,
				matched_item_id: if row.user_item_id == item_id {
					row.matched_item_id
				} else {
					row.user_item_id
				},
				similarity_score: row.similarity_score,
				confidence: row.confidence,
				status: row.status,
			})
			.collect())
	}
}

/// The item is stored and processed at this point, so a failed match listing is reported in
/// `ai_error` rather than failing the submission.
fn processed_response(
	item_id: Uuid,
	processing: ProcessingResult,
	summaries: Result<Vec<MatchSummary>>,
) -> SubmitItemResponse {
	let (matches, ai_error) = match summaries {
		Ok(matches) => (matches, None),
		Err(err) => {
			tracing::warn!(
				item_id = %item_id,
				error = %err,
				"Failed to list matches for submitted item."
			);

			(Vec::new(), Some(err.to_string()))
		},
	};

	SubmitItemResponse {
		item_id,
		ai_processed: true,
		processing: Some(processing),
		matches,
		ai_error,
	}
}

fn build_new_item(req: &SubmitItemRequest) -> Result<NewItem> {
	let title = required_text("title", &req.title)?;
	let location_name = required_text("location_name", &req.location_name)?;
	let coordinates = match (req.latitude, req.longitude) {
		(None, None) => None,
		(Some(latitude), Some(longitude)) =>
			Some(Coordinates::new(latitude, longitude).ok_or_else(|| Error::InvalidRequest {
				message: "Coordinates are out of range.".to_string(),
			})?),
		_ => {
			return Err(Error::InvalidRequest {
				message: "latitude and longitude must be provided together.".to_string(),
			});
		},
	};

	Ok(NewItem {
		item_id: Uuid::new_v4(),
		owner_id: req.owner_id,
		item_type: req.item_type,
		category: req.category,
		title,
		description: optional_text(req.description.as_deref()),
		brand: optional_text(req.brand.as_deref()),
		color: optional_text(req.color.as_deref()),
		location_name,
		coordinates,
		occurred_at: req.occurred_at,
	})
}

fn required_text(field: &str, value: &str) -> Result<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidRequest { message: format!("{field} must be non-empty.") });
	}

	Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::{StageStatus, Thumbnails};

	fn request() -> SubmitItemRequest {
		SubmitItemRequest {
			owner_id: Uuid::new_v4(),
			item_type: ItemType::Lost,
			category: Category::Wallet,
			title: "  Brown wallet ".to_string(),
			description: Some("   ".to_string()),
			brand: Some(" Fossil ".to_string()),
			color: None,
			location_name: "Main St".to_string(),
			latitude: Some(40.7),
			longitude: Some(-74.0),
			occurred_at: OffsetDateTime::UNIX_EPOCH,
			image: Vec::new(),
		}
	}

	#[test]
	fn trims_fields_and_drops_blank_optionals() {
		let item = build_new_item(&request()).expect("Expected a valid item.");

		assert_eq!(item.title, "Brown wallet");
		assert_eq!(item.description, None);
		assert_eq!(item.brand.as_deref(), Some("Fossil"));
		assert_eq!(item.coordinates, Coordinates::new(40.7, -74.0));
	}

	#[test]
	fn rejects_blank_title_and_location() {
		let mut req = request();

		req.title = " ".to_string();

		assert!(matches!(build_new_item(&req), Err(Error::InvalidRequest { .. })));

		let mut req = request();

		req.location_name = String::new();

		assert!(matches!(build_new_item(&req), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn rejects_half_or_out_of_range_coordinates() {
		let mut req = request();

		req.longitude = None;

		assert!(matches!(build_new_item(&req), Err(Error::InvalidRequest { .. })));

		let mut req = request();

		req.latitude = Some(91.0);

		assert!(matches!(build_new_item(&req), Err(Error::InvalidRequest { .. })));
	}

	fn processing(item_id: Uuid) -> ProcessingResult {
		ProcessingResult {
			item_id,
			detected_objects: Vec::new(),
			ai_category: None,
			embedding: Some(vec![1.0, 0.0]),
			matches_found: 1,
			processing_time_ms: 5,
			detection: StageStatus::Completed,
			extraction: StageStatus::Completed,
			thumbnails: Thumbnails::default(),
		}
	}

	#[test]
	fn failed_match_listing_keeps_the_processed_item() {
		let item_id = Uuid::new_v4();
		let response = processed_response(
			item_id,
			processing(item_id),
			Err(Error::Storage { message: "connection reset".to_string() }),
		);

		assert!(response.ai_processed);
		assert!(response.processing.is_some());
		assert!(response.matches.is_empty());
		assert_eq!(response.ai_error.as_deref(), Some("Storage error: connection reset"));
	}

	#[test]
	fn listed_matches_are_returned_without_error() {
		let item_id = Uuid::new_v4();
		let summary = MatchSummary {
			match_id: Uuid::new_v4(),
			matched_item_id: Uuid::new_v4(),
			similarity_score: 0.8,
			confidence: "HIGH".to_string(),
			status: "PENDING".to_string(),
		};
		let response = processed_response(item_id, processing(item_id), Ok(vec![summary]));

		assert_eq!(response.matches.len(), 1);
		assert!(response.ai_error.is_none());
	}

	#[test]
	fn coordinates_may_be_absent() {
		let mut req = request();

		req.latitude = None;
		req.longitude = None;

		assert!(build_new_item(&req).expect("Expected a valid item.").coordinates.is_none());
	}
}
