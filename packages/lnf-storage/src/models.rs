use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};
use lnf_domain::{
	detection::DetectedObject,
	geo::Coordinates,
	item::{Category, ItemMetadata, ItemType, MatchConfidence},
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
	pub item_id: Uuid,
	pub owner_id: Uuid,
	pub item_type: String,
	pub status: String,
	pub category: String,
	pub title: String,
	pub description: Option<String>,
	pub brand: Option<String>,
	pub color: Option<String>,
	pub location_name: String,
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub occurred_at: OffsetDateTime,
	pub embedding: Option<Vec<f32>>,
	pub ai_category: Option<String>,
	pub ai_processed: bool,
	pub detected_objects: Json<Vec<DetectedObject>>,
	pub match_count: i32,
	pub image_phash: Option<String>,
	pub image_digest: Option<String>,
	pub ai_processed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl ItemRow {
	pub fn item_type(&self) -> Result<ItemType> {
		self.item_type.parse().map_err(|err| Error::InvalidArgument(format!("{err}")))
	}

	pub fn metadata(&self) -> Result<ItemMetadata> {
		let category: Category =
			self.category.parse().map_err(|err| Error::InvalidArgument(format!("{err}")))?;

		Ok(ItemMetadata {
			item_id: self.item_id,
			item_type: self.item_type()?,
			category,
			title: self.title.clone(),
			brand: self.brand.clone(),
			color: self.color.clone(),
			location_name: self.location_name.clone(),
			coordinates: Coordinates::from_parts(self.latitude, self.longitude),
			occurred_at: Some(self.occurred_at),
		})
	}
}

#[derive(Debug, Clone)]
pub struct NewItem {
	pub item_id: Uuid,
	pub owner_id: Uuid,
	pub item_type: ItemType,
	pub category: Category,
	pub title: String,
	pub description: Option<String>,
	pub brand: Option<String>,
	pub color: Option<String>,
	pub location_name: String,
	pub coordinates: Option<Coordinates>,
	pub occurred_at: OffsetDateTime,
}

/// AI-derived fields written by one processing run.
///
/// Detections always overwrite the stored ones; a degraded detector writes the empty result.
/// `embedding` is `None` when extraction degraded, which keeps the stored embedding.
#[derive(Debug, Clone)]
pub struct ItemAiUpdate {
	pub item_id: Uuid,
	pub detected_objects: Vec<DetectedObject>,
	pub ai_category: Option<String>,
	pub embedding: Option<Vec<f32>>,
	pub image_phash: Option<String>,
	pub image_digest: Option<String>,
	pub processed_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchRow {
	pub match_id: Uuid,
	pub user_item_id: Uuid,
	pub matched_item_id: Uuid,
	pub similarity_score: f64,
	pub confidence: String,
	pub matching_features: Value,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMatch {
	pub match_id: Uuid,
	pub user_item_id: Uuid,
	pub matched_item_id: Uuid,
	pub similarity_score: f64,
	pub confidence: MatchConfidence,
	pub matching_features: Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchNotification {
	pub notification_id: Uuid,
	pub match_id: Uuid,
	pub recipient_id: Uuid,
	pub item_id: Uuid,
	pub payload: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMatchNotification {
	pub notification_id: Uuid,
	pub match_id: Uuid,
	pub recipient_id: Uuid,
	pub item_id: Uuid,
	pub payload: Value,
}
