use std::{collections::HashMap, time::Instant};

use serde::Serialize;
use sqlx::{Acquire, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, LnfService, Result, inference::StageStatus};
use lnf_domain::{
	detection::DetectedObject,
	matcher::{self, CandidateItem, MatchCandidate},
};
use lnf_imaging::PreparedImage;
use lnf_storage::{
	models::{ItemAiUpdate, ItemRow, NewMatch, NewMatchNotification},
	outbox,
	queries::{self, CandidateFilter},
};

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
	pub item_id: Uuid,
	pub detected_objects: Vec<DetectedObject>,
	pub ai_category: Option<String>,
	pub embedding: Option<Vec<f32>>,
	/// Matches created by this run.
	pub matches_found: u32,
	pub processing_time_ms: u64,
	pub detection: StageStatus,
	pub extraction: StageStatus,
	#[serde(skip)]
	pub thumbnails: Thumbnails,
}

/// JPEG thumbnails for the caller's media store.
#[derive(Debug, Clone, Default)]
pub struct Thumbnails {
	pub small: Vec<u8>,
	pub large: Vec<u8>,
}

impl LnfService {
	/// Runs detection, extraction, and matching for a stored item and persists the results.
	///
	/// The AI fields are committed even when the matching stage fails; that failure is still
	/// returned.
	pub async fn process_item(&self, item_id: Uuid, image_data: &[u8]) -> Result<ProcessingResult> {
		let started = Instant::now();

		if queries::fetch_item(&self.db, item_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("item {item_id}") });
		}

		let prepared = self.prepare_image(image_data).await?;

		self.process_prepared(item_id, prepared, started).await
	}

	pub(crate) async fn prepare_image(&self, image_data: &[u8]) -> Result<PreparedImage> {
		let bytes = image_data.to_vec();
		let cfg = self.cfg.imaging.clone();
		let prepared = tokio::task::spawn_blocking(move || lnf_imaging::prepare(&bytes, &cfg))
			.await
			.map_err(|err| Error::InvalidImage {
				message: format!("Image preparation aborted: {err}."),
			})??;

		Ok(prepared)
	}

	pub(crate) async fn process_prepared(
		&self,
		item_id: Uuid,
		prepared: PreparedImage,
		started: Instant,
	) -> Result<ProcessingResult> {
		let (detection, extraction) = tokio::join!(
			self.run_detection(&prepared.canonical_jpeg),
			self.run_extraction(&prepared.canonical_jpeg),
		);
		let detection_status = detection.status();
		let extraction_status = extraction.status();
		let (detected_objects, ai_category) = match detection.ready() {
			Some(result) => (result.detections, result.primary_class),
			None => (Vec::new(), None),
		};
		let embedding = extraction.ready();
		let mut tx = self.db.pool.begin().await?;
		let Some(item) = queries::lock_item_tx(&mut tx, item_id).await? else {
			return Err(Error::NotFound { message: format!("item {item_id}") });
		};

		queries::update_item_ai_tx(
			&mut tx,
			&ItemAiUpdate {
				item_id,
				detected_objects: detected_objects.clone(),
				ai_category: ai_category.clone(),
				embedding: embedding.clone(),
				image_phash: Some(prepared.phash.clone()),
				image_digest: Some(prepared.digest.clone()),
				processed_at: OffsetDateTime::now_utc(),
			},
		)
		.await?;

		let matching = match embedding.as_deref() {
			Some(embedding) => self.match_in_savepoint(&mut tx, &item, embedding).await,
			None => Ok(0),
		};

		tx.commit().await?;

		let matches_found = matching?;
		let processing_time_ms = started.elapsed().as_millis() as u64;

		tracing::info!(
			item_id = %item_id,
			matches_found,
			processing_time_ms,
			embedding = embedding.is_some(),
			"Item processed."
		);

		Ok(ProcessingResult {
			item_id,
			detected_objects,
			ai_category,
			embedding,
			matches_found,
			processing_time_ms,
			detection: detection_status,
			extraction: extraction_status,
			thumbnails: Thumbnails {
				small: prepared.thumbnail_small,
				large: prepared.thumbnail_large,
			},
		})
	}

	async fn match_in_savepoint(
		&self,
		tx: &mut Transaction<'_, Postgres>,
		item: &ItemRow,
		embedding: &[f32],
	) -> Result<u32> {
		let mut savepoint = tx.begin().await?;

		match self.record_matches(&mut savepoint, item, embedding).await {
			Ok(created) => {
				savepoint.commit().await?;

				Ok(created)
			},
			Err(err) => {
				if let Err(rollback_err) = savepoint.rollback().await {
					tracing::warn!(
						item_id = %item.item_id,
						error = %rollback_err,
						"Failed to roll back matching savepoint."
					);
				}

				tracing::error!(
					item_id = %item.item_id,
					error = %err,
					"Matching stage failed. AI fields are kept."
				);

				Err(err)
			},
		}
	}

	/// Scores candidates for `item`, inserts new matches with their notifications, and bumps
	/// the item's match counter by the number created.
	pub(crate) async fn record_matches(
		&self,
		tx: &mut Transaction<'_, Postgres>,
		item: &ItemRow,
		embedding: &[f32],
	) -> Result<u32> {
		let metadata = item.metadata()?;
		let filter = CandidateFilter {
			item_type: metadata.item_type.opposite(),
			exclude_owner: item.owner_id,
			limit: i64::from(self.cfg.matching.candidate_scan_limit),
		};
		let rows = queries::fetch_candidates_tx(tx, filter).await?;
		let mut owners = HashMap::with_capacity(rows.len());
		let mut candidates = Vec::with_capacity(rows.len());

		for row in rows {
			let Some(candidate_embedding) = row.embedding.clone() else {
				continue;
			};
			let candidate_metadata = match row.metadata() {
				Ok(candidate_metadata) => candidate_metadata,
				Err(err) => {
					tracing::warn!(
						item_id = %row.item_id,
						error = %err,
						"Skipping candidate with unreadable metadata."
					);

					continue;
				},
			};

			owners.insert(row.item_id, row.owner_id);
			candidates.push(CandidateItem {
				metadata: candidate_metadata,
				embedding: candidate_embedding,
			});
		}

		let found = matcher::find_matches(
			embedding,
			&metadata,
			&candidates,
			self.cfg.matching.min_score,
			self.cfg.matching.max_results as usize,
		);
		let mut created = 0_u32;

		for candidate in &found {
			let Some(candidate_owner) = owners.get(&candidate.item_id).copied() else {
				continue;
			};

			if queries::match_exists_tx(tx, item.item_id, candidate.item_id).await? {
				continue;
			}

			let new = new_match(item.item_id, candidate)?;

			if !queries::insert_match_tx(tx, &new).await? {
				continue;
			}

			let payload = notification_payload(&new);

			for (recipient_id, recipient_item) in
				[(item.owner_id, item.item_id), (candidate_owner, candidate.item_id)]
			{
				outbox::enqueue_notification_tx(
					tx,
					&NewMatchNotification {
						notification_id: Uuid::new_v4(),
						match_id: new.match_id,
						recipient_id,
						item_id: recipient_item,
						payload: payload.clone(),
					},
				)
				.await?;
			}

			created += 1;
		}

		queries::increment_match_count_tx(tx, item.item_id, created as i32).await?;

		tracing::info!(
			item_id = %item.item_id,
			candidates = candidates.len(),
			scored = found.len(),
			created,
			"Matching stage completed."
		);

		Ok(created)
	}
}

fn new_match(item_id: Uuid, candidate: &MatchCandidate) -> Result<NewMatch> {
	let matching_features = serde_json::to_value(&candidate.features).map_err(|err| {
		Error::Storage { message: format!("Failed to encode matching features: {err}.") }
	})?;

	Ok(NewMatch {
		match_id: Uuid::new_v4(),
		user_item_id: item_id,
		matched_item_id: candidate.item_id,
		similarity_score: candidate.final_score,
		confidence: candidate.confidence,
		matching_features,
	})
}

fn notification_payload(new: &NewMatch) -> serde_json::Value {
	serde_json::json!({
		"match_id": new.match_id,
		"user_item_id": new.user_item_id,
		"matched_item_id": new.matched_item_id,
		"similarity_score": new.similarity_score,
		"confidence": new.confidence.as_str(),
	})
}
