use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::{Error, LnfService, Result};
use lnf_storage::queries;

#[derive(Debug, Clone, Serialize)]
pub struct RematchResult {
	pub item_id: Uuid,
	pub matches_found: u32,
	pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RematchReport {
	pub items_scanned: u64,
	pub items_failed: u64,
	pub matches_created: u64,
}

impl LnfService {
	/// Re-runs matching for one item from its stored embedding, without touching the image.
	pub async fn rematch_item(&self, item_id: Uuid) -> Result<RematchResult> {
		let started = Instant::now();
		let mut tx = self.db.pool.begin().await?;
		let Some(item) = queries::lock_item_tx(&mut tx, item_id).await? else {
			return Err(Error::NotFound { message: format!("item {item_id}") });
		};

		if !item.ai_processed {
			return Err(Error::InvalidRequest {
				message: format!("Item {item_id} has not been processed yet."),
			});
		}

		let Some(embedding) = item.embedding.clone() else {
			return Err(Error::InvalidRequest {
				message: format!("Item {item_id} has no stored embedding."),
			});
		};
		let matches_found = self.record_matches(&mut tx, &item, &embedding).await?;

		tx.commit().await?;

		Ok(RematchResult {
			item_id,
			matches_found,
			processing_time_ms: started.elapsed().as_millis() as u64,
		})
	}

	/// Walks every open, processed item in id order and rematches it.
	///
	/// Failures are counted and logged per item; only listing failures abort the walk.
	pub async fn rematch_open_items(&self, batch_size: u32) -> Result<RematchReport> {
		if batch_size == 0 {
			return Err(Error::InvalidRequest {
				message: "batch_size must be greater than zero.".to_string(),
			});
		}

		let mut report = RematchReport::default();
		let mut after = None;

		loop {
			let ids = queries::list_rematch_batch(&self.db, after, i64::from(batch_size)).await?;

			for item_id in &ids {
				report.items_scanned += 1;

				match self.rematch_item(*item_id).await {
					Ok(result) => report.matches_created += u64::from(result.matches_found),
					Err(err) => {
						report.items_failed += 1;

						tracing::warn!(item_id = %item_id, error = %err, "Rematch failed.");
					},
				}
			}

			if ids.len() < batch_size as usize {
				break;
			}

			after = ids.last().copied();
		}

		tracing::info!(
			items_scanned = report.items_scanned,
			items_failed = report.items_failed,
			matches_created = report.matches_created,
			"Rematch sweep completed."
		);

		Ok(report)
	}
}
