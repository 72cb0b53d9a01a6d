use sqlx::{Executor, Postgres, Transaction, types::Json};
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{ItemAiUpdate, ItemRow, MatchRow, NewItem, NewMatch},
};
use lnf_domain::item::{ItemStatus, ItemType};

const ITEM_COLUMNS: &str = "\
item_id,
	owner_id,
	item_type,
	status,
	category,
	title,
	description,
	brand,
	color,
	location_name,
	latitude,
	longitude,
	occurred_at,
	embedding,
	ai_category,
	ai_processed,
	detected_objects,
	match_count,
	image_phash,
	image_digest,
	ai_processed_at,
	created_at,
	updated_at";

/// Which stored items may be scored against a processed item.
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter {
	pub item_type: ItemType,
	pub exclude_owner: Uuid,
	pub limit: i64,
}

pub async fn insert_item(db: &Db, item: &NewItem) -> Result<()> {
	insert_item_exec(&db.pool, item).await
}

pub async fn insert_item_tx(tx: &mut Transaction<'_, Postgres>, item: &NewItem) -> Result<()> {
	insert_item_exec(&mut **tx, item).await
}

pub async fn fetch_item(db: &Db, item_id: Uuid) -> Result<Option<ItemRow>> {
	let sql = format!("SELECT {ITEM_COLUMNS}\nFROM items\nWHERE item_id = $1");
	let row = sqlx::query_as::<_, ItemRow>(&sql).bind(item_id).fetch_optional(&db.pool).await?;

	Ok(row)
}

/// Loads an item and holds its row lock until the transaction ends.
///
/// The lock is `FOR NO KEY UPDATE` so match and notification inserts that reference this row
/// from another transaction (their `FOR KEY SHARE` check) are not blocked by it.
pub async fn lock_item_tx(
	tx: &mut Transaction<'_, Postgres>,
	item_id: Uuid,
) -> Result<Option<ItemRow>> {
	let sql =
		format!("SELECT {ITEM_COLUMNS}\nFROM items\nWHERE item_id = $1\nFOR NO KEY UPDATE");
	let row = sqlx::query_as::<_, ItemRow>(&sql).bind(item_id).fetch_optional(&mut **tx).await?;

	Ok(row)
}

pub async fn update_item_ai_tx(
	tx: &mut Transaction<'_, Postgres>,
	update: &ItemAiUpdate,
) -> Result<()> {
	let result = sqlx::query(
		"\
UPDATE items
SET
	detected_objects = $2,
	ai_category = $3,
	embedding = COALESCE($4, embedding),
	image_phash = COALESCE($5, image_phash),
	image_digest = COALESCE($6, image_digest),
	ai_processed = true,
	ai_processed_at = $7,
	updated_at = $7
WHERE item_id = $1",
	)
	.bind(update.item_id)
	.bind(Json(&update.detected_objects))
	.bind(update.ai_category.as_deref())
	.bind(update.embedding.as_deref())
	.bind(update.image_phash.as_deref())
	.bind(update.image_digest.as_deref())
	.bind(update.processed_at)
	.execute(&mut **tx)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("item {}", update.item_id)));
	}

	Ok(())
}

pub async fn fetch_candidates(db: &Db, filter: CandidateFilter) -> Result<Vec<ItemRow>> {
	fetch_candidates_exec(&db.pool, filter).await
}

pub async fn fetch_candidates_tx(
	tx: &mut Transaction<'_, Postgres>,
	filter: CandidateFilter,
) -> Result<Vec<ItemRow>> {
	fetch_candidates_exec(&mut **tx, filter).await
}

pub async fn increment_match_count_tx(
	tx: &mut Transaction<'_, Postgres>,
	item_id: Uuid,
	delta: i32,
) -> Result<()> {
	if delta == 0 {
		return Ok(());
	}
	if delta < 0 {
		return Err(Error::InvalidArgument("match_count only moves forward.".to_string()));
	}

	sqlx::query(
		"UPDATE items SET match_count = match_count + $1, updated_at = now() WHERE item_id = $2",
	)
	.bind(delta)
	.bind(item_id)
	.execute(&mut **tx)
	.await?;

	Ok(())
}

/// True when a match already links the two items, in either direction.
pub async fn match_exists(db: &Db, a: Uuid, b: Uuid) -> Result<bool> {
	match_exists_exec(&db.pool, a, b).await
}

pub async fn match_exists_tx(tx: &mut Transaction<'_, Postgres>, a: Uuid, b: Uuid) -> Result<bool> {
	match_exists_exec(&mut **tx, a, b).await
}

/// Inserts a pending match and reports whether a row was created.
///
/// A concurrent insert for the same unordered pair makes this a no-op instead of an error.
pub async fn insert_match_tx(tx: &mut Transaction<'_, Postgres>, new: &NewMatch) -> Result<bool> {
	let result = sqlx::query(
		"\
INSERT INTO matches (
	match_id,
	user_item_id,
	matched_item_id,
	similarity_score,
	confidence,
	matching_features,
	status
)
VALUES ($1, $2, $3, $4, $5, $6, 'PENDING')
ON CONFLICT DO NOTHING",
	)
	.bind(new.match_id)
	.bind(new.user_item_id)
	.bind(new.matched_item_id)
	.bind(new.similarity_score)
	.bind(new.confidence.as_str())
	.bind(&new.matching_features)
	.execute(&mut **tx)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn list_matches_for_item(db: &Db, item_id: Uuid) -> Result<Vec<MatchRow>> {
	let rows = sqlx::query_as::<_, MatchRow>(
		"\
SELECT
	match_id,
	user_item_id,
	matched_item_id,
	similarity_score,
	confidence,
	matching_features,
	status,
	created_at,
	updated_at
FROM matches
WHERE user_item_id = $1 OR matched_item_id = $1
ORDER BY similarity_score DESC, match_id ASC",
	)
	.bind(item_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// One keyset page of open, processed items that carry an embedding.
pub async fn list_rematch_batch(db: &Db, after: Option<Uuid>, limit: i64) -> Result<Vec<Uuid>> {
	let ids = sqlx::query_scalar::<_, Uuid>(
		"\
SELECT item_id
FROM items
WHERE status = $1
	AND ai_processed
	AND embedding IS NOT NULL
	AND ($2::uuid IS NULL OR item_id > $2)
ORDER BY item_id ASC
LIMIT $3",
	)
	.bind(ItemStatus::Open.as_str())
	.bind(after)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

async fn insert_item_exec<'e, E>(executor: E, item: &NewItem) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	let (latitude, longitude) = match item.coordinates {
		Some(coords) => (Some(coords.latitude), Some(coords.longitude)),
		None => (None, None),
	};

	sqlx::query(
		"\
INSERT INTO items (
	item_id,
	owner_id,
	item_type,
	status,
	category,
	title,
	description,
	brand,
	color,
	location_name,
	latitude,
	longitude,
	occurred_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
	)
	.bind(item.item_id)
	.bind(item.owner_id)
	.bind(item.item_type.as_str())
	.bind(ItemStatus::Open.as_str())
	.bind(item.category.as_str())
	.bind(item.title.as_str())
	.bind(item.description.as_deref())
	.bind(item.brand.as_deref())
	.bind(item.color.as_deref())
	.bind(item.location_name.as_str())
	.bind(latitude)
	.bind(longitude)
	.bind(item.occurred_at)
	.execute(executor)
	.await?;

	Ok(())
}

async fn fetch_candidates_exec<'e, E>(executor: E, filter: CandidateFilter) -> Result<Vec<ItemRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!(
		"\
SELECT {ITEM_COLUMNS}
FROM items
WHERE item_type = $1
	AND status = $2
	AND ai_processed
	AND embedding IS NOT NULL
	AND owner_id <> $3
ORDER BY created_at DESC, item_id ASC
LIMIT $4"
	);
	let rows = sqlx::query_as::<_, ItemRow>(&sql)
		.bind(filter.item_type.as_str())
		.bind(ItemStatus::Open.as_str())
		.bind(filter.exclude_owner)
		.bind(filter.limit)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

async fn match_exists_exec<'e, E>(executor: E, a: Uuid, b: Uuid) -> Result<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let exists = sqlx::query_scalar::<_, bool>(
		"\
SELECT EXISTS (
	SELECT 1
	FROM matches
	WHERE (user_item_id = $1 AND matched_item_id = $2)
		OR (user_item_id = $2 AND matched_item_id = $1)
)",
	)
	.bind(a)
	.bind(b)
	.fetch_one(executor)
	.await?;

	Ok(exists)
}
