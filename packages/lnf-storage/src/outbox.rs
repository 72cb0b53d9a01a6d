use sqlx::{PgExecutor, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{MatchNotification, NewMatchNotification},
};

const NOTIFICATION_COLUMNS: &str = "\
notification_id,
	match_id,
	recipient_id,
	item_id,
	payload,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at";

/// Queues a notification in the caller's transaction so it commits with its match.
///
/// Returns `false` when the recipient already has a row for this match.
pub async fn enqueue_notification_tx(
	tx: &mut Transaction<'_, Postgres>,
	new: &NewMatchNotification,
) -> Result<bool> {
	enqueue_notification_exec(&mut **tx, new).await
}

pub async fn claim_next_notification(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
) -> Result<Option<MatchNotification>> {
	let mut tx = db.pool.begin().await?;
	let sql = format!(
		"\
SELECT {NOTIFICATION_COLUMNS}
FROM match_notifications
WHERE status IN ('PENDING','FAILED','CLAIMED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED"
	);
	let row = sqlx::query_as::<_, MatchNotification>(&sql)
		.bind(now)
		.fetch_optional(&mut *tx)
		.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + time::Duration::seconds(lease_seconds);

		sqlx::query(
			"\
UPDATE match_notifications
SET status = 'CLAIMED', available_at = $1, updated_at = $2
WHERE notification_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.notification_id)
		.execute(&mut *tx)
		.await?;

		job.status = "CLAIMED".to_string();
		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_notification_done(
	db: &Db,
	notification_id: Uuid,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE match_notifications
SET status = 'DONE', updated_at = $1
WHERE notification_id = $2",
	)
	.bind(now)
	.bind(notification_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn mark_notification_failed(
	db: &Db,
	notification_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE match_notifications
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE notification_id = $5",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(notification_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn list_notifications_for_match(
	db: &Db,
	match_id: Uuid,
) -> Result<Vec<MatchNotification>> {
	let sql = format!(
		"\
SELECT {NOTIFICATION_COLUMNS}
FROM match_notifications
WHERE match_id = $1
ORDER BY recipient_id ASC"
	);
	let rows =
		sqlx::query_as::<_, MatchNotification>(&sql).bind(match_id).fetch_all(&db.pool).await?;

	Ok(rows)
}

async fn enqueue_notification_exec<'e, E>(executor: E, new: &NewMatchNotification) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO match_notifications (
	notification_id,
	match_id,
	recipient_id,
	item_id,
	payload,
	status
)
VALUES ($1, $2, $3, $4, $5, 'PENDING')
ON CONFLICT (match_id, recipient_id) DO NOTHING",
	)
	.bind(new.notification_id)
	.bind(new.match_id)
	.bind(new.recipient_id)
	.bind(new.item_id)
	.bind(&new.payload)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}
