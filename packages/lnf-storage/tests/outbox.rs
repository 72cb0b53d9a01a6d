use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use lnf_config::Postgres;
use lnf_domain::item::{Category, ItemType, MatchConfidence};
use lnf_storage::{
	db::Db,
	models::{NewItem, NewMatch, NewMatchNotification},
	outbox, queries,
};
use lnf_testkit::TestDatabase;

fn new_item(item_type: ItemType) -> NewItem {
	NewItem {
		item_id: Uuid::new_v4(),
		owner_id: Uuid::new_v4(),
		item_type,
		category: Category::Bag,
		title: "Blue backpack".to_string(),
		description: Some("Laptop inside.".to_string()),
		brand: None,
		color: Some("blue".to_string()),
		location_name: "Station".to_string(),
		coordinates: None,
		occurred_at: OffsetDateTime::now_utc(),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LNF_PG_DSN to run."]
async fn notifications_claim_fail_and_complete() {
	let Some(base_dsn) = lnf_testkit::env_dsn() else {
		eprintln!("Skipping notifications_claim_fail_and_complete; set LNF_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let lost = new_item(ItemType::Lost);
	let found = new_item(ItemType::Found);

	queries::insert_item(&db, &lost).await.expect("Failed to insert lost item.");
	queries::insert_item(&db, &found).await.expect("Failed to insert found item.");

	let match_id = Uuid::new_v4();
	let notification = NewMatchNotification {
		notification_id: Uuid::new_v4(),
		match_id,
		recipient_id: lost.owner_id,
		item_id: lost.item_id,
		payload: serde_json::json!({ "match_id": match_id }),
	};
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	queries::insert_match_tx(
		&mut tx,
		&NewMatch {
			match_id,
			user_item_id: lost.item_id,
			matched_item_id: found.item_id,
			similarity_score: 0.5,
			confidence: MatchConfidence::Medium,
			matching_features: serde_json::json!({}),
		},
	)
	.await
	.expect("Failed to insert match.");

	assert!(
		outbox::enqueue_notification_tx(&mut tx, &notification)
			.await
			.expect("Failed to enqueue notification.")
	);
	assert!(
		!outbox::enqueue_notification_tx(
			&mut tx,
			&NewMatchNotification { notification_id: Uuid::new_v4(), ..notification.clone() },
		)
		.await
		.expect("Failed to enqueue duplicate notification.")
	);

	tx.commit().await.expect("Failed to commit.");

	let now = OffsetDateTime::now_utc() + Duration::seconds(1);
	let claimed = outbox::claim_next_notification(&db, now, 30)
		.await
		.expect("Failed to claim.")
		.expect("Expected a due notification.");

	assert_eq!(claimed.notification_id, notification.notification_id);
	assert_eq!(claimed.status, "CLAIMED");
	assert!(
		outbox::claim_next_notification(&db, now, 30)
			.await
			.expect("Failed to claim.")
			.is_none(),
		"Leased notification must not be claimed twice."
	);

	let retry_at = now + Duration::seconds(5);

	outbox::mark_notification_failed(&db, claimed.notification_id, 1, "boom", retry_at, now)
		.await
		.expect("Failed to mark failed.");

	assert!(
		outbox::claim_next_notification(&db, now, 30)
			.await
			.expect("Failed to claim.")
			.is_none()
	);

	let retried = outbox::claim_next_notification(&db, retry_at, 30)
		.await
		.expect("Failed to claim.")
		.expect("Expected the retry to be due.");

	assert_eq!(retried.attempts, 1);
	assert_eq!(retried.last_error.as_deref(), Some("boom"));

	outbox::mark_notification_done(&db, retried.notification_id, retry_at)
		.await
		.expect("Failed to mark done.");

	let rows =
		outbox::list_notifications_for_match(&db, match_id).await.expect("Failed to list rows.");

	assert_eq!(rows.len(), 1);
	assert_eq!(rows[0].status, "DONE");

	drop(db);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
