//! Integration tests for the `dogrota-db` schedule store.
//!
//! Every test runs against a private in-memory `SQLite` database, except
//! the restart test which uses a temporary file so it can close and reopen
//! the pool.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use chrono::NaiveDate;
use dogrota_core::config::SeedConfig;
use dogrota_core::rotation::{
    apply_weekly_reset, build_weekday_map, plan_weekly_reset, report_completion,
};
use dogrota_db::{DbError, ScheduleStore, SqliteConfig, SqliteStore};
use dogrota_types::{FullState, PointerKey, RotationPointers, WeekdayIndex};
use uuid::Uuid;

// =============================================================================
// Helpers
// =============================================================================

async fn setup() -> (SqliteStore, FullState) {
    let store = SqliteStore::connect(&SqliteConfig::in_memory())
        .await
        .expect("Failed to open in-memory SQLite");
    store
        .run_migrations()
        .await
        .expect("Failed to run migrations");
    let seed = SeedConfig::default().to_state().unwrap();
    ScheduleStore::new(store.pool())
        .seed_if_empty(&seed)
        .await
        .expect("Failed to seed");
    (store, seed)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn day(value: u8) -> WeekdayIndex {
    WeekdayIndex::new(value).unwrap()
}

// =============================================================================
// Seeding and loading
// =============================================================================

#[tokio::test]
async fn load_returns_seed() {
    let (store, seed) = setup().await;
    let state = ScheduleStore::new(store.pool()).load().await.unwrap();
    assert_eq!(state, seed);
}

#[tokio::test]
async fn seeding_twice_keeps_existing_rows() {
    let (store, seed) = setup().await;
    let schedule = ScheduleStore::new(store.pool());

    schedule.update_meta("dog_name", "Rex").await.unwrap();
    schedule.update_pointer(PointerKey::Next, 1).await.unwrap();

    let seeded_again = schedule.seed_if_empty(&seed).await.unwrap();
    assert!(!seeded_again);

    let state = schedule.load().await.unwrap();
    assert_eq!(state.meta.dog_name(), "Rex");
    assert_eq!(state.pointers.next_index, 1);
}

#[tokio::test]
async fn load_rejects_missing_weekday_row() {
    let (store, _) = setup().await;
    sqlx::query("DELETE FROM weekday_slots WHERE weekday = 3")
        .execute(store.pool())
        .await
        .unwrap();

    let err = ScheduleStore::new(store.pool()).load().await.unwrap_err();
    assert!(matches!(err, DbError::Corrupt(_)));
}

#[tokio::test]
async fn load_rejects_missing_pointer() {
    let (store, _) = setup().await;
    sqlx::query("DELETE FROM rotation_pointers WHERE key = 'next_index'")
        .execute(store.pool())
        .await
        .unwrap();

    let err = ScheduleStore::new(store.pool()).load().await.unwrap_err();
    assert!(matches!(err, DbError::Corrupt(msg) if msg.contains("next_index")));
}

#[tokio::test]
async fn closed_pool_is_a_storage_error() {
    let (store, _) = setup().await;
    store.close().await;

    let err = ScheduleStore::new(store.pool()).load().await.unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
}

// =============================================================================
// Engine plans
// =============================================================================

#[tokio::test]
async fn completion_and_reset_round_through_storage() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());

    // Eden walks on Saturday while on duty.
    let state = schedule.load().await.unwrap();
    let report =
        report_completion(&state, "Eden", WeekdayIndex::SATURDAY, date(2024, 6, 8)).unwrap();
    schedule.record_completion(&report).await.unwrap();

    let state = schedule.load().await.unwrap();
    assert_eq!(state.pointers, RotationPointers { current_index: 0, next_index: 1 });
    let saturday = state.slot(WeekdayIndex::SATURDAY).unwrap();
    assert!(saturday.completed);
    assert_eq!(saturday.reporter, "Eden");
    assert_eq!(saturday.completion_date, Some(date(2024, 6, 8)));

    // The reset clears everything and promotes the pointer.
    schedule
        .apply_weekly_reset(&plan_weekly_reset(&state))
        .await
        .unwrap();
    let state = schedule.load().await.unwrap();
    assert_eq!(state.pointers.current_index, 1);
    assert!(state.slots.iter().all(|s| !s.completed));
    assert!(state.slots.iter().all(|s| s.reporter.is_empty()));
    assert!(state.slots.iter().all(|s| s.completion_date.is_none()));
}

#[tokio::test]
async fn completion_with_reset_lands_in_one_transaction() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());
    schedule
        .update_slot(day(3), true, "Eden", Some(date(2024, 6, 5)))
        .await
        .unwrap();
    schedule.update_pointer(PointerKey::Next, 1).await.unwrap();

    // Monday of the following week: reset, then Shaked reports.
    let mut state = schedule.load().await.unwrap();
    let reset = apply_weekly_reset(&mut state);
    let report = report_completion(&state, "Shaked", day(1), date(2024, 6, 10)).unwrap();
    schedule
        .record_completion_with_reset(Some(&reset), &report)
        .await
        .unwrap();

    let state = schedule.load().await.unwrap();
    assert_eq!(state.pointers.current_index, 1);
    assert!(!state.slots[3].completed);
    assert!(state.slots[1].completed);
    assert_eq!(state.slots[1].reporter, "Shaked");
}

#[tokio::test]
async fn failed_completion_rolls_back_its_reset() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());
    schedule
        .update_slot(day(3), true, "Eden", Some(date(2024, 6, 5)))
        .await
        .unwrap();
    schedule.update_pointer(PointerKey::Next, 1).await.unwrap();
    let before = schedule.load().await.unwrap();

    sqlx::query(
        r"CREATE TRIGGER reject_completion BEFORE UPDATE ON weekday_slots
          WHEN NEW.completed = 1
          BEGIN SELECT RAISE(ABORT, 'completion rejected'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let mut state = before.clone();
    let reset = apply_weekly_reset(&mut state);
    let report = report_completion(&state, "Shaked", day(1), date(2024, 6, 10)).unwrap();
    let err = schedule
        .record_completion_with_reset(Some(&reset), &report)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));

    assert_eq!(schedule.load().await.unwrap(), before);
}

// =============================================================================
// Reconfiguration
// =============================================================================

#[tokio::test]
async fn replace_roster_reindexes_and_folds_pointers() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());

    schedule.update_pointer(PointerKey::Current, 4).await.unwrap();
    schedule.update_pointer(PointerKey::Next, 5).await.unwrap();

    let roster = vec!["Ann".to_owned(), "Ben".to_owned(), "Cat".to_owned()];
    let pointers = schedule.replace_roster(&roster).await.unwrap();
    assert_eq!(pointers, RotationPointers { current_index: 1, next_index: 2 });

    let state = schedule.load().await.unwrap();
    assert_eq!(state.roster, roster);
    assert_eq!(state.pointers, pointers);
}

#[tokio::test]
async fn replace_weekday_map_swaps_all_rows() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());

    schedule
        .update_slot(day(2), true, "Eden", Some(date(2024, 6, 4)))
        .await
        .unwrap();

    let mapping = WeekdayIndex::all()
        .map(|wd| (wd, ("Shaked".to_owned(), wd == day(1))))
        .collect();
    let slots = build_weekday_map(&mapping).unwrap();
    schedule.replace_weekday_map(&slots).await.unwrap();

    let state = schedule.load().await.unwrap();
    assert!(state.slots.iter().all(|s| s.name == "Shaked"));
    assert!(state.slots[1].completed);
    assert!(!state.slots[2].completed);
    assert!(state.slots[2].reporter.is_empty());
}

// =============================================================================
// Targeted writes
// =============================================================================

#[tokio::test]
async fn pending_slot_update_drops_reporter_and_date() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());

    schedule
        .update_slot(day(4), false, "Eden", Some(date(2024, 6, 6)))
        .await
        .unwrap();

    let state = schedule.load().await.unwrap();
    assert!(state.slots[4].reporter.is_empty());
    assert!(state.slots[4].completion_date.is_none());
}

#[tokio::test]
async fn update_meta_inserts_and_overwrites() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());

    schedule.update_meta("dog_image", "uploads/dog.png").await.unwrap();
    schedule.update_meta("vet", "Dr. Levi").await.unwrap();

    let state = schedule.load().await.unwrap();
    assert_eq!(state.meta.dog_image(), "uploads/dog.png");
    assert_eq!(state.meta.get("vet"), Some("Dr. Levi"));
}

#[tokio::test]
async fn meta_entries_are_written_together_or_not_at_all() {
    let (store, _) = setup().await;
    let schedule = ScheduleStore::new(store.pool());

    schedule
        .update_meta_entries(&[("dog_name", "Rex"), ("dog_image", "uploads/dog.png")])
        .await
        .unwrap();
    let state = schedule.load().await.unwrap();
    assert_eq!(state.meta.dog_name(), "Rex");
    assert_eq!(state.meta.dog_image(), "uploads/dog.png");

    sqlx::query(
        r"CREATE TRIGGER reject_image BEFORE UPDATE ON meta
          WHEN NEW.key = 'dog_image'
          BEGIN SELECT RAISE(ABORT, 'image rejected'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let err = schedule
        .update_meta_entries(&[("dog_name", "Bolt"), ("dog_image", "uploads/other.png")])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));

    let state = schedule.load().await.unwrap();
    assert_eq!(state.meta.dog_name(), "Rex");
    assert_eq!(state.meta.dog_image(), "uploads/dog.png");
}

// =============================================================================
// Durability
// =============================================================================

#[tokio::test]
async fn state_survives_reopen() {
    let path = std::env::temp_dir().join(format!("dogrota-{}.sqlite", Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    let seed = SeedConfig::default().to_state().unwrap();

    {
        let store = SqliteStore::connect_url(&url).await.unwrap();
        store.run_migrations().await.unwrap();
        let schedule = ScheduleStore::new(store.pool());
        schedule.seed_if_empty(&seed).await.unwrap();

        let state = schedule.load().await.unwrap();
        let report =
            report_completion(&state, "Eden", WeekdayIndex::SATURDAY, date(2024, 6, 8)).unwrap();
        schedule.record_completion(&report).await.unwrap();
        store.close().await;
    }

    let store = SqliteStore::connect_url(&url).await.unwrap();
    store.run_migrations().await.unwrap();
    let schedule = ScheduleStore::new(store.pool());
    assert!(!schedule.seed_if_empty(&seed).await.unwrap());

    let state = schedule.load().await.unwrap();
    assert_eq!(state.pointers.next_index, 1);
    assert_eq!(state.slot(WeekdayIndex::SATURDAY).unwrap().reporter, "Eden");
    store.close().await;

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
