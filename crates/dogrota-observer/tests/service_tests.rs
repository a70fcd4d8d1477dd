//! Integration tests for the schedule service.
//!
//! Each test runs against a private in-memory `SQLite` store and a
//! [`FixedClock`] so the calendar can be moved across week boundaries.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dogrota_core::config::SeedConfig;
use dogrota_core::{Clock, FixedClock, RotationError};
use dogrota_db::{ScheduleStore, SqliteConfig, SqliteStore};
use dogrota_observer::ScheduleService;
use dogrota_types::{FullState, WeekdayIndex};

// =============================================================================
// Helpers
// =============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn day(value: u8) -> WeekdayIndex {
    WeekdayIndex::new(value).unwrap()
}

/// A Saturday, with Eden first on the Saturday rotation.
fn saturday() -> NaiveDate {
    date(2024, 6, 8)
}

async fn setup(today: NaiveDate) -> (Arc<ScheduleService>, Arc<FixedClock>) {
    let store = SqliteStore::connect(&SqliteConfig::in_memory())
        .await
        .expect("Failed to open in-memory SQLite");
    store.run_migrations().await.expect("Failed to migrate");
    let seed = SeedConfig::default().to_state().unwrap();
    ScheduleStore::new(store.pool())
        .seed_if_empty(&seed)
        .await
        .unwrap();

    let fixed = Arc::new(FixedClock::new(today));
    let clock: Arc<dyn Clock> = fixed.clone();
    (Arc::new(ScheduleService::new(store, clock)), fixed)
}

async fn stored(service: &ScheduleService) -> FullState {
    ScheduleStore::new(service.store().pool())
        .load()
        .await
        .unwrap()
}

// =============================================================================
// Rotation
// =============================================================================

#[tokio::test]
async fn saturday_duty_rotates_across_weeks() {
    let (service, clock) = setup(saturday()).await;

    let snapshot = service.snapshot().await.unwrap();
    assert_eq!(snapshot.weekday, WeekdayIndex::SATURDAY);
    assert_eq!(snapshot.today_name, "Eden");

    let snapshot = service.mark_done("Eden").await.unwrap();
    let row = snapshot.day(WeekdayIndex::SATURDAY).unwrap();
    assert!(row.completed);
    assert_eq!(row.reporter, "Eden");
    assert_eq!(row.date, Some(saturday()));
    assert_eq!(stored(&service).await.pointers.next_index, 1);

    // Sunday's first read starts the new week.
    clock.advance_days(1);
    let snapshot = service.snapshot().await.unwrap();
    assert_eq!(snapshot.weekday, WeekdayIndex::SUNDAY);
    assert!(snapshot.shifts_table.iter().all(|e| !e.completed));
    assert_eq!(stored(&service).await.pointers.current_index, 1);

    clock.set(date(2024, 6, 15));
    let snapshot = service.snapshot().await.unwrap();
    assert_eq!(snapshot.today_name, "Shaked");
    assert_eq!(
        snapshot.day(WeekdayIndex::SATURDAY).unwrap().name,
        "Shaked"
    );
}

#[tokio::test]
async fn saturday_stand_in_does_not_rotate() {
    let (service, clock) = setup(saturday()).await;

    service.mark_done("Shaked").await.unwrap();
    let state = stored(&service).await;
    assert_eq!(state.pointers.next_index, 0);
    assert_eq!(state.slot(WeekdayIndex::SATURDAY).unwrap().reporter, "Shaked");

    clock.set(date(2024, 6, 15));
    assert_eq!(service.snapshot().await.unwrap().today_name, "Eden");
}

#[tokio::test]
async fn weekday_report_keeps_static_assignee() {
    // Wednesday, statically assigned to Shaked.
    let (service, _) = setup(date(2024, 6, 5)).await;

    let snapshot = service.mark_done("Eden").await.unwrap();
    let wednesday = snapshot.day(day(3)).unwrap();
    assert_eq!(wednesday.name, "Shaked");
    assert!(wednesday.completed);
    assert_eq!(wednesday.reporter, "Eden");
    assert_eq!(stored(&service).await.pointers.next_index, 0);
}

#[tokio::test]
async fn first_report_of_new_week_survives_reset() {
    let (service, clock) = setup(date(2024, 6, 5)).await;
    service.mark_done("Shaked").await.unwrap();

    // Monday of the next week, with Wednesday still marked from before.
    clock.set(date(2024, 6, 10));
    let snapshot = service.mark_done("Shaked").await.unwrap();

    assert!(snapshot.day(day(1)).unwrap().completed);
    assert!(!snapshot.day(day(3)).unwrap().completed);
    let state = stored(&service).await;
    assert!(state.slots[1].completed);
    assert!(!state.slots[3].completed);
}

#[tokio::test]
async fn failed_report_leaves_previous_week_untouched() {
    let (service, clock) = setup(date(2024, 6, 5)).await;
    service.mark_done("Shaked").await.unwrap();
    let before = stored(&service).await;

    sqlx::query(
        r"CREATE TRIGGER reject_completion BEFORE UPDATE ON weekday_slots
          WHEN NEW.completed = 1
          BEGIN SELECT RAISE(ABORT, 'completion rejected'); END",
    )
    .execute(service.store().pool())
    .await
    .unwrap();
    let mut observer = service.notifier().subscribe();

    clock.set(date(2024, 6, 10));
    let err = service.mark_done("Shaked").await.unwrap_err();
    assert!(matches!(err, RotationError::StorageUnavailable { .. }));

    // Neither the reset nor the report was stored, so nothing was broadcast.
    assert_eq!(stored(&service).await, before);
    assert!(observer.rx.try_recv().is_err());

    // The next read still sees the week as stale and resets it.
    let snapshot = service.snapshot().await.unwrap();
    assert!(snapshot.shifts_table.iter().all(|e| !e.completed));
    assert!(observer.rx.try_recv().is_ok());
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn unknown_participant_changes_nothing() {
    let (service, _) = setup(saturday()).await;
    let mut observer = service.notifier().subscribe();
    let before = stored(&service).await;

    let err = service.mark_done("Rex").await.unwrap_err();
    assert!(matches!(err, RotationError::InvalidParticipant { name } if name == "Rex"));

    assert_eq!(stored(&service).await, before);
    assert!(observer.rx.try_recv().is_err());
}

#[tokio::test]
async fn unknown_participant_does_not_trigger_reset() {
    let (service, clock) = setup(date(2024, 6, 5)).await;
    service.mark_done("Eden").await.unwrap();

    clock.set(date(2024, 6, 10));
    service.mark_done("Nobody").await.unwrap_err();
    assert!(stored(&service).await.slots[3].completed);
}

#[tokio::test]
async fn invalid_roster_and_schedule_are_rejected() {
    let (service, _) = setup(date(2024, 6, 5)).await;
    let mut observer = service.notifier().subscribe();

    let err = service.replace_roster(&[]).await.unwrap_err();
    assert!(matches!(err, RotationError::InvalidRoster { .. }));

    let dupes = vec![String::from("Eden"), String::from("Eden")];
    let err = service.replace_roster(&dupes).await.unwrap_err();
    assert!(matches!(err, RotationError::InvalidRoster { .. }));

    let partial = BTreeMap::from([(day(0), (String::from("Eden"), false))]);
    let err = service.replace_weekday_map(&partial).await.unwrap_err();
    assert!(matches!(err, RotationError::InvalidSchedule { .. }));

    assert!(observer.rx.try_recv().is_err());
}

#[tokio::test]
async fn closed_store_is_storage_unavailable() {
    let (service, _) = setup(date(2024, 6, 5)).await;
    service.store().close().await;

    let err = service.snapshot().await.unwrap_err();
    assert!(matches!(err, RotationError::StorageUnavailable { .. }));
}

// =============================================================================
// Reconfiguration
// =============================================================================

#[tokio::test]
async fn roster_replacement_folds_pointers_and_broadcasts() {
    let (service, _) = setup(saturday()).await;
    service.mark_done("Eden").await.unwrap();
    let mut observer = service.notifier().subscribe();

    let roster = vec![String::from("Noa")];
    let snapshot = service.replace_roster(&roster).await.unwrap();
    assert_eq!(snapshot.roster, roster);
    assert_eq!(snapshot.today_name, "Noa");

    let state = stored(&service).await;
    assert_eq!(state.pointers.current_index, 0);
    assert_eq!(state.pointers.next_index, 0);
    assert_eq!(observer.rx.try_recv().unwrap().roster, roster);
    assert!(observer.rx.try_recv().is_err());
}

#[tokio::test]
async fn weekday_map_replacement_is_visible() {
    let (service, _) = setup(date(2024, 6, 3)).await;

    let mapping = WeekdayIndex::all()
        .map(|wd| (wd, (String::from("Shaked"), false)))
        .collect();
    let snapshot = service.replace_weekday_map(&mapping).await.unwrap();
    assert_eq!(snapshot.today_name, "Shaked");
    assert!(
        snapshot
            .shifts_table
            .iter()
            .filter(|e| e.weekday != WeekdayIndex::SATURDAY)
            .all(|e| e.name == "Shaked")
    );
}

#[tokio::test]
async fn meta_update_is_broadcast() {
    let (service, _) = setup(date(2024, 6, 3)).await;
    let mut observer = service.notifier().subscribe();

    let snapshot = service
        .update_meta(&[("dog_name", "Rex"), ("dog_image", "uploads/dog_image.png")])
        .await
        .unwrap();
    assert_eq!(snapshot.meta.dog_name(), "Rex");
    assert_eq!(snapshot.meta.dog_image(), "uploads/dog_image.png");
    assert_eq!(observer.rx.try_recv().unwrap().meta.dog_name(), "Rex");
}

// =============================================================================
// Observers and concurrency
// =============================================================================

#[tokio::test]
async fn lazy_reset_is_broadcast_once() {
    let (service, clock) = setup(date(2024, 6, 5)).await;
    service.mark_done("Eden").await.unwrap();
    let mut observer = service.notifier().subscribe();

    clock.set(date(2024, 6, 10));
    service.snapshot().await.unwrap();
    service.snapshot().await.unwrap();

    let update = observer.rx.try_recv().unwrap();
    assert!(update.shifts_table.iter().all(|e| !e.completed));
    assert!(observer.rx.try_recv().is_err());
}

#[tokio::test]
async fn meta_read_never_resets_or_broadcasts() {
    let (service, clock) = setup(date(2024, 6, 5)).await;
    service.mark_done("Eden").await.unwrap();
    let mut observer = service.notifier().subscribe();

    clock.set(date(2024, 6, 10));
    let meta = service.meta().await.unwrap();
    assert_eq!(meta.dog_name(), "Lucky");

    assert!(stored(&service).await.slots[3].completed);
    assert!(observer.rx.try_recv().is_err());
}

#[tokio::test]
async fn subscription_sees_initial_state_then_updates() {
    let (service, _) = setup(date(2024, 6, 3)).await;

    let (mut subscription, initial) = service.subscribe().await.unwrap();
    assert!(!initial.day(day(1)).unwrap().completed);

    service.mark_done("Shaked").await.unwrap();
    let update = subscription.rx.recv().await.unwrap();
    assert!(update.day(day(1)).unwrap().completed);

    assert!(service.notifier().unsubscribe(subscription.id));
    assert_eq!(service.notifier().observer_count(), 0);
}

#[tokio::test]
async fn dropped_observer_is_pruned_on_next_change() {
    let (service, _) = setup(date(2024, 6, 3)).await;
    let (dead, _) = service.subscribe().await.unwrap();
    let (mut live, _) = service.subscribe().await.unwrap();
    drop(dead);

    service.mark_done("Eden").await.unwrap();
    assert_eq!(service.notifier().observer_count(), 1);
    assert!(live.rx.try_recv().is_ok());
}

#[tokio::test]
async fn concurrent_reads_and_reports_never_lose_a_report() {
    let (service, clock) = setup(date(2024, 6, 5)).await;
    service.mark_done("Eden").await.unwrap();

    // Monday of the next week: the first read or report must reset once,
    // and every report made afterwards must survive.
    clock.set(date(2024, 6, 10));
    let mut tasks = Vec::new();
    for i in 0..16 {
        let service = Arc::clone(&service);
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.snapshot().await.map(|_| ())
            } else {
                service.mark_done("Shaked").await.map(|_| ())
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let state = stored(&service).await;
    assert!(state.slots[1].completed);
    assert_eq!(state.slots[1].reporter, "Shaked");
    assert!(!state.slots[3].completed);
}
