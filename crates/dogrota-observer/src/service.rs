//! The schedule service: query/command facade over store and engine.
//!
//! [`ScheduleService`] is the only component that mutates the schedule.
//! It owns the store handle, the calendar [`Clock`], the
//! [`UpdateNotifier`], and a [`RwLock`] acting as the exclusion boundary:
//!
//! - Plain snapshot reads share the read side.
//! - Any read that has to apply the weekly reset, and every command, takes
//!   the write side. The reset is re-checked after acquiring it, so two
//!   racing readers can never reset the same week twice.
//!
//! Every successful change is followed by exactly one broadcast of the
//! resulting snapshot; rejected commands write and broadcast nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dogrota_core::rotation::{
    self, UNASSIGNED, build_weekday_map, compute_weekday, detect_new_week, report_completion,
    today_assignee, validate_roster,
};
use dogrota_core::{Clock, RotationError};
use dogrota_db::{ScheduleStore, SqliteStore};
use dogrota_types::{DayEntry, FullState, MetaConfig, Snapshot, WeekdayIndex};
use tokio::sync::RwLock;
use tracing::info;

use crate::notifier::{Subscription, UpdateNotifier};

/// Project a state into the client-facing snapshot for `today`.
///
/// Saturday's row shows the rotating assignee, never the stored name.
pub fn build_snapshot(state: &FullState, today: NaiveDate) -> Snapshot {
    let weekday = compute_weekday(today);
    let shifts_table = state
        .slots
        .iter()
        .map(|slot| DayEntry {
            weekday: slot.weekday,
            label: slot.weekday.label().to_owned(),
            name: today_assignee(state, slot.weekday)
                .unwrap_or(UNASSIGNED)
                .to_owned(),
            completed: slot.completed,
            reporter: slot.reporter.clone(),
            date: slot.completion_date,
        })
        .collect();

    Snapshot {
        date: today,
        weekday,
        today_name: today_assignee(state, weekday)
            .unwrap_or(UNASSIGNED)
            .to_owned(),
        roster: state.roster.clone(),
        shifts_table,
        meta: state.meta.clone(),
    }
}

/// Query/command facade for the schedule.
pub struct ScheduleService {
    store: SqliteStore,
    clock: Arc<dyn Clock>,
    notifier: UpdateNotifier,
    boundary: RwLock<()>,
}

impl ScheduleService {
    /// Create a service over an already migrated and seeded store.
    pub fn new(store: SqliteStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            notifier: UpdateNotifier::new(),
            boundary: RwLock::new(()),
        }
    }

    /// The observer registry.
    pub const fn notifier(&self) -> &UpdateNotifier {
        &self.notifier
    }

    /// The underlying store handle.
    pub const fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Today's date according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn schedule(&self) -> ScheduleStore<'_> {
        ScheduleStore::new(self.store.pool())
    }

    /// Apply the weekly reset to `state` (and storage) if it belongs to a
    /// previous week. Callers must hold the write side of the boundary.
    async fn settle(
        &self,
        state: &mut FullState,
        weekday: WeekdayIndex,
    ) -> Result<bool, RotationError> {
        if !detect_new_week(state, weekday) {
            return Ok(false);
        }
        let reset = rotation::plan_weekly_reset(state);
        self.schedule().apply_weekly_reset(&reset).await?;
        reset.apply(state);
        info!(
            weekday = %weekday,
            current_index = reset.current_index,
            "New week detected, schedule reset"
        );
        Ok(true)
    }

    /// Build the current snapshot, applying the weekly reset first if due.
    ///
    /// A reset performed here is broadcast to observers like any other
    /// change.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::StorageUnavailable`] if the store cannot be
    /// read or the reset cannot be written.
    pub async fn snapshot(&self) -> Result<Snapshot, RotationError> {
        let today = self.today();
        let weekday = compute_weekday(today);

        {
            let _read = self.boundary.read().await;
            let state = self.schedule().load().await?;
            if !detect_new_week(&state, weekday) {
                return Ok(build_snapshot(&state, today));
            }
        }

        let _write = self.boundary.write().await;
        let mut state = self.schedule().load().await?;
        let reset = self.settle(&mut state, weekday).await?;
        let snapshot = build_snapshot(&state, today);
        if reset {
            self.notifier.broadcast(snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Read the meta entries as stored.
    ///
    /// Unlike [`snapshot`](Self::snapshot) this never applies the weekly
    /// reset and never broadcasts.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::StorageUnavailable`] if the store cannot be
    /// read.
    pub async fn meta(&self) -> Result<MetaConfig, RotationError> {
        let _read = self.boundary.read().await;
        let state = self.schedule().load().await?;
        Ok(state.meta)
    }

    /// Record that `name` walked the dog today.
    ///
    /// A pending weekly reset is applied first, so the first report of a
    /// new week is never wiped by stale slots from the previous one. The
    /// reset and the report are stored in one transaction. Returns the
    /// snapshot that was broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::InvalidParticipant`] if `name` is not on the
    /// roster (nothing is written or broadcast), or
    /// [`RotationError::StorageUnavailable`] on storage failure.
    pub async fn mark_done(&self, name: &str) -> Result<Snapshot, RotationError> {
        let today = self.today();
        let weekday = compute_weekday(today);

        let _write = self.boundary.write().await;
        let mut state = self.schedule().load().await?;
        if !state.has_participant(name) {
            return Err(RotationError::InvalidParticipant {
                name: name.to_owned(),
            });
        }

        let reset = detect_new_week(&state, weekday)
            .then(|| rotation::apply_weekly_reset(&mut state));
        let report = report_completion(&state, name, weekday, today)?;
        self.schedule()
            .record_completion_with_reset(reset.as_ref(), &report)
            .await?;
        report.apply(&mut state);

        if let Some(reset) = reset {
            info!(
                weekday = %weekday,
                current_index = reset.current_index,
                "New week detected, schedule reset"
            );
        }
        info!(
            name,
            weekday = %weekday,
            next_index = ?report.next_index,
            "Walk marked done"
        );

        let snapshot = build_snapshot(&state, today);
        self.notifier.broadcast(snapshot.clone());
        Ok(snapshot)
    }

    /// Replace the roster wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::InvalidRoster`] if the roster is empty or
    /// has blank or duplicate names, or
    /// [`RotationError::StorageUnavailable`] on storage failure.
    pub async fn replace_roster(&self, names: &[String]) -> Result<Snapshot, RotationError> {
        let roster = validate_roster(names)?;

        let _write = self.boundary.write().await;
        self.schedule().replace_roster(&roster).await?;
        info!(participants = roster.len(), "Roster replaced");
        self.publish_locked().await
    }

    /// Replace the static weekday map wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::InvalidSchedule`] unless every weekday
    /// `0..=6` is present, or [`RotationError::StorageUnavailable`] on
    /// storage failure.
    pub async fn replace_weekday_map(
        &self,
        mapping: &BTreeMap<WeekdayIndex, (String, bool)>,
    ) -> Result<Snapshot, RotationError> {
        let slots = build_weekday_map(mapping)?;

        let _write = self.boundary.write().await;
        self.schedule().replace_weekday_map(&slots).await?;
        info!("Weekday map replaced");
        self.publish_locked().await
    }

    /// Insert or overwrite meta entries.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::StorageUnavailable`] on storage failure.
    pub async fn update_meta(&self, entries: &[(&str, &str)]) -> Result<Snapshot, RotationError> {
        let _write = self.boundary.write().await;
        self.schedule().update_meta_entries(entries).await?;
        info!(keys = entries.len(), "Meta updated");
        self.publish_locked().await
    }

    /// Register an observer and build the snapshot it should receive first.
    ///
    /// The observer is registered before the snapshot is built, so no
    /// change can fall between the two.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::StorageUnavailable`] if the initial snapshot
    /// cannot be built; the observer is unregistered again in that case.
    pub async fn subscribe(&self) -> Result<(Subscription, Snapshot), RotationError> {
        let subscription = self.notifier.subscribe();
        match self.snapshot().await {
            Ok(snapshot) => Ok((subscription, snapshot)),
            Err(e) => {
                self.notifier.unsubscribe(subscription.id);
                Err(e)
            }
        }
    }

    /// Reload, settle, broadcast, and return the snapshot. Callers must
    /// hold the write side of the boundary.
    async fn publish_locked(&self) -> Result<Snapshot, RotationError> {
        let today = self.today();
        let mut state = self.schedule().load().await?;
        self.settle(&mut state, compute_weekday(today)).await?;
        let snapshot = build_snapshot(&state, today);
        self.notifier.broadcast(snapshot.clone());
        Ok(snapshot)
    }
}
