//! Schedule persistence.
//!
//! [`ScheduleStore`] reconstructs a [`FullState`] from the four schedule
//! tables and applies the rotation engine's write plans. Writes that must
//! be observed together (the seven-slot reset plus pointer promotion, a
//! Saturday report plus pointer move, a roster swap plus pointer folding)
//! each run in one transaction.

use chrono::NaiveDate;
use dogrota_core::rotation::fold_pointers;
use dogrota_core::{CompletionReport, WeeklyReset};
use dogrota_types::{
    FullState, MetaConfig, PointerKey, RotationPointers, WeekdayIndex, WeekdaySlot,
};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbError;

/// A row from the `weekday_slots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SlotRow {
    weekday: i64,
    name: String,
    completed: bool,
    reporter: String,
    completion_date: Option<NaiveDate>,
}

impl TryFrom<SlotRow> for WeekdaySlot {
    type Error = DbError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        let weekday = u8::try_from(row.weekday)
            .ok()
            .and_then(WeekdayIndex::new)
            .ok_or_else(|| DbError::Corrupt(format!("weekday index {}", row.weekday)))?;
        let mut slot = Self::pending(weekday, row.name);
        if row.completed {
            slot.completed = true;
            slot.reporter = row.reporter;
            slot.completion_date = row.completion_date;
        }
        Ok(slot)
    }
}

/// Convert an in-memory roster index into its stored form.
fn to_stored(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

/// Convert a stored roster index back, rejecting negative values.
fn from_stored(key: &str, value: i64) -> Result<usize, DbError> {
    usize::try_from(value).map_err(|e| DbError::Corrupt(format!("pointer {key}={value}: {e}")))
}

/// Operations on the schedule tables.
pub struct ScheduleStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ScheduleStore<'a> {
    /// Create a new schedule store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Write `seed` into any table that has no data yet.
    ///
    /// Existing rows are never overwritten, so calling this on every start
    /// preserves the schedule across restarts. Returns `true` if the roster
    /// was seeded (a fresh database).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any statement fails.
    pub async fn seed_if_empty(&self, seed: &FullState) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let (participants,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM participants")
            .fetch_one(&mut *tx)
            .await?;
        let fresh = participants == 0;
        if fresh {
            insert_roster(&mut tx, &seed.roster).await?;
        }

        for slot in &seed.slots {
            sqlx::query(
                r"INSERT OR IGNORE INTO weekday_slots
                  (weekday, name, completed, reporter, completion_date)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(i64::from(slot.weekday.get()))
            .bind(&slot.name)
            .bind(slot.completed)
            .bind(&slot.reporter)
            .bind(slot.completion_date)
            .execute(&mut *tx)
            .await?;
        }

        for key in [PointerKey::Current, PointerKey::Next] {
            sqlx::query("INSERT OR IGNORE INTO rotation_pointers (key, value) VALUES ($1, $2)")
                .bind(key.as_str())
                .bind(to_stored(seed.pointers.get(key)))
                .execute(&mut *tx)
                .await?;
        }

        for (key, value) in seed.meta.iter() {
            sqlx::query("INSERT OR IGNORE INTO meta (key, value) VALUES ($1, $2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        if fresh {
            tracing::info!(participants = seed.roster.len(), "Seeded empty schedule");
        }
        Ok(fresh)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reconstruct the whole schedule.
    ///
    /// All four tables are read inside one transaction so the result is a
    /// consistent snapshot even while another connection is writing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the database cannot be read, or
    /// [`DbError::Corrupt`] if the rows do not form a valid schedule
    /// (missing or duplicate weekdays, missing or negative pointers).
    pub async fn load(&self) -> Result<FullState, DbError> {
        let mut tx = self.pool.begin().await?;

        let roster: Vec<String> =
            sqlx::query_scalar("SELECT name FROM participants ORDER BY position")
                .fetch_all(&mut *tx)
                .await?;

        let slot_rows = sqlx::query_as::<_, SlotRow>(
            r"SELECT weekday, name, completed, reporter, completion_date
              FROM weekday_slots
              ORDER BY weekday",
        )
        .fetch_all(&mut *tx)
        .await?;

        let pointer_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT key, value FROM rotation_pointers")
                .fetch_all(&mut *tx)
                .await?;

        let meta_rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM meta ORDER BY key")
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        let rows = slot_rows
            .into_iter()
            .map(WeekdaySlot::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let row_count = rows.len();
        let slots = WeekdaySlot::week_from_rows(rows).ok_or_else(|| {
            DbError::Corrupt(format!("expected one slot per weekday, found {row_count} rows"))
        })?;

        let mut current = None;
        let mut next = None;
        for (key, value) in pointer_rows {
            match PointerKey::from_key(&key) {
                Some(PointerKey::Current) => current = Some(from_stored(&key, value)?),
                Some(PointerKey::Next) => next = Some(from_stored(&key, value)?),
                None => tracing::warn!(key = %key, "Ignoring unknown rotation pointer"),
            }
        }
        let pointers = RotationPointers {
            current_index: current
                .ok_or_else(|| DbError::Corrupt("missing pointer current_index".to_owned()))?,
            next_index: next
                .ok_or_else(|| DbError::Corrupt("missing pointer next_index".to_owned()))?,
        };

        let mut meta = MetaConfig::new();
        for (key, value) in meta_rows {
            meta.set(key, value);
        }

        Ok(FullState {
            roster,
            slots,
            pointers,
            meta,
        })
    }

    // =========================================================================
    // Engine plans
    // =========================================================================

    /// Clear all seven slots and promote the next pointer, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the transaction fails; nothing is
    /// written in that case.
    pub async fn apply_weekly_reset(&self, reset: &WeeklyReset) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        write_reset(&mut tx, reset).await?;
        tx.commit().await?;

        tracing::info!(current_index = reset.current_index, "Applied weekly reset");
        Ok(())
    }

    /// Persist a completion report (slot plus optional pointer), atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the transaction fails.
    pub async fn record_completion(&self, report: &CompletionReport) -> Result<(), DbError> {
        self.record_completion_with_reset(None, report).await
    }

    /// Persist a completion report, first applying `reset` if given, in one
    /// transaction.
    ///
    /// Either both plans are stored or neither is, so a report can never
    /// land in a week whose reset failed to commit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the transaction fails.
    pub async fn record_completion_with_reset(
        &self,
        reset: Option<&WeeklyReset>,
        report: &CompletionReport,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        if let Some(reset) = reset {
            write_reset(&mut tx, reset).await?;
        }
        if let Some(next) = report.next_index {
            write_pointer(&mut tx, PointerKey::Next, next).await?;
        }
        write_slot(
            &mut tx,
            report.weekday,
            true,
            &report.reporter,
            Some(report.date),
        )
        .await?;

        tx.commit().await?;

        if let Some(reset) = reset {
            tracing::info!(current_index = reset.current_index, "Applied weekly reset");
        }

        tracing::debug!(
            weekday = %report.weekday,
            reporter = %report.reporter,
            next_index = ?report.next_index,
            "Recorded completion"
        );
        Ok(())
    }

    // =========================================================================
    // Reconfiguration
    // =========================================================================

    /// Replace the roster wholesale, re-indexing by position.
    ///
    /// Stored pointers are folded into the new roster's bounds in the same
    /// transaction. Returns the pointers as stored afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the transaction fails, or
    /// [`DbError::Corrupt`] if the stored pointers are unreadable.
    pub async fn replace_roster(&self, names: &[String]) -> Result<RotationPointers, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM participants")
            .execute(&mut *tx)
            .await?;
        insert_roster(&mut tx, names).await?;

        let stored = read_pointers(&mut tx).await?;
        let folded = fold_pointers(stored, names.len());
        write_pointer(&mut tx, PointerKey::Current, folded.current_index).await?;
        write_pointer(&mut tx, PointerKey::Next, folded.next_index).await?;

        tx.commit().await?;

        tracing::info!(participants = names.len(), "Replaced roster");
        Ok(folded)
    }

    /// Replace the seven static weekday rows wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the transaction fails.
    pub async fn replace_weekday_map(
        &self,
        slots: &[WeekdaySlot; WeekdayIndex::COUNT],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM weekday_slots")
            .execute(&mut *tx)
            .await?;

        for slot in slots {
            sqlx::query(
                r"INSERT INTO weekday_slots
                  (weekday, name, completed, reporter, completion_date)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(i64::from(slot.weekday.get()))
            .bind(&slot.name)
            .bind(slot.completed)
            .bind(&slot.reporter)
            .bind(slot.completion_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Replaced weekday map");
        Ok(())
    }

    // =========================================================================
    // Targeted writes
    // =========================================================================

    /// Overwrite one slot's completion fields.
    ///
    /// A pending slot is always stored with an empty reporter and no date,
    /// whatever was passed in.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the update fails.
    pub async fn update_slot(
        &self,
        weekday: WeekdayIndex,
        completed: bool,
        reporter: &str,
        date: Option<NaiveDate>,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        write_slot(&mut conn, weekday, completed, reporter, date).await
    }

    /// Overwrite one rotation pointer.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the write fails.
    pub async fn update_pointer(&self, key: PointerKey, value: usize) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        write_pointer(&mut conn, key, value).await
    }

    /// Insert or overwrite one meta entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the write fails.
    pub async fn update_meta(&self, key: &str, value: &str) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        write_meta(&mut conn, key, value).await?;
        tracing::debug!(key, "Updated meta entry");
        Ok(())
    }

    /// Insert or overwrite several meta entries in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any write fails; no entry is changed
    /// in that case.
    pub async fn update_meta_entries(&self, entries: &[(&str, &str)]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            write_meta(&mut tx, key, value).await?;
        }
        tx.commit().await?;

        tracing::debug!(entries = entries.len(), "Updated meta entries");
        Ok(())
    }
}

// =========================================================================
// Statement helpers shared by transactional and single-statement writes
// =========================================================================

async fn insert_roster(conn: &mut SqliteConnection, names: &[String]) -> Result<(), DbError> {
    for (position, name) in names.iter().enumerate() {
        sqlx::query("INSERT INTO participants (position, name) VALUES ($1, $2)")
            .bind(to_stored(position))
            .bind(name)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn read_pointers(conn: &mut SqliteConnection) -> Result<RotationPointers, DbError> {
    let rows: Vec<(String, i64)> = sqlx::query_as("SELECT key, value FROM rotation_pointers")
        .fetch_all(&mut *conn)
        .await?;
    let mut pointers = RotationPointers::default();
    for (key, value) in rows {
        if let Some(pointer) = PointerKey::from_key(&key) {
            pointers.set(pointer, from_stored(&key, value)?);
        }
    }
    Ok(pointers)
}

async fn write_reset(conn: &mut SqliteConnection, reset: &WeeklyReset) -> Result<(), DbError> {
    sqlx::query(
        r"UPDATE weekday_slots
          SET completed = 0, reporter = '', completion_date = NULL",
    )
    .execute(&mut *conn)
    .await?;
    write_pointer(conn, PointerKey::Current, reset.current_index).await
}

async fn write_meta(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO meta (key, value) VALUES ($1, $2)
          ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(key)
    .bind(value)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_pointer(
    conn: &mut SqliteConnection,
    key: PointerKey,
    value: usize,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO rotation_pointers (key, value) VALUES ($1, $2)
          ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(key.as_str())
    .bind(to_stored(value))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_slot(
    conn: &mut SqliteConnection,
    weekday: WeekdayIndex,
    completed: bool,
    reporter: &str,
    date: Option<NaiveDate>,
) -> Result<(), DbError> {
    let (reporter, date) = if completed { (reporter, date) } else { ("", None) };
    sqlx::query(
        r"UPDATE weekday_slots
          SET completed = $1, reporter = $2, completion_date = $3
          WHERE weekday = $4",
    )
    .bind(completed)
    .bind(reporter)
    .bind(date)
    .bind(i64::from(weekday.get()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}
