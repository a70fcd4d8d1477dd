//! Shared type definitions for the dog walk rotation service.
//!
//! This crate is the single source of truth for the data model that flows
//! between the schedule store, the rotation engine, and connected clients.
//! Wire types are exported to `TypeScript` via `ts-rs` for the graphical
//! client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers (observer handles)
//! - [`schedule`] -- Persisted schedule state (weekday slots, pointers, meta)
//! - [`snapshot`] -- The read-only projection pushed to clients

pub mod ids;
pub mod schedule;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use ids::ObserverId;
pub use schedule::{
    CURRENT_INDEX_KEY, DOG_IMAGE_KEY, DOG_NAME_KEY, FullState, InvalidWeekday, MetaConfig,
    NEXT_INDEX_KEY, PointerKey, RotationPointers, WeekdayIndex, WeekdaySlot,
};
pub use snapshot::{DayEntry, Snapshot, StreamKind, StreamMessage};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the client-facing types.

    #[test]
    fn export_bindings() {
        // Exporting writes the `.ts` files into `bindings/` relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::ids::ObserverId::export_all();
        let _ = crate::schedule::WeekdayIndex::export_all();
        let _ = crate::schedule::MetaConfig::export_all();
        let _ = crate::snapshot::DayEntry::export_all();
        let _ = crate::snapshot::Snapshot::export_all();
        let _ = crate::snapshot::StreamKind::export_all();
        let _ = crate::snapshot::StreamMessage::export_all();
    }
}
