//! Shared primitive types used across the entire engine.

/// A stable, unique identifier for any persisted record.
pub type EntityId = String;

/// A whole number of calendar days. Negative means "in the past".
pub type DayCount = i64;
