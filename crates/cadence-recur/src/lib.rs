//! Occurrence expansion for recurring calendar definitions.
//!
//! A [`RecurrenceSet`] holds the rules and date lists of one event. Each call
//! to [`RecurrenceSet::iterator`] opens a [`RecurrenceMerger`] session that
//! lazily merges the inclusion streams, drops duplicates and subtracts the
//! exception streams, yielding one [`Instant`] at a time.

pub mod error;
pub mod instant;
pub mod merger;
pub mod set;
pub mod source;
pub mod stream;
pub mod timezone;

pub use cadence_core::config::ExceptionMatch;
pub use error::{
    ConstructionError, IterationError, RecurrenceError, RecurrenceResult,
};
pub use instant::{DateValue, Instant};
pub use merger::RecurrenceMerger;
pub use set::{ExpansionOptions, RecurrenceSet};
pub use source::{DateList, RecurrenceSource, RuleSource};
pub use stream::{InstantStream, OccurrenceStream};
pub use timezone::TimeZoneResolver;
