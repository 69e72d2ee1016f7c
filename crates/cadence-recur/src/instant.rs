//! Occurrence instants and the date-time forms sources are built from.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::fmt;

use crate::error::{ConstructionError, IterationResult};
use crate::timezone::{TimeZoneResolver, resolve_local};

/// An absolute point in time tagged with the timezone it was generated under.
///
/// Equality and ordering are by absolute time; the timezone tag does not
/// take part in comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(DateTime<Tz>);

impl Instant {
    #[must_use]
    pub fn new(at: DateTime<Tz>) -> Self {
        Self(at)
    }

    #[must_use]
    pub fn from_utc(at: DateTime<Utc>, tz: Tz) -> Self {
        Self(at.with_timezone(&tz))
    }

    #[must_use]
    pub fn utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.0.timezone()
    }

    /// Wall-clock time in the tagged timezone.
    #[must_use]
    pub fn local(&self) -> NaiveDateTime {
        self.0.naive_local()
    }

    /// Calendar day in the tagged timezone.
    #[must_use]
    pub fn local_date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Tz> {
        &self.0
    }

    /// Re-tags the same absolute instant with another timezone.
    #[must_use]
    pub fn in_timezone(&self, tz: Tz) -> Self {
        Self(self.0.with_timezone(&tz))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Tz>> for Instant {
    fn from(at: DateTime<Tz>) -> Self {
        Self(at)
    }
}

/// A date-time as written in a rule anchor or an explicit date list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateValue {
    /// Fixed absolute time.
    Utc(DateTime<Utc>),
    /// Wall-clock time in a named timezone.
    Zoned { local: NaiveDateTime, tz: Tz },
    /// Wall-clock time interpreted in the session timezone.
    Floating(NaiveDateTime),
}

impl DateValue {
    /// ## Summary
    /// Builds a zoned value from a TZID, resolving it through `resolver`.
    ///
    /// ## Errors
    /// Returns `ConstructionError::UnknownTimezone` if the TZID cannot be resolved.
    pub fn zoned(
        local: NaiveDateTime,
        tzid: &str,
        resolver: &mut TimeZoneResolver,
    ) -> Result<Self, ConstructionError> {
        let tz = resolver.resolve(tzid)?;
        Ok(Self::Zoned { local, tz })
    }

    /// Timezone the value is expressed in, given the session timezone.
    #[must_use]
    pub fn anchor_timezone(&self, session_tz: Tz) -> Tz {
        match self {
            Self::Utc(_) => Tz::UTC,
            Self::Zoned { tz, .. } => *tz,
            Self::Floating(_) => session_tz,
        }
    }

    /// ## Summary
    /// Resolves the value to a concrete time in its anchor timezone.
    ///
    /// ## Errors
    /// Returns `IterationError::NonExistentTime` if a wall-clock value falls
    /// in a DST gap that cannot be shifted out of.
    pub fn resolve_anchored(&self, session_tz: Tz) -> IterationResult<DateTime<Tz>> {
        match self {
            Self::Utc(at) => Ok(at.with_timezone(&Tz::UTC)),
            Self::Zoned { local, tz } => resolve_local(*local, *tz),
            Self::Floating(local) => resolve_local(*local, session_tz),
        }
    }

    /// ## Summary
    /// Resolves the value to an instant tagged with the session timezone.
    ///
    /// ## Errors
    /// Same as [`DateValue::resolve_anchored`].
    pub fn resolve(&self, session_tz: Tz) -> IterationResult<Instant> {
        let anchored = self.resolve_anchored(session_tz)?;
        Ok(Instant::new(anchored.with_timezone(&session_tz)))
    }
}

impl From<DateTime<Utc>> for DateValue {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Utc(at)
    }
}

impl From<NaiveDateTime> for DateValue {
    fn from(local: NaiveDateTime) -> Self {
        Self::Floating(local)
    }
}
