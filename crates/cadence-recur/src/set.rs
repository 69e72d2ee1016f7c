//! Per-event aggregate of inclusion and exception sources.

use cadence_core::config::{DEFAULT_MAX_INSTANCES, ExceptionMatch, RecurrenceConfig};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::RecurrenceResult;
use crate::instant::Instant;
use crate::merger::RecurrenceMerger;
use crate::source::RecurrenceSource;
use crate::timezone::TimeZoneResolver;

/// Options for eager expansion with [`RecurrenceSet::expand`].
#[derive(Debug, Clone)]
pub struct ExpansionOptions {
    /// Maximum number of occurrences to collect.
    pub max_instances: usize,

    /// Start of time range filter (inclusive).
    pub range_start: Option<DateTime<Utc>>,

    /// End of time range filter (exclusive).
    pub range_end: Option<DateTime<Utc>>,

    /// Session timezone; the set's default timezone when unset.
    pub timezone: Option<Tz>,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            range_start: None,
            range_end: None,
            timezone: None,
        }
    }
}

impl ExpansionOptions {
    /// Creates expansion options with a time range.
    #[must_use]
    pub fn with_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            range_start: Some(start),
            range_end: Some(end),
            ..Self::default()
        }
    }

    /// Creates expansion options capped at the configured instance count.
    #[must_use]
    pub fn from_config(config: &RecurrenceConfig) -> Self {
        Self {
            max_instances: config.max_instances,
            ..Self::default()
        }
    }

    /// Sets the maximum number of instances.
    #[must_use]
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = max;
        self
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }
}

/// The recurrence definition of one event: rules and date lists that add
/// occurrences, and rules and date lists that remove them.
///
/// Built up during setup, then only read. Every call to
/// [`RecurrenceSet::iterator`] starts an independent session.
#[derive(Debug, Clone)]
pub struct RecurrenceSet {
    inclusions: Vec<RecurrenceSource>,
    exceptions: Vec<RecurrenceSource>,
    exception_match: ExceptionMatch,
    default_timezone: Tz,
}

impl Default for RecurrenceSet {
    fn default() -> Self {
        Self {
            inclusions: Vec::new(),
            exceptions: Vec::new(),
            exception_match: ExceptionMatch::default(),
            default_timezone: Tz::UTC,
        }
    }
}

impl RecurrenceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Creates an empty set using the configured matching policy and
    /// default timezone.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::Core` if the configuration is invalid, or
    /// `ConstructionError::UnknownTimezone` if `default_timezone` does not
    /// resolve.
    pub fn with_config(config: &RecurrenceConfig) -> RecurrenceResult<Self> {
        config.validate()?;
        let default_timezone = TimeZoneResolver::new().resolve(&config.default_timezone)?;
        Ok(Self {
            exception_match: config.exception_match,
            default_timezone,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_exception_match(mut self, exception_match: ExceptionMatch) -> Self {
        self.exception_match = exception_match;
        self
    }

    #[must_use]
    pub fn with_default_timezone(mut self, timezone: Tz) -> Self {
        self.default_timezone = timezone;
        self
    }

    pub fn add_inclusion(&mut self, source: RecurrenceSource) {
        self.inclusions.push(source);
    }

    pub fn add_exception(&mut self, source: RecurrenceSource) {
        self.exceptions.push(source);
    }

    #[must_use]
    pub fn inclusions(&self) -> &[RecurrenceSource] {
        &self.inclusions
    }

    #[must_use]
    pub fn exceptions(&self) -> &[RecurrenceSource] {
        &self.exceptions
    }

    #[must_use]
    pub fn exception_match(&self) -> ExceptionMatch {
        self.exception_match
    }

    #[must_use]
    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    /// True when no inclusion source exists; such a set never yields anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inclusions.is_empty()
    }

    /// ## Summary
    /// Starts an unbounded session anchored at `(timezone, start)`.
    #[must_use]
    pub fn iterator(&self, timezone: Tz, start: DateTime<Utc>) -> RecurrenceMerger {
        self.session(timezone, start, None)
    }

    /// ## Summary
    /// Starts a session anchored at `(timezone, start)` that stops before `end`.
    #[must_use]
    pub fn iterator_until(
        &self,
        timezone: Tz,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RecurrenceMerger {
        self.session(timezone, start, Some(end))
    }

    fn session(
        &self,
        timezone: Tz,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> RecurrenceMerger {
        tracing::debug!(
            inclusions = self.inclusions.len(),
            exceptions = self.exceptions.len(),
            %timezone,
            %start,
            end = ?end,
            exception_match = ?self.exception_match,
            "Starting recurrence session"
        );

        let inclusions = self
            .inclusions
            .iter()
            .map(|source| source.stream(timezone, start))
            .collect();
        let exceptions = self
            .exceptions
            .iter()
            .map(|source| source.stream(timezone, start))
            .collect();

        RecurrenceMerger::new(inclusions, exceptions, end, self.exception_match, timezone)
    }

    /// ## Summary
    /// Collects the occurrences in the window described by `options`.
    ///
    /// Stops after `options.max_instances` occurrences even when the window
    /// is unbounded.
    ///
    /// ## Errors
    /// Propagates the first iteration fault of the underlying session.
    pub fn expand(&self, options: &ExpansionOptions) -> RecurrenceResult<Vec<Instant>> {
        let timezone = options.timezone.unwrap_or(self.default_timezone);
        let start = options.range_start.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let session = self.session(timezone, start, options.range_end);

        let occurrences = session
            .take(options.max_instances)
            .collect::<RecurrenceResult<Vec<_>>>()?;

        tracing::trace!(count = occurrences.len(), "Expanded recurrence set");
        Ok(occurrences)
    }
}
