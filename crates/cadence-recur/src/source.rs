//! Recurrence instance sources: one rule, one explicit date list, or one instant.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rrule::{RRule, RRuleError, Unvalidated, ValidationError};

use crate::error::{ConstructionError, ConstructionResult};
use crate::instant::DateValue;
use crate::stream::InstantStream;

/// An immutable definition that can hand out independent instant streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceSource {
    RuleBased(RuleSource),
    ListBased(DateList),
    SingleInstant(DateValue),
}

/// A validated RRULE anchored at its DTSTART.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    rrule: String,
    dtstart: DateValue,
}

impl RuleSource {
    #[must_use]
    pub fn rrule(&self) -> &str {
        &self.rrule
    }

    #[must_use]
    pub fn dtstart(&self) -> DateValue {
        self.dtstart
    }
}

/// A non-empty, finite list of explicit date-times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateList(Vec<DateValue>);

impl DateList {
    #[must_use]
    pub fn values(&self) -> &[DateValue] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl RecurrenceSource {
    /// ## Summary
    /// Builds a rule-based source from RRULE text (with or without the
    /// `RRULE:` prefix) anchored at `dtstart`.
    ///
    /// The rule is parsed and validated here so a malformed rule never
    /// reaches iteration. A rule whose UNTIL precedes its DTSTART is
    /// accepted and produces no instants.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The RRULE text cannot be parsed (`RuleParse`)
    /// - A field is out of range or inconsistent (`RuleValidation`)
    /// - The anchor is a wall-clock time that does not exist (`InvalidDateTime`)
    pub fn rule(rrule: &str, dtstart: impl Into<DateValue>) -> ConstructionResult<Self> {
        let dtstart = dtstart.into();
        let text = rrule.trim();
        let text = text.strip_prefix("RRULE:").unwrap_or(text).to_string();

        let parsed = text
            .parse::<RRule<Unvalidated>>()
            .map_err(|err| ConstructionError::RuleParse(err.to_string()))?;

        // Floating anchors are checked against UTC; a session re-anchors them.
        let anchor_tz = rrule::Tz::Tz(dtstart.anchor_timezone(Tz::UTC));
        let anchor = dtstart
            .resolve_anchored(Tz::UTC)
            .map_err(|err| ConstructionError::InvalidDateTime(err.to_string()))?
            .with_timezone(&anchor_tz);

        match parsed.validate(anchor) {
            Ok(_) => {}
            Err(RRuleError::ValidationError(ValidationError::UntilBeforeStart { .. })) => {
                tracing::debug!(rrule = %text, "Rule ends before it starts; source is empty");
            }
            Err(RRuleError::ValidationError(err)) => {
                return Err(ConstructionError::RuleValidation(err));
            }
            Err(err) => return Err(ConstructionError::RuleParse(err.to_string())),
        }

        tracing::trace!(rrule = %text, "Constructed rule source");
        Ok(Self::RuleBased(RuleSource {
            rrule: text,
            dtstart,
        }))
    }

    /// ## Summary
    /// Builds a list-based source from explicit date-times.
    ///
    /// ## Errors
    /// Returns `ConstructionError::EmptyDateList` if `values` is empty.
    pub fn list(values: impl IntoIterator<Item = DateValue>) -> ConstructionResult<Self> {
        let values: Vec<DateValue> = values.into_iter().collect();
        if values.is_empty() {
            return Err(ConstructionError::EmptyDateList);
        }
        Ok(Self::ListBased(DateList(values)))
    }

    /// Builds a source for exactly one date-time.
    #[must_use]
    pub fn single(value: impl Into<DateValue>) -> Self {
        Self::SingleInstant(value.into())
    }

    /// ## Summary
    /// Creates a fresh stream anchored at `(timezone, start)`.
    ///
    /// The source keeps no iteration state, so any number of streams may be
    /// created and consumed independently. Nothing is expanded until the
    /// stream is first pulled.
    #[must_use]
    pub fn stream(&self, timezone: Tz, start: DateTime<Utc>) -> InstantStream {
        match self {
            Self::RuleBased(rule) => {
                InstantStream::rule(rule.rrule.clone(), rule.dtstart, timezone, start)
            }
            Self::ListBased(list) => InstantStream::list(list.0.clone(), timezone, start),
            Self::SingleInstant(value) => InstantStream::list(vec![*value], timezone, start),
        }
    }
}
