//! Forward-only instant streams produced by recurrence sources.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rrule::{RRule, RRuleError, RRuleSet, RRuleSetIter, Unvalidated, ValidationError};
use std::collections::VecDeque;

use crate::error::{IterationError, IterationResult};
use crate::instant::{DateValue, Instant};

/// A lazily evaluated, non-decreasing sequence of instants.
pub trait OccurrenceStream {
    /// ## Summary
    /// Looks at the next instant without consuming it.
    ///
    /// ## Errors
    /// Returns an `IterationError` if producing the value faults.
    fn peek(&mut self) -> IterationResult<Option<Instant>>;

    /// ## Summary
    /// Consumes and returns the next instant.
    ///
    /// ## Errors
    /// Returns an `IterationError` if producing the value faults.
    fn advance(&mut self) -> IterationResult<Option<Instant>>;
}

/// Stream over one recurrence source, anchored to a session timezone and start.
#[derive(Debug)]
pub struct InstantStream {
    kind: StreamKind,
    last: Option<Instant>,
}

#[derive(Debug)]
enum StreamKind {
    Rule(RuleStream),
    List(ListStream),
}

impl InstantStream {
    pub(crate) fn rule(
        rrule: String,
        dtstart: DateValue,
        timezone: Tz,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: StreamKind::Rule(RuleStream {
                rrule,
                dtstart,
                timezone,
                start,
                engine: None,
                head: None,
                last_seen: None,
                drained: false,
            }),
            last: None,
        }
    }

    pub(crate) fn list(values: Vec<DateValue>, timezone: Tz, start: DateTime<Utc>) -> Self {
        Self {
            kind: StreamKind::List(ListStream {
                pending: values,
                timezone,
                start,
                resolved: None,
            }),
            last: None,
        }
    }

    fn head(&mut self) -> IterationResult<Option<Instant>> {
        match &mut self.kind {
            StreamKind::Rule(rule) => rule.head(),
            StreamKind::List(list) => list.head(),
        }
    }

    fn pop(&mut self) {
        match &mut self.kind {
            StreamKind::Rule(rule) => {
                rule.head = None;
            }
            StreamKind::List(list) => {
                if let Some(resolved) = list.resolved.as_mut() {
                    resolved.pop_front();
                }
            }
        }
    }
}

impl OccurrenceStream for InstantStream {
    fn peek(&mut self) -> IterationResult<Option<Instant>> {
        self.head()
    }

    fn advance(&mut self) -> IterationResult<Option<Instant>> {
        let Some(next) = self.head()? else {
            return Ok(None);
        };

        if let Some(previous) = self.last
            && next < previous
        {
            return Err(IterationError::OutOfOrder {
                previous: previous.to_string(),
                current: next.to_string(),
            });
        }

        self.pop();
        self.last = Some(next);
        Ok(Some(next))
    }
}

/// The rule engine's iterator, kept alive for the whole stream so every
/// instance is generated once.
#[derive(Debug)]
struct RuleEngine {
    set: RRuleSet,
    iter: RRuleSetIter,
}

/// Pulls occurrences one at a time out of the `rrule` engine.
#[derive(Debug)]
struct RuleStream {
    rrule: String,
    dtstart: DateValue,
    timezone: Tz,
    start: DateTime<Utc>,
    engine: Option<RuleEngine>,
    head: Option<Instant>,
    last_seen: Option<DateTime<rrule::Tz>>,
    drained: bool,
}

impl RuleStream {
    fn head(&mut self) -> IterationResult<Option<Instant>> {
        if self.head.is_none() && !self.drained {
            self.head = self.pull()?;
            self.drained = self.head.is_none();
        }
        Ok(self.head)
    }

    fn build(&self) -> IterationResult<Option<RuleEngine>> {
        let anchor_tz = rrule::Tz::Tz(self.dtstart.anchor_timezone(self.timezone));
        let dtstart = self
            .dtstart
            .resolve_anchored(self.timezone)?
            .with_timezone(&anchor_tz);

        let rule = self
            .rrule
            .parse::<RRule<Unvalidated>>()
            .map_err(|err| IterationError::Rule(err.to_string()))?;
        let validated = match rule.validate(dtstart) {
            Ok(validated) => validated,
            Err(RRuleError::ValidationError(ValidationError::UntilBeforeStart { .. })) => {
                tracing::trace!(rrule = %self.rrule, "UNTIL precedes DTSTART, stream is empty");
                return Ok(None);
            }
            Err(err) => return Err(IterationError::Rule(err.to_string())),
        };

        // `limit` turns on the engine's loop guard for rules that never match.
        let set = RRuleSet::new(dtstart).rrule(validated).limit();
        let iter = (&set).into_iter();

        tracing::trace!(
            rrule = %self.rrule,
            dtstart = %dtstart.with_timezone(&Utc),
            start = %self.start,
            "Built rule stream"
        );
        Ok(Some(RuleEngine { set, iter }))
    }

    /// Next engine instance at or after `start`, or `None` once the rule ends.
    fn pull(&mut self) -> IterationResult<Option<Instant>> {
        if self.engine.is_none() {
            self.engine = self.build()?;
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(None);
        };

        // The engine has no seek, so instances before `start` are walked once here.
        let mut skipped: usize = 0;
        for date in engine.iter.by_ref() {
            self.last_seen = Some(date);
            let instant = Instant::new(date.with_timezone(&self.timezone));
            if instant.utc() >= self.start {
                if skipped > 0 {
                    tracing::trace!(skipped, start = %self.start, "Skipped instances before start");
                }
                return Ok(Some(instant));
            }
            skipped += 1;
        }

        // The iterator ends the same way on exhaustion and on its loop guard;
        // replaying from the last instance seen reports which one happened.
        let replay = match self.last_seen {
            Some(last) => engine.set.clone().after(last),
            None => engine.set.clone(),
        };
        if replay.all(2).limited {
            return Err(IterationError::IterationLimit);
        }

        tracing::trace!(rrule = %self.rrule, "Rule stream exhausted");
        Ok(None)
    }
}

/// Resolves an explicit date list on first use.
#[derive(Debug)]
struct ListStream {
    pending: Vec<DateValue>,
    timezone: Tz,
    start: DateTime<Utc>,
    resolved: Option<VecDeque<Instant>>,
}

impl ListStream {
    fn head(&mut self) -> IterationResult<Option<Instant>> {
        if self.resolved.is_none() {
            let mut instants = self
                .pending
                .iter()
                .map(|value| value.resolve(self.timezone))
                .collect::<IterationResult<Vec<_>>>()?;
            instants.retain(|instant| instant.utc() >= self.start);
            instants.sort_unstable();
            instants.dedup();
            self.resolved = Some(instants.into());
        }

        Ok(self
            .resolved
            .as_ref()
            .and_then(|resolved| resolved.front().copied()))
    }
}
