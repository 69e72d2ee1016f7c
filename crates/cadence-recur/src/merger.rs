//! K-way merge of inclusion streams with exception subtraction.
//!
//! Inclusion heads are merged in ascending order; equal heads from different
//! sources collapse into one output. Exception streams are advanced in lock
//! step and remove candidates they match under the session's
//! [`ExceptionMatch`] policy. Nothing is pulled from a stream until the
//! consumer asks for the next value.

use cadence_core::config::ExceptionMatch;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::iter::FusedIterator;

use crate::error::{IterationError, IterationResult, RecurrenceResult};
use crate::instant::Instant;
use crate::stream::{InstantStream, OccurrenceStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Exhausted,
    Failed,
}

/// Key under which a candidate and an exception are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchKey {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

/// One iteration session over a recurrence set.
///
/// Created per query and never restarted; a new session is required to
/// iterate again. After an iteration fault the session stays failed.
#[derive(Debug)]
pub struct RecurrenceMerger<S = InstantStream> {
    inclusions: Vec<S>,
    exceptions: Vec<S>,
    end: Option<DateTime<Utc>>,
    exception_match: ExceptionMatch,
    timezone: Tz,
    state: SessionState,
    emitted: usize,
}

impl<S: OccurrenceStream> RecurrenceMerger<S> {
    /// Creates a session over the given streams. `end` is exclusive; `None`
    /// leaves the session unbounded.
    #[must_use]
    pub fn new(
        inclusions: Vec<S>,
        exceptions: Vec<S>,
        end: Option<DateTime<Utc>>,
        exception_match: ExceptionMatch,
        timezone: Tz,
    ) -> Self {
        Self {
            inclusions,
            exceptions,
            end,
            exception_match,
            timezone,
            state: SessionState::Active,
            emitted: 0,
        }
    }

    /// Number of instants produced so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == SessionState::Exhausted
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state == SessionState::Failed
    }

    /// ## Summary
    /// Produces the next instant of the session.
    ///
    /// Returns `Ok(None)` once the session is exhausted, and keeps doing so.
    ///
    /// ## Errors
    ///
    /// Propagates the first `IterationError` raised by any stream. The
    /// session is failed afterwards and every later call returns
    /// `IterationError::SessionFailed`.
    pub fn try_next(&mut self) -> RecurrenceResult<Option<Instant>> {
        match self.state {
            SessionState::Exhausted => return Ok(None),
            SessionState::Failed => return Err(IterationError::SessionFailed.into()),
            SessionState::Active => {}
        }

        match self.produce() {
            Ok(Some(instant)) => {
                self.emitted += 1;
                Ok(Some(instant))
            }
            Ok(None) => {
                self.state = SessionState::Exhausted;
                tracing::debug!(emitted = self.emitted, "Recurrence session exhausted");
                Ok(None)
            }
            Err(err) => {
                self.state = SessionState::Failed;
                tracing::warn!(
                    error = %err,
                    emitted = self.emitted,
                    "Recurrence session failed"
                );
                Err(err.into())
            }
        }
    }

    fn produce(&mut self) -> IterationResult<Option<Instant>> {
        loop {
            let Some(candidate) = self.min_head()? else {
                return Ok(None);
            };

            if self.end.is_some_and(|end| candidate.utc() >= end) {
                return Ok(None);
            }

            let excluded = self.is_excluded(candidate)?;
            self.consume_inclusions(candidate)?;

            if excluded {
                tracing::trace!(%candidate, "Occurrence removed by exception");
                continue;
            }

            return Ok(Some(candidate));
        }
    }

    fn min_head(&mut self) -> IterationResult<Option<Instant>> {
        let mut min: Option<Instant> = None;
        for stream in &mut self.inclusions {
            if let Some(head) = stream.peek()? {
                min = Some(min.map_or(head, |current| current.min(head)));
            }
        }
        Ok(min)
    }

    /// Advances every inclusion stream past all heads equal to `candidate`.
    fn consume_inclusions(&mut self, candidate: Instant) -> IterationResult<()> {
        for stream in &mut self.inclusions {
            while stream.peek()? == Some(candidate) {
                stream.advance()?;
            }
        }
        Ok(())
    }

    /// Drops exception heads that fall before `candidate` and reports whether
    /// any remaining head matches it.
    fn is_excluded(&mut self, candidate: Instant) -> IterationResult<bool> {
        let policy = self.exception_match;
        let timezone = self.timezone;
        let key = match_key(policy, timezone, candidate);
        let mut excluded = false;

        for stream in &mut self.exceptions {
            while let Some(head) = stream.peek()? {
                let head_key = match_key(policy, timezone, head);
                if head_key < key {
                    stream.advance()?;
                    continue;
                }
                if head_key == key {
                    excluded = true;
                    // Day matches stay in place so later candidates that day are removed too.
                    if policy == ExceptionMatch::Exact {
                        stream.advance()?;
                    }
                }
                break;
            }
        }

        Ok(excluded)
    }
}

fn match_key(policy: ExceptionMatch, timezone: Tz, instant: Instant) -> MatchKey {
    match policy {
        ExceptionMatch::Exact => MatchKey::Instant(instant.utc()),
        ExceptionMatch::LocalDay => MatchKey::Day(instant.in_timezone(timezone).local_date()),
    }
}

impl<S: OccurrenceStream> Iterator for RecurrenceMerger<S> {
    type Item = RecurrenceResult<Instant>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != SessionState::Active {
            return None;
        }
        self.try_next().transpose()
    }
}

impl<S: OccurrenceStream> FusedIterator for RecurrenceMerger<S> {}
