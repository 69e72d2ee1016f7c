//! Timezone resolution and local-time conversion for recurrence anchors.
//!
//! TZIDs from calendar clients are matched against IANA names, ICU alias
//! data and the Windows zone table.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{ConstructionError, IterationError, IterationResult};

/// Resolver for timezone identifiers.
///
/// Maintains a cache of resolved timezones keyed by the identifier as given.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    cache: HashMap<String, Tz>,
}

impl TimeZoneResolver {
    /// Creates a new timezone resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// Vendor prefixes, Windows zone names and IANA aliases are normalized
    /// before lookup.
    ///
    /// ## Errors
    ///
    /// Returns `ConstructionError::UnknownTimezone` if the TZID cannot be resolved.
    ///
    /// ## Side Effects
    ///
    /// Caches successful resolutions to avoid repeated parsing.
    pub fn resolve(&mut self, tzid: &str) -> Result<Tz, ConstructionError> {
        if let Some(tz) = self.cache.get(tzid) {
            return Ok(*tz);
        }

        let tz = candidates(tzid)
            .find_map(lookup)
            .ok_or_else(|| ConstructionError::UnknownTimezone(tzid.to_string()))?;

        tracing::trace!(tzid, resolved = %tz, "Resolved timezone");
        self.cache.insert(tzid.to_string(), tz);

        Ok(tz)
    }

    /// Number of identifiers resolved so far.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Names to try for a TZID, most specific first.
///
/// Vendor identifiers look like `/mozilla.org/20050126_1/America/New_York`,
/// so a leading `/` yields every trailing path suffix after the vendor
/// segment, longest first.
fn candidates(tzid: &str) -> impl Iterator<Item = &str> {
    let trimmed = tzid.trim();
    let vendor_tail = trimmed
        .strip_prefix('/')
        .and_then(|rest| rest.split_once('/'))
        .map(|(_vendor, tail)| tail);

    let suffixes = vendor_tail.into_iter().flat_map(|tail| {
        std::iter::once(tail).chain(
            tail.match_indices('/')
                .map(move |(idx, _)| &tail[idx + 1..]),
        )
    });

    std::iter::once(trimmed)
        .filter(|name| !name.starts_with('/'))
        .chain(suffixes)
        .filter(|name| !name.is_empty())
}

/// Maps one candidate name to a zone: exact IANA name, then an IANA alias
/// canonicalized by ICU, then a Windows zone name.
fn lookup(name: &str) -> Option<Tz> {
    if let Ok(tz) = Tz::from_str(name) {
        return Some(tz);
    }

    let iana = IanaParserExtended::new();
    let parsed = iana.parse(name);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN
        && let Ok(tz) = Tz::from_str(parsed.canonical)
    {
        return Some(tz);
    }

    let bcp47 = WindowsParser::new().parse(name, None)?;
    iana.iter()
        .find(|entry| entry.time_zone == bcp47)
        .and_then(|entry| Tz::from_str(entry.canonical).ok())
}

/// ## Summary
/// Interprets a wall-clock time in `tz`.
///
/// Ambiguous times (DST fold) resolve to the earlier instant. Non-existent
/// times (DST gap) are shifted forward by one hour.
///
/// ## Errors
///
/// Returns `IterationError::NonExistentTime` if the shifted time still does
/// not exist in `tz`.
pub fn resolve_local(local: NaiveDateTime, tz: Tz) -> IterationResult<DateTime<Tz>> {
    if let Some(dt) = earliest(tz.from_local_datetime(&local)) {
        return Ok(dt);
    }

    tracing::trace!(%local, %tz, "Local time falls in a DST gap, shifting forward");
    local
        .checked_add_signed(TimeDelta::hours(1))
        .and_then(|shifted| earliest(tz.from_local_datetime(&shifted)))
        .ok_or_else(|| IterationError::NonExistentTime(format!("{local} in timezone {tz}")))
}

fn earliest(result: LocalResult<DateTime<Tz>>) -> Option<DateTime<Tz>> {
    match result {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => None,
    }
}
