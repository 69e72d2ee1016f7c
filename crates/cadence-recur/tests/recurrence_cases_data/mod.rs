use cadence_recur::{DateValue, RecurrenceSet, RecurrenceSource, TimeZoneResolver};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Tz;

pub enum SourceDef {
    Rule {
        rrule: &'static str,
        dtstart: &'static str,
    },
    FloatingRule {
        rrule: &'static str,
        dtstart: &'static str,
    },
    ZonedRule {
        rrule: &'static str,
        dtstart: &'static str,
        tzid: &'static str,
    },
    List(&'static [&'static str]),
    FloatingList(&'static [&'static str]),
    Single(&'static str),
}

pub struct RecurrenceCase {
    pub name: &'static str,
    pub timezone: Tz,
    pub inclusions: &'static [SourceDef],
    pub exceptions: &'static [SourceDef],
    pub start: &'static str,
    pub end: Option<&'static str>,
    pub expected: Option<&'static [&'static str]>,
    pub expected_len: Option<usize>,
}

#[expect(clippy::too_many_lines)]
pub fn recurrence_cases() -> Vec<RecurrenceCase> {
    vec![
        RecurrenceCase {
            name: "end_is_exclusive",
            timezone: Tz::UTC,
            inclusions: &[SourceDef::List(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-02T09:00:00+00:00",
                "2024-01-03T09:00:00+00:00",
            ])],
            exceptions: &[],
            start: "2024-01-01T00:00:00+00:00",
            end: Some("2024-01-03T09:00:00+00:00"),
            expected: Some(&["2024-01-01T09:00:00+00:00", "2024-01-02T09:00:00+00:00"]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "exception_removes_match",
            timezone: Tz::UTC,
            inclusions: &[SourceDef::List(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-02T09:00:00+00:00",
                "2024-01-03T09:00:00+00:00",
            ])],
            exceptions: &[SourceDef::Single("2024-01-02T09:00:00+00:00")],
            start: "2024-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&["2024-01-01T09:00:00+00:00", "2024-01-03T09:00:00+00:00"]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "list_and_rule_overlap",
            timezone: Tz::UTC,
            inclusions: &[
                SourceDef::List(&["2024-01-01T09:00:00+00:00"]),
                SourceDef::Rule {
                    rrule: "FREQ=DAILY;COUNT=1",
                    dtstart: "2024-01-01T09:00:00+00:00",
                },
            ],
            exceptions: &[],
            start: "2024-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&["2024-01-01T09:00:00+00:00"]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "rdate_exdate",
            timezone: Tz::UTC,
            inclusions: &[
                SourceDef::Rule {
                    rrule: "FREQ=DAILY;COUNT=3",
                    dtstart: "2012-02-01T09:30:00+00:00",
                },
                SourceDef::List(&["2012-02-10T09:30:00+00:00"]),
            ],
            exceptions: &[SourceDef::List(&["2012-02-02T09:30:00+00:00"])],
            start: "2012-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&[
                "2012-02-01T09:30:00+00:00",
                "2012-02-03T09:30:00+00:00",
                "2012-02-10T09:30:00+00:00",
            ]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "weekdays_except_holiday",
            timezone: Tz::America__New_York,
            inclusions: &[SourceDef::FloatingRule {
                rrule: "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR",
                dtstart: "2024-01-01T09:00:00",
            }],
            exceptions: &[SourceDef::FloatingList(&["2024-01-03T09:00:00"])],
            start: "2024-01-01T00:00:00+00:00",
            end: Some("2024-01-08T00:00:00+00:00"),
            expected: Some(&[
                "2024-01-01T09:00:00-05:00",
                "2024-01-02T09:00:00-05:00",
                "2024-01-04T09:00:00-05:00",
                "2024-01-05T09:00:00-05:00",
            ]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "dst_new_york_floating",
            timezone: Tz::America__New_York,
            inclusions: &[SourceDef::FloatingRule {
                rrule: "FREQ=DAILY;COUNT=3",
                dtstart: "2021-03-13T09:00:00",
            }],
            exceptions: &[],
            start: "2021-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&[
                "2021-03-13T09:00:00-05:00",
                "2021-03-14T09:00:00-04:00",
                "2021-03-15T09:00:00-04:00",
            ]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "zoned_rule_ignores_session_timezone",
            timezone: Tz::Asia__Tokyo,
            inclusions: &[SourceDef::ZonedRule {
                rrule: "FREQ=DAILY;COUNT=2",
                dtstart: "2024-01-01T09:00:00",
                tzid: "Europe/Berlin",
            }],
            exceptions: &[],
            start: "2024-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&["2024-01-01T08:00:00+00:00", "2024-01-02T08:00:00+00:00"]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "start_is_inclusive",
            timezone: Tz::UTC,
            inclusions: &[SourceDef::Rule {
                rrule: "FREQ=DAILY;COUNT=5",
                dtstart: "2024-01-01T09:00:00+00:00",
            }],
            exceptions: &[],
            start: "2024-01-03T09:00:00+00:00",
            end: None,
            expected: Some(&[
                "2024-01-03T09:00:00+00:00",
                "2024-01-04T09:00:00+00:00",
                "2024-01-05T09:00:00+00:00",
            ]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "monthly_last_weekday",
            timezone: Tz::UTC,
            inclusions: &[SourceDef::Rule {
                rrule: "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=3",
                dtstart: "2024-01-31T17:00:00+00:00",
            }],
            exceptions: &[],
            start: "2024-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&[
                "2024-01-31T17:00:00+00:00",
                "2024-02-29T17:00:00+00:00",
                "2024-03-29T17:00:00+00:00",
            ]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "exception_rule_every_other_day",
            timezone: Tz::UTC,
            inclusions: &[SourceDef::Rule {
                rrule: "FREQ=DAILY;COUNT=6",
                dtstart: "2024-01-01T09:00:00+00:00",
            }],
            exceptions: &[SourceDef::Rule {
                rrule: "FREQ=DAILY;INTERVAL=2",
                dtstart: "2024-01-02T09:00:00+00:00",
            }],
            start: "2024-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-03T09:00:00+00:00",
                "2024-01-05T09:00:00+00:00",
            ]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "near_miss_exception_has_no_effect",
            timezone: Tz::UTC,
            inclusions: &[SourceDef::Rule {
                rrule: "FREQ=DAILY;COUNT=3",
                dtstart: "2024-01-01T09:00:00+00:00",
            }],
            exceptions: &[SourceDef::Single("2024-01-02T09:00:01+00:00")],
            start: "2024-01-01T00:00:00+00:00",
            end: None,
            expected: Some(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-02T09:00:00+00:00",
                "2024-01-03T09:00:00+00:00",
            ]),
            expected_len: None,
        },
        RecurrenceCase {
            name: "rfc_every_day_in_jan",
            timezone: Tz::America__New_York,
            inclusions: &[SourceDef::ZonedRule {
                rrule: "FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
                dtstart: "1998-01-01T09:00:00",
                tzid: "America/New_York",
            }],
            exceptions: &[],
            start: "1997-01-01T00:00:00+00:00",
            end: None,
            expected: None,
            expected_len: Some(93),
        },
    ]
}

pub fn build_source(def: &SourceDef, resolver: &mut TimeZoneResolver) -> RecurrenceSource {
    match def {
        SourceDef::Rule { rrule, dtstart } => {
            RecurrenceSource::rule(rrule, DateValue::Utc(parse_utc(dtstart)))
        }
        SourceDef::FloatingRule { rrule, dtstart } => {
            RecurrenceSource::rule(rrule, DateValue::Floating(parse_naive(dtstart)))
        }
        SourceDef::ZonedRule {
            rrule,
            dtstart,
            tzid,
        } => {
            let value = DateValue::zoned(parse_naive(dtstart), tzid, resolver)
                .unwrap_or_else(|err| panic!("Failed to resolve {tzid}: {err}"));
            RecurrenceSource::rule(rrule, value)
        }
        SourceDef::List(values) => {
            RecurrenceSource::list(values.iter().map(|v| DateValue::Utc(parse_utc(v))))
        }
        SourceDef::FloatingList(values) => {
            RecurrenceSource::list(values.iter().map(|v| DateValue::Floating(parse_naive(v))))
        }
        SourceDef::Single(value) => Ok(RecurrenceSource::single(parse_utc(value))),
    }
    .unwrap_or_else(|err| panic!("Failed to build source: {err}"))
}

pub fn build_set(case: &RecurrenceCase) -> RecurrenceSet {
    let mut resolver = TimeZoneResolver::new();
    let mut set = RecurrenceSet::new();
    for def in case.inclusions {
        set.add_inclusion(build_source(def, &mut resolver));
    }
    for def in case.exceptions {
        set.add_exception(build_source(def, &mut resolver));
    }
    set
}

pub fn run_case(case: &RecurrenceCase) -> Vec<i64> {
    let set = build_set(case);
    let start = parse_utc(case.start);
    let session = match case.end {
        Some(end) => set.iterator_until(case.timezone, start, parse_utc(end)),
        None => set.iterator(case.timezone, start),
    };

    session
        .map(|instant| {
            instant
                .unwrap_or_else(|err| panic!("Case {} failed: {err}", case.name))
                .timestamp()
        })
        .collect()
}

pub fn assert_case(case: &RecurrenceCase) {
    let actual_timestamps = run_case(case);

    if let Some(expected) = case.expected {
        let expected_timestamps: Vec<i64> = expected
            .iter()
            .map(|value| parse_rfc3339(value).timestamp())
            .collect();
        assert_eq!(
            actual_timestamps, expected_timestamps,
            "Case {} did not match",
            case.name
        );
    }

    if let Some(expected_len) = case.expected_len {
        assert_eq!(
            actual_timestamps.len(),
            expected_len,
            "Case {} expected {} occurrences",
            case.name,
            expected_len
        );
    }
}

pub fn parse_utc(value: &str) -> DateTime<Utc> {
    parse_rfc3339(value).with_timezone(&Utc)
}

fn parse_rfc3339(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).unwrap_or_else(|err| {
        panic!("Failed to parse rfc3339 value {value}: {err}")
    })
}

fn parse_naive(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap_or_else(|err| {
        panic!("Failed to parse local value {value}: {err}")
    })
}
