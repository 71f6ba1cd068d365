//! # Severity table
//!
//! One ordered table maps every OTLP severity number to its canonical
//! lowercase name and the alternative spellings accepted when parsing. Both
//! the name → severity and number → severity lookups are derived from it, so
//! the two directions cannot disagree.
use once_cell::sync::Lazy;
use opentelemetry_proto::tonic::logs::v1::SeverityNumber;
use std::collections::HashMap;
use std::fmt;

/// Canonical text used when no better severity text can be derived.
pub const DEFAULT_SEVERITY_TEXT: &str = "info";

const SEVERITY_TABLE: [(SeverityNumber, &str, &[&str]); 24] = [
    (SeverityNumber::Trace, "trace", &["trace1"]),
    (SeverityNumber::Trace2, "trace2", &[]),
    (SeverityNumber::Trace3, "trace3", &[]),
    (SeverityNumber::Trace4, "trace4", &[]),
    (SeverityNumber::Debug, "debug", &["debug1"]),
    (SeverityNumber::Debug2, "debug2", &[]),
    (SeverityNumber::Debug3, "debug3", &[]),
    (SeverityNumber::Debug4, "debug4", &[]),
    (SeverityNumber::Info, "info", &["info1"]),
    (SeverityNumber::Info2, "info2", &[]),
    (SeverityNumber::Info3, "info3", &[]),
    (SeverityNumber::Info4, "info4", &[]),
    (
        SeverityNumber::Warn,
        "warn",
        &["warn1", "warning", "warning1"],
    ),
    (SeverityNumber::Warn2, "warn2", &["warning2"]),
    (SeverityNumber::Warn3, "warn3", &["warning3"]),
    (SeverityNumber::Warn4, "warn4", &["warning4"]),
    (SeverityNumber::Error, "error", &["error1", "err", "err1"]),
    (SeverityNumber::Error2, "error2", &["err2"]),
    (SeverityNumber::Error3, "error3", &["err3"]),
    (SeverityNumber::Error4, "error4", &["err4"]),
    (SeverityNumber::Fatal, "fatal", &["fatal1"]),
    (SeverityNumber::Fatal2, "fatal2", &[]),
    (SeverityNumber::Fatal3, "fatal3", &[]),
    (SeverityNumber::Fatal4, "fatal4", &[]),
];

struct SeverityLookup {
    by_name: HashMap<&'static str, Severity>,
    by_number: HashMap<i32, Severity>,
}

static LOOKUP: Lazy<SeverityLookup> = Lazy::new(|| {
    let mut by_name = HashMap::new();
    let mut by_number = HashMap::with_capacity(SEVERITY_TABLE.len());
    for (number, text, aliases) in SEVERITY_TABLE {
        let severity = Severity { number, text };
        by_number.insert(number as i32, severity);
        by_name.insert(text, severity);
        for alias in aliases {
            by_name.insert(*alias, severity);
        }
    }
    SeverityLookup { by_name, by_number }
});

/// A recognised severity: an OTLP severity number paired with its canonical
/// lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Severity {
    number: SeverityNumber,
    text: &'static str,
}

impl Severity {
    /// The `info` severity, used whenever nothing else applies.
    pub const INFO: Severity = Severity {
        number: SeverityNumber::Info,
        text: DEFAULT_SEVERITY_TEXT,
    };

    /// Parses a severity name, ignoring ASCII case.
    ///
    /// Accepts the six base levels, their numbered sub-levels (`warn2`,
    /// `error3`, `info1`, ...) and the `warning` / `err` aliases with the same
    /// suffixes. Returns `None` for anything else so callers can fall through
    /// to their next source of severity.
    pub fn parse(name: &str) -> Option<Severity> {
        LOOKUP
            .by_name
            .get(name.to_ascii_lowercase().as_str())
            .copied()
    }

    /// Looks up the severity for an OTLP severity number.
    ///
    /// Returns `None` for `0` (unspecified) and anything outside `1..=24`.
    pub fn from_number(number: i32) -> Option<Severity> {
        LOOKUP.by_number.get(&number).copied()
    }

    /// The OTLP severity number.
    pub fn number(&self) -> SeverityNumber {
        self.number
    }

    /// The canonical lowercase name, e.g. `warn2`.
    pub fn text(&self) -> &'static str {
        self.text
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::INFO
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

/// Canonical text for a raw severity number, `info` when the number is not
/// one of the 24 defined levels.
pub fn severity_text_for_number(number: i32) -> &'static str {
    Severity::from_number(number)
        .map(|severity| severity.text())
        .unwrap_or(DEFAULT_SEVERITY_TEXT)
}
