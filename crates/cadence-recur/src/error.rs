use thiserror::Error;

/// A rule or date list could not be turned into a recurrence source.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("Failed to parse RRULE: {0}")]
    RuleParse(String),

    #[error("RRule validation error: {0}")]
    RuleValidation(#[from] rrule::ValidationError),

    #[error("Date list must contain at least one value")]
    EmptyDateList,

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),
}

/// A fault raised while lazily expanding a source.
#[derive(Error, Debug)]
pub enum IterationError {
    #[error("Rule expansion failed: {0}")]
    Rule(String),

    /// Local time falls in a DST gap even after shifting forward.
    #[error("Non-existent time (DST gap): {0}")]
    NonExistentTime(String),

    /// The rule engine stopped searching for a next instance.
    #[error("Rule expansion hit the iteration limit")]
    IterationLimit,

    #[error("Stream produced {current} after {previous}")]
    OutOfOrder { previous: String, current: String },

    #[error("Iteration session already failed")]
    SessionFailed,
}

#[derive(Error, Debug)]
pub enum RecurrenceError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Iteration(#[from] IterationError),

    #[error(transparent)]
    Core(#[from] cadence_core::error::CoreError),
}

pub type ConstructionResult<T> = std::result::Result<T, ConstructionError>;
pub type IterationResult<T> = std::result::Result<T, IterationError>;
pub type RecurrenceResult<T> = std::result::Result<T, RecurrenceError>;
