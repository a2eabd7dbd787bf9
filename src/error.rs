use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("no region column found in uploaded CSV (looked for {0})")]
    MissingRegionColumn(String),
    #[error("no month column found in uploaded CSV (looked for {0})")]
    MissingMonthColumn(String),
    #[error("no enrolment column found in uploaded CSV (looked for {0})")]
    MissingEnrolmentColumn(String),
    #[error("row {row}: month value {value:?} is not a recognisable date")]
    UnparseableMonth { row: usize, value: String },
    #[error("region {0:?} has no trend data")]
    UnknownRegion(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
