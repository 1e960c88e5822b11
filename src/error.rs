use thiserror::Error;

/// Why a file could not be read as a sensor table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("Time goes backwards at data row {row}")]
    NonMonotonicTime { row: usize },

    #[error("Failed to parse CSV file: {0}")]
    Unparseable(String),

    #[error("Failed to read file: {0}")]
    Io(String),
}

/// Analysis error kinds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid file format: {0}")]
    InvalidFormat(#[from] FormatError),

    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Insufficient data: minimum {required} rows required, found {found}")]
    InsufficientData { found: usize, required: usize },

    #[error(
        "Invalid quaternion data: {invalid} of {total} rows have magnitude outside 1 ± {tolerance}"
    )]
    InvalidQuaternions {
        invalid: usize,
        total: usize,
        tolerance: f64,
    },

    #[error("Streams do not overlap in time (window {start} to {end})")]
    NoOverlap { start: f64, end: f64 },

    #[error("Computation failed: {0}")]
    Computation(String),
}

impl AnalysisError {
    /// Stable short code for the serving layer.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::InvalidFormat(FormatError::UnsupportedExtension(_)) => "E001",
            AnalysisError::InvalidFormat(FormatError::MissingColumns(_))
            | AnalysisError::FileTooLarge { .. } => "E002",
            AnalysisError::InsufficientData { .. } => "E003",
            AnalysisError::InvalidFormat(_) => "E004",
            AnalysisError::InvalidQuaternions { .. } => "E005",
            AnalysisError::NoOverlap { .. } => "E006",
            AnalysisError::Computation(_) => "E007",
        }
    }

    /// True for failures caused by the uploaded data rather than by the math.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, AnalysisError::Computation(_))
    }

    pub(crate) fn computation(msg: impl Into<String>) -> Self {
        AnalysisError::Computation(msg.into())
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::InvalidFormat(FormatError::Unparseable(err.to_string()))
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::InvalidFormat(FormatError::Io(err.to_string()))
    }
}

/// Result type for analysis stages
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err: AnalysisError =
            FormatError::MissingColumns(vec!["Quat_W".into(), "Quat_Z".into()]).into();
        assert_eq!(
            err.to_string(),
            "Invalid file format: Missing required columns: Quat_W, Quat_Z"
        );
        assert_eq!(err.code(), "E002");
    }

    #[test]
    fn test_quaternion_message_uses_tolerance() {
        let err = AnalysisError::InvalidQuaternions {
            invalid: 20,
            total: 200,
            tolerance: 0.05,
        };
        assert_eq!(
            err.to_string(),
            "Invalid quaternion data: 20 of 200 rows have magnitude outside 1 ± 0.05"
        );
        assert_eq!(err.code(), "E005");
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            AnalysisError::InsufficientData {
                found: 50,
                required: 100
            }
            .code(),
            "E003"
        );
        assert_eq!(
            AnalysisError::from(FormatError::UnsupportedExtension("txt".into())).code(),
            "E001"
        );
        assert_eq!(
            AnalysisError::from(FormatError::Unparseable("bad".into())).code(),
            "E004"
        );
        assert!(!AnalysisError::computation("x").is_input_error());
        assert!(AnalysisError::NoOverlap { start: 1.0, end: 0.0 }.is_input_error());
    }
}
