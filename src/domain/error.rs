//! Domain error types.

/// Top-level error type for stockfit.
#[derive(Debug, thiserror::Error)]
pub enum StockfitError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("unknown strategy: {key}")]
    UnknownStrategy { key: String },

    #[error("result store error: {reason}")]
    ResultStore { reason: String },

    #[error("site generation error: {reason}")]
    Site { reason: String },

    #[error("publish error: {reason}")]
    Publish { reason: String },

    #[error("batch exceeded maximum runtime of {minutes} minutes")]
    Timeout { minutes: u64 },

    #[error("another run holds the lock at {path}")]
    AlreadyRunning { path: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockfitError> for std::process::ExitCode {
    fn from(err: &StockfitError) -> Self {
        let code: u8 = match err {
            StockfitError::Io(_) | StockfitError::Json(_) => 1,
            StockfitError::ConfigParse { .. }
            | StockfitError::ConfigMissing { .. }
            | StockfitError::ConfigInvalid { .. } => 2,
            StockfitError::Data { .. } | StockfitError::ResultStore { .. } => 3,
            StockfitError::UnknownStrategy { .. } => 4,
            StockfitError::NoData { .. } | StockfitError::InsufficientData { .. } => 5,
            StockfitError::Site { .. } | StockfitError::Publish { .. } => 6,
            StockfitError::Timeout { .. } | StockfitError::AlreadyRunning { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}
