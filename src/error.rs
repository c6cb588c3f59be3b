use thiserror::Error;

/// Errors raised while computing a private estimate.
///
/// None of these are recovered locally: a randomized private mechanism that
/// failed part-way has already consumed budget, so retrying would double-spend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("privacy budget exceeded: requested {requested}, remaining {remaining}")]
    BudgetExceeded { requested: f64, remaining: f64 },
    #[error("estimator failure: {0}")]
    EstimatorFailure(String),
}

impl EstimateError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EstimateError::InvalidParameter(message.into())
    }
}

pub type EstimateResult<T> = Result<T, EstimateError>;

/// Error surfaced by the `dplr` binary, carrying the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EstimateError> for AppError {
    fn from(err: EstimateError) -> Self {
        let exit_code = match err {
            EstimateError::DimensionMismatch { .. } => 3,
            EstimateError::InvalidParameter(_) => 2,
            EstimateError::BudgetExceeded { .. } | EstimateError::EstimatorFailure(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
