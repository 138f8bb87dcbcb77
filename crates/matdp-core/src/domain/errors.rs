use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MatDpResult<T> = Result<T, MatDpError>;
pub type LoadResult<T> = MatDpResult<T>;
pub type ComputeResult<T> = MatDpResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidation,
    IoSystem,
    Computation,
    Internal,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidation => 2,
            Self::IoSystem => 3,
            Self::Computation => 4,
            Self::Internal => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidation => "InputValidationError",
            Self::IoSystem => "IoSystemError",
            Self::Computation => "ComputationError",
            Self::Internal => "InternalError",
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatDpError {
    category: ErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl MatDpError {
    pub fn new(
        category: ErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    /// Structural problems in the input tree: yearly keys outside the base
    /// table, indicator sets that differ along a branch, misplaced targets.
    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InputValidation, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::IoSystem, placeholder, message)
    }

    /// Run-wide consistency failures only detectable once every leaf is computed.
    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Computation, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> ErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for MatDpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category, self.placeholder, self.message
        )
    }
}

impl Error for MatDpError {}
