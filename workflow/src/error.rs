use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("cannot add more steps: capacity of {capacity} reached")]
    CapacityExceeded { capacity: usize },

    #[error("flow capacity must be at least 1")]
    ZeroCapacity,

    #[error("flow capacity {capacity} exceeds the limit of {max}")]
    CapacityTooLarge { capacity: usize, max: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("division by zero")]
    DivideByZero,

    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(char),

    #[error("cannot parse `{0}` as a number")]
    Parse(String),

    #[error("could not open file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("input closed before the step finished reading")]
    InputClosed,
}

impl FlowError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            FlowError::CapacityExceeded { capacity: 3 }.to_string(),
            "cannot add more steps: capacity of 3 reached"
        );
        assert_eq!(
            FlowError::format(7, "Unknown step type `FooStep`").to_string(),
            "line 7: Unknown step type `FooStep`"
        );
        assert_eq!(
            FlowError::UnsupportedOperator('x').to_string(),
            "unsupported operator `x`"
        );
    }
}
