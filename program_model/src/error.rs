//! Errors raised while building a [`crate::ProgramModel`].

use crate::node::Location;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The source text is not valid for the language. Fatal for the whole request.
    #[error("syntax error at {location}: {message}")]
    Syntax { location: Location, message: String },
    /// The source is valid but uses a construct the model does not represent.
    #[error("unsupported construct at {location}: {message}")]
    Unsupported { location: Location, message: String },
}

impl ModelError {
    pub fn syntax(location: Location, message: impl Into<String>) -> Self {
        ModelError::Syntax {
            location,
            message: message.into(),
        }
    }

    pub fn unsupported(location: Location, message: impl Into<String>) -> Self {
        ModelError::Unsupported {
            location,
            message: message.into(),
        }
    }

    pub fn location(&self) -> Location {
        match self {
            ModelError::Syntax { location, .. } | ModelError::Unsupported { location, .. } => {
                *location
            }
        }
    }
}
