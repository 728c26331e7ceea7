//! Parser Trait
//!
//! Language plugins implement [`ProgramParser`] to turn source text into a
//! [`ProgramModel`]. Implementations must normalize superficial variation
//! (parenthesization, whitespace, comments, sugar such as `elif` or `+=`) so that
//! structurally identical logic yields equal trees.

use crate::error::ModelError;
use crate::model::ProgramModel;

pub trait ProgramParser: Send + Sync {
    /// Parse a complete source file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Syntax`] with the offending location when the text is invalid.
    fn parse(&self, source: &str) -> Result<ProgramModel, ModelError>;

    /// Parse and attach an identity (typically the file name) to the model.
    fn parse_named(&self, name: &str, source: &str) -> Result<ProgramModel, ModelError> {
        Ok(self.parse(source)?.with_name(name))
    }
}
