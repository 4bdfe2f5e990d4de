//! Context notes on fallible canopy calls

use super::types::{Error, Result};

/// Attach a note to the error side of a result, keeping the original error as its source
pub trait ResultExt<T> {
    fn context(self, note: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the note only on failure
    fn with_context<F>(self, note: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, note: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.into().with_note(note))
    }

    fn with_context<F>(self, note: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| err.into().with_note(note()))
    }
}
