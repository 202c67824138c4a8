//! Context helpers for attaching location information to failures.

use super::{ParityError, Result};

/// Attach a lazily built context message to any error result.
pub trait ResultExt<T> {
    /// Wrap the error in [`ParityError::WithContext`].
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is `Err`.
    fn with_context<F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| ParityError::WithContext {
            context: context(),
            source: Box::new(source),
        })
    }
}

/// Turn a missing value into an invalid-operation error.
pub trait OptionExt<T> {
    /// # Errors
    ///
    /// Returns [`ParityError::InvalidOperation`] when `self` is `None`.
    fn ok_or_invalid<F>(self, reason: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid<F>(self, reason: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| ParityError::invalid_operation(reason()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_with_context_wraps_message() {
        let res: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.with_context(|| "reading fixture".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "reading fixture: gone");
    }

    #[test]
    fn test_ok_or_invalid() {
        let value: Option<u8> = None;
        let err = value.ok_or_invalid(|| "no name".to_string()).unwrap_err();
        assert!(matches!(err, ParityError::InvalidOperation { .. }));
        assert_eq!(Some(3).ok_or_invalid(String::new).unwrap(), 3);
    }
}
