use core::fmt;

use crate::{NEWLINE, QUOTE};

/// An error that occurs when a scanner or escaper is configured with a
/// delimiter it cannot work with.
///
/// Configuration is checked once, when a builder's `build` method is called,
/// so that a bad delimiter is never discovered in the middle of a stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The delimiter is the record terminator, `\n`.
    NewlineDelimiter,
    /// The delimiter is the quote byte, `"`, while quoting is enabled.
    QuoteDelimiter,
}

impl ConfigError {
    /// Check that `delimiter` can be used with the given quoting mode.
    pub(crate) fn check(delimiter: u8, quoting: bool) -> Result<(), ConfigError> {
        if delimiter == NEWLINE {
            Err(ConfigError::NewlineDelimiter)
        } else if quoting && delimiter == QUOTE {
            Err(ConfigError::QuoteDelimiter)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::NewlineDelimiter => write!(
                f,
                "invalid delimiter: '\\n' is the record terminator"
            ),
            ConfigError::QuoteDelimiter => write!(
                f,
                "invalid delimiter: '\"' is the quote character \
                 and quoting is enabled"
            ),
        }
    }
}
