use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

use csvline_core::ConfigError;

use crate::reader::Position;

/// A type alias for `Result<T, csvline::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing delimited rows.
///
/// Reaching the end of the input is not an error: `Reader::read_row`
/// returns `Ok(None)` in that case.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// A crate private constructor for `Error`.
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Return the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self.0 {
            ErrorKind::Io(_) => true,
            _ => false,
        }
    }

    /// Return the position of the record in which this error occurred, if
    /// available.
    pub fn position(&self) -> Option<&Position> {
        match *self.0 {
            ErrorKind::UnterminatedQuote { ref pos } => Some(pos),
            _ => None,
        }
    }
}

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An I/O error that occurred while reading or writing. It is passed
    /// through unchanged from the underlying stream.
    Io(io::Error),
    /// The reader or writer was built with an invalid configuration.
    Config(ConfigError),
    /// The input ended while a quoted field was still open.
    ///
    /// No part of the truncated record is returned.
    UnterminatedQuote {
        /// The position at which the truncated record started.
        pos: Position,
    },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::new(ErrorKind::Io(err))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::new(ErrorKind::Config(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err.into_kind() {
            ErrorKind::Io(err) => err,
            kind => io::Error::new(io::ErrorKind::InvalidData, Error::new(kind)),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            ErrorKind::Config(_) => None,
            ErrorKind::UnterminatedQuote { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::Config(ref err) => {
                write!(f, "configuration error: {}", err)
            }
            ErrorKind::UnterminatedQuote { ref pos } => write!(
                f,
                "parse error: record {} (line {}, byte {}): \
                 input ended inside a quoted field",
                pos.record(),
                pos.line(),
                pos.byte()
            ),
        }
    }
}

/// `IntoInnerError` occurs when consuming a `Writer` fails.
///
/// Consuming the `Writer` causes a flush to happen. If the flush fails, then
/// this error is returned, which contains both the original `Writer` and
/// the error that occurred.
///
/// The type parameter `W` is the unconsumed writer.
pub struct IntoInnerError<W> {
    wtr: W,
    err: io::Error,
}

impl<W> IntoInnerError<W> {
    /// Creates a new `IntoInnerError`.
    pub(crate) fn new(wtr: W, err: io::Error) -> IntoInnerError<W> {
        IntoInnerError { wtr, err }
    }

    /// Returns the error which caused the call to `into_inner` to fail.
    pub fn error(&self) -> &io::Error {
        &self.err
    }

    /// Returns the underlying writer which generated the error.
    ///
    /// The returned value can be used for error recovery, such as
    /// re-inspecting the buffer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W> StdError for IntoInnerError<W> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.err)
    }
}

impl<W> fmt::Display for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl<W> fmt::Debug for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;
    use std::io;

    use csvline_core::ConfigError;

    use super::{Error, ErrorKind};
    use crate::reader::Position;

    #[test]
    fn io_error_round_trip() {
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.is_io_error());
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "boom");

        let err = io::Error::from(err);
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn config_error() {
        let err = Error::from(ConfigError::NewlineDelimiter);
        assert!(!err.is_io_error());
        match *err.kind() {
            ErrorKind::Config(ConfigError::NewlineDelimiter) => {}
            ref kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn unterminated_quote_display() {
        let mut pos = Position::new();
        pos.set_byte(10).set_line(3).set_record(2);
        let err = Error::new(ErrorKind::UnterminatedQuote { pos });
        assert_eq!(err.position().map(|p| p.line()), Some(3));
        assert_eq!(
            err.to_string(),
            "parse error: record 2 (line 3, byte 10): \
             input ended inside a quoted field"
        );

        let err = io::Error::from(err);
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
