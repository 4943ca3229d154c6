use memchr::memchr3;

use crate::error::ConfigError;
use crate::{NEWLINE, QUOTE};

const QUOTE_SLICE: &[u8] = &[QUOTE];

/// Builds an escaper with a delimiter and quoting mode.
#[derive(Debug, Default)]
pub struct EscaperBuilder {
    escaper: Escaper,
}

impl EscaperBuilder {
    /// Create a new builder with the default configuration: a `,` delimiter
    /// and quoting enabled.
    pub fn new() -> EscaperBuilder {
        EscaperBuilder::default()
    }

    /// Build an escaper from this configuration.
    ///
    /// This fails if the delimiter is `\n`, or if it is `"` while quoting is
    /// enabled.
    pub fn build(&self) -> Result<Escaper, ConfigError> {
        ConfigError::check(self.escaper.delimiter, self.escaper.quoting)?;
        Ok(self.escaper)
    }

    /// The field delimiter to escape.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut EscaperBuilder {
        self.escaper.delimiter = delimiter;
        self
    }

    /// Enable or disable quoting.
    ///
    /// When disabled, fields are always written verbatim, even when they
    /// contain the delimiter or a newline. This is enabled by default.
    pub fn quoting(&mut self, yes: bool) -> &mut EscaperBuilder {
        self.escaper.quoting = yes;
        self
    }
}

/// Escapes fields for output.
///
/// A field is quoted only when it contains a quote, the delimiter or a
/// newline. Quotes inside a quoted field are doubled.
#[derive(Clone, Copy, Debug)]
pub struct Escaper {
    delimiter: u8,
    quoting: bool,
}

impl Default for Escaper {
    fn default() -> Escaper {
        Escaper { delimiter: b',', quoting: true }
    }
}

impl Escaper {
    /// Create an escaper with the default configuration.
    pub fn new() -> Escaper {
        Escaper::default()
    }

    /// The field delimiter.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Whether fields are quoted when necessary.
    pub fn is_quoting(&self) -> bool {
        self.quoting
    }

    /// Returns true if and only if `field` must be quoted to be read back
    /// unchanged.
    ///
    /// This is always false when quoting is disabled.
    pub fn needs_quotes(&self, field: &[u8]) -> bool {
        self.quoting && self.find_special(field).is_some()
    }

    /// Return the output segments of `field`.
    ///
    /// Writing every segment in order produces the escaped field. The field
    /// is scanned incrementally: each segment ends at the next byte that
    /// needs attention.
    ///
    /// ```
    /// use csvline_core::Escaper;
    ///
    /// let escaper = Escaper::new();
    /// let mut out = vec![];
    /// for segment in escaper.escape(b"say \"hi\"") {
    ///     out.extend_from_slice(segment);
    /// }
    /// assert_eq!(out, b"\"say \"\"hi\"\"\"");
    /// ```
    pub fn escape<'a>(&self, field: &'a [u8]) -> Escape<'a> {
        let next =
            if self.quoting { self.find_special(field) } else { None };
        Escape {
            field,
            escaper: *self,
            next,
            pos: 0,
            state: EscapeState::Start,
        }
    }

    fn find_special(&self, field: &[u8]) -> Option<usize> {
        memchr3(QUOTE, NEWLINE, self.delimiter, field)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EscapeState {
    Start,
    Body,
    DoubleQuote,
    Close,
    Done,
}

/// An iterator over the output segments of one escaped field.
#[derive(Clone, Debug)]
pub struct Escape<'a> {
    field: &'a [u8],
    escaper: Escaper,
    /// Offset of the next special byte, when it is already known.
    next: Option<usize>,
    pos: usize,
    state: EscapeState,
}

impl<'a> Iterator for Escape<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        loop {
            match self.state {
                EscapeState::Start => {
                    if self.next.is_none() {
                        self.state = EscapeState::Done;
                        return Some(self.field);
                    }
                    self.state = EscapeState::Body;
                    return Some(QUOTE_SLICE);
                }
                EscapeState::Body => {
                    let (start, field) = (self.pos, self.field);
                    let next = match self.next.take() {
                        Some(i) => Some(i),
                        None => self
                            .escaper
                            .find_special(&field[start..])
                            .map(|i| start + i),
                    };
                    match next {
                        None => {
                            self.pos = field.len();
                            self.state = EscapeState::Close;
                            if start < field.len() {
                                return Some(&field[start..]);
                            }
                        }
                        Some(i) => {
                            self.pos = i + 1;
                            if field[i] == QUOTE {
                                self.state = EscapeState::DoubleQuote;
                            }
                            return Some(&field[start..i + 1]);
                        }
                    }
                }
                EscapeState::DoubleQuote => {
                    self.state = EscapeState::Body;
                    return Some(QUOTE_SLICE);
                }
                EscapeState::Close => {
                    self.state = EscapeState::Done;
                    return Some(QUOTE_SLICE);
                }
                EscapeState::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::str;

    use arrayvec::{ArrayString, ArrayVec};

    use super::{Escaper, EscaperBuilder};

    fn escape(escaper: &Escaper, field: &str) -> ArrayString<64> {
        let mut out = ArrayString::new();
        for segment in escaper.escape(field.as_bytes()) {
            out.push_str(str::from_utf8(segment).unwrap());
        }
        out
    }

    macro_rules! escapes_to {
        ($name:ident, $field:expr, $expected:expr) => {
            escapes_to!($name, $field, $expected, |builder| builder);
        };
        ($name:ident, $field:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut builder = EscaperBuilder::new();
                $config(&mut builder);
                let escaper = builder.build().unwrap();
                assert_eq!(escape(&escaper, $field).as_str(), $expected);
            }
        };
    }

    escapes_to!(plain, "abc", "abc");
    escapes_to!(empty, "", "");
    escapes_to!(delimiter, "a,b", "\"a,b\"");
    escapes_to!(newline, "a\nb", "\"a\nb\"");
    escapes_to!(quote, "a\"b", "\"a\"\"b\"");
    escapes_to!(leading_quote, "\"a", "\"\"\"a\"");
    escapes_to!(trailing_quote, "a\"", "\"a\"\"\"");
    escapes_to!(only_quote, "\"", "\"\"\"\"");
    escapes_to!(mixed, "x,\"y\"\n", "\"x,\"\"y\"\"\n\"");
    escapes_to!(carriage_return_is_data, "a\rb", "a\rb");
    escapes_to!(
        other_delimiter,
        "a,b;c",
        "\"a,b;c\"",
        |b: &mut EscaperBuilder| {
            b.delimiter(b';');
        }
    );
    escapes_to!(
        comma_ok_with_semicolon,
        "a,b",
        "a,b",
        |b: &mut EscaperBuilder| {
            b.delimiter(b';');
        }
    );
    escapes_to!(
        no_quoting,
        "a,\"b\"\n",
        "a,\"b\"\n",
        |b: &mut EscaperBuilder| {
            b.quoting(false);
        }
    );

    #[test]
    fn segments_split_at_special_bytes() {
        let escaper = Escaper::new();
        let segments: ArrayVec<&[u8], 8> =
            escaper.escape(b"abc,def\"g").collect();
        let expected: [&[u8]; 6] =
            [b"\"", b"abc,", b"def\"", b"\"", b"g", b"\""];
        assert_eq!(&segments[..], &expected[..]);

        let segments: ArrayVec<&[u8], 8> = escaper.escape(b"plain").collect();
        assert_eq!(&segments[..], &[&b"plain"[..]][..]);
    }

    #[test]
    fn needs_quotes() {
        let escaper = Escaper::new();
        assert!(!escaper.needs_quotes(b"abc"));
        assert!(!escaper.needs_quotes(b""));
        assert!(escaper.needs_quotes(b"a,c"));
        assert!(escaper.needs_quotes(b"\""));
        assert!(escaper.needs_quotes(b"\n"));

        let escaper = EscaperBuilder::new().quoting(false).build().unwrap();
        assert!(!escaper.needs_quotes(b"a,c"));
    }
}
