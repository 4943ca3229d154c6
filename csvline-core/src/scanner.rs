use core::mem;

use memchr::{memchr, memchr2};

use crate::error::ConfigError;
use crate::QUOTE;

/// Builds a scanner with a delimiter and quoting mode.
///
/// Once a `Scanner` is built, its configuration cannot be changed.
#[derive(Debug, Default)]
pub struct ScannerBuilder {
    scanner: Scanner,
}

impl ScannerBuilder {
    /// Create a new builder with the default configuration: a `,` delimiter
    /// and quoting enabled.
    pub fn new() -> ScannerBuilder {
        ScannerBuilder::default()
    }

    /// Build a scanner from this configuration.
    ///
    /// This fails if the delimiter is `\n`, or if it is `"` while quoting is
    /// enabled.
    pub fn build(&self) -> Result<Scanner, ConfigError> {
        ConfigError::check(self.scanner.delimiter, self.scanner.quoting)?;
        Ok(self.scanner)
    }

    /// The field delimiter to use when scanning.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ScannerBuilder {
        self.scanner.delimiter = delimiter;
        self
    }

    /// Enable or disable quoting.
    ///
    /// When disabled, a line is split on every occurrence of the delimiter
    /// and quotes are ordinary data. This is enabled by default.
    pub fn quoting(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.scanner.quoting = yes;
        self
    }
}

/// Splits one physical line into field pieces.
///
/// A scanner holds no state between lines. When a line ends inside a quoted
/// field, the [`Scan`] for that line says so with [`Scan::is_open`], and the
/// caller resumes by scanning the next line with `resume` set to `true`.
#[derive(Clone, Copy, Debug)]
pub struct Scanner {
    delimiter: u8,
    quoting: bool,
}

impl Default for Scanner {
    fn default() -> Scanner {
        Scanner { delimiter: b',', quoting: true }
    }
}

impl Scanner {
    /// Create a scanner with the default configuration.
    pub fn new() -> Scanner {
        Scanner::default()
    }

    /// The field delimiter.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Whether quotes are interpreted.
    pub fn is_quoting(&self) -> bool {
        self.quoting
    }

    /// Return the structural events of `line`.
    ///
    /// When `resume` is true, scanning starts inside a quoted field that
    /// was left open by the previous line. `resume` is ignored when quoting
    /// is disabled.
    pub fn events<'a>(&self, line: &'a [u8], resume: bool) -> Events<'a> {
        let state = if resume && self.quoting {
            QuoteState::Inside
        } else {
            QuoteState::Outside
        };
        Events {
            line,
            pos: 0,
            delimiter: self.delimiter,
            quoting: self.quoting,
            state,
            done: false,
        }
    }

    /// Return the field pieces of `line`.
    ///
    /// When `resume` is true, the first piece continues the open field of
    /// the previous line (see [`Piece::is_continuation`]).
    pub fn scan<'a>(&self, line: &'a [u8], resume: bool) -> Scan<'a> {
        let events = self.events(line, resume);
        Scan {
            line,
            continues: events.state == QuoteState::Inside,
            events,
            start: 0,
            close: None,
            escapes: 0,
            open: false,
        }
    }

    /// Split `line` on every delimiter, ignoring quotes.
    ///
    /// This is what `scan` reduces to when quoting is disabled, without
    /// running the quote state machine.
    pub fn split<'a>(&self, line: &'a [u8]) -> Split<'a> {
        Split { line, start: 0, delimiter: self.delimiter, done: false }
    }
}

/// The two states of the quoting automaton.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteState {
    /// Not inside a quoted field. Delimiters end fields.
    Outside,
    /// Inside a quoted field. Delimiters and newlines are data.
    Inside,
}

/// A structural event found while scanning a line.
///
/// Positions are byte offsets into the line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// A quote at the start of a field opened a quoted field.
    QuoteOpen(usize),
    /// Two consecutive quotes inside a quoted field. The position is that of
    /// the first one.
    EscapedQuote(usize),
    /// A quote that closed a quoted field.
    QuoteClose(usize),
    /// A delimiter outside of quotes ended a field.
    FieldEnd(usize),
    /// The end of the line. `open` is true when the line ended inside a
    /// quoted field.
    LineEnd {
        /// Whether a quoted field is still open.
        open: bool,
    },
}

/// An iterator over the structural events of one line.
///
/// The last event is always `Event::LineEnd`.
#[derive(Clone, Debug)]
pub struct Events<'a> {
    line: &'a [u8],
    pos: usize,
    delimiter: u8,
    quoting: bool,
    state: QuoteState,
    done: bool,
}

impl<'a> Events<'a> {
    /// The current state of the quoting automaton.
    pub fn state(&self) -> QuoteState {
        self.state
    }

    fn at_field_start(&self, i: usize) -> bool {
        i == 0 || self.line[i - 1] == self.delimiter
    }

    fn end(&mut self) -> Option<Event> {
        self.pos = self.line.len();
        self.done = true;
        Some(Event::LineEnd { open: self.state == QuoteState::Inside })
    }
}

impl<'a> Iterator for Events<'a> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.done {
            return None;
        }
        loop {
            let rest = &self.line[self.pos..];
            match self.state {
                QuoteState::Outside => {
                    let found = if self.quoting {
                        memchr2(self.delimiter, QUOTE, rest)
                    } else {
                        memchr(self.delimiter, rest)
                    };
                    let i = match found {
                        None => return self.end(),
                        Some(i) => self.pos + i,
                    };
                    self.pos = i + 1;
                    if self.line[i] == self.delimiter {
                        return Some(Event::FieldEnd(i));
                    }
                    if self.at_field_start(i) {
                        self.state = QuoteState::Inside;
                        return Some(Event::QuoteOpen(i));
                    }
                    // A quote in the middle of an unquoted field is data.
                }
                QuoteState::Inside => {
                    let i = match memchr(QUOTE, rest) {
                        None => return self.end(),
                        Some(i) => self.pos + i,
                    };
                    if self.line.get(i + 1) == Some(&QUOTE) {
                        self.pos = i + 2;
                        return Some(Event::EscapedQuote(i));
                    }
                    self.pos = i + 1;
                    self.state = QuoteState::Outside;
                    return Some(Event::QuoteClose(i));
                }
            }
        }
    }
}

/// The part of one field that lies on one physical line.
///
/// The bytes of a piece are still escaped: every literal quote appears
/// doubled. When [`Piece::escapes`] is zero, the bytes are the field value
/// and can be used without copying.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Piece<'a> {
    bytes: &'a [u8],
    start: usize,
    escapes: usize,
    continues: bool,
    open: bool,
}

impl<'a> Piece<'a> {
    /// The raw bytes of this piece, excluding any surrounding quotes.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The offset of the first byte of this piece in its line.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The offset one past the last byte of this piece in its line.
    pub fn end(&self) -> usize {
        self.start + self.bytes.len()
    }

    /// The number of escaped quote pairs in this piece.
    pub fn escapes(&self) -> usize {
        self.escapes
    }

    /// The length of this piece once its escaped quotes are collapsed.
    pub fn unescaped_len(&self) -> usize {
        self.bytes.len() - self.escapes
    }

    /// Whether this piece continues the field left open by the previous
    /// line, rather than starting a new field.
    pub fn is_continuation(&self) -> bool {
        self.continues
    }

    /// Whether the line ended before this piece's quoted field was closed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Copy this piece into `out`, collapsing every `""` into `"`, and
    /// return the number of bytes written.
    ///
    /// # Panics
    ///
    /// When `out` is shorter than `unescaped_len()`.
    pub fn unescape(&self, out: &mut [u8]) -> usize {
        if self.escapes == 0 {
            // Unquoted fields may contain lone quotes, which are data.
            out[..self.bytes.len()].copy_from_slice(self.bytes);
            return self.bytes.len();
        }
        let (mut src, mut n) = (self.bytes, 0);
        while let Some(i) = memchr(QUOTE, src) {
            // Keep the first quote of the pair and drop the second.
            out[n..n + i + 1].copy_from_slice(&src[..i + 1]);
            n += i + 1;
            src = src.get(i + 2..).unwrap_or(&[]);
        }
        out[n..n + src.len()].copy_from_slice(src);
        n + src.len()
    }
}

/// An iterator over the field pieces of one line.
///
/// Every line yields at least one piece: an empty line is a single empty
/// field.
#[derive(Clone, Debug)]
pub struct Scan<'a> {
    line: &'a [u8],
    events: Events<'a>,
    start: usize,
    close: Option<usize>,
    escapes: usize,
    continues: bool,
    open: bool,
}

impl<'a> Scan<'a> {
    /// Whether the line ended inside an open quoted field.
    ///
    /// This is only meaningful once the iterator is exhausted.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn piece(&mut self, end: usize, open: bool) -> Piece<'a> {
        // Bytes between a closing quote and the delimiter are dropped.
        let end = self.close.take().unwrap_or(end);
        Piece {
            bytes: &self.line[self.start..end],
            start: self.start,
            escapes: mem::replace(&mut self.escapes, 0),
            continues: mem::replace(&mut self.continues, false),
            open,
        }
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Piece<'a>> {
        loop {
            match self.events.next()? {
                Event::QuoteOpen(i) => self.start = i + 1,
                Event::EscapedQuote(_) => self.escapes += 1,
                Event::QuoteClose(i) => self.close = Some(i),
                Event::FieldEnd(i) => {
                    let piece = self.piece(i, false);
                    self.start = i + 1;
                    return Some(piece);
                }
                Event::LineEnd { open } => {
                    self.open = open;
                    return Some(self.piece(self.line.len(), open));
                }
            }
        }
    }
}

/// An iterator over the delimiter separated pieces of one line, with no
/// quote handling.
#[derive(Clone, Debug)]
pub struct Split<'a> {
    line: &'a [u8],
    start: usize,
    delimiter: u8,
    done: bool,
}

impl<'a> Iterator for Split<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Piece<'a>> {
        if self.done {
            return None;
        }
        let start = self.start;
        let end = match memchr(self.delimiter, &self.line[start..]) {
            Some(i) => start + i,
            None => {
                self.done = true;
                self.line.len()
            }
        };
        self.start = end + 1;
        Some(Piece {
            bytes: &self.line[start..end],
            start,
            escapes: 0,
            continues: false,
            open: false,
        })
    }
}
