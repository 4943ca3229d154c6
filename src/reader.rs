use std::cmp;
use std::fs::File;
use std::io;
use std::path::Path;

use csvline_core::{Piece, Scanner, ScannerBuilder, NEWLINE};
use log::{debug, trace};

use crate::byte_row::ByteRow;
use crate::error::{Error, ErrorKind, Result};
use crate::line::{Line, LineAssembler};
use crate::row::{Row, Slot};

/// Builds a reader with a delimiter, quoting mode and buffer size.
///
/// # Example
///
/// ```
/// use csvline::ReaderBuilder;
///
/// let data = "a;\"b;c\"\n";
/// let mut rdr = ReaderBuilder::new().delimiter(b';').from_reader(data.as_bytes())?;
/// let row = rdr.read_row()?.unwrap();
/// assert_eq!(row, vec!["a", "b;c"]);
/// # Ok::<(), csvline::Error>(())
/// ```
#[derive(Debug)]
pub struct ReaderBuilder {
    capacity: usize,
    scanner: ScannerBuilder,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            capacity: 8 * (1 << 10),
            scanner: ScannerBuilder::new(),
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring a reader.
    ///
    /// The defaults are a `,` delimiter with quoting enabled.
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a reader from this configuration that reads from `rdr`.
    ///
    /// The stream is buffered for you automatically.
    ///
    /// This fails when the configuration is invalid: a `\n` delimiter, or
    /// a `"` delimiter while quoting is enabled.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Result<Reader<R>> {
        let scanner = self.scanner.build()?;
        Ok(Reader::new(self.capacity, scanner, rdr))
    }

    /// Build a reader from this configuration that reads the file at
    /// `path`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        let scanner = self.scanner.build()?;
        Ok(Reader::new(self.capacity, scanner, File::open(path)?))
    }

    /// The field delimiter to use when reading.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ReaderBuilder {
        self.scanner.delimiter(delimiter);
        self
    }

    /// Enable or disable quoting.
    ///
    /// When enabled (the default), a field may be wrapped in `"` to contain
    /// the delimiter or line breaks, and `""` inside such a field stands
    /// for one `"`. When disabled, every line is one record and every
    /// delimiter ends a field.
    pub fn quoting(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.scanner.quoting(yes);
        self
    }

    /// Set the capacity (in bytes) of the buffer used in the reader.
    ///
    /// Lines that fit in this buffer are handed out without copying. A
    /// capacity of `0` is treated as `1`.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }
}

/// The position of a record in the input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    record: u64,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// Returns a new position initialized to the start value.
    pub fn new() -> Position {
        Position { byte: 0, line: 1, record: 0 }
    }

    /// The byte offset, starting at `0`, of the first byte of the record.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`, of the first physical line of the
    /// record.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The record index, starting at `0`.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Set the byte offset.
    pub fn set_byte(&mut self, byte: u64) -> &mut Position {
        self.byte = byte;
        self
    }

    /// Set the line number.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        self.line = line;
        self
    }

    /// Set the record index.
    pub fn set_record(&mut self, record: u64) -> &mut Position {
        self.record = record;
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// Waiting to read the first physical line of a record.
    ReadingFirstLine,
    /// A quoted field is open and the record needs more lines.
    ContinuingQuotedField,
    /// The input is exhausted.
    Done,
    /// An error was returned. Nothing more is read.
    Errored,
}

/// A reader of delimited rows.
///
/// The reader pulls physical lines from a buffered stream and splits them
/// into fields. With quoting enabled, a quoted field that contains a line
/// break makes its record span several physical lines.
///
/// Rows are returned as [`Row`] views into buffers owned by the reader.
/// These buffers are reused for every record and never shrink, so reading
/// a stream allocates almost nothing once it has warmed up.
///
/// Only `\n` ends a record. Input with `\r\n` line endings leaves a
/// trailing `\r` in the last field of every record.
///
/// # Example
///
/// ```
/// let data = "\
/// city,pop
/// \"Boston, MA\",4628910
/// ";
/// let mut rdr = csvline::Reader::from_reader(data.as_bytes());
/// let mut count = 0;
/// while let Some(row) = rdr.read_row()? {
///     assert_eq!(row.len(), 2);
///     count += 1;
/// }
/// assert_eq!(count, 2);
/// # Ok::<(), csvline::Error>(())
/// ```
#[derive(Debug)]
pub struct Reader<R> {
    rdr: io::BufReader<R>,
    scanner: Scanner,
    lines: LineAssembler,
    /// Where the last line of the current record lives.
    line: Line,
    /// The fields of the current record.
    slots: Vec<Slot>,
    /// Field data that does not live in the current line.
    scratch: Vec<u8>,
    state: State,
    /// The position of the current record.
    pos: Position,
    records: u64,
}

impl<R: io::Read> Reader<R> {
    fn new(capacity: usize, scanner: Scanner, rdr: R) -> Reader<R> {
        Reader {
            // An empty buffer would make every fill look like end of input.
            rdr: io::BufReader::with_capacity(cmp::max(capacity, 1), rdr),
            scanner,
            lines: LineAssembler::new(),
            line: Line::default(),
            slots: vec![],
            scratch: vec![],
            state: State::ReadingFirstLine,
            pos: Position::new(),
            records: 0,
        }
    }

    /// Create a new reader with a default configuration for the given
    /// stream: a `,` delimiter with quoting enabled.
    ///
    /// To customize the delimiter or quoting, use `ReaderBuilder`.
    pub fn from_reader(rdr: R) -> Reader<R> {
        Reader::new(ReaderBuilder::new().capacity, Scanner::new(), rdr)
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at the end of the input. The returned row
    /// borrows this reader and must be dropped (or materialized) before
    /// reading again.
    ///
    /// If the input ends while a quoted field is open, this returns an
    /// `ErrorKind::UnterminatedQuote` error rather than a partial row.
    /// Once an error or the end of the input has been returned, every
    /// further call returns `Ok(None)`.
    pub fn read_row(&mut self) -> Result<Option<Row<'_>>> {
        if !self.advance()? {
            return Ok(None);
        }
        Ok(Some(self.row()))
    }

    /// Read the next record into `row`, reusing its allocation.
    ///
    /// Returns `false` at the end of the input, in which case `row` is
    /// left empty.
    pub fn read_byte_row(&mut self, row: &mut ByteRow) -> Result<bool> {
        row.clear();
        if !self.advance()? {
            return Ok(false);
        }
        self.row().materialize_into(row);
        Ok(true)
    }

    /// Returns a borrowed iterator over all remaining records as owned
    /// rows.
    pub fn byte_rows(&mut self) -> ByteRowsIter<R> {
        ByteRowsIter { rdr: self }
    }

    /// Returns an owned iterator over all remaining records as owned rows.
    pub fn into_byte_rows(self) -> ByteRowsIntoIter<R> {
        ByteRowsIntoIter { rdr: self }
    }

    /// Returns the position of the most recently read record.
    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Returns true if the end of the input has been reached, or if an
    /// error stopped the reader.
    pub fn is_done(&self) -> bool {
        match self.state {
            State::Done | State::Errored => true,
            State::ReadingFirstLine | State::ContinuingQuotedField => false,
        }
    }

    /// Returns true if this reader interprets quotes.
    pub fn is_quoting(&self) -> bool {
        self.scanner.is_quoting()
    }

    /// Returns the field delimiter of this reader.
    pub fn delimiter(&self) -> u8 {
        self.scanner.delimiter()
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &R {
        self.rdr.get_ref()
    }

    /// Returns a mutable reference to the underlying stream.
    ///
    /// Reading from it directly will confuse this reader.
    pub fn get_mut(&mut self) -> &mut R {
        self.rdr.get_mut()
    }

    /// Unwraps this reader, returning the underlying stream.
    ///
    /// Buffered data that has not been read yet is lost.
    pub fn into_inner(self) -> R {
        self.rdr.into_inner()
    }

    /// Close this reader, dropping the underlying stream.
    pub fn close(self) -> Result<()> {
        drop(self.into_inner());
        Ok(())
    }

    fn row(&self) -> Row<'_> {
        let line = self.lines.get(&self.rdr, self.line);
        Row::new(line, &self.scratch, &self.slots)
    }

    fn advance(&mut self) -> Result<bool> {
        match self.state {
            State::Done | State::Errored => return Ok(false),
            State::ReadingFirstLine | State::ContinuingQuotedField => {}
        }
        match self.read_record() {
            Ok(true) => {
                self.state = State::ReadingFirstLine;
                Ok(true)
            }
            Ok(false) => {
                debug!("end of input after {} records", self.records);
                self.state = State::Done;
                Ok(false)
            }
            Err(err) => {
                self.state = State::Errored;
                Err(err)
            }
        }
    }

    fn read_record(&mut self) -> Result<bool> {
        self.slots.clear();
        self.scratch.clear();
        self.pos = Position {
            byte: self.lines.bytes(),
            line: self.lines.lines() + 1,
            record: self.records,
        };

        let mut line = match self.lines.next_line(&mut self.rdr)? {
            None => return Ok(false),
            Some(line) => line,
        };
        if !self.scanner.is_quoting() {
            let bytes = self.lines.get(&self.rdr, line);
            for piece in self.scanner.split(bytes) {
                push_piece(&mut self.slots, &mut self.scratch, &piece);
            }
            return Ok(self.finish(line));
        }

        let mut resume = false;
        loop {
            let bytes = self.lines.get(&self.rdr, line);
            let mut scan = self.scanner.scan(bytes, resume);
            for piece in scan.by_ref() {
                if piece.is_continuation() {
                    continue_piece(&mut self.slots, &mut self.scratch, &piece);
                } else {
                    push_piece(&mut self.slots, &mut self.scratch, &piece);
                }
            }
            if !scan.is_open() {
                return Ok(self.finish(line));
            }
            // The next line may overwrite this one, so every field that
            // still points into it must be copied first.
            detach(bytes, &mut self.slots, &mut self.scratch);
            self.state = State::ContinuingQuotedField;
            trace!(
                "record {} continues a quoted field past line {}",
                self.pos.record,
                self.lines.lines()
            );
            line = match self.lines.next_line(&mut self.rdr)? {
                Some(line) => line,
                None => {
                    debug!(
                        "input ended inside a quoted field of record {} \
                         (line {})",
                        self.pos.record, self.pos.line
                    );
                    return Err(Error::new(ErrorKind::UnterminatedQuote {
                        pos: self.pos.clone(),
                    }));
                }
            };
            resume = true;
        }
    }

    fn finish(&mut self, line: Line) -> bool {
        self.line = line;
        self.records += 1;
        true
    }
}

impl Reader<File> {
    /// Create a new reader with a default configuration for the file at
    /// `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

/// Record a new field. Pieces with escaped quotes are unescaped into the
/// scratch buffer; all others stay where they are.
fn push_piece(slots: &mut Vec<Slot>, scratch: &mut Vec<u8>, piece: &Piece) {
    if piece.escapes() == 0 {
        slots.push(Slot::Line { start: piece.start(), end: piece.end() });
        return;
    }
    let start = scratch.len();
    unescape_into(scratch, piece);
    slots.push(Slot::Scratch { start, end: scratch.len() });
}

/// Append the first piece of a resumed line to the open field, which
/// `detach` left at the end of the scratch buffer.
fn continue_piece(slots: &mut Vec<Slot>, scratch: &mut Vec<u8>, piece: &Piece) {
    scratch.push(NEWLINE);
    unescape_into(scratch, piece);
    if let Some(Slot::Scratch { end, .. }) = slots.last_mut() {
        *end = scratch.len();
    }
}

/// Copy every field that points into `line` into the scratch buffer. The
/// last field, which is the open one, always ends up at the very end of
/// the scratch buffer so that it can be extended in place.
fn detach(line: &[u8], slots: &mut [Slot], scratch: &mut Vec<u8>) {
    let last = slots.len().saturating_sub(1);
    for (i, slot) in slots.iter_mut().enumerate() {
        let start = scratch.len();
        match *slot {
            Slot::Line { start: s, end: e } => {
                scratch.extend_from_slice(&line[s..e]);
            }
            Slot::Scratch { start: s, end: e }
                if i == last && e != scratch.len() =>
            {
                scratch.extend_from_within(s..e);
            }
            Slot::Scratch { .. } => continue,
        }
        *slot = Slot::Scratch { start, end: scratch.len() };
    }
}

fn unescape_into(scratch: &mut Vec<u8>, piece: &Piece) {
    let start = scratch.len();
    scratch.resize(start + piece.unescaped_len(), 0);
    piece.unescape(&mut scratch[start..]);
}

/// A borrowed iterator over the remaining records of a reader, as owned
/// rows.
///
/// The lifetime parameter `'r` refers to the lifetime of the reader.
pub struct ByteRowsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
}

impl<'r, R: io::Read> ByteRowsIter<'r, R> {
    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }
}

impl<'r, R: io::Read> Iterator for ByteRowsIter<'r, R> {
    type Item = Result<ByteRow>;

    fn next(&mut self) -> Option<Result<ByteRow>> {
        next_byte_row(self.rdr)
    }
}

/// An owned iterator over the remaining records of a reader, as owned
/// rows.
pub struct ByteRowsIntoIter<R> {
    rdr: Reader<R>,
}

impl<R: io::Read> ByteRowsIntoIter<R> {
    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for ByteRowsIntoIter<R> {
    type Item = Result<ByteRow>;

    fn next(&mut self) -> Option<Result<ByteRow>> {
        next_byte_row(&mut self.rdr)
    }
}

fn next_byte_row<R: io::Read>(rdr: &mut Reader<R>) -> Option<Result<ByteRow>> {
    match rdr.read_row() {
        Ok(Some(row)) => Some(Ok(row.materialize())),
        Ok(None) => None,
        Err(err) => Some(Err(err)),
    }
}
