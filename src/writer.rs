use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use csvline_core::{Escaper, EscaperBuilder, NEWLINE};
use log::debug;

use crate::byte_row::ByteRow;
use crate::error::{IntoInnerError, Result};
use crate::row::Row;

/// Builds a writer with a delimiter, quoting mode and buffer size.
///
/// # Example
///
/// ```
/// use csvline::WriterBuilder;
///
/// let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(vec![])?;
/// wtr.write_record(&["a", "b\tc"])?;
///
/// let data = String::from_utf8(wtr.into_inner()?).unwrap();
/// assert_eq!(data, "a\t\"b\tc\"\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct WriterBuilder {
    capacity: usize,
    escaper: EscaperBuilder,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            capacity: 8 * (1 << 10),
            escaper: EscaperBuilder::new(),
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring a writer.
    ///
    /// The defaults are a `,` delimiter with quoting enabled.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a writer from this configuration that writes to `wtr`.
    ///
    /// The stream is buffered for you automatically.
    ///
    /// This fails when the configuration is invalid: a `\n` delimiter, or
    /// a `"` delimiter while quoting is enabled.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Result<Writer<W>> {
        let escaper = self.escaper.build()?;
        Ok(Writer::new(self.capacity, escaper, wtr))
    }

    /// Build a writer from this configuration that writes to the file at
    /// `path`, truncating it if it exists.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let escaper = self.escaper.build()?;
        Ok(Writer::new(self.capacity, escaper, File::create(path)?))
    }

    /// The field delimiter to use when writing.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.escaper.delimiter(delimiter);
        self
    }

    /// Enable or disable quoting.
    ///
    /// When enabled (the default), fields containing a quote, the delimiter
    /// or a newline are wrapped in quotes. When disabled, every field is
    /// written as is, which may produce output that does not read back the
    /// same way.
    pub fn quoting(&mut self, yes: bool) -> &mut WriterBuilder {
        self.escaper.quoting(yes);
        self
    }

    /// Set the capacity (in bytes) of the internal buffer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A writer of delimited rows.
///
/// Every record ends with a single `\n`. A field is quoted only when it has
/// to be, and empty fields are never quoted. This means a record with no
/// fields and a record with one empty field are both written as an empty
/// line, which reads back as one empty field.
///
/// Output is buffered. The buffer is flushed when the writer is dropped,
/// but errors are ignored then; call [`Writer::flush`] or
/// [`Writer::into_inner`] to see them.
///
/// # Example
///
/// ```
/// let mut wtr = csvline::Writer::from_writer(vec![]);
/// wtr.write_record(&["city", "pop"])?;
/// wtr.write_record(&["Boston, MA", "4628910"])?;
///
/// let data = String::from_utf8(wtr.into_inner()?).unwrap();
/// assert_eq!(data, "city,pop\n\"Boston, MA\",4628910\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    wtr: io::BufWriter<W>,
    escaper: Escaper,
    /// Whether the next field starts a record.
    first_field: bool,
    records: u64,
}

impl<W: io::Write> Writer<W> {
    fn new(capacity: usize, escaper: Escaper, wtr: W) -> Writer<W> {
        Writer {
            wtr: io::BufWriter::with_capacity(capacity, wtr),
            escaper,
            first_field: true,
            records: 0,
        }
    }

    /// Create a new writer with a default configuration for the given
    /// stream: a `,` delimiter with quoting enabled.
    ///
    /// To customize the delimiter or quoting, use `WriterBuilder`.
    pub fn from_writer(wtr: W) -> Writer<W> {
        Writer::new(WriterBuilder::new().capacity, Escaper::new(), wtr)
    }

    /// Write a single record.
    ///
    /// Any iterator of byte strings works, including `&[&str]`,
    /// `Vec<String>` and a borrowed [`Row`].
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for field in record {
            self.write_field(field)?;
        }
        self.write_terminator()
    }

    /// Write a borrowed row, as returned by
    /// [`Reader::read_row`](crate::Reader::read_row).
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.write_record(row.iter())
    }

    /// Write an owned row.
    pub fn write_byte_row(&mut self, row: &ByteRow) -> Result<()> {
        self.write_record(row.iter())
    }

    /// Write a single field, preceded by the delimiter unless it is the
    /// first field of the current record.
    ///
    /// Call `write_terminator` to end the record.
    pub fn write_field<T: AsRef<[u8]>>(&mut self, field: T) -> Result<()> {
        if !self.first_field {
            self.wtr.write_all(&[self.escaper.delimiter()])?;
        }
        self.first_field = false;
        for segment in self.escaper.escape(field.as_ref()) {
            self.wtr.write_all(segment)?;
        }
        Ok(())
    }

    /// End the current record.
    pub fn write_terminator(&mut self) -> Result<()> {
        self.wtr.write_all(&[NEWLINE])?;
        self.first_field = true;
        self.records += 1;
        Ok(())
    }

    /// Flush the contents of the internal buffer to the underlying stream.
    pub fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()?;
        debug!("flushed after {} records", self.records);
        Ok(())
    }

    /// Returns true if this writer quotes fields that need it.
    pub fn is_quoting(&self) -> bool {
        self.escaper.is_quoting()
    }

    /// Returns the field delimiter of this writer.
    pub fn delimiter(&self) -> u8 {
        self.escaper.delimiter()
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &W {
        self.wtr.get_ref()
    }

    /// Flush the contents of the internal buffer and return the underlying
    /// stream.
    ///
    /// If the flush fails, the writer is handed back inside the error.
    pub fn into_inner(
        self,
    ) -> std::result::Result<W, IntoInnerError<Writer<W>>> {
        let Writer { wtr, escaper, first_field, records } = self;
        match wtr.into_inner() {
            Ok(wtr) => {
                debug!("writer closed after {} records", records);
                Ok(wtr)
            }
            Err(err) => {
                let (err, wtr) = err.into_parts();
                debug!("flush failed while closing writer: {}", err);
                let wtr = Writer { wtr, escaper, first_field, records };
                Err(IntoInnerError::new(wtr, err))
            }
        }
    }
}

impl Writer<File> {
    /// Create a new writer with a default configuration for the file at
    /// `path`, truncating it if it exists.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}
