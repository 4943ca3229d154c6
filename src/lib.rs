/*!
The `csvline` crate provides a fast, line oriented reader and writer for
delimited data such as CSV or TSV.

Records are separated by a single `\n` and fields by a configurable
delimiter byte. With quoting enabled (the default), a field may be wrapped
in `"`, inside which the delimiter and line breaks are literal and `""`
stands for one `"`. A quoted field that is still open at the end of a
physical line continues the record onto the next line.

# Borrowed rows

[`Reader::read_row`] returns a [`Row`]: a view into buffers that the reader
reuses for every record. Most fields point straight into the reader's
input buffer, so a typical row is returned without copying anything. The
borrow checker makes sure that a view is never used after the next read.
Call [`Row::materialize`] (or use [`Reader::read_byte_row`]) to get an
owned [`ByteRow`] that can be kept.

# Example

Read every row from stdin and write it back out with tabs:

```no_run
use std::io;

fn main() -> Result<(), csvline::Error> {
    let mut rdr = csvline::Reader::from_reader(io::stdin());
    let mut wtr = csvline::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(io::stdout())?;
    while let Some(row) = rdr.read_row()? {
        wtr.write_row(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
```

Rows are plain byte strings. There is no header handling and no conversion
of fields into other types; decoding fields is left to the caller:

```
let data = "\
Boston,4628910
\"Concord, NH\",42695
";
let mut rdr = csvline::Reader::from_reader(data.as_bytes());
let mut total: u64 = 0;
while let Some(row) = rdr.read_row()? {
    let pop = std::str::from_utf8(&row[1]).unwrap();
    total += pop.parse::<u64>().unwrap();
}
assert_eq!(total, 4671605);
# Ok::<(), csvline::Error>(())
```

# Logging

The reader and writer emit `trace` and `debug` records through the
[`log`](https://docs.rs/log) facade. No logger is installed by this crate.
*/

#![deny(missing_docs)]

pub use csvline_core::ConfigError;

pub use crate::byte_row::{ByteRow, ByteRowIter};
pub use crate::error::{Error, ErrorKind, IntoInnerError, Result};
pub use crate::reader::{
    ByteRowsIntoIter, ByteRowsIter, Position, Reader, ReaderBuilder,
};
pub use crate::row::{Row, RowIter};
pub use crate::writer::{Writer, WriterBuilder};

mod byte_row;
mod error;
mod line;
mod reader;
mod row;
mod writer;
