use std::fmt;
use std::ops;

use bstr::ByteSlice;

use crate::byte_row::{fields_eq, ByteRow};

/// The location of one field of the current row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Slot {
    /// A slice of the current physical line.
    Line { start: usize, end: usize },
    /// A slice of the reader's scratch buffer, holding unescaped and
    /// materialized field data.
    Scratch { start: usize, end: usize },
}

impl Slot {
    fn get<'r>(&self, line: &'r [u8], scratch: &'r [u8]) -> &'r [u8] {
        match *self {
            Slot::Line { start, end } => &line[start..end],
            Slot::Scratch { start, end } => &scratch[start..end],
        }
    }
}

/// A row of fields borrowed from a [`Reader`](crate::Reader).
///
/// A `Row` is a view into buffers that the reader reuses for every record,
/// so it cannot outlive the next call to any `read_*` method. Most fields
/// point directly at the bytes the reader pulled from its stream; only
/// quoted fields with escaped quotes and fields that spanned a line break
/// are copied.
///
/// Use [`Row::materialize`] to keep a row around:
///
/// ```
/// let mut rdr = csvline::Reader::from_reader("a,b\nc,d".as_bytes());
///
/// let first = rdr.read_row()?.unwrap().materialize();
/// let second = rdr.read_row()?.unwrap();
/// assert_eq!(first, vec!["a", "b"]);
/// assert_eq!(second.get(0), Some(&b"c"[..]));
/// # Ok::<(), csvline::Error>(())
/// ```
///
/// Holding on to a view across reads does not compile:
///
/// ```compile_fail
/// let mut rdr = csvline::Reader::from_reader("a,b\nc,d".as_bytes());
///
/// let first = rdr.read_row()?.unwrap();
/// let second = rdr.read_row()?.unwrap();
/// assert_eq!(first.get(0), Some(&b"a"[..]));
/// # Ok::<(), csvline::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Row<'r> {
    line: &'r [u8],
    scratch: &'r [u8],
    slots: &'r [Slot],
}

impl<'r> Row<'r> {
    pub(crate) fn new(
        line: &'r [u8],
        scratch: &'r [u8],
        slots: &'r [Slot],
    ) -> Row<'r> {
        Row { line, scratch, slots }
    }

    /// Returns the number of fields in this row.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if and only if this row has no fields.
    ///
    /// Rows returned by a reader always have at least one field.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Return the field at index `i`.
    pub fn get(&self, i: usize) -> Option<&'r [u8]> {
        self.slots.get(i).map(|slot| slot.get(self.line, self.scratch))
    }

    /// Returns an iterator over all fields in this row.
    pub fn iter(&self) -> RowIter<'r> {
        RowIter { row: *self, i: 0 }
    }

    /// Copy this row into a new owned `ByteRow`.
    pub fn materialize(&self) -> ByteRow {
        let mut row = ByteRow::with_capacity(self.byte_len(), self.len());
        self.materialize_into(&mut row);
        row
    }

    /// Copy this row into `row`, replacing its contents and reusing its
    /// allocation.
    pub fn materialize_into(&self, row: &mut ByteRow) {
        row.clear();
        row.extend(self.iter());
    }

    fn byte_len(&self) -> usize {
        self.iter().map(|field| field.len()).sum()
    }
}

impl<'r> fmt::Debug for Row<'r> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|field| field.as_bstr()))
            .finish()
    }
}

impl<'r> ops::Index<usize> for Row<'r> {
    type Output = [u8];

    fn index(&self, i: usize) -> &[u8] {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "index out of bounds: the row has {} fields \
                 but the index is {}",
                self.len(),
                i
            ),
        }
    }
}

impl<'r, T: AsRef<[u8]>> PartialEq<Vec<T>> for Row<'r> {
    fn eq(&self, other: &Vec<T>) -> bool {
        fields_eq(self.iter(), other)
    }
}

impl<'r> PartialEq<ByteRow> for Row<'r> {
    fn eq(&self, other: &ByteRow) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<'r> IntoIterator for Row<'r> {
    type IntoIter = RowIter<'r>;
    type Item = &'r [u8];

    fn into_iter(self) -> RowIter<'r> {
        self.iter()
    }
}

impl<'a, 'r> IntoIterator for &'a Row<'r> {
    type IntoIter = RowIter<'r>;
    type Item = &'r [u8];

    fn into_iter(self) -> RowIter<'r> {
        self.iter()
    }
}

/// An iterator over the fields of a borrowed row.
#[derive(Clone, Debug)]
pub struct RowIter<'r> {
    row: Row<'r>,
    i: usize,
}

impl<'r> Iterator for RowIter<'r> {
    type Item = &'r [u8];

    fn next(&mut self) -> Option<&'r [u8]> {
        let field = self.row.get(self.i)?;
        self.i += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.row.len() - self.i;
        (n, Some(n))
    }
}

impl<'r> ExactSizeIterator for RowIter<'r> {}

#[cfg(test)]
mod tests {
    use super::{Row, Slot};

    fn row<'r>(line: &'r [u8], scratch: &'r [u8], slots: &'r [Slot]) -> Row<'r> {
        Row::new(line, scratch, slots)
    }

    #[test]
    fn fields_from_both_buffers() {
        let slots = [
            Slot::Line { start: 0, end: 1 },
            Slot::Scratch { start: 0, end: 3 },
            Slot::Line { start: 2, end: 2 },
        ];
        let row = row(b"a,", b"b\"c", &slots);
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(0), Some(&b"a"[..]));
        assert_eq!(row.get(1), Some(&b"b\"c"[..]));
        assert_eq!(row.get(2), Some(&b""[..]));
        assert_eq!(row.get(3), None);
        assert_eq!(row, vec!["a", "b\"c", ""]);
    }

    #[test]
    fn materialize_copies() {
        let line = b"x,y".to_vec();
        let slots = [
            Slot::Line { start: 0, end: 1 },
            Slot::Line { start: 2, end: 3 },
        ];
        let owned = row(&line, b"", &slots).materialize();
        drop(line);
        assert_eq!(owned, vec!["x", "y"]);
    }

    #[test]
    fn debug_lists_fields() {
        let slots = [Slot::Line { start: 0, end: 3 }];
        let row = row(b"foo", b"", &slots);
        assert_eq!(format!("{:?}", row), r#"["foo"]"#);
    }

    #[test]
    fn debug_escapes_invalid_utf8() {
        let slots = [
            Slot::Line { start: 0, end: 1 },
            Slot::Scratch { start: 0, end: 2 },
        ];
        let row = row(b"a", b"\xFFb", &slots);
        assert_eq!(format!("{:?}", row), r#"["a", "\xFFb"]"#);
    }
}
