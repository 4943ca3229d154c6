use std::fmt;
use std::iter::FromIterator;
use std::ops;

use bstr::ByteSlice;

/// An owned row of fields stored as raw bytes.
///
/// A `ByteRow` does not borrow from anything, so it may be kept across
/// reads. It is produced by [`Row::materialize`](crate::Row::materialize),
/// and it can be reused with
/// [`Reader::read_byte_row`](crate::Reader::read_byte_row) to amortize
/// allocation: clearing a row keeps its capacity.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct ByteRow {
    /// All fields in this row, stored contiguously.
    fields: Vec<u8>,
    /// The ending offset of each field in `fields`.
    ends: Vec<usize>,
}

impl ByteRow {
    /// Create a new empty `ByteRow`.
    pub fn new() -> ByteRow {
        ByteRow::default()
    }

    /// Create a new empty `ByteRow` with room for `buffer` bytes of field
    /// data spread over `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> ByteRow {
        ByteRow {
            fields: Vec::with_capacity(buffer),
            ends: Vec::with_capacity(fields),
        }
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&[u8]> {
        let end = *self.ends.get(i)?;
        let start = match i.checked_sub(1) {
            None => 0,
            Some(prev) => self.ends[prev],
        };
        Some(&self.fields[start..end])
    }

    /// Returns true if and only if this row has no fields.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Returns the number of fields in this row.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Clear this row so that it has zero fields.
    ///
    /// The allocations are kept for the next use.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.ends.clear();
    }

    /// Add a new field to the end of this row.
    pub fn push_field(&mut self, field: &[u8]) {
        self.fields.extend_from_slice(field);
        self.ends.push(self.fields.len());
    }

    /// Return all field data in this row as one contiguous slice, without
    /// any separators.
    pub fn as_slice(&self) -> &[u8] {
        &self.fields
    }

    /// Returns an iterator over all fields in this row.
    pub fn iter(&self) -> ByteRowIter {
        ByteRowIter { row: self, start: 0, i: 0 }
    }
}

impl fmt::Debug for ByteRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|field| field.as_bstr()))
            .finish()
    }
}

impl ops::Index<usize> for ByteRow {
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

impl<T: AsRef<[u8]>> PartialEq<Vec<T>> for ByteRow {
    fn eq(&self, other: &Vec<T>) -> bool {
        fields_eq(self.iter(), other)
    }
}

impl<T: AsRef<[u8]>> PartialEq<[T]> for ByteRow {
    fn eq(&self, other: &[T]) -> bool {
        fields_eq(self.iter(), other)
    }
}

pub(crate) fn fields_eq<'a, I, J, T>(fields: I, other: J) -> bool
where
    I: ExactSizeIterator<Item = &'a [u8]>,
    J: IntoIterator<Item = T>,
    J::IntoIter: ExactSizeIterator,
    T: AsRef<[u8]>,
{
    let other = other.into_iter();
    if fields.len() != other.len() {
        return false;
    }
    fields.zip(other).all(|(a, b)| a == b.as_ref())
}

impl<T: AsRef<[u8]>> FromIterator<T> for ByteRow {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> ByteRow {
        let mut row = ByteRow::new();
        row.extend(iter);
        row
    }
}

impl<T: AsRef<[u8]>> Extend<T> for ByteRow {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for field in iter {
            self.push_field(field.as_ref());
        }
    }
}

impl<'a, T: AsRef<[u8]>> From<&'a [T]> for ByteRow {
    fn from(fields: &'a [T]) -> ByteRow {
        fields.iter().collect()
    }
}

impl<T: AsRef<[u8]>> From<Vec<T>> for ByteRow {
    fn from(fields: Vec<T>) -> ByteRow {
        fields.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a ByteRow {
    type IntoIter = ByteRowIter<'a>;
    type Item = &'a [u8];

    fn into_iter(self) -> ByteRowIter<'a> {
        self.iter()
    }
}

/// An iterator over the fields in a byte row.
#[derive(Clone, Debug)]
pub struct ByteRowIter<'a> {
    row: &'a ByteRow,
    start: usize,
    i: usize,
}

impl<'a> Iterator for ByteRowIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let end = *self.row.ends.get(self.i)?;
        let field = &self.row.fields[self.start..end];
        self.start = end;
        self.i += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.row.len() - self.i;
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for ByteRowIter<'a> {}
