/*!
`csvline-core` provides the allocation free building blocks of a line
oriented, quote-aware reader and writer for delimited data.

Nothing in this crate performs I/O. The [`Scanner`] splits a single physical
line into field pieces and reports whether the line ended inside an open
quoted field, in which case the logical record continues onto the next
physical line. The [`Escaper`] is its inverse: it decides whether a field
needs quotes and produces the output segments of an escaped field without
buffering it.

Both are configured with a delimiter and a quoting flag. The quote byte is
always `"`, and a literal quote inside a quoted field is written as `""`.

# Example

```
use csvline_core::Scanner;

let scanner = Scanner::new();
let mut scan = scanner.scan(br##"a,"b,c","say ""hi"""##, false);

let first = scan.next().unwrap();
assert_eq!(first.bytes(), b"a");

let second = scan.next().unwrap();
assert_eq!(second.bytes(), b"b,c");

// The third field contains escaped quotes, so it must be unescaped.
let third = scan.next().unwrap();
assert_eq!(third.escapes(), 2);
let mut buf = [0; 16];
let n = third.unescape(&mut buf);
assert_eq!(&buf[..n], br#"say "hi""#);

assert!(scan.next().is_none());
assert!(!scan.is_open());
```

A quoted field that is not closed by the end of the line is reported as
open:

```
use csvline_core::Scanner;

let scanner = Scanner::new();
let mut scan = scanner.scan(b"1,\"multi", false);
assert_eq!(scan.by_ref().count(), 2);
assert!(scan.is_open());

// The next physical line resumes inside the quotes.
let mut scan = scanner.scan(b"line\",2", true);
let piece = scan.next().unwrap();
assert!(piece.is_continuation());
assert_eq!(piece.bytes(), b"line");
```
*/

#![deny(missing_docs)]
#![no_std]

pub use crate::error::ConfigError;
pub use crate::escape::{Escape, Escaper, EscaperBuilder};
pub use crate::scanner::{
    Event, Events, Piece, QuoteState, Scan, Scanner, ScannerBuilder, Split,
};

mod error;
mod escape;
mod scanner;

/// The quote byte. It is not configurable.
pub const QUOTE: u8 = b'"';

/// The record terminator. It is not configurable.
pub const NEWLINE: u8 = b'\n';
