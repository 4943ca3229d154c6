use std::io::{self, BufRead};

use csvline_core::NEWLINE;
use memchr::memchr;

/// Where the bytes of the most recently assembled line live.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Line {
    /// The first `len` bytes of the stream's buffer. They are consumed when
    /// the next line is requested.
    Buffered(usize),
    /// The assembler's own accumulation buffer.
    Assembled,
}

impl Default for Line {
    fn default() -> Line {
        Line::Assembled
    }
}

/// Pulls physical lines out of a buffered stream.
///
/// A line that fits in the stream's buffer is returned in place. Only lines
/// that straddle a buffer refill are copied, into a buffer that is reused
/// from one line to the next.
#[derive(Debug, Default)]
pub(crate) struct LineAssembler {
    buf: Vec<u8>,
    /// Bytes of a `Line::Buffered` line (and its terminator) that have not
    /// been consumed from the stream yet.
    pending: usize,
    /// Total bytes consumed, terminators included.
    bytes: u64,
    /// Total physical lines read.
    lines: u64,
}

impl LineAssembler {
    pub(crate) fn new() -> LineAssembler {
        LineAssembler::default()
    }

    /// The number of bytes read so far, including the line most recently
    /// returned.
    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }

    /// The number of physical lines read so far.
    pub(crate) fn lines(&self) -> u64 {
        self.lines
    }

    /// Read the next physical line, without its `\n` terminator.
    ///
    /// Returns `None` when the stream is exhausted. A final line without a
    /// terminator is returned like any other.
    ///
    /// This invalidates the line returned by the previous call.
    pub(crate) fn next_line<R: io::Read>(
        &mut self,
        rdr: &mut io::BufReader<R>,
    ) -> io::Result<Option<Line>> {
        rdr.consume(self.pending);
        self.pending = 0;
        self.buf.clear();
        loop {
            let (found, used) = {
                let chunk = match rdr.fill_buf() {
                    Ok(chunk) => chunk,
                    Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                if chunk.is_empty() {
                    if self.buf.is_empty() {
                        return Ok(None);
                    }
                    self.lines += 1;
                    return Ok(Some(Line::Assembled));
                }
                match memchr(NEWLINE, chunk) {
                    Some(i) if self.buf.is_empty() => {
                        self.pending = i + 1;
                        self.bytes += (i + 1) as u64;
                        self.lines += 1;
                        return Ok(Some(Line::Buffered(i)));
                    }
                    Some(i) => {
                        self.buf.extend_from_slice(&chunk[..i]);
                        (true, i + 1)
                    }
                    None => {
                        self.buf.extend_from_slice(chunk);
                        (false, chunk.len())
                    }
                }
            };
            rdr.consume(used);
            self.bytes += used as u64;
            if found {
                self.lines += 1;
                return Ok(Some(Line::Assembled));
            }
        }
    }

    /// Return the bytes of `line`.
    ///
    /// `line` must be the value most recently returned by `next_line` on
    /// the same stream.
    pub(crate) fn get<'a, R>(
        &'a self,
        rdr: &'a io::BufReader<R>,
        line: Line,
    ) -> &'a [u8] {
        match line {
            Line::Buffered(len) => &rdr.buffer()[..len],
            Line::Assembled => &self.buf,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader, Read};

    use super::{Line, LineAssembler};

    fn lines(data: &[u8], capacity: usize) -> Vec<Vec<u8>> {
        let mut rdr = BufReader::with_capacity(capacity, data);
        let mut asm = LineAssembler::new();
        let mut lines = vec![];
        while let Some(line) = asm.next_line(&mut rdr).unwrap() {
            lines.push(asm.get(&rdr, line).to_vec());
        }
        lines
    }

    fn b(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn empty_input() {
        assert!(lines(b"", 16).is_empty());
    }

    #[test]
    fn single_line_no_terminator() {
        assert_eq!(lines(b"Foo", 16), vec![b("Foo")]);
    }

    #[test]
    fn single_line_terminator() {
        assert_eq!(lines(b"Foo\n", 16), vec![b("Foo")]);
    }

    #[test]
    fn empty_lines_are_lines() {
        assert_eq!(lines(b"\n\na", 16), vec![b(""), b(""), b("a")]);
    }

    #[test]
    fn carriage_return_kept() {
        assert_eq!(lines(b"a\r\nb", 16), vec![b("a\r"), b("b")]);
    }

    #[test]
    fn lines_longer_than_buffer() {
        let long = "0123456789".repeat(10);
        let data = format!("{}\nshort\n{}", long, long);
        assert_eq!(
            lines(data.as_bytes(), 8),
            vec![b(&long), b("short"), b(&long)]
        );
    }

    #[test]
    fn fast_path_is_not_copied() {
        let mut rdr = BufReader::with_capacity(64, &b"abc\ndef\n"[..]);
        let mut asm = LineAssembler::new();
        match asm.next_line(&mut rdr).unwrap() {
            Some(Line::Buffered(3)) => {}
            line => panic!("expected a buffered line, got {:?}", line),
        }
        match asm.next_line(&mut rdr).unwrap() {
            Some(line @ Line::Buffered(_)) => {
                assert_eq!(asm.get(&rdr, line), b"def");
            }
            line => panic!("expected a buffered line, got {:?}", line),
        }
        assert!(asm.next_line(&mut rdr).unwrap().is_none());
    }

    #[test]
    fn counts_bytes_and_lines() {
        let mut rdr = BufReader::with_capacity(4, &b"ab\ncdefg\nh"[..]);
        let mut asm = LineAssembler::new();
        while asm.next_line(&mut rdr).unwrap().is_some() {}
        assert_eq!(asm.lines(), 3);
        assert_eq!(asm.bytes(), 10);
    }

    /// Returns `Interrupted` once before every successful read.
    struct Flaky<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl<'a> Read for Flaky<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "eintr"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn interrupted_is_retried() {
        let flaky = Flaky { data: b"a\nb", interrupt: false };
        let mut rdr = BufReader::with_capacity(16, flaky);
        let mut asm = LineAssembler::new();
        let mut got = vec![];
        while let Some(line) = asm.next_line(&mut rdr).unwrap() {
            got.push(asm.get(&rdr, line).to_vec());
        }
        assert_eq!(got, vec![b("a"), b("b")]);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn other_errors_propagate() {
        let mut rdr = BufReader::new(Broken);
        let err = LineAssembler::new().next_line(&mut rdr).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
