use std::fs;

use csvline::{ByteRow, ErrorKind, Reader, ReaderBuilder, Writer, WriterBuilder};
use tempfile::tempdir;

/// Rows that survive a write and a read unchanged.
fn sample_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["name", "quote", "notes"],
        vec!["plain", "he said \"hi\"", ""],
        vec!["with,comma", "\"", "two\nlines"],
        vec!["", "", ""],
        vec!["trailing\r", "tab\there", "multi\n\nblank\n"],
        vec!["\u{2603}", "a\"b", "end"],
    ]
}

fn write_rows<W: std::io::Write>(wtr: &mut Writer<W>, rows: &[Vec<&str>]) {
    for row in rows {
        wtr.write_record(row).unwrap();
    }
    wtr.flush().unwrap();
}

fn read_rows<R: std::io::Read>(rdr: &mut Reader<R>) -> Vec<ByteRow> {
    rdr.byte_rows().map(Result::unwrap).collect()
}

#[test]
fn round_trip_in_memory() {
    let rows = sample_rows();
    let mut wtr = Writer::from_writer(vec![]);
    write_rows(&mut wtr, &rows);
    let data = wtr.into_inner().unwrap();

    let mut rdr = Reader::from_reader(&data[..]);
    let got = read_rows(&mut rdr);
    assert_eq!(got.len(), rows.len());
    for (got, want) in got.iter().zip(&rows) {
        assert_eq!(got, want);
    }
}

#[test]
fn round_trip_borrowed_rows() {
    let rows = sample_rows();
    let mut wtr = Writer::from_writer(vec![]);
    write_rows(&mut wtr, &rows);
    let data = wtr.into_inner().unwrap();

    let mut rdr = Reader::from_reader(&data[..]);
    let mut copy = Writer::from_writer(vec![]);
    while let Some(row) = rdr.read_row().unwrap() {
        copy.write_row(&row).unwrap();
    }
    assert_eq!(copy.into_inner().unwrap(), data);
}

#[test]
fn round_trip_other_delimiter() {
    let rows = sample_rows();
    let mut wtr = WriterBuilder::new()
        .delimiter(b';')
        .from_writer(vec![])
        .unwrap();
    write_rows(&mut wtr, &rows);
    let data = wtr.into_inner().unwrap();

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .buffer_capacity(7)
        .from_reader(&data[..])
        .unwrap();
    let got = read_rows(&mut rdr);
    assert_eq!(got.len(), rows.len());
    for (got, want) in got.iter().zip(&rows) {
        assert_eq!(got, want);
    }
}

#[test]
fn round_trip_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("round-trip.csv");
    let rows = sample_rows();
    {
        let mut wtr = Writer::from_path(&path).unwrap();
        write_rows(&mut wtr, &rows);
    }

    let mut rdr = Reader::from_path(&path).unwrap();
    let got = read_rows(&mut rdr);
    assert!(rdr.is_done());
    rdr.close().unwrap();

    assert_eq!(got.len(), rows.len());
    for (got, want) in got.iter().zip(&rows) {
        assert_eq!(got, want);
    }
}

#[test]
fn file_with_builders() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("builders.tsv");
    {
        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .from_path(&path)
            .unwrap();
        wtr.write_record(&["a", "\"b\""]).unwrap();
        wtr.write_record(&["c", "d"]).unwrap();
        wtr.into_inner().unwrap();
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), "a\t\"b\"\nc\td\n");

    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .from_path(&path)
        .unwrap();
    let got = read_rows(&mut rdr);
    assert_eq!(got, vec![
        ByteRow::from(vec!["a", "\"b\""]),
        ByteRow::from(vec!["c", "d"]),
    ]);
}

#[test]
fn missing_file() {
    let dir = tempdir().unwrap();
    let err = Reader::from_path(dir.path().join("missing.csv")).unwrap_err();
    assert!(err.is_io_error());
}

#[cfg(unix)]
#[test]
fn round_trip_pipe() {
    use std::os::unix::net::UnixStream;
    use std::thread;

    let rows = sample_rows();
    let (left, right) = UnixStream::pair().unwrap();
    let writer = thread::spawn(move || {
        let rows = sample_rows();
        let mut wtr = WriterBuilder::new()
            .buffer_capacity(16)
            .from_writer(left)
            .unwrap();
        // Many small records so the reader sees partial lines.
        for _ in 0..100 {
            for row in &rows {
                wtr.write_record(row).unwrap();
            }
        }
        // Dropping the stream closes our end of the pipe.
        drop(wtr.into_inner().unwrap());
    });

    let mut rdr = ReaderBuilder::new()
        .buffer_capacity(32)
        .from_reader(right)
        .unwrap();
    let mut count = 0;
    while let Some(row) = rdr.read_row().unwrap() {
        assert_eq!(row, rows[count % rows.len()]);
        count += 1;
    }
    writer.join().unwrap();
    assert_eq!(count, 100 * rows.len());
}

#[test]
fn truncated_input() {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(&["ok"]).unwrap();
    wtr.write_record(&["multi\nline"]).unwrap();
    let mut data = wtr.into_inner().unwrap();
    // Cut off the closing quote and terminator of the second record.
    data.truncate(data.len() - 2);

    let mut rdr = Reader::from_reader(&data[..]);
    assert!(rdr.read_row().unwrap().is_some());
    let err = rdr.read_row().unwrap_err();
    match err.into_kind() {
        ErrorKind::UnterminatedQuote { pos } => {
            assert_eq!(pos.record(), 1);
            assert_eq!(pos.line(), 2);
            assert_eq!(pos.byte(), 3);
        }
        kind => panic!("unexpected error: {:?}", kind),
    }
    assert!(rdr.read_row().unwrap().is_none());
}
