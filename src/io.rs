/*!
Reading and writing corpora. Two formats are supported:

* CoNLL: one token per line, the token in the first field and its tag in the last field, and a
  blank line after each sentence.
* JSON lines: one `{"text": [...], "tags": [...]}` object per sentence.

Every record read receives a fresh identifier from the given `RecordIdAllocator`.
*/
use crate::corpus::{Record, RecordIdAllocator};
use crate::error::NerfoldError;
use serde::{Deserialize, Serialize};
use serde_jsonlines::{json_lines, write_json_lines};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Reads a CoNLL file.
pub fn read_conll<P: AsRef<Path>>(
    path: P,
    separator: char,
    allocator: &mut RecordIdAllocator,
) -> Result<Vec<Record>, NerfoldError> {
    let file = File::open(path.as_ref())?;
    let records = read_conll_from(BufReader::new(file), separator, allocator)?;
    debug!(path = %path.as_ref().display(), records = records.len(), "read conll corpus");
    Ok(records)
}

/// Reads CoNLL lines from any buffered reader. A last sentence that is not followed by a blank
/// line is kept.
pub fn read_conll_from<R: BufRead>(
    reader: R,
    separator: char,
    allocator: &mut RecordIdAllocator,
) -> Result<Vec<Record>, NerfoldError> {
    let mut records = Vec::new();
    let mut tokens = Vec::new();
    let mut tags = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            if !tokens.is_empty() {
                records.push(allocator.record(
                    std::mem::take(&mut tokens),
                    std::mem::take(&mut tags),
                )?);
            }
            continue;
        }
        let mut fields = line.split(separator).filter(|f| !f.is_empty());
        let token = fields.next().ok_or_else(|| NerfoldError::Parse {
            line: i + 1,
            reason: format!("no field separated by {:?}", separator),
        })?;
        let tag = fields.last().unwrap_or(token);
        tokens.push(String::from(token));
        tags.push(String::from(tag));
    }
    if !tokens.is_empty() {
        records.push(allocator.record(tokens, tags)?);
    }
    Ok(records)
}

/// Writes the records in the CoNLL format: `token O O tag` on every line, fields joined by
/// `separator`.
pub fn write_conll<'a, P, I>(records: I, path: P, separator: char) -> Result<(), NerfoldError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Record>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_conll_to(records, &mut writer, separator)?;
    writer.flush()?;
    debug!(path = %path.as_ref().display(), "wrote conll corpus");
    Ok(())
}

pub fn write_conll_to<'a, W, I>(
    records: I,
    writer: &mut W,
    separator: char,
) -> Result<(), NerfoldError>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    for record in records {
        for (token, tag) in record.tokens().iter().zip(record.tags()) {
            writeln!(writer, "{token}{separator}O{separator}O{separator}{tag}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonRecordRef<'a> {
    text: &'a [String],
    tags: &'a [String],
}

#[derive(Deserialize)]
struct JsonRecord {
    text: Vec<String>,
    tags: Vec<String>,
}

/// Writes one JSON object per record and per line.
pub fn write_jsonl<'a, P, I>(records: I, path: P) -> Result<(), NerfoldError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Record>,
{
    let lines = records.into_iter().map(|r| JsonRecordRef {
        text: r.tokens(),
        tags: r.tags(),
    });
    write_json_lines(path.as_ref(), lines)?;
    debug!(path = %path.as_ref().display(), "wrote json lines corpus");
    Ok(())
}

pub fn read_jsonl<P: AsRef<Path>>(
    path: P,
    allocator: &mut RecordIdAllocator,
) -> Result<Vec<Record>, NerfoldError> {
    json_lines::<JsonRecord, _>(path.as_ref())?
        .map(|line| {
            let line = line?;
            allocator.record(line.text, line.tags)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::corpus::RecordId;
    use rstest::rstest;
    use std::io::Cursor;
    use tempfile::tempdir;

    const CORPUS: &str = "Paulo B-PER\nmora O\nno O\nRio B-LOC\n\nNada O\n\n";

    fn read_str(content: &str, separator: char) -> Result<Vec<Record>, NerfoldError> {
        read_conll_from(Cursor::new(content), separator, &mut RecordIdAllocator::new())
    }

    #[test]
    fn test_read_conll() {
        let records = read_str(CORPUS, ' ').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tokens(), &["Paulo", "mora", "no", "Rio"]);
        assert_eq!(records[0].tags(), &["B-PER", "O", "O", "B-LOC"]);
        assert_eq!(records[1].id(), RecordId(1));
    }

    #[rstest]
    #[case("a X X B-PER\nb X X O\n\n", ' ', vec!["B-PER", "O"])]
    #[case("a\tB-PER\r\nb\tO\r\n\r\n", '\t', vec!["B-PER", "O"])]
    #[case("a  B-PER\n\n", ' ', vec!["B-PER"])]
    fn test_tag_is_last_field(
        #[case] content: &str,
        #[case] separator: char,
        #[case] expected: Vec<&str>,
    ) {
        let records = read_str(content, separator).unwrap();
        assert_eq!(records[0].tags(), expected.as_slice());
        assert_eq!(records[0].tokens()[0], "a");
    }

    #[test]
    fn test_trailing_block_is_kept() {
        let records = read_str("a O\n\nb B-X\nc I-X", ' ').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].len(), 2);
    }

    #[test]
    fn test_consecutive_blank_lines() {
        let records = read_str("\n\na O\n\n\n\nb O\n", ' ').unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_line_without_field_is_an_error() {
        let res = read_str("a,O\n,,\n", ',');
        assert!(matches!(res, Err(NerfoldError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_write_conll_format() {
        let records = read_str(CORPUS, ' ').unwrap();
        let mut buffer = Vec::new();
        write_conll_to(&records, &mut buffer, ' ').unwrap();
        let written = String::from_utf8(buffer).unwrap();
        assert!(written.starts_with("Paulo O O B-PER\nmora O O O\n"));
        assert!(written.ends_with("Nada O O O\n\n"));
        let reread = read_str(&written, ' ').unwrap();
        assert_eq!(reread, records);
    }

    #[test]
    fn test_files() {
        let dir = tempdir().unwrap();
        let records = read_str(CORPUS, ' ').unwrap();
        let conll = dir.path().join("train.conll");
        let jsonl = dir.path().join("train.jsonl");
        write_conll(&records, &conll, ' ').unwrap();
        write_jsonl(&records, &jsonl).unwrap();
        let from_conll = read_conll(&conll, ' ', &mut RecordIdAllocator::new()).unwrap();
        let from_jsonl = read_jsonl(&jsonl, &mut RecordIdAllocator::new()).unwrap();
        assert_eq!(from_conll, records);
        assert_eq!(from_jsonl, records);
        let first_line = std::fs::read_to_string(&jsonl).unwrap();
        assert!(first_line.starts_with(
            r#"{"text":["Paulo","mora","no","Rio"],"tags":["B-PER","O","O","B-LOC"]}"#
        ));
    }

    #[test]
    fn test_jsonl_length_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"text\": [\"a\", \"b\"], \"tags\": [\"O\"]}\n").unwrap();
        let res = read_jsonl(&path, &mut RecordIdAllocator::new());
        assert!(matches!(
            res,
            Err(NerfoldError::RecordLengthMismatch { tokens: 2, tags: 1 })
        ));
    }

    #[test]
    fn test_missing_file() {
        let res = read_conll("does/not/exist.conll", ' ', &mut RecordIdAllocator::new());
        assert!(matches!(res, Err(NerfoldError::Io(_))));
    }
}
