//! # Corpus Records
//!
//! A corpus is a newline-delimited JSON file; one [`RawInstance`] per line.
//!
//! Parsing is fail-fast: a malformed line aborts the read with a
//! [`ChaincastError::Corpus`] error rather than being skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CcResult, ChaincastError};

/// One raw training example, as parsed from a corpus line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInstance {
    /// The textual span describing the current event.
    pub e1_text: String,

    /// The current event identifier.
    pub e1: String,

    /// The next event identifier; the prediction target.
    pub e2: String,

    /// Prior event identifiers appearing in the surrounding context,
    /// in document order.
    pub e1prev_intext: Vec<String>,
}

/// Read all records from a JSONL corpus file.
///
/// ## Arguments
/// * `path` - the corpus path.
///
/// ## Returns
/// The parsed records, in file order.
pub fn read_instances<P: AsRef<Path>>(path: P) -> CcResult<Vec<RawInstance>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| {
        ChaincastError::Corpus(format!("cannot open corpus {}: {err}", path.display()))
    })?;

    read_instance_stream(BufReader::new(file))
}

/// Read all records from a JSONL [`BufRead`] stream.
pub fn read_instance_stream<R: BufRead>(mut reader: R) -> CcResult<Vec<RawInstance>> {
    let mut records = Vec::new();
    loop {
        match jsonl::read::<_, RawInstance>(&mut reader) {
            Ok(record) => records.push(record),
            Err(jsonl::ReadError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(records)
}

/// Visit each record in a JSONL corpus file without collecting.
///
/// Used by the vocabulary builder to count frequencies in one pass.
///
/// ## Arguments
/// * `path` - the corpus path.
/// * `visit` - the per-record callback.
pub fn for_each_instance<P, F>(
    path: P,
    mut visit: F,
) -> CcResult<()>
where
    P: AsRef<Path>,
    F: FnMut(&RawInstance),
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| {
        ChaincastError::Corpus(format!("cannot open corpus {}: {err}", path.display()))
    })?;

    let mut reader = BufReader::new(file);
    loop {
        match jsonl::read::<_, RawInstance>(&mut reader) {
            Ok(record) => visit(&record),
            Err(jsonl::ReadError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Tokenize a text field: lower-case, then split on whitespace.
pub fn tokenize_text(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_line() -> &'static str {
        concat!(
            r#"{"e1_text": "John Walked the dog", "e1": "walk->dog", "#,
            r#""e2": "feed->dog", "e1prev_intext": ["wake->john", "rise->sun"]}"#,
            "\n",
        )
    }

    #[test]
    fn test_read_instance_stream() {
        let records = read_instance_stream(Cursor::new(sample_line())).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].e1, "walk->dog");
        assert_eq!(records[0].e2, "feed->dog");
        assert_eq!(records[0].e1prev_intext, vec!["wake->john", "rise->sun"]);
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let data = format!("{}{}", sample_line(), "{not json\n");
        let result = read_instance_stream(Cursor::new(data));

        assert!(result.is_err());
    }

    #[test]
    fn test_tokenize_text() {
        assert_eq!(
            tokenize_text("John  Walked the dog"),
            vec!["john", "walked", "the", "dog"]
        );
        assert!(tokenize_text("").is_empty());
    }
}
