//! Document and score file adapters.
//!
//! Documents come in the ranking text format used by the LETOR-style test
//! sets: one document per line, a relevance label, a `qid:` token, then
//! `feature:value` pairs with consecutive 1-based feature ids. Expected
//! scores are one `f64` per line.

use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("line {line}: expected feature id {expected}, found {found}")]
    NonConsecutiveFeature {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: malformed token {token:?}")]
    MalformedToken { line: usize, token: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse one document line: `<label> qid:<q> 1:<v1> 2:<v2> ...`.
///
/// The label and `qid:` token are stripped; feature ids must count up from
/// 1 without gaps so position `i` of the result is feature `i`.
pub fn parse_document_line(line: &str, line_no: usize) -> Result<Vec<f64>, DataError> {
    let mut features = Vec::new();
    for token in line.split_whitespace().skip(2) {
        let Some((id, value)) = token.split_once(':') else {
            return Err(DataError::MalformedToken {
                line: line_no,
                token: token.to_string(),
            });
        };
        let id: usize = id.parse().map_err(|_| DataError::MalformedToken {
            line: line_no,
            token: token.to_string(),
        })?;
        let value: f64 = value.parse().map_err(|_| DataError::MalformedToken {
            line: line_no,
            token: token.to_string(),
        })?;
        if id != features.len() + 1 {
            return Err(DataError::NonConsecutiveFeature {
                line: line_no,
                expected: features.len() + 1,
                found: id,
            });
        }
        features.push(value);
    }
    Ok(features)
}

/// Read documents from a file. If `max > 0`, stops after `max` documents.
pub fn read_documents<P: AsRef<Path>>(path: P, max: usize) -> Result<Vec<Vec<f64>>, DataError> {
    let file = std::fs::File::open(path)?;
    let mut documents = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        if max > 0 && documents.len() >= max {
            break;
        }
        documents.push(parse_document_line(&line?, line_no + 1)?);
    }
    Ok(documents)
}

/// Read one score per line. If `max > 0`, stops after `max` scores.
pub fn read_scores<P: AsRef<Path>>(path: P, max: usize) -> Result<Vec<f64>, DataError> {
    let file = std::fs::File::open(path)?;
    let mut scores = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        if max > 0 && scores.len() >= max {
            break;
        }
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        scores.push(trimmed.parse().map_err(|_| DataError::MalformedToken {
            line: line_no + 1,
            token: trimmed.to_string(),
        })?);
    }
    Ok(scores)
}
