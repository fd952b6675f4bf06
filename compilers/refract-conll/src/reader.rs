use std::collections::HashMap;

use refract_sentence::components::NOT_A_PREDICATE;
use refract_sentence::{AnnotatedSentence, Document, SentenceBuilder, SentenceError, SpanKind};
use tracing::debug;

use crate::tags::{parse_span_tags, SpanTag};

const ID: usize = 0;
const FORM: usize = 1;
const PLEMMA: usize = 3;
const PPOS: usize = 5;
const PHEAD: usize = 9;
const PDEPREL: usize = 11;
const PRED: usize = 13;
/// Columns before the APRED block.
const FIXED_COLUMNS: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConllError {
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount { line: usize, expected: usize, found: usize },
    #[error("line {line}: token id `{found}` out of sequence, expected {expected}")]
    TokenOrder { line: usize, expected: u32, found: String },
    #[error("line {line}: head `{value}` is not a token id")]
    InvalidHead { line: usize, value: String },
    #[error("line {line}: malformed span tag `{value}`")]
    SpanTag { line: usize, value: String },
    #[error("line {line}: span `{label}` closed without being opened")]
    UnopenedSpan { line: usize, label: String },
    #[error("line {line}: span `{label}` is never closed")]
    UnclosedSpan { line: usize, label: String },
    #[error("sentence starting at line {line}: {source}")]
    Sentence {
        line: usize,
        #[source]
        source: SentenceError,
    },
}

/// Reads every sentence of `input` into one document.
pub fn read_document(input: &str) -> Result<Document, ConllError> {
    let mut sentences = Vec::new();
    let mut block: Vec<(usize, &str)> = Vec::new();

    for (i, line) in input.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = line.trim_end_matches('\r');
        if trimmed.starts_with('#') {
            continue;
        }
        if trimmed.trim().is_empty() {
            if !block.is_empty() {
                sentences.push(parse_sentence(&block)?);
                block.clear();
            }
            continue;
        }
        block.push((line_no, trimmed));
    }
    if !block.is_empty() {
        sentences.push(parse_sentence(&block)?);
    }

    debug!(sentences = sentences.len(), "read CoNLL document");
    Ok(Document::new(sentences))
}

/// Tracks open spans of one kind while walking the rows of a sentence.
struct SpanTracker {
    kind: SpanKind,
    open: HashMap<String, Vec<(u32, usize)>>,
}

impl SpanTracker {
    fn new(kind: SpanKind) -> Self {
        Self {
            kind,
            open: HashMap::new(),
        }
    }

    fn feed(&mut self, builder: &mut SentenceBuilder, cell: &str, token: u32, line: usize) -> Result<(), ConllError> {
        let tags = parse_span_tags(cell).ok_or_else(|| ConllError::SpanTag {
            line,
            value: cell.to_string(),
        })?;
        for tag in tags {
            match tag {
                SpanTag::Single(label) => {
                    builder.span(self.kind, label, token, token);
                }
                SpanTag::Open(label) => {
                    self.open.entry(label.to_string()).or_default().push((token, line));
                }
                SpanTag::Close(label) => {
                    let start = self.open.get_mut(label).and_then(Vec::pop).ok_or_else(|| ConllError::UnopenedSpan {
                        line,
                        label: label.to_string(),
                    })?;
                    builder.span(self.kind, label, start.0, token);
                }
            }
        }
        Ok(())
    }

    /// Reports the earliest span still open, if any.
    fn finish(self) -> Result<(), ConllError> {
        let earliest = self
            .open
            .into_iter()
            .flat_map(|(label, starts)| starts.into_iter().map(move |(_, line)| (line, label.clone())))
            .min();
        match earliest {
            Some((line, label)) => Err(ConllError::UnclosedSpan { line, label }),
            None => Ok(()),
        }
    }
}

fn parse_sentence(rows: &[(usize, &str)]) -> Result<AnnotatedSentence, ConllError> {
    let first_line = rows.first().map(|(line, _)| *line).unwrap_or_default();
    let table: Vec<(usize, Vec<&str>)> = rows
        .iter()
        .map(|(line, text)| (*line, text.split('\t').collect()))
        .collect();

    // Each predicate contributes one APRED column, then NE and COREF follow.
    let predicates: Vec<u32> = table
        .iter()
        .enumerate()
        .filter(|(_, (_, cols))| cols.get(PRED).is_some_and(|p| *p != NOT_A_PREDICATE))
        .map(|(i, _)| i as u32 + 1)
        .collect();
    let expected = FIXED_COLUMNS + predicates.len() + 2;

    let mut builder = SentenceBuilder::new();
    let mut entities = SpanTracker::new(SpanKind::NamedEntity);
    let mut coreference = SpanTracker::new(SpanKind::Coreference);

    for (i, (line, cols)) in table.iter().enumerate() {
        let line = *line;
        if cols.len() != expected {
            return Err(ConllError::ColumnCount {
                line,
                expected,
                found: cols.len(),
            });
        }
        let position = i as u32 + 1;
        if cols[ID].parse::<u32>().ok() != Some(position) {
            return Err(ConllError::TokenOrder {
                line,
                expected: position,
                found: cols[ID].to_string(),
            });
        }
        let head = cols[PHEAD].parse::<u32>().map_err(|_| ConllError::InvalidHead {
            line,
            value: cols[PHEAD].to_string(),
        })?;

        let token = builder.token(cols[FORM], cols[PLEMMA], cols[PPOS], head, cols[PDEPREL]);
        builder.set_predicate(token, cols[PRED]);

        for (j, predicate) in predicates.iter().enumerate() {
            let role = cols[FIXED_COLUMNS + j];
            if role != "_" {
                builder.semantic_role(refract_protocol::TokenId(*predicate), token, role);
            }
        }

        let ne = cols[expected - 2];
        let coref = cols[expected - 1];
        entities.feed(&mut builder, ne, position, line)?;
        coreference.feed(&mut builder, coref, position, line)?;
    }

    entities.finish()?;
    coreference.finish()?;

    builder.build().map_err(|source| ConllError::Sentence {
        line: first_line,
        source,
    })
}
