use std::collections::HashMap;

use refract_protocol::SentenceId;

use crate::span::{Span, SpanKind};
use crate::AnnotatedSentence;

/// An ordered list of sentences plus a document-wide span index.
///
/// Coreference chains cross sentence boundaries, so span lookup by label is
/// answered here rather than per sentence.
#[derive(Debug, Default)]
pub struct Document {
    sentences: Vec<AnnotatedSentence>,
    by_label: HashMap<(SpanKind, String), Vec<(usize, usize)>>,
}

impl Document {
    pub fn new(sentences: Vec<AnnotatedSentence>) -> Self {
        let mut by_label: HashMap<(SpanKind, String), Vec<(usize, usize)>> = HashMap::new();
        for (s, sentence) in sentences.iter().enumerate() {
            for (i, span) in sentence.spans().iter().enumerate() {
                by_label
                    .entry((span.kind, span.label.clone()))
                    .or_default()
                    .push((s, i));
            }
        }
        Self { sentences, by_label }
    }

    pub fn sentences(&self) -> &[AnnotatedSentence] {
        &self.sentences
    }

    pub fn sentence(&self, id: SentenceId) -> Option<&AnnotatedSentence> {
        self.sentences.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// All spans of `kind` labelled exactly `label`, in document order, with
    /// the sentence each belongs to.
    pub fn spans_with_label<'a>(
        &'a self,
        kind: SpanKind,
        label: &str,
    ) -> impl Iterator<Item = (&'a AnnotatedSentence, &'a Span)> + 'a {
        self.by_label
            .get(&(kind, label.to_string()))
            .into_iter()
            .flatten()
            .map(move |&(s, i)| {
                let sentence = &self.sentences[s];
                (sentence, &sentence.spans()[i])
            })
    }
}
