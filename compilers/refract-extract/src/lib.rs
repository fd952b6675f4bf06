//! Frame extraction: segmentation of dependency trees into bounded-height
//! frames and enrichment of each frame into a slot sequence.

pub mod config;
pub mod enrich;
pub mod ids;
pub mod segment;

use std::ops::AddAssign;

use rayon::prelude::*;
use refract_protocol::Frame;
use refract_sentence::{AnnotatedSentence, Document, PropertyError, SpanKind};
use serde::Serialize;
use tracing::{debug, warn};

pub use config::ExtractConfig;
pub use enrich::Enricher;
pub use ids::{IdSource, NamespacedIds, SequentialIds, SharedIds};
pub use segment::{segment, FrameReference, FrameTokens, Segmentation};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error("frame id source exhausted (namespace {namespace:?})")]
    IdsExhausted { namespace: Option<u32> },
    #[error("{0} documents exceed the id namespaces available")]
    TooManyDocuments(usize),
}

/// Counters accumulated while extracting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub sentences: u64,
    pub skipped_sentences: u64,
    pub frames: u64,
    pub named_entities: u64,
    /// Entity spans whose head token landed in some frame.
    pub named_entities_in_frames: u64,
    pub predicates: u64,
    pub predicates_in_frames: u64,
}

impl AddAssign for ExtractionStats {
    fn add_assign(&mut self, other: Self) {
        self.sentences += other.sentences;
        self.skipped_sentences += other.skipped_sentences;
        self.frames += other.frames;
        self.named_entities += other.named_entities;
        self.named_entities_in_frames += other.named_entities_in_frames;
        self.predicates += other.predicates;
        self.predicates_in_frames += other.predicates_in_frames;
    }
}

/// Frames of one extraction run plus its counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub frames: Vec<Frame>,
    pub stats: ExtractionStats,
}

impl Extraction {
    pub fn absorb(&mut self, other: Extraction) {
        self.frames.extend(other.frames);
        self.stats += other.stats;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameExtractor {
    config: ExtractConfig,
}

impl FrameExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Frames of a single sentence of `document`.
    ///
    /// A property lookup failure aborts the whole sentence; ids already
    /// drawn from `ids` are not returned.
    pub fn extract_sentence<I: IdSource>(
        &self,
        document: &Document,
        sentence: &AnnotatedSentence,
        ids: I,
    ) -> Result<Extraction, ExtractError> {
        let segmentation = segment(sentence, self.config.frame_height, ids)?;
        let frames = Enricher::new(document, sentence, &segmentation, &self.config).frames()?;

        let mut stats = ExtractionStats {
            sentences: 1,
            frames: frames.len() as u64,
            ..ExtractionStats::default()
        };
        for span in sentence.spans_of_kind(SpanKind::NamedEntity) {
            stats.named_entities += 1;
            if let Some(head) = sentence.span_head(span)? {
                if segmentation.covers(head) {
                    stats.named_entities_in_frames += 1;
                }
            }
        }
        for token in sentence.predicate_tokens() {
            stats.predicates += 1;
            if segmentation.covers(token) {
                stats.predicates_in_frames += 1;
            }
        }

        Ok(Extraction { frames, stats })
    }

    /// Frames of every sentence of `document`, in sentence order.
    ///
    /// Sentences with missing or malformed properties are skipped and
    /// counted; only id exhaustion ends the run.
    pub fn extract_document<I: IdSource>(&self, document: &Document, mut ids: I) -> Result<Extraction, ExtractError> {
        let mut out = Extraction::default();
        for (index, sentence) in document.sentences().iter().enumerate() {
            match self.extract_sentence(document, sentence, &mut ids) {
                Ok(extraction) => {
                    debug!(sentence = index, frames = extraction.frames.len(), "extracted sentence");
                    out.absorb(extraction);
                }
                Err(ExtractError::Property(error)) => {
                    warn!(sentence = index, %error, "skipping sentence");
                    out.stats.sentences += 1;
                    out.stats.skipped_sentences += 1;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(out)
    }

    /// Extracts `documents` on the rayon pool. Document `i` draws ids from
    /// namespace `i`, so ids do not depend on scheduling. Frames come back
    /// in document order.
    pub fn extract_parallel(&self, documents: &[Document]) -> Result<Extraction, ExtractError> {
        let parts: Vec<Result<Extraction, ExtractError>> = documents
            .par_iter()
            .enumerate()
            .map(|(index, document)| {
                let namespace = u32::try_from(index).map_err(|_| ExtractError::TooManyDocuments(documents.len()))?;
                self.extract_document(document, NamespacedIds::new(namespace))
            })
            .collect();

        let mut out = Extraction::default();
        for part in parts {
            out.absorb(part?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refract_protocol::FrameId;
    use refract_sentence::SentenceBuilder;

    /// "John Smith bought shares" with `bought` as predicate and an entity
    /// on "John Smith".
    fn bought() -> AnnotatedSentence {
        let mut b = SentenceBuilder::new();
        b.token("John", "John", "NNP", 2, "NAME");
        let smith = b.token("Smith", "Smith", "NNP", 3, "SBJ");
        let verb = b.token("bought", "buy", "VBD", 0, "ROOT");
        let shares = b.token("shares", "share", "NNS", 3, "OBJ");
        b.set_predicate(verb, "buy.01")
            .semantic_role(verb, smith, "A0")
            .semantic_role(verb, shares, "A1")
            .span(SpanKind::NamedEntity, "PER", 1, 2);
        b.build().unwrap()
    }

    /// A sentence whose second token has no part-of-speech tag.
    fn broken() -> AnnotatedSentence {
        let mut b = SentenceBuilder::new();
        b.token("go", "go", "VB", 0, "ROOT");
        let bare = b.raw_token("there");
        b.set_syntax(bare, 1, "ADV");
        b.build().unwrap()
    }

    /// A sentence without a noun or verb under the root.
    fn greeting() -> AnnotatedSentence {
        let mut b = SentenceBuilder::new();
        b.token("Hi", "hi", "UH", 0, "ROOT");
        b.span(SpanKind::NamedEntity, "MISC", 1, 1);
        b.build().unwrap()
    }

    #[test]
    fn test_sentence_counters() {
        let doc = Document::new(vec![bought()]);
        let extractor = FrameExtractor::default();
        let out = extractor
            .extract_sentence(&doc, &doc.sentences()[0], SequentialIds::new())
            .unwrap();

        assert_eq!(out.frames.len(), 1);
        assert_eq!(
            out.stats,
            ExtractionStats {
                sentences: 1,
                skipped_sentences: 0,
                frames: 1,
                named_entities: 1,
                named_entities_in_frames: 1,
                predicates: 1,
                predicates_in_frames: 1,
            }
        );
    }

    #[test]
    fn test_document_skips_broken_sentences() {
        let doc = Document::new(vec![bought(), broken(), greeting(), bought()]);
        let extractor = FrameExtractor::new(ExtractConfig::default().with_height(0));
        let out = extractor.extract_document(&doc, SequentialIds::new()).unwrap();

        assert_eq!(out.stats.sentences, 4);
        assert_eq!(out.stats.skipped_sentences, 1);
        assert_eq!(out.stats.named_entities, 3);
        assert_eq!(out.stats.named_entities_in_frames, 2);
        assert_eq!(out.stats.frames, out.frames.len() as u64);

        // Ids keep increasing across sentences and never repeat.
        let ids: Vec<FrameId> = out.frames.iter().map(|f| f.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_id_exhaustion_ends_the_run() {
        let extractor = FrameExtractor::default();

        // The last id still goes out; the next sentence has none left.
        let single = Document::new(vec![bought()]);
        let out = extractor.extract_document(&single, SequentialIds::starting_at(u64::MAX)).unwrap();
        assert_eq!(out.frames[0].id, FrameId(u64::MAX));

        let doc = Document::new(vec![bought(), bought()]);
        let result = extractor.extract_document(&doc, SequentialIds::starting_at(u64::MAX));
        assert_eq!(result.unwrap_err(), ExtractError::IdsExhausted { namespace: None });
    }

    #[test]
    fn test_parallel_matches_sequential_per_document() {
        let docs: Vec<Document> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    Document::new(vec![bought(), greeting()])
                } else {
                    Document::new(vec![broken(), bought(), bought()])
                }
            })
            .collect();
        let extractor = FrameExtractor::default();
        let parallel = extractor.extract_parallel(&docs).unwrap();

        let mut expected = Extraction::default();
        for (i, doc) in docs.iter().enumerate() {
            expected.absorb(extractor.extract_document(doc, NamespacedIds::new(i as u32)).unwrap());
        }
        assert_eq!(parallel, expected);
        assert_eq!(parallel.stats.skipped_sentences, 3);
        assert_eq!(parallel.frames[0].id, FrameId(0));
        assert_eq!(parallel.frames.last().unwrap().id.0 >> 32, 5);
    }
}
