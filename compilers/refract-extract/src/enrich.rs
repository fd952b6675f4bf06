//! Turns segmented token groups into slot sequences.

use refract_protocol::{Frame, Slot, TokenId};
use refract_sentence::{AnnotatedSentence, Document, PropertyError, SpanKind};

use crate::config::ExtractConfig;
use crate::segment::{FrameTokens, Segmentation};

/// Suffixes of the slots derived from a token's syntactic slot.
const COREFERENCE: &str = "-C";
const YIELD: &str = "-Y";
const ENTITY_TYPE: &str = "-T";

/// Coreference labels of representative mentions end with this marker.
const REPRESENTATIVE: char = '*';

pub struct Enricher<'a> {
    document: &'a Document,
    sentence: &'a AnnotatedSentence,
    segmentation: &'a Segmentation,
    config: &'a ExtractConfig,
}

impl<'a> Enricher<'a> {
    pub fn new(
        document: &'a Document,
        sentence: &'a AnnotatedSentence,
        segmentation: &'a Segmentation,
        config: &'a ExtractConfig,
    ) -> Self {
        Self {
            document,
            sentence,
            segmentation,
            config,
        }
    }

    /// Frames for every group of the segmentation, in id order.
    pub fn frames(&self) -> Result<Vec<Frame>, PropertyError> {
        self.segmentation.frames.iter().map(|group| self.enrich(group)).collect()
    }

    pub fn enrich(&self, group: &FrameTokens) -> Result<Frame, PropertyError> {
        let mut frame = Frame::new(group.id);
        for &token in &group.tokens {
            self.token_slots(group, token, &mut frame)?;
        }
        Ok(frame)
    }

    fn token_slots(&self, group: &FrameTokens, token: TokenId, frame: &mut Frame) -> Result<(), PropertyError> {
        let s = self.sentence;
        let (proper, relation) = {
            let pos = s.pos_tag(token)?;
            let syntax = s.syntax(token)?;
            let relation = if group.contains(syntax.governor) {
                syntax.relation.clone()
            } else if pos.is_noun() {
                "NOUN".to_string()
            } else if pos.is_verb() {
                "VERB".to_string()
            } else {
                syntax.relation.clone()
            };
            (pos.is_proper_noun(), relation)
        };
        let lemma = s.lemma(token)?.0.clone();

        // 1. Syntactic slot
        let value = match self.segmentation.references.get(&token) {
            Some(reference) if reference.parent == group.id => format!("Frame {}", reference.child),
            _ => lemma.clone(),
        };
        frame.push(Slot::new(relation.clone(), value, proper));

        // 2. Coreference mention
        if let Some(mention) = self.coreference_mention(token)? {
            if !mention.is_empty() {
                frame.push(Slot::new(format!("{relation}{COREFERENCE}"), mention, proper));
            }
        }

        // 3. Yield
        let yielded = self.yield_text(group, token)?;
        push_yield(frame, &relation, &yielded, proper);

        // 4. Entity type
        if let Some(label) = self.entity_type(token)? {
            frame.push(Slot::new(format!("{relation}{ENTITY_TYPE}"), label, proper));
        }

        // 5. Semantic roles
        let sense = s.predicate(token)?;
        if sense.is_predicate() {
            let predicate = sense.to_uppercase();
            frame.push(Slot::new(predicate.clone(), lemma.clone(), proper));
            push_yield(frame, &predicate, &yielded, proper);
        }
        for (predicate, role) in s.semantic_roles(token)? {
            let sense = s.predicate(predicate)?;
            if sense.is_predicate() {
                let relation = format!("{}_{}", sense.to_uppercase(), role);
                frame.push(Slot::new(relation.clone(), lemma.clone(), proper));
                push_yield(frame, &relation, &yielded, proper);
            }
        }
        Ok(())
    }

    /// Full text of the representative mention of the chain `token` heads a
    /// span of, when the document holds exactly one such mention.
    fn coreference_mention(&self, token: TokenId) -> Result<Option<String>, PropertyError> {
        let mut label = None;
        for span in self.sentence.spans_of_kind(SpanKind::Coreference) {
            if self.sentence.is_span_head(token, span)? {
                label = Some(span.label.clone());
                break;
            }
        }
        let Some(mut label) = label else {
            return Ok(None);
        };
        if !label.ends_with(REPRESENTATIVE) {
            label.push(REPRESENTATIVE);
        }

        let mut mentions = self.document.spans_with_label(SpanKind::Coreference, &label);
        match (mentions.next(), mentions.next()) {
            (Some((sentence, span)), None) => sentence.span_text(span).map(Some),
            _ => Ok(None),
        }
    }

    /// Forms of `token` and its descendants inside the frame, in position
    /// order, without the excluded tags.
    fn yield_text(&self, group: &FrameTokens, token: TokenId) -> Result<String, PropertyError> {
        let mut reached = vec![token];
        let mut stack = vec![token];
        while let Some(current) = stack.pop() {
            for child in self.sentence.children(current)? {
                if group.contains(child) {
                    reached.push(child);
                    stack.push(child);
                }
            }
        }
        reached.sort();

        let mut forms = Vec::with_capacity(reached.len());
        for t in reached {
            if !self.config.excludes_from_yield(&self.sentence.pos_tag(t)?) {
                forms.push(self.sentence.form(t)?.0.clone());
            }
        }
        Ok(forms.join(" "))
    }

    /// Label of the last entity span headed by `token`.
    fn entity_type(&self, token: TokenId) -> Result<Option<String>, PropertyError> {
        let mut label = None;
        for span in self.sentence.spans_of_kind(SpanKind::NamedEntity) {
            if self.sentence.is_span_head(token, span)? {
                label = Some(span.label.clone());
            }
        }
        Ok(label)
    }
}

fn push_yield(frame: &mut Frame, relation: &str, yielded: &str, proper: bool) {
    if !yielded.is_empty() {
        frame.push(Slot::new(format!("{relation}{YIELD}"), yielded, proper));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::segment::segment;
    use refract_protocol::FrameId;
    use refract_sentence::SentenceBuilder;

    fn frames_of(document: &Document, index: usize, height: u32) -> Vec<Frame> {
        let sentence = &document.sentences()[index];
        let config = ExtractConfig::default();
        let seg = segment(sentence, height, SequentialIds::new()).unwrap();
        Enricher::new(document, sentence, &seg, &config).frames().unwrap()
    }

    /// "Barack Obama visited Paris" / "He left".
    fn obama_sentences() -> Vec<AnnotatedSentence> {
        let mut b = SentenceBuilder::new();
        b.token("Barack", "Barack", "NNP", 2, "NAME");
        let obama = b.token("Obama", "Obama", "NNP", 3, "SBJ");
        let visited = b.token("visited", "visit", "VBD", 0, "ROOT");
        let paris = b.token("Paris", "Paris", "NNP", 3, "OBJ");
        b.set_predicate(visited, "visit.01")
            .semantic_role(visited, obama, "A0")
            .semantic_role(visited, paris, "A1")
            .span(SpanKind::NamedEntity, "PER", 1, 2)
            .span(SpanKind::NamedEntity, "LOC", 4, 4)
            .span(SpanKind::Coreference, "5*", 1, 2);
        let first = b.build().unwrap();

        let mut b = SentenceBuilder::new();
        let he = b.token("He", "he", "PRP", 2, "SBJ");
        let left = b.token("left", "leave", "VBD", 0, "ROOT");
        // `left` is not marked as a predicate, so this role is ignored.
        b.semantic_role(left, he, "A0").span(SpanKind::Coreference, "5", 1, 1);
        let second = b.build().unwrap();

        vec![first, second]
    }

    fn obama() -> Document {
        Document::new(obama_sentences())
    }

    fn rendered(frames: &[Frame]) -> Vec<String> {
        frames.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_verb_with_two_nouns() {
        let mut b = SentenceBuilder::new();
        b.token("cats", "cat", "NNS", 2, "SBJ");
        b.token("chase", "chase", "VBP", 0, "ROOT");
        b.token("mice", "mouse", "NNS", 2, "OBJ");
        let doc = Document::new(vec![b.build().unwrap()]);

        let frames = frames_of(&doc, 0, 1);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, FrameId(0));
        assert_eq!(
            frames[0].to_string(),
            "{<SBJ,\"cat\",N>\t<SBJ-Y,\"cats\",N>\t<VERB,\"chase\",N>\t\
             <VERB-Y,\"cats chase mice\",N>\t<OBJ,\"mouse\",N>\t<OBJ-Y,\"mice\",N>}"
        );
    }

    #[test]
    fn test_entities_roles_and_coreference() {
        let doc = obama();
        let first = frames_of(&doc, 0, 2);
        assert_eq!(first.len(), 1);

        let slots: Vec<(&str, &str, bool)> = first[0]
            .slots()
            .iter()
            .map(|s| (s.relation.as_str(), s.value.as_str(), s.is_proper_noun))
            .collect();
        assert_eq!(
            slots,
            vec![
                ("NAME", "Barack", true),
                ("NAME-Y", "Barack", true),
                ("SBJ", "Obama", true),
                ("SBJ-C", "Barack Obama", true),
                ("SBJ-Y", "Barack Obama", true),
                ("SBJ-T", "PER", true),
                ("VISIT.01_A0", "Obama", true),
                ("VISIT.01_A0-Y", "Barack Obama", true),
                ("VERB", "visit", false),
                ("VERB-Y", "Barack Obama visited Paris", false),
                ("VISIT.01", "visit", false),
                ("VISIT.01-Y", "Barack Obama visited Paris", false),
                ("OBJ", "Paris", true),
                ("OBJ-Y", "Paris", true),
                ("OBJ-T", "LOC", true),
                ("VISIT.01_A1", "Paris", true),
                ("VISIT.01_A1-Y", "Paris", true),
            ]
        );

        let second = frames_of(&doc, 1, 2);
        assert_eq!(
            rendered(&second),
            vec!["{<SBJ,\"he\",N>\t<SBJ-C,\"Barack Obama\",N>\t<SBJ-Y,\"He\",N>\t<VERB,\"leave\",N>\t<VERB-Y,\"He left\",N>}"]
        );
    }

    #[test]
    fn test_ambiguous_chain_has_no_mention() {
        let mut b = SentenceBuilder::new();
        b.token("Michelle", "Michelle", "NNP", 0, "ROOT");
        b.span(SpanKind::Coreference, "5*", 1, 1);

        let mut sentences = obama_sentences();
        sentences.push(b.build().unwrap());
        let doc = Document::new(sentences);

        let second = frames_of(&doc, 1, 2);
        assert!(second[0].slots().iter().all(|s| s.relation != "SBJ-C"));
        let first = frames_of(&doc, 0, 2);
        assert!(first[0].slots().iter().all(|s| s.relation != "SBJ-C"));
    }

    #[test]
    fn test_frame_references_and_exclusions() {
        let mut b = SentenceBuilder::new();
        b.token("the", "the", "DT", 2, "NMOD");
        b.token("man", "man", "NN", 3, "SBJ");
        b.token("saw", "see", "VBD", 0, "ROOT");
        b.token("with", "with", "IN", 3, "ADV");
        b.token("a", "a", "DT", 6, "NMOD");
        b.token("telescope", "telescope", "NN", 4, "PMOD");
        let doc = Document::new(vec![b.build().unwrap()]);

        let frames = frames_of(&doc, 0, 1);
        assert_eq!(
            rendered(&frames),
            vec![
                "{<SBJ,\"Frame 1\",N>\t<SBJ-Y,\"man\",N>\t<VERB,\"see\",N>\t<VERB-Y,\"man saw\",N>\t<ADV,\"with\",N>}",
                "{<NMOD,\"the\",N>\t<NOUN,\"man\",N>\t<NOUN-Y,\"man\",N>}",
                "{<NMOD,\"a\",N>\t<NOUN,\"telescope\",N>\t<NOUN-Y,\"telescope\",N>}",
            ]
        );
    }

    #[test]
    fn test_last_entity_span_wins() {
        let mut b = SentenceBuilder::new();
        b.token("Apple", "Apple", "NNP", 0, "ROOT");
        b.span(SpanKind::NamedEntity, "ORG", 1, 1)
            .span(SpanKind::NamedEntity, "PRODUCT", 1, 1);
        let doc = Document::new(vec![b.build().unwrap()]);

        let frames = frames_of(&doc, 0, 2);
        assert_eq!(
            frames[0].to_string(),
            "{<NOUN,\"Apple\",Y>\t<NOUN-Y,\"Apple\",Y>\t<NOUN-T,\"PRODUCT\",Y>}"
        );
    }

    #[test]
    fn test_custom_exclusions() {
        let mut b = SentenceBuilder::new();
        b.token("the", "the", "DT", 2, "NMOD");
        b.token("dog", "dog", "NN", 0, "ROOT");
        let doc = Document::new(vec![b.build().unwrap()]);
        let sentence = &doc.sentences()[0];

        let config = ExtractConfig {
            yield_exclusions: vec![],
            ..ExtractConfig::default()
        };
        let seg = segment(sentence, 2, SequentialIds::new()).unwrap();
        let frames = Enricher::new(&doc, sentence, &seg, &config).frames().unwrap();
        assert_eq!(
            frames[0].to_string(),
            "{<NMOD,\"the\",N>\t<NMOD-Y,\"the\",N>\t<NOUN,\"dog\",N>\t<NOUN-Y,\"the dog\",N>}"
        );
    }
}
