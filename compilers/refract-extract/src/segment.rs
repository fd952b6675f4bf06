//! Partitioning of a dependency tree into frames of bounded height.

use std::collections::HashMap;

use refract_protocol::{FrameId, TokenId};
use refract_sentence::AnnotatedSentence;

use crate::ids::IdSource;
use crate::ExtractError;

/// Link recorded on a token that closes one frame and roots another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReference {
    pub parent: FrameId,
    pub child: FrameId,
}

/// Tokens of one frame, ascending by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTokens {
    pub id: FrameId,
    pub tokens: Vec<TokenId>,
}

impl FrameTokens {
    pub fn contains(&self, token: TokenId) -> bool {
        self.tokens.binary_search(&token).is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    /// Ordered by frame id.
    pub frames: Vec<FrameTokens>,
    pub references: HashMap<TokenId, FrameReference>,
}

impl Segmentation {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Tokens that belong to at least one frame.
    pub fn covers(&self, token: TokenId) -> bool {
        self.frames.iter().any(|frame| frame.contains(token))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// Add the token to the current frame; `remaining` levels may still be
    /// collected below it.
    Collecting(u32),
    /// Below the cutoff, looking for the next noun or verb to root a frame.
    Searching,
}

struct Walk<'a, I> {
    sentence: &'a AnnotatedSentence,
    height: u32,
    ids: I,
    stack: Vec<(TokenId, Visit, FrameId)>,
    frames: Vec<FrameTokens>,
    slots: HashMap<FrameId, usize>,
    roots: Vec<TokenId>,
    references: HashMap<TokenId, FrameReference>,
}

/// Splits `sentence` into frames no deeper than `height`.
///
/// Only sentences whose root has exactly one dependent, a noun or a verb,
/// produce frames. Each governor has one incoming dependency, so the walk
/// from the root visits every reachable token once and terminates.
pub fn segment<I: IdSource>(sentence: &AnnotatedSentence, height: u32, ids: I) -> Result<Segmentation, ExtractError> {
    let top = sentence.children(sentence.root())?;
    let first = match top.as_slice() {
        [only] if sentence.is_noun_or_verb(*only)? => *only,
        _ => return Ok(Segmentation::default()),
    };

    let mut walk = Walk {
        sentence,
        height,
        ids,
        stack: Vec::new(),
        frames: Vec::new(),
        slots: HashMap::new(),
        roots: Vec::new(),
        references: HashMap::new(),
    };
    let frame = walk.open_frame(first)?;
    walk.stack.push((first, Visit::Collecting(height), frame));
    walk.run()?;

    let mut frames = walk.frames;
    for frame in &mut frames {
        frame.tokens.sort();
    }
    frames.sort_by_key(|frame| frame.id);

    Ok(Segmentation {
        frames,
        references: walk.references,
    })
}

impl<I: IdSource> Walk<'_, I> {
    fn open_frame(&mut self, root: TokenId) -> Result<FrameId, ExtractError> {
        let id = self.ids.next_id()?;
        self.slots.insert(id, self.frames.len());
        self.frames.push(FrameTokens { id, tokens: Vec::new() });
        self.roots.push(root);
        Ok(id)
    }

    fn is_root_of(&self, frame: FrameId, token: TokenId) -> bool {
        self.slots.get(&frame).and_then(|&slot| self.roots.get(slot)) == Some(&token)
    }

    fn add(&mut self, frame: FrameId, token: TokenId) {
        if let Some(&slot) = self.slots.get(&frame) {
            self.frames[slot].tokens.push(token);
        }
    }

    /// Children are pushed in reverse so they pop in position order.
    fn push_children(&mut self, children: &[TokenId], visit: Visit, frame: FrameId) {
        for &child in children.iter().rev() {
            self.stack.push((child, visit, frame));
        }
    }

    fn run(&mut self) -> Result<(), ExtractError> {
        while let Some((token, visit, frame)) = self.stack.pop() {
            match visit {
                Visit::Collecting(remaining) => {
                    self.add(frame, token);
                    let children = self.sentence.children(token)?;
                    if remaining > 0 {
                        self.push_children(&children, Visit::Collecting(remaining - 1), frame);
                    } else if self.is_root_of(frame, token) {
                        // Height 0: the frame root is its own cutoff and must
                        // not be re-rooted.
                        self.push_children(&children, Visit::Searching, frame);
                    } else if !children.is_empty() {
                        self.branch(token, &children, frame)?;
                    }
                }
                Visit::Searching => {
                    let children = self.sentence.children(token)?;
                    self.branch(token, &children, frame)?;
                }
            }
        }
        Ok(())
    }

    /// Roots a new frame at `token` if it is a noun or verb, otherwise keeps
    /// searching among its children.
    fn branch(&mut self, token: TokenId, children: &[TokenId], frame: FrameId) -> Result<(), ExtractError> {
        if self.sentence.is_noun_or_verb(token)? {
            let child = self.open_frame(token)?;
            self.references.insert(token, FrameReference { parent: frame, child });
            self.stack.push((token, Visit::Collecting(self.height), child));
        } else {
            self.push_children(children, Visit::Searching, frame);
        }
        Ok(())
    }
}
