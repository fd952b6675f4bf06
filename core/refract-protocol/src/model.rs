use rkyv::{Archive, Deserialize, Serialize};
use crate::ids::FrameId;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// One `(relation, value, proper-noun)` triple inside a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct Slot {
    pub relation: String,
    pub value: String,
    pub is_proper_noun: bool,
}

impl Slot {
    pub fn new(relation: impl Into<String>, value: impl Into<String>, is_proper_noun: bool) -> Self {
        Self {
            relation: relation.into(),
            value: value.into(),
            is_proper_noun,
        }
    }
}

/// Canonical form: `<REL,"VALUE",Y>` (or `,N` when not a proper noun).
impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.is_proper_noun { 'Y' } else { 'N' };
        write!(f, "<{},\"{}\",{}>", self.relation, self.value, flag)
    }
}

/// A bounded-height subtree of a dependency tree rendered as an ordered slot
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct Frame {
    pub id: FrameId,
    slots: Vec<Slot>,
}

impl Frame {
    pub fn new(id: FrameId) -> Self {
        Self { id, slots: Vec::new() }
    }

    pub fn with_slots(id: FrameId, slots: Vec<Slot>) -> Self {
        Self { id, slots }
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_slots(self) -> Vec<Slot> {
        self.slots
    }

    /// Slot values joined by single spaces. Used as a grouping key.
    pub fn slot_values(&self) -> String {
        let mut out = String::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&slot.value);
        }
        out
    }
}

/// Canonical form: `{<slot>\t<slot>...}`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{}", slot)?;
        }
        f.write_str("}")
    }
}

/// A versioned set of frames, archived as a single zero-copy blob.
#[derive(Debug, Clone, PartialEq, Eq, Default, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct FrameBatch {
    pub version: u32,
    pub frames: Vec<Frame>,
}

impl FrameBatch {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            frames,
        }
    }
}
