use std::fmt;
use std::ops::Deref;

use refract_protocol::TokenId;

/// Marker value of the PRED column for tokens that are not predicates.
pub const NOT_A_PREDICATE: &str = "_";

macro_rules! text_component {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub String);

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

text_component!(Form, "Surface form of the token as written.");
text_component!(Lemma, "Predicted lemma.");
text_component!(PosTag, "Predicted part-of-speech tag (Penn Treebank style).");
text_component!(PredicateSense, "Predicate sense such as `chase.01`, or `_`.");

/// Every token entity carries its own position so query results can be
/// mapped back to the sentence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position(pub TokenId);

/// Attachment of a token in the dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub governor: TokenId,
    pub relation: String,
}

impl PosTag {
    pub fn is_noun(&self) -> bool {
        self.0.starts_with("NN")
    }

    pub fn is_verb(&self) -> bool {
        self.0.starts_with("VB")
    }

    pub fn is_noun_or_verb(&self) -> bool {
        self.is_noun() || self.is_verb()
    }

    pub fn is_proper_noun(&self) -> bool {
        self.0.eq_ignore_ascii_case("NNP") || self.0.eq_ignore_ascii_case("NNPS")
    }
}

impl PredicateSense {
    pub fn is_predicate(&self) -> bool {
        !self.0.eq_ignore_ascii_case(NOT_A_PREDICATE)
    }
}

/// Token properties that can be looked up (and can be missing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Form,
    Lemma,
    PosTag,
    Syntax,
    Predicate,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Property::Form => "form",
            Property::Lemma => "lemma",
            Property::PosTag => "part-of-speech tag",
            Property::Syntax => "dependency attachment",
            Property::Predicate => "predicate marker",
        };
        f.write_str(name)
    }
}
