use refract_protocol::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpanKind {
    NamedEntity,
    Coreference,
}

/// A contiguous, inclusive token range carrying a label (an entity type or a
/// coreference chain id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub label: String,
    pub start: TokenId,
    pub end: TokenId,
}

impl Span {
    pub fn new(kind: SpanKind, label: impl Into<String>, start: TokenId, end: TokenId) -> Self {
        Self {
            kind,
            label: label.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.start <= token && token <= self.end
    }

    /// Tokens of the span in ascending position order.
    pub fn tokens(&self) -> impl Iterator<Item = TokenId> {
        (self.start.0..=self.end.0).map(TokenId)
    }
}
