pub mod components;
pub mod document;
pub mod span;

use std::fmt;

use hecs::{Entity, Ref, World};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Directed;
pub use petgraph::Direction;

use components::{Form, Lemma, PosTag, Position, PredicateSense, Property, Syntax, NOT_A_PREDICATE};
pub use document::Document;
use refract_protocol::TokenId;
pub use span::{Span, SpanKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("token {token} has no {property}")]
    NotFound { token: TokenId, property: Property },
    #[error("token {0} is not part of the sentence")]
    UnknownToken(TokenId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SentenceError {
    #[error("token {token} is attached to missing governor {governor}")]
    UnknownGovernor { token: TokenId, governor: TokenId },
    #[error("semantic role edge refers to missing token {0}")]
    UnknownRoleToken(TokenId),
    #[error("span {start}..={end} does not fit a sentence of {len} tokens")]
    InvalidSpan { start: TokenId, end: TokenId, len: usize },
    #[error("token {0} was not created by this builder")]
    ForeignToken(TokenId),
}

/// Typed edge between two tokens.
///
/// Dependency edges run governor → dependent, semantic-role edges run
/// predicate → argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    Dependency,
    SemanticRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    Dependency,
    SemanticRole,
}

impl EdgeKind {
    pub fn edge_type(&self) -> EdgeType {
        match self {
            EdgeKind::Dependency => EdgeType::Dependency,
            EdgeKind::SemanticRole(_) => EdgeType::SemanticRole,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            EdgeKind::Dependency => None,
            EdgeKind::SemanticRole(label) => Some(label),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    pub from: TokenId,
    pub to: TokenId,
    pub kind: &'a EdgeKind,
}

/// An immutable, annotated sentence.
///
/// Token properties live as components in a `hecs` world (a missing component
/// is a missing property); typed edges live in a `petgraph` graph whose node
/// index equals the token position, with node 0 as the artificial root.
pub struct AnnotatedSentence {
    world: World,
    entities: Vec<Entity>,
    graph: Graph<TokenId, EdgeKind, Directed>,
    spans: Vec<Span>,
}

impl fmt::Debug for AnnotatedSentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedSentence")
            .field("tokens", &self.entities.len())
            .field("edges", &self.graph.edge_count())
            .field("spans", &self.spans.len())
            .finish()
    }
}

impl AnnotatedSentence {
    pub fn builder() -> SentenceBuilder {
        SentenceBuilder::new()
    }

    pub fn root(&self) -> TokenId {
        TokenId::ROOT
    }

    /// Number of real tokens (the root excluded).
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Real token ids in ascending order.
    pub fn token_ids(&self) -> impl Iterator<Item = TokenId> {
        (1..=self.entities.len() as u32).map(TokenId)
    }

    pub fn contains(&self, token: TokenId) -> bool {
        (token.0 as usize) <= self.entities.len()
    }

    fn entity(&self, token: TokenId, property: Property) -> Result<Entity, PropertyError> {
        if token.is_root() {
            return Err(PropertyError::NotFound { token, property });
        }
        self.entities
            .get(token.0 as usize - 1)
            .copied()
            .ok_or(PropertyError::UnknownToken(token))
    }

    fn component<T: hecs::Component>(&self, token: TokenId, property: Property) -> Result<Ref<'_, T>, PropertyError> {
        let entity = self.entity(token, property)?;
        self.world
            .get::<&T>(entity)
            .map_err(|_| PropertyError::NotFound { token, property })
    }

    pub fn form(&self, token: TokenId) -> Result<Ref<'_, Form>, PropertyError> {
        self.component(token, Property::Form)
    }

    pub fn lemma(&self, token: TokenId) -> Result<Ref<'_, Lemma>, PropertyError> {
        self.component(token, Property::Lemma)
    }

    pub fn pos_tag(&self, token: TokenId) -> Result<Ref<'_, PosTag>, PropertyError> {
        self.component(token, Property::PosTag)
    }

    pub fn predicate(&self, token: TokenId) -> Result<Ref<'_, PredicateSense>, PropertyError> {
        self.component(token, Property::Predicate)
    }

    pub fn syntax(&self, token: TokenId) -> Result<Ref<'_, Syntax>, PropertyError> {
        self.component(token, Property::Syntax)
    }

    pub fn governor(&self, token: TokenId) -> Result<TokenId, PropertyError> {
        Ok(self.syntax(token)?.governor)
    }

    pub fn is_noun_or_verb(&self, token: TokenId) -> Result<bool, PropertyError> {
        Ok(self.pos_tag(token)?.is_noun_or_verb())
    }

    fn node(&self, token: TokenId) -> Result<NodeIndex, PropertyError> {
        if self.contains(token) {
            Ok(NodeIndex::new(token.0 as usize))
        } else {
            Err(PropertyError::UnknownToken(token))
        }
    }

    /// Edges of type `ty` leaving (`Outgoing`) or entering (`Incoming`)
    /// `token`, ordered by the position of the opposite endpoint.
    pub fn edges(&self, token: TokenId, ty: EdgeType, direction: Direction) -> Result<Vec<Edge<'_>>, PropertyError> {
        let node = self.node(token)?;
        let mut edges: Vec<Edge<'_>> = self
            .graph
            .edges_directed(node, direction)
            .filter(|e| e.weight().edge_type() == ty)
            .map(|e| Edge {
                from: self.graph[e.source()],
                to: self.graph[e.target()],
                kind: e.weight(),
            })
            .collect();
        match direction {
            Direction::Outgoing => edges.sort_by_key(|e| e.to),
            Direction::Incoming => edges.sort_by_key(|e| e.from),
        }
        Ok(edges)
    }

    /// Every edge of type `ty`, ordered by source then target.
    pub fn edges_of_type(&self, ty: EdgeType) -> Vec<Edge<'_>> {
        let mut edges: Vec<Edge<'_>> = self
            .graph
            .edge_references()
            .filter(|e| e.weight().edge_type() == ty)
            .map(|e| Edge {
                from: self.graph[e.source()],
                to: self.graph[e.target()],
                kind: e.weight(),
            })
            .collect();
        edges.sort_by_key(|e| (e.from, e.to));
        edges
    }

    /// Syntactic dependents of `token` in ascending position order.
    pub fn children(&self, token: TokenId) -> Result<Vec<TokenId>, PropertyError> {
        Ok(self
            .edges(token, EdgeType::Dependency, Direction::Outgoing)?
            .into_iter()
            .map(|e| e.to)
            .collect())
    }

    /// `(predicate, role label)` for every semantic-role edge that has
    /// `argument` as its argument.
    pub fn semantic_roles(&self, argument: TokenId) -> Result<Vec<(TokenId, &str)>, PropertyError> {
        Ok(self
            .edges(argument, EdgeType::SemanticRole, Direction::Incoming)?
            .into_iter()
            .map(|e| (e.from, e.kind.label().unwrap_or_default()))
            .collect())
    }

    /// Tokens whose predicate marker is set, in ascending order.
    pub fn predicate_tokens(&self) -> Vec<TokenId> {
        let mut tokens: Vec<TokenId> = self
            .world
            .query::<(&Position, &PredicateSense)>()
            .iter()
            .filter(|(_, (_, sense))| sense.is_predicate())
            .map(|(_, (position, _))| position.0)
            .collect();
        tokens.sort();
        tokens
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn spans_of_kind(&self, kind: SpanKind) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(move |span| span.kind == kind)
    }

    /// The first token of `span` (scanning from its start) whose governor
    /// lies outside the span. `None` when every governor is inside.
    pub fn span_head(&self, span: &Span) -> Result<Option<TokenId>, PropertyError> {
        for token in span.tokens() {
            if !span.contains(self.governor(token)?) {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }

    pub fn is_span_head(&self, token: TokenId, span: &Span) -> Result<bool, PropertyError> {
        Ok(self.span_head(span)? == Some(token))
    }

    /// Surface forms of the span's tokens joined by single spaces.
    pub fn span_text(&self, span: &Span) -> Result<String, PropertyError> {
        let mut forms = Vec::new();
        for token in span.tokens() {
            forms.push(self.form(token)?.0.clone());
        }
        Ok(forms.join(" "))
    }
}

/// Incremental construction of an [`AnnotatedSentence`].
///
/// Tokens are numbered from 1 in the order they are added.
pub struct SentenceBuilder {
    world: World,
    entities: Vec<Entity>,
    roles: Vec<(TokenId, TokenId, String)>,
    spans: Vec<Span>,
    error: Option<SentenceError>,
}

impl Default for SentenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceBuilder {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            entities: Vec::new(),
            roles: Vec::new(),
            spans: Vec::new(),
            error: None,
        }
    }

    /// Adds a token that only has a surface form.
    pub fn raw_token(&mut self, form: &str) -> TokenId {
        let id = TokenId(self.entities.len() as u32 + 1);
        let entity = self.world.spawn((Position(id), Form(form.to_string())));
        self.entities.push(entity);
        id
    }

    /// Adds a fully annotated, non-predicate token attached to `governor`
    /// (0 for the root).
    pub fn token(&mut self, form: &str, lemma: &str, pos: &str, governor: u32, relation: &str) -> TokenId {
        let id = self.raw_token(form);
        self.set_lemma(id, lemma)
            .set_pos(id, pos)
            .set_syntax(id, governor, relation)
            .set_predicate(id, NOT_A_PREDICATE);
        id
    }

    fn insert<C: hecs::Component>(&mut self, token: TokenId, component: C) -> &mut Self {
        let entity = match token.0.checked_sub(1).and_then(|i| self.entities.get(i as usize)) {
            Some(entity) => *entity,
            None => {
                self.error.get_or_insert(SentenceError::ForeignToken(token));
                return self;
            }
        };
        if self.world.insert_one(entity, component).is_err() {
            self.error.get_or_insert(SentenceError::ForeignToken(token));
        }
        self
    }

    pub fn set_lemma(&mut self, token: TokenId, lemma: &str) -> &mut Self {
        self.insert(token, Lemma(lemma.to_string()))
    }

    pub fn set_pos(&mut self, token: TokenId, pos: &str) -> &mut Self {
        self.insert(token, PosTag(pos.to_string()))
    }

    pub fn set_syntax(&mut self, token: TokenId, governor: u32, relation: &str) -> &mut Self {
        self.insert(
            token,
            Syntax {
                governor: TokenId(governor),
                relation: relation.to_string(),
            },
        )
    }

    pub fn set_predicate(&mut self, token: TokenId, sense: &str) -> &mut Self {
        self.insert(token, PredicateSense(sense.to_string()))
    }

    /// Records that `argument` fills role `label` of `predicate`.
    pub fn semantic_role(&mut self, predicate: TokenId, argument: TokenId, label: &str) -> &mut Self {
        self.roles.push((predicate, argument, label.to_string()));
        self
    }

    pub fn span(&mut self, kind: SpanKind, label: &str, start: u32, end: u32) -> &mut Self {
        self.spans.push(Span::new(kind, label, TokenId(start), TokenId(end)));
        self
    }

    pub fn build(self) -> Result<AnnotatedSentence, SentenceError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let len = self.entities.len();
        let mut graph = Graph::with_capacity(len + 1, len);
        for position in 0..=len as u32 {
            graph.add_node(TokenId(position));
        }

        for (i, entity) in self.entities.iter().enumerate() {
            let token = TokenId(i as u32 + 1);
            if let Ok(syntax) = self.world.get::<&Syntax>(*entity) {
                if syntax.governor.0 as usize > len {
                    return Err(SentenceError::UnknownGovernor {
                        token,
                        governor: syntax.governor,
                    });
                }
                graph.add_edge(
                    NodeIndex::new(syntax.governor.0 as usize),
                    NodeIndex::new(token.0 as usize),
                    EdgeKind::Dependency,
                );
            }
        }

        for (predicate, argument, label) in self.roles {
            for token in [predicate, argument] {
                if token.is_root() || token.0 as usize > len {
                    return Err(SentenceError::UnknownRoleToken(token));
                }
            }
            graph.add_edge(
                NodeIndex::new(predicate.0 as usize),
                NodeIndex::new(argument.0 as usize),
                EdgeKind::SemanticRole(label),
            );
        }

        for span in &self.spans {
            if span.start.is_root() || span.start > span.end || span.end.0 as usize > len {
                return Err(SentenceError::InvalidSpan {
                    start: span.start,
                    end: span.end,
                    len,
                });
            }
        }

        Ok(AnnotatedSentence {
            world: self.world,
            entities: self.entities,
            graph,
            spans: self.spans,
        })
    }
}
