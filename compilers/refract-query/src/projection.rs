use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::take_till1,
    character::complete::{char, multispace0, one_of},
    combinator::{all_consuming, map, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use refract_protocol::{Frame, Slot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid projection query `{query}` at byte {offset}")]
    InvalidSyntax { query: String, offset: usize },
}

/// One element of a projection query: a relation, optionally restricted to
/// proper-noun slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPattern {
    pub relation: String,
    pub proper_noun: bool,
}

impl SlotPattern {
    pub fn new(relation: impl Into<String>, proper_noun: bool) -> Self {
        Self {
            relation: relation.into(),
            proper_noun,
        }
    }

    pub fn matches(&self, slot: &Slot) -> bool {
        (!self.proper_noun || slot.is_proper_noun) && eq_ignore_case(&self.relation, &slot.relation)
    }
}

impl fmt::Display for SlotPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relation)?;
        if self.proper_noun {
            f.write_str(":Y")?;
        }
        Ok(())
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

fn relation(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ',' || c == ':' || c.is_whitespace())(input)
}

fn pattern(input: &str) -> IResult<&str, SlotPattern> {
    map(
        tuple((
            delimited(multispace0, relation, multispace0),
            opt(preceded(pair(char(':'), multispace0), terminated(one_of("Yy"), multispace0))),
        )),
        |(relation, proper)| SlotPattern::new(relation, proper.is_some()),
    )(input)
}

/// A compiled `RELATION[:Y](,RELATION[:Y])*` expression.
///
/// Projection walks the frame's slots once and takes, in order, the first
/// slot matching each pattern. All patterns must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionQuery {
    patterns: Vec<SlotPattern>,
}

impl ProjectionQuery {
    pub fn compile(query: &str) -> Result<Self, QueryError> {
        match all_consuming(separated_list1(char(','), pattern))(query) {
            Ok((_, patterns)) => Ok(Self { patterns }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(QueryError::InvalidSyntax {
                query: query.to_string(),
                offset: query.len() - e.input.len(),
            }),
            Err(nom::Err::Incomplete(_)) => Err(QueryError::InvalidSyntax {
                query: query.to_string(),
                offset: query.len(),
            }),
        }
    }

    pub fn from_patterns(patterns: Vec<SlotPattern>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[SlotPattern] {
        &self.patterns
    }

    /// The sub-frame selected by this query, or `None` when some pattern
    /// finds no slot (or there are no patterns).
    pub fn project(&self, frame: &Frame) -> Option<Frame> {
        if self.patterns.is_empty() {
            return None;
        }
        let mut pending = self.patterns.iter().peekable();
        let mut projected = Frame::new(frame.id);
        for slot in frame.slots() {
            let Some(pattern) = pending.peek() else {
                break;
            };
            if pattern.matches(slot) {
                projected.push(slot.clone());
                pending.next();
            }
        }
        pending.peek().is_none().then_some(projected)
    }
}

impl FromStr for ProjectionQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

/// Normalized query text, e.g. `VERB,OBJ:Y`.
impl fmt::Display for ProjectionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pattern) in self.patterns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", pattern)?;
        }
        Ok(())
    }
}

/// Every successful projection of `frames`, in input order.
pub fn project_frames<'a, I>(query: &ProjectionQuery, frames: I) -> Vec<Frame>
where
    I: IntoIterator<Item = &'a Frame>,
{
    frames.into_iter().filter_map(|frame| query.project(frame)).collect()
}
