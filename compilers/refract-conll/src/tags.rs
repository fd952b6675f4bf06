use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{all_consuming, map},
    multi::separated_list1,
    sequence::{delimited, preceded, terminated},
    IResult,
};

/// One bracket tag from an NE or COREF column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanTag<'a> {
    /// `(LABEL)`: a span covering only this token.
    Single(&'a str),
    /// `(LABEL`: a span starting at this token.
    Open(&'a str),
    /// `LABEL)`: a span ending at this token.
    Close(&'a str),
}

fn is_label_char(c: char) -> bool {
    c != '(' && c != ')' && c != '|' && !c.is_whitespace()
}

fn label(input: &str) -> IResult<&str, &str> {
    take_while1(is_label_char)(input)
}

fn tag(input: &str) -> IResult<&str, SpanTag<'_>> {
    alt((
        map(delimited(char('('), label, char(')')), SpanTag::Single),
        map(preceded(char('('), label), SpanTag::Open),
        map(terminated(label, char(')')), SpanTag::Close),
    ))(input)
}

/// Parses a whole span column cell. `_`, `-` and `*` mean "no tag".
///
/// Returns `None` when the cell is malformed.
pub fn parse_span_tags(cell: &str) -> Option<Vec<SpanTag<'_>>> {
    if matches!(cell, "_" | "-" | "*") {
        return Some(Vec::new());
    }
    all_consuming(separated_list1(char('|'), tag))(cell)
        .ok()
        .map(|(_, tags)| tags)
}
