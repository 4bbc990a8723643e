//! Lexer/parser for the boolean query language (spec.md §4.7):
//!
//! ```text
//! expr    := term (op term)*
//! op      := "AND" | "OR" | ε   (ε = implicit AND)
//! term    := "NOT" term
//!          | FIELD ":" atom
//!          | atom
//! atom    := WORD | QUOTE | PHRASE | "(" expr ")"
//! ```
//!
//! There is no separate tokenization pass: each grammar rule is a `nom`
//! combinator over a [`Span`], in the style of `filter-parser`'s
//! `parse_expression`/`parse_condition` family, with `nom_locate` tracking
//! the byte/line/column the parser reached so error messages can point at
//! it. Operator keywords (`AND`, `OR`, `NOT`) are matched case-sensitively
//! uppercase; field prefixes (`title:`, `text:`, `url:`, `anchor:`,
//! `desc:`) are matched case-sensitively lowercase, per spec.md.

use std::cell::Cell;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::{eof, map, opt};
use nom::multi::many0;
use nom::sequence::{pair, preceded, terminated};
use nom::{Err as NomErr, Finish, IResult as NomIResult};
use nom_locate::LocatedSpan;

use crate::error::QueryParseError;

pub type Span<'a> = LocatedSpan<&'a str>;
type IResult<'a, T> = NomIResult<Span<'a>, T, ParseErr<'a>>;

const MAX_QUERY_DEPTH: usize = 64;

thread_local! {
    static PAREN_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Which field a query term (or a whole sub-tree, via `FIELD:(...)`)
/// applies to. `Text`/`Anchor` have no dedicated posting-list prefix in
/// `mithril-index` (spec.md §9: anchor text isn't part of this crawler's
/// document model) and are resolved against the undecorated (`All`)
/// postings the same way an unqualified term is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    All,
    Title,
    Url,
    Desc,
    Text,
    Anchor,
}

/// A parsed query tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Term { field: Field, text: String },
    /// Single-quoted phrase: fuzzy span match (spec.md §4.6 `PhraseISR`).
    Phrase { field: Field, terms: Vec<String> },
    /// Double-quoted phrase: strict consecutive match (`QuoteISR`).
    Quote { field: Field, terms: Vec<String> },
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
}

#[derive(Debug, Clone)]
struct ParseErr<'a> {
    span: Span<'a>,
    message: String,
}

impl<'a> nom::error::ParseError<Span<'a>> for ParseErr<'a> {
    fn from_error_kind(input: Span<'a>, kind: nom::error::ErrorKind) -> Self {
        ParseErr { span: input, message: format!("unexpected input ({kind:?})") }
    }

    fn append(_input: Span<'a>, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

/// Runs `parser`; if it fails with a plain (backtrackable) error, replaces
/// the error with a `Failure` carrying `message`, which aborts the
/// enclosing `alt`/`opt` instead of silently falling through to the next
/// alternative. Used at every point the grammar commits to a production
/// (e.g. once `(` has been seen, `)` is mandatory).
fn expect<'a, O>(
    mut parser: impl FnMut(Span<'a>) -> IResult<'a, O>,
    message: &'static str,
) -> impl FnMut(Span<'a>) -> IResult<'a, O> {
    move |input: Span<'a>| {
        parser(input).map_err(|e| match e {
            NomErr::Error(err) | NomErr::Failure(err) => NomErr::Failure(ParseErr { span: err.span, message: message.to_string() }),
            NomErr::Incomplete(needed) => NomErr::Incomplete(needed),
        })
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != ':' && c != '\'' && c != '"'
}

fn parse_word_atom(input: Span) -> IResult<QueryNode> {
    map(take_while1(is_word_char), |s: Span| QueryNode::Term { field: Field::All, text: s.fragment().to_string() })(input)
}

fn parse_quote(input: Span) -> IResult<QueryNode> {
    let (input, _) = char('"')(input)?;
    let (input, content) = expect(take_while(|c: char| c != '"'), "expected closing '\"'")(input)?;
    let (input, _) = expect(char('"'), "expected closing '\"'")(input)?;
    let terms = content.fragment().split_whitespace().map(|s| s.to_string()).collect();
    Ok((input, QueryNode::Quote { field: Field::All, terms }))
}

fn parse_phrase(input: Span) -> IResult<QueryNode> {
    let (input, _) = char('\'')(input)?;
    let (input, content) = expect(take_while(|c: char| c != '\''), "expected closing '\\''")(input)?;
    let (input, _) = expect(char('\''), "expected closing '\\''")(input)?;
    let terms = content.fragment().split_whitespace().map(|s| s.to_string()).collect();
    Ok((input, QueryNode::Phrase { field: Field::All, terms }))
}

fn parse_paren_expr(input: Span) -> IResult<QueryNode> {
    let depth = PAREN_DEPTH.with(|d| {
        let v = d.get() + 1;
        d.set(v);
        v
    });
    let result = (|| -> IResult<QueryNode> {
        if depth > MAX_QUERY_DEPTH {
            return Err(NomErr::Failure(ParseErr { span: input, message: "query nested too deeply".to_string() }));
        }
        let (input, _) = char('(')(input)?;
        let (input, _) = multispace0(input)?;
        let (input, node) = expect(parse_expr, "expected an expression")(input)?;
        let (input, _) = multispace0(input)?;
        let (input, _) = expect(char(')'), "expected ')'")(input)?;
        Ok((input, node))
    })();
    PAREN_DEPTH.with(|d| d.set(d.get() - 1));
    result
}

fn parse_atom(input: Span) -> IResult<QueryNode> {
    alt((parse_quote, parse_phrase, parse_paren_expr, parse_word_atom))(input)
}

fn parse_field(input: Span) -> IResult<Field> {
    alt((
        map(tag("title"), |_| Field::Title),
        map(tag("text"), |_| Field::Text),
        map(tag("url"), |_| Field::Url),
        map(tag("anchor"), |_| Field::Anchor),
        map(tag("desc"), |_| Field::Desc),
    ))(input)
}

/// Recursively stamps `field` onto every term/phrase/quote leaf of `node`,
/// so `title:(fox OR hound)` qualifies both disjuncts, not just the first.
fn apply_field(field: Field, node: QueryNode) -> QueryNode {
    match node {
        QueryNode::Term { text, .. } => QueryNode::Term { field, text },
        QueryNode::Phrase { terms, .. } => QueryNode::Phrase { field, terms },
        QueryNode::Quote { terms, .. } => QueryNode::Quote { field, terms },
        QueryNode::And(children) => QueryNode::And(children.into_iter().map(|c| apply_field(field, c)).collect()),
        QueryNode::Or(children) => QueryNode::Or(children.into_iter().map(|c| apply_field(field, c)).collect()),
        QueryNode::Not(inner) => QueryNode::Not(Box::new(apply_field(field, *inner))),
    }
}

fn parse_field_term(input: Span) -> IResult<QueryNode> {
    let (input, field) = parse_field(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, atom) = expect(parse_atom, "expected a value after field prefix")(input)?;
    Ok((input, apply_field(field, atom)))
}

fn parse_not(input: Span) -> IResult<QueryNode> {
    let (input, _) = tag("NOT")(input)?;
    let (input, _) = expect(multispace1, "expected whitespace after 'NOT'")(input)?;
    let (input, inner) = expect(parse_term, "expected a term after 'NOT'")(input)?;
    Ok((input, QueryNode::Not(Box::new(inner))))
}

fn parse_term(input: Span) -> IResult<QueryNode> {
    alt((parse_not, parse_field_term, parse_atom))(input)
}

fn parse_op(input: Span) -> IResult<Op> {
    alt((map(tag("AND"), |_| Op::And), map(tag("OR"), |_| Op::Or)))(input)
}

fn parse_and_or_term(input: Span) -> IResult<(Op, QueryNode)> {
    let (input, _) = multispace1(input)?;
    let (input, op) = opt(terminated(parse_op, multispace1))(input)?;
    let (input, term) = parse_term(input)?;
    Ok((input, (op.unwrap_or(Op::And), term)))
}

fn parse_expr(input: Span) -> IResult<QueryNode> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(parse_and_or_term)(input)?;
    let node = rest.into_iter().fold(first, |acc, (op, term)| match op {
        Op::And => QueryNode::And(vec![acc, term]),
        Op::Or => QueryNode::Or(vec![acc, term]),
    });
    Ok((input, node))
}

/// Parses a full query string into a [`QueryNode`] tree, or a specific
/// [`QueryParseError`] naming the line/column and what was expected.
pub fn parse_query(input: &str) -> Result<QueryNode, QueryParseError> {
    let span = Span::new(input);
    let full = pair(preceded(multispace0, expect(parse_expr, "expected a query")), preceded(multispace0, expect(eof, "unexpected trailing input")));
    match full(span).finish() {
        Ok((_, (node, _))) => Ok(node),
        Err(e) => Err(QueryParseError { line: e.span.location_line(), column: e.span.get_utf8_column(), message: e.message }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(t: &str) -> QueryNode {
        QueryNode::Term { field: Field::All, text: t.to_string() }
    }

    #[test]
    fn parses_single_word() {
        assert_eq!(parse_query("fox").unwrap(), term("fox"));
    }

    #[test]
    fn implicit_juxtaposition_is_and() {
        assert_eq!(parse_query("cat dog").unwrap(), QueryNode::And(vec![term("cat"), term("dog")]));
    }

    #[test]
    fn explicit_or() {
        assert_eq!(parse_query("cat OR dog").unwrap(), QueryNode::Or(vec![term("cat"), term("dog")]));
    }

    #[test]
    fn left_to_right_mixed_operators() {
        // "a OR b AND c" => (a OR b) AND c, per the flat grammar (no precedence climbing).
        let expected = QueryNode::And(vec![QueryNode::Or(vec![term("a"), term("b")]), term("c")]);
        assert_eq!(parse_query("a OR b AND c").unwrap(), expected);
    }

    #[test]
    fn not_is_right_associative_prefix() {
        assert_eq!(parse_query("NOT dog").unwrap(), QueryNode::Not(Box::new(term("dog"))));
    }

    #[test]
    fn cat_and_not_dog() {
        let expected = QueryNode::And(vec![term("cat"), QueryNode::Not(Box::new(term("dog")))]);
        assert_eq!(parse_query("cat AND NOT dog").unwrap(), expected);
    }

    #[test]
    fn parses_field_qualified_term() {
        assert_eq!(parse_query("title:fox").unwrap(), QueryNode::Term { field: Field::Title, text: "fox".to_string() });
    }

    #[test]
    fn parses_field_over_parenthesized_group() {
        let expected = QueryNode::Or(vec![
            QueryNode::Term { field: Field::Title, text: "fox".to_string() },
            QueryNode::Term { field: Field::Title, text: "hound".to_string() },
        ]);
        assert_eq!(parse_query("title:(fox OR hound)").unwrap(), expected);
    }

    #[test]
    fn parses_double_quoted_phrase_as_quote() {
        assert_eq!(
            parse_query("\"alpha beta\"").unwrap(),
            QueryNode::Quote { field: Field::All, terms: vec!["alpha".to_string(), "beta".to_string()] }
        );
    }

    #[test]
    fn parses_single_quoted_phrase_as_fuzzy() {
        assert_eq!(
            parse_query("'alpha beta'").unwrap(),
            QueryNode::Phrase { field: Field::All, terms: vec!["alpha".to_string(), "beta".to_string()] }
        );
    }

    #[test]
    fn parses_nested_parens_and_precedence() {
        let expected = QueryNode::And(vec![term("a"), QueryNode::Or(vec![term("b"), term("c")])]);
        assert_eq!(parse_query("a AND (b OR c)").unwrap(), expected);
    }

    #[test]
    fn reports_missing_closing_paren() {
        let err = parse_query("(a AND b").unwrap_err();
        assert_eq!(err.message, "expected ')'");
    }

    #[test]
    fn reports_missing_term_after_not() {
        let err = parse_query("NOT").unwrap_err();
        assert_eq!(err.message, "expected whitespace after 'NOT'");
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = parse_query("a)").unwrap_err();
        assert_eq!(err.message, "unexpected trailing input");
    }

    #[test]
    fn word_may_contain_decorator_like_characters() {
        assert_eq!(parse_query("c#net").unwrap(), term("c#net"));
    }
}
