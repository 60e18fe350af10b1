//! Mini-notation grammar
//!
//! Parses the compact rhythm syntax (`"bd*2 [sd cp]? <hh oh>(3,8)"`) into a
//! parse tree. The tree is compiled into a pattern by
//! [`crate::mini_interpreter`].
//!
//! Grammar, informally:
//!
//! ```text
//! root      := ws? body? ws? EOF
//! body      := sequence ((',' sequence)* | ('|' sequence)*)
//! sequence  := ws? step (ws step)*          -- '.' steps split groups
//! step      := element | '_' | '.'
//! element   := term (euclid | modifier)*
//! term      := '[' body ']' | '<' body '>' | '{' body '}' ('%' number)?
//!            | number | word (':' integer)? | '~'
//! euclid    := '(' sequence ',' sequence (',' sequence)? ')'
//! modifier  := '*' arg | '/' arg | '!' digits? | '?' digits? | '@' number
//! arg       := number | '[' body ']' | '<' body '>' | '{' body '}'
//! ```

use crate::time::Fraction;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit0, digit1, multispace0, multispace1, one_of},
    combinator::{map, opt, recognize},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};
use serde::Serialize;
use std::fmt;

// ============================================
// Parse tree
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Sequence(Sequence),
    Word { value: String, index: Option<i64> },
    Number { value: Number },
    Rest,
    /// `[a b, c d]`: every sub-sequence squeezed into the step
    Polyrhythm { seqs: Vec<Sequence> },
    /// `<a b, c>` and `{a b, c d e}%n`: sub-sequences advance `steps` steps
    /// per cycle; without `%n`, as many as the first sub-sequence has
    Polymeter { seqs: Vec<Sequence>, steps: Option<Fraction> },
    /// `[a | b]`: one sub-sequence picked at random per cycle
    RandomSequence { seqs: Vec<Sequence> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sequence {
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub value: Box<Node>,
    pub modifiers: Vec<Modifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Euclid {
    pub pulses: Sequence,
    pub steps: Sequence,
    pub rotation: Option<Sequence>,
}

/// Element modifiers, in the order they apply.
///
/// After parsing, at most one `Degrade` follows the positional modifiers
/// and at most one `Weight` comes last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Modifier {
    Fast { value: Box<Node> },
    Slow { value: Box<Node> },
    Euclid(Euclid),
    Repeat { count: u32 },
    Degrade { count: u32 },
    Weight { value: Fraction },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_fraction(self) -> Fraction {
        match self {
            Number::Int(i) => Fraction::from_integer(i),
            Number::Float(f) => Fraction::from_float(f),
        }
    }
}

impl Sequence {
    pub fn new(elements: Vec<Element>) -> Self {
        Sequence { elements }
    }
}

impl Element {
    pub fn new(value: Node) -> Self {
        Element {
            value: Box::new(value),
            modifiers: Vec::new(),
        }
    }
}

// ============================================
// Errors
// ============================================

/// A mini-notation syntax error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset into the source
    pub offset: usize,
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
    pub message: String,
    pub source_line: String,
}

impl SyntaxError {
    fn at(source: &str, offset: usize, message: String) -> Self {
        let before = &source[..offset];
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = source[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or(source.len());
        SyntaxError {
            offset,
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
            message,
            source_line: source[line_start..line_end].to_string(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "syntax error at line {}:{}: {}", self.line, self.column, self.message)?;
        writeln!(f, "  {}", self.source_line)?;
        write!(f, "  {}^", " ".repeat(self.column - 1))
    }
}

impl std::error::Error for SyntaxError {}

/// nom error carrying the position reached and an optional message
#[derive(Debug, Clone, PartialEq)]
struct GrammarError<'a> {
    input: &'a str,
    message: Option<&'static str>,
}

impl<'a> GrammarError<'a> {
    fn failure(input: &'a str, message: &'static str) -> nom::Err<Self> {
        nom::Err::Failure(GrammarError {
            input,
            message: Some(message),
        })
    }

    fn backtrack(input: &'a str) -> nom::Err<Self> {
        nom::Err::Error(GrammarError { input, message: None })
    }
}

impl<'a> ParseError<&'a str> for GrammarError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        GrammarError { input, message: None }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        // Report whichever branch got further.
        if other.input.len() <= self.input.len() {
            other
        } else {
            self
        }
    }
}

type PResult<'a, O> = IResult<&'a str, O, GrammarError<'a>>;

// ============================================
// Entry point
// ============================================

/// Parse mini-notation source into a tree
///
/// Blank source parses to an empty sequence, which compiles to silence.
pub fn parse(source: &str) -> Result<Node, SyntaxError> {
    let (rest, _) = ws0(source).map_err(|e| to_syntax_error(source, e))?;
    if rest.is_empty() {
        return Ok(Node::Sequence(Sequence::default()));
    }

    let (rest, tree) = match body(rest) {
        Ok((rest, body)) => (rest, body.into_node()),
        Err(e) => return Err(to_syntax_error(source, e)),
    };
    let (rest, _) = ws0(rest).map_err(|e| to_syntax_error(source, e))?;
    if !rest.is_empty() {
        return Err(unexpected(source, rest, None));
    }
    Ok(tree)
}

fn to_syntax_error(source: &str, err: nom::Err<GrammarError<'_>>) -> SyntaxError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => unexpected(source, e.input, e.message),
        nom::Err::Incomplete(_) => unexpected(source, "", None),
    }
}

fn unexpected(source: &str, rest: &str, message: Option<&'static str>) -> SyntaxError {
    let offset = source.len() - rest.len();
    let message = match (message, rest.chars().next()) {
        (Some(m), _) => m.to_string(),
        (None, None) => "unexpected end of input".to_string(),
        (None, Some(c)) => format!("unexpected `{}`", c),
    };
    SyntaxError::at(source, offset, message)
}

// ============================================
// Lexical helpers
// ============================================

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '#' | '.' | '^')
}

fn ws0(input: &str) -> PResult<'_, &str> {
    multispace0(input)
}

fn expect_char<'a>(c: char, message: &'static str) -> impl FnMut(&'a str) -> PResult<'a, char> {
    move |input: &'a str| match input.chars().next() {
        Some(found) if found == c => Ok((&input[c.len_utf8()..], c)),
        _ => Err(GrammarError::failure(input, message)),
    }
}

fn number(input: &str) -> PResult<'_, Number> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit0)),
    )))(input)?;
    // `808bd` and `2.5.1` are words.
    if rest.starts_with(is_word_char) {
        return Err(GrammarError::backtrack(input));
    }

    if text.contains('.') {
        match text.trim_end_matches('.').parse::<f64>() {
            Ok(f) => Ok((rest, Number::Float(f))),
            Err(_) => Err(GrammarError::failure(input, "invalid number")),
        }
    } else {
        match text.parse::<i64>() {
            Ok(i) => Ok((rest, Number::Int(i))),
            Err(_) => Err(GrammarError::failure(input, "integer out of range")),
        }
    }
}

fn integer(input: &str) -> PResult<'_, i64> {
    let (rest, text) = recognize(pair(opt(char('-')), digit1))(input)?;
    match text.parse::<i64>() {
        Ok(i) => Ok((rest, i)),
        Err(_) => Err(GrammarError::failure(input, "integer out of range")),
    }
}

/// Largest `!` repeat count on one element, summed over adjacent marks.
pub const MAX_REPEAT: u32 = 1024;

fn count(input: &str) -> PResult<'_, Option<u32>> {
    let (rest, digits) = opt(digit1)(input)?;
    match digits.map(str::parse::<u32>) {
        None => Ok((rest, None)),
        Some(Ok(n)) => Ok((rest, Some(n))),
        Some(Err(_)) => Err(GrammarError::failure(input, "count out of range")),
    }
}

// ============================================
// Bracketed bodies
// ============================================

struct Body {
    seqs: Vec<Sequence>,
    separator: Option<char>,
}

impl Body {
    fn into_node(mut self) -> Node {
        match self.separator {
            Some('|') => Node::RandomSequence { seqs: self.seqs },
            Some(_) => Node::Polyrhythm { seqs: self.seqs },
            None => Node::Sequence(self.seqs.remove(0)),
        }
    }
}

fn body(input: &str) -> PResult<'_, Body> {
    let (mut rest, first) = sequence(input)?;
    let mut seqs = vec![first];
    let mut separator = None;

    loop {
        let (at_sep, _) = ws0(rest)?;
        let (after, sep) = match one_of::<_, _, GrammarError>(",|")(at_sep) {
            Ok(found) => found,
            Err(_) => break,
        };
        match separator {
            None => separator = Some(sep),
            Some(prev) if prev != sep => {
                return Err(GrammarError::failure(at_sep, "cannot mix `,` and `|` in one group"));
            }
            Some(_) => {}
        }
        let (after, seq) = match sequence(after) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) => {
                return Err(nom::Err::Failure(GrammarError {
                    input: e.input,
                    message: Some("expected a step after separator"),
                }))
            }
            Err(e) => return Err(e),
        };
        seqs.push(seq);
        rest = after;
    }

    Ok((rest, Body { seqs, separator }))
}

fn square(input: &str) -> PResult<'_, Node> {
    let (rest, _) = char('[')(input)?;
    let (rest, body) = bracket_body(rest)?;
    let (rest, _) = expect_char(']', "expected `]`")(rest)?;
    let node = match body.separator {
        Some('|') => Node::RandomSequence { seqs: body.seqs },
        _ => Node::Polyrhythm { seqs: body.seqs },
    };
    Ok((rest, node))
}

fn angle(input: &str) -> PResult<'_, Node> {
    let (rest, _) = char('<')(input)?;
    let (rest, body) = polymeter_body(rest)?;
    let (rest, _) = expect_char('>', "expected `>`")(rest)?;
    Ok((
        rest,
        Node::Polymeter {
            seqs: body.seqs,
            steps: Some(Fraction::one()),
        },
    ))
}

fn curly(input: &str) -> PResult<'_, Node> {
    let (rest, _) = char('{')(input)?;
    let (rest, body) = polymeter_body(rest)?;
    let (rest, _) = expect_char('}', "expected `}`")(rest)?;
    let (rest, steps) = opt(preceded(char('%'), committed(number, "expected a step count after `%`")))(rest)?;
    Ok((
        rest,
        Node::Polymeter {
            seqs: body.seqs,
            steps: steps.map(Number::to_fraction),
        },
    ))
}

fn bracket_body(input: &str) -> PResult<'_, Body> {
    let (rest, body) = committed(body, "expected a step")(input)?;
    let (rest, _) = ws0(rest)?;
    Ok((rest, body))
}

fn polymeter_body(input: &str) -> PResult<'_, Body> {
    let (rest, body) = bracket_body(input)?;
    if body.separator == Some('|') {
        return Err(GrammarError::failure(input, "`|` is only allowed inside `[ ]`"));
    }
    Ok((rest, body))
}

fn bracketed(input: &str) -> PResult<'_, Node> {
    alt((square, angle, curly))(input)
}

/// Turns a recoverable error into a fatal one with `message`.
fn committed<'a, O>(
    mut parser: impl FnMut(&'a str) -> PResult<'a, O>,
    message: &'static str,
) -> impl FnMut(&'a str) -> PResult<'a, O> {
    move |input: &'a str| match parser(input) {
        Err(nom::Err::Error(e)) => Err(nom::Err::Failure(GrammarError {
            input: e.input,
            message: e.message.or(Some(message)),
        })),
        other => other,
    }
}

// ============================================
// Sequences and steps
// ============================================

enum Step<'a> {
    Element(Element),
    Extend(&'a str),
    Break(&'a str),
}

fn step(input: &str) -> PResult<'_, Step<'_>> {
    if let Ok((rest, token)) = take_while1::<_, _, GrammarError>(is_word_char)(input) {
        match token {
            "_" => return Ok((rest, Step::Extend(input))),
            "." => return Ok((rest, Step::Break(input))),
            _ => {}
        }
    }
    map(element, Step::Element)(input)
}

fn sequence(input: &str) -> PResult<'_, Sequence> {
    let (rest, _) = ws0(input)?;
    let (rest, first) = step(rest)?;
    let (rest, others) = many0(preceded(multispace1, step))(rest)?;

    let mut groups: Vec<Vec<Element>> = Vec::new();
    let mut current: Vec<Element> = Vec::new();
    for step in std::iter::once(first).chain(others) {
        match step {
            Step::Element(element) => current.push(element),
            Step::Extend(at) => match current.last_mut() {
                Some(previous) => extend_weight(previous),
                None => return Err(GrammarError::failure(at, "`_` cannot start a sequence")),
            },
            Step::Break(at) => {
                if current.is_empty() {
                    return Err(GrammarError::failure(at, "empty group before `.`"));
                }
                groups.push(std::mem::take(&mut current));
            }
        }
    }

    if groups.is_empty() {
        return Ok((rest, Sequence::new(current)));
    }
    if current.is_empty() {
        return Err(GrammarError::failure(rest, "empty group after `.`"));
    }
    groups.push(current);
    let elements = groups
        .into_iter()
        .map(|group| {
            Element::new(Node::Polyrhythm {
                seqs: vec![Sequence::new(group)],
            })
        })
        .collect();
    Ok((rest, Sequence::new(elements)))
}

/// `a _ _` stretches `a` by one step per `_`.
fn extend_weight(element: &mut Element) {
    match element.modifiers.last_mut() {
        Some(Modifier::Weight { value }) => *value = &*value + Fraction::one(),
        _ => element.modifiers.push(Modifier::Weight {
            value: Fraction::from_integer(2),
        }),
    }
}

// ============================================
// Elements
// ============================================

fn term(input: &str) -> PResult<'_, Node> {
    alt((
        bracketed,
        map(number, |value| Node::Number { value }),
        word,
        map(char('~'), |_| Node::Rest),
    ))(input)
}

fn word(input: &str) -> PResult<'_, Node> {
    let (rest, text) = take_while1(is_word_char)(input)?;
    if text == "_" || text == "." {
        return Err(GrammarError::backtrack(input));
    }
    let (rest, index) = opt(preceded(char(':'), committed(integer, "expected an index after `:`")))(rest)?;
    Ok((
        rest,
        Node::Word {
            value: text.to_string(),
            index,
        },
    ))
}

fn element(input: &str) -> PResult<'_, Element> {
    let (rest, value) = term(input)?;
    let (rest, raw) = many0(alt((map(euclid, RawModifier::Euclid), modifier)))(rest)?;
    let modifiers = normalize_modifiers(raw);
    let too_many = modifiers
        .iter()
        .any(|m| matches!(m, Modifier::Repeat { count } if *count > MAX_REPEAT));
    if too_many {
        return Err(GrammarError::failure(input, "too many repeats"));
    }
    Ok((
        rest,
        Element {
            value: Box::new(value),
            modifiers,
        },
    ))
}

fn euclid(input: &str) -> PResult<'_, Euclid> {
    let (rest, _) = char('(')(input)?;
    let (rest, pulses) = euclid_arg(rest)?;
    let (rest, _) = expect_char(',', "expected `,` between euclid arguments")(rest)?;
    let (rest, steps) = euclid_arg(rest)?;
    let (rest, rotation) = opt(preceded(char(','), euclid_arg))(rest)?;
    let (rest, _) = expect_char(')', "expected `)`")(rest)?;
    Ok((
        rest,
        Euclid {
            pulses,
            steps,
            rotation,
        },
    ))
}

fn euclid_arg(input: &str) -> PResult<'_, Sequence> {
    let (rest, seq) = committed(sequence, "expected a euclid argument")(input)?;
    let (rest, _) = ws0(rest)?;
    Ok((rest, seq))
}

/// Modifier as written, before adjacent `!` and `?` marks are merged
enum RawModifier {
    Fast(Node),
    Slow(Node),
    Euclid(Euclid),
    Repeat(u32),
    Degrade(u32),
    Weight(Fraction),
}

fn modifier_arg(input: &str) -> PResult<'_, Node> {
    committed(
        alt((map(number, |value| Node::Number { value }), bracketed)),
        "expected a number or bracketed pattern",
    )(input)
}

fn modifier(input: &str) -> PResult<'_, RawModifier> {
    alt((
        map(preceded(char('*'), modifier_arg), RawModifier::Fast),
        map(preceded(char('/'), modifier_arg), RawModifier::Slow),
        map(preceded(char('!'), count), |n| RawModifier::Repeat(n.unwrap_or(1))),
        map(preceded(char('?'), count), |n| RawModifier::Degrade(n.unwrap_or(1))),
        map(
            preceded(char('@'), committed(number, "expected a weight after `@`")),
            |n| RawModifier::Weight(n.to_fraction()),
        ),
    ))(input)
}

/// Adjacent `!` marks become one repeat whose count is their sum; all
/// `?` marks are summed into one trailing degrade; only the last `@`
/// weight is kept, after everything else.
fn normalize_modifiers(raw: Vec<RawModifier>) -> Vec<Modifier> {
    let mut modifiers = Vec::new();
    let mut degrade = 0u32;
    let mut weight = None;
    let mut previous_was_repeat = false;

    for m in raw {
        let is_repeat = matches!(m, RawModifier::Repeat(_));
        match m {
            RawModifier::Fast(node) => modifiers.push(Modifier::Fast { value: Box::new(node) }),
            RawModifier::Slow(node) => modifiers.push(Modifier::Slow { value: Box::new(node) }),
            RawModifier::Euclid(euclid) => modifiers.push(Modifier::Euclid(euclid)),
            RawModifier::Repeat(n) => match modifiers.last_mut() {
                Some(Modifier::Repeat { count }) if previous_was_repeat => {
                    *count = count.saturating_add(n)
                }
                _ => modifiers.push(Modifier::Repeat { count: n }),
            },
            RawModifier::Degrade(n) => degrade = degrade.saturating_add(n),
            RawModifier::Weight(w) => weight = Some(w),
        }
        previous_was_repeat = is_repeat;
    }

    if degrade > 0 {
        modifiers.push(Modifier::Degrade { count: degrade });
    }
    if let Some(value) = weight {
        modifiers.push(Modifier::Weight { value });
    }
    modifiers
}
