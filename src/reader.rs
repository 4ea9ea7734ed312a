//! S-expression reader: turns source text into [`Value`] AST nodes.
//!
//! The evaluator never reads raw text; this module is the front end that
//! hosts (the REPL, tests) use to build AST nodes. Supported syntax:
//! decimal integers, `#t`/`#f` booleans, double-quoted strings with escape
//! sequences, symbols, parenthesized lists, the `'expr` quote shorthand,
//! and `;` comments running to end of line.
//!
//! Nesting is bounded by [`MAX_PARSE_DEPTH`] so untrusted input cannot
//! overflow the stack before evaluation even begins.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{opt, recognize, value},
    sequence::pair,
};

use crate::ast::{IntegerType, SYMBOL_SPECIAL_CHARS, Value, is_valid_symbol};
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Skip whitespace and `;` comments. Comments run to end of line.
fn skip_trivia(input: &str) -> &str {
    let mut rest = input.trim_start();
    while let Some(comment) = rest.strip_prefix(';') {
        rest = match comment.split_once('\n') {
            Some((_, after)) => after.trim_start(),
            None => "",
        };
    }
    rest
}

/// Parse a decimal integer
fn parse_integer(input: &str) -> IResult<&str, Value> {
    let (input, number_str) = recognize(pair(
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
    ))
    .parse(input)?;

    match number_str.parse::<IntegerType>() {
        Ok(n) => Ok((input, Value::Integer(n))),
        Err(_) => {
            // Out of range for the integer type. Symbol parsing will
            // reject this anyway since it starts with digits.
            Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Digit,
            )))
        }
    }
}

/// Parse a boolean (#t or #f)
fn parse_bool(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Boolean(true), tag("#t")),
        value(Value::Boolean(false), tag("#f")),
    ))
    .parse(input)
}

/// Parse a symbol (identifier)
fn parse_symbol(input: &str) -> IResult<&str, Value> {
    let mut symbol_chars =
        take_while1(|c: char| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c));

    let (remaining, candidate) = symbol_chars.parse(input)?;

    if is_valid_symbol(candidate) {
        Ok((remaining, Value::Symbol(candidate.into())))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alpha,
        )))
    }
}

/// Commit to the current branch: a recoverable error becomes a failure,
/// so `alt` stops backtracking and reports the innermost position.
fn cut_error(e: nom::Err<nom::error::Error<&str>>) -> nom::Err<nom::error::Error<&str>> {
    match e {
        nom::Err::Error(inner) => nom::Err::Failure(inner),
        other => other,
    }
}

/// Parse a string literal. Once the opening quote is consumed the parse is
/// committed: errors inside the literal are failures, not backtracks.
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut chars = Vec::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some('"') => {
                // End of string - remaining is what's left after consuming the quote
                return Ok((
                    char_iter.as_str(),
                    Value::String(chars.into_iter().collect()),
                ));
            }
            Some('\\') => {
                // Handle escape sequences
                match char_iter.next() {
                    Some('n') => chars.push('\n'),
                    Some('t') => chars.push('\t'),
                    Some('r') => chars.push('\r'),
                    Some('\\') => chars.push('\\'),
                    Some('"') => chars.push('"'),
                    // Unknown or incomplete escape sequence
                    _ => {
                        return Err(nom::Err::Failure(nom::error::Error::new(
                            remaining,
                            nom::error::ErrorKind::Char,
                        )));
                    }
                }
                remaining = char_iter.as_str();
            }
            Some(ch) => {
                chars.push(ch);
                remaining = char_iter.as_str();
            }
            None => {
                // Reached end of input without finding closing quote
                return Err(nom::Err::Failure(nom::error::Error::new(
                    remaining,
                    nom::error::ErrorKind::Char,
                )));
            }
        }
    }
}

/// Parse a parenthesized list of expressions. Committed once the opening
/// parenthesis is consumed.
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (first, _) = char('(').parse(input)?;
    let mut rest = first;
    let mut elements = Vec::new();

    loop {
        let after_trivia = skip_trivia(rest);
        if let Ok((after_close, _)) = char::<_, nom::error::Error<&str>>(')').parse(after_trivia) {
            return Ok((after_close, Value::List(elements)));
        }
        let (after_element, element) =
            parse_expr(after_trivia, depth + 1).map_err(cut_error)?;
        elements.push(element);
        rest = after_element;
    }
}

/// Parse quote shorthand ('expr -> (quote expr)). Committed once the
/// quote character is consumed.
fn parse_quote(input: &str, depth: usize) -> IResult<&str, Value> {
    let (input, _) = char('\'').parse(input)?;
    let (input, expr) = parse_expr(input, depth + 1).map_err(cut_error)?;

    Ok((
        input,
        Value::List(vec![Value::Symbol("quote".to_owned()), expr]),
    ))
}

/// Parse one expression, with depth tracking for nested structures
fn parse_expr(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }

    let input = skip_trivia(input);
    alt((
        |input| parse_quote(input, depth),
        |input| parse_list(input, depth),
        parse_integer,
        parse_bool,
        parse_string,
        parse_symbol,
    ))
    .parse(input)
}

/// Parse a complete expression from input.
///
/// Fails with [`Error::Parse`] on malformed syntax, on input that ends
/// mid-expression, and on trailing content after a complete expression.
pub fn parse(input: &str) -> Result<Value, Error> {
    match parse_expr(input, 0) {
        Ok((rest, parsed)) => {
            let rest = skip_trivia(rest);
            if rest.is_empty() {
                Ok(parsed)
            } else {
                let offset = input.len() - rest.len();
                Err(Error::Parse(ParseError::with_context(
                    ParseErrorKind::TrailingContent,
                    "unexpected input after expression",
                    input,
                    offset,
                )))
            }
        }
        Err(e) => Err(Error::Parse(error_from_nom(input, e))),
    }
}

/// Convert nom parsing errors into structured reader errors
fn error_from_nom(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                nom::error::ErrorKind::TooLarge => ParseError::from_message(
                    ParseErrorKind::TooDeeplyNested,
                    format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                ),
                _ if position >= input.len() => {
                    ParseError::from_message(ParseErrorKind::Incomplete, "unexpected end of input")
                }
                _ => ParseError::with_context(
                    ParseErrorKind::InvalidSyntax,
                    "invalid syntax",
                    input,
                    position,
                ),
            }
        }
        nom::Err::Incomplete(_) => {
            ParseError::from_message(ParseErrorKind::Incomplete, "incomplete input")
        }
    }
}
