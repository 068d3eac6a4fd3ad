//! # Type Expression Parser
//!
//! Parses textual type expressions such as `dict[str, list[int]] | None`
//! into a [`RawType`], ready for [`crate::resolve::resolve`]. Built on `nom`.
//!
//! ## Grammar
//!
//! ```text
//! expr      := primary ('|' primary)*
//! primary   := '...' | quoted | name ('[' args ']')?
//! name      := ident ('.' ident)*
//! args      := expr (',' expr)* ','?
//! ```
//!
//! A quoted string in type position is a forward reference. The heads
//! `Optional`, `Union`, `Literal`, `Final`, `ClassVar`, `Shared`, `Cast` and
//! `Annotated` are special forms; `Literal[...]` takes literal values
//! (integers, floats, strings, `True`, `False`, `None`, nested `Literal`).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, cut, map, not, opt, recognize, value},
    error::{context, ErrorKind, ParseError, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::descriptor::WrapperKind;
use crate::error::UnresolvableDescriptorError;
use crate::resolve::{LiteralItem, RawType};
use crate::value::Value;

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Parse a complete type expression.
///
/// # Errors
///
/// Returns [`UnresolvableDescriptorError::Syntax`] with the byte offset of
/// the failure when the input is not a well-formed type expression.
pub fn parse_type_expr(input: &str) -> Result<RawType, UnresolvableDescriptorError> {
    match all_consuming(ws(type_expr))(input) {
        Ok((_, raw)) => Ok(raw),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(syntax_error(input, &err)),
        Err(nom::Err::Incomplete(_)) => Err(UnresolvableDescriptorError::Syntax {
            input: input.to_string(),
            offset: input.len(),
            message: "incomplete type expression".to_string(),
        }),
    }
}

fn syntax_error(input: &str, err: &VerboseError<&str>) -> UnresolvableDescriptorError {
    let (offset, message) = match err.errors.first() {
        Some((rest, kind)) => {
            let message = match kind {
                VerboseErrorKind::Char(c) => format!("expected '{c}'"),
                VerboseErrorKind::Nom(ErrorKind::Eof) => "unexpected trailing input".to_string(),
                _ => err
                    .errors
                    .iter()
                    .find_map(|(_, k)| match k {
                        VerboseErrorKind::Context(ctx) => Some(format!("expected {ctx}")),
                        _ => None,
                    })
                    .unwrap_or_else(|| "invalid type expression".to_string()),
            };
            (input.len().saturating_sub(rest.len()), message)
        }
        None => (0, "invalid type expression".to_string()),
    };
    UnresolvableDescriptorError::Syntax {
        input: input.to_string(),
        offset,
        message,
    }
}

// ---------------------------------------------------------------------------
// Type positions
// ---------------------------------------------------------------------------

fn type_expr(input: &str) -> PResult<'_, RawType> {
    map(separated_list1(ws(char('|')), primary), |mut variants| {
        if variants.len() == 1 {
            variants.remove(0)
        } else {
            RawType::Union(variants)
        }
    })(input)
}

fn primary(input: &str) -> PResult<'_, RawType> {
    ws(context(
        "a type name, quoted forward reference or '...'",
        alt((
            value(RawType::Ellipsis, tag("...")),
            map(string_literal, RawType::Forward),
            named_form,
        )),
    ))(input)
}

fn type_args(input: &str) -> PResult<'_, Vec<RawType>> {
    terminated(separated_list1(ws(char(',')), type_expr), opt(ws(char(','))))(input)
}

fn named_form(input: &str) -> PResult<'_, RawType> {
    let (rest, name) = dotted_name(input)?;
    let short = name.rsplit('.').next().unwrap_or(name);
    match short {
        "Literal" => map(bracketed(literal_items), RawType::Literal)(rest),
        "Optional" => map(bracketed(type_expr), |inner| RawType::Optional(Box::new(inner)))(rest),
        "Union" => map(bracketed(type_args), RawType::Union)(rest),
        "Final" | "ClassVar" | "Shared" | "Cast" => {
            let kind = match short {
                "Final" => WrapperKind::Final,
                "Cast" => WrapperKind::Cast,
                _ => WrapperKind::Shared,
            };
            map(bracketed(type_expr), move |inner| RawType::Wrapped {
                kind,
                inner: Box::new(inner),
            })(rest)
        }
        "Annotated" => map(
            bracketed(pair(type_expr, many0(preceded(ws(char(',')), metadata)))),
            |(inner, metadata)| RawType::Annotated {
                inner: Box::new(inner),
                metadata,
            },
        )(rest),
        _ => {
            let (rest, args) = opt(bracketed(type_args))(rest)?;
            let name = RawType::Name(name.to_string());
            let raw = match args {
                Some(args) => RawType::Generic {
                    head: Box::new(name),
                    args,
                },
                None => name,
            };
            Ok((rest, raw))
        }
    }
}

fn metadata(input: &str) -> PResult<'_, String> {
    map(
        alt((recognize(literal_value), recognize(type_expr))),
        |text: &str| text.trim().to_string(),
    )(input)
}

// ---------------------------------------------------------------------------
// Literal values
// ---------------------------------------------------------------------------

fn literal_items(input: &str) -> PResult<'_, Vec<LiteralItem>> {
    terminated(separated_list1(ws(char(',')), literal_item), opt(ws(char(','))))(input)
}

fn literal_item(input: &str) -> PResult<'_, LiteralItem> {
    ws(alt((
        map(
            preceded(keyword("Literal"), bracketed(literal_items)),
            LiteralItem::Nested,
        ),
        map(literal_value, LiteralItem::Value),
    )))(input)
}

fn literal_value(input: &str) -> PResult<'_, Value> {
    context(
        "a literal value",
        alt((
            value(Value::None, keyword("None")),
            value(Value::Bool(true), keyword("True")),
            value(Value::Bool(false), keyword("False")),
            number,
            map(string_literal, Value::Str),
        )),
    )(input)
}

fn number(input: &str) -> PResult<'_, Value> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), digit0)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    let parsed = if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    };
    match parsed {
        Some(v) => Ok((rest, v)),
        None => Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Digit,
        ))),
    }
}

/// A single- or double-quoted string with backslash escapes.
fn string_literal(input: &str) -> PResult<'_, String> {
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => {
            return Err(nom::Err::Error(VerboseError::from_error_kind(
                input,
                ErrorKind::Char,
            )))
        }
    };
    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&input[i + c.len_utf8()..], out)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }
    // Unterminated.
    Err(nom::Err::Failure(VerboseError::from_char(
        &input[input.len()..],
        quote,
    )))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_continue)))(input)
}

fn dotted_name(input: &str) -> PResult<'_, &str> {
    recognize(pair(identifier, many0(pair(char('.'), identifier))))(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_continue)))
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// `[ inner ]`. Once the opening bracket is consumed the contents and the
/// closing bracket are mandatory.
fn bracketed<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(ws(char('[')), cut(inner), cut(ws(char(']'))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> RawType {
        RawType::Name(n.to_string())
    }

    fn generic(head: &str, args: Vec<RawType>) -> RawType {
        RawType::Generic {
            head: Box::new(name(head)),
            args,
        }
    }

    #[test]
    fn bare_name() {
        assert_eq!(parse_type_expr("int").unwrap(), name("int"));
        assert_eq!(parse_type_expr("  my.mod.Point ").unwrap(), name("my.mod.Point"));
    }

    #[test]
    fn nested_generics_and_union() {
        let raw = parse_type_expr("dict[str, list[int]] | None").unwrap();
        assert_eq!(
            raw,
            RawType::Union(vec![
                generic("dict", vec![name("str"), generic("list", vec![name("int")])]),
                name("None"),
            ])
        );
    }

    #[test]
    fn union_inside_arguments() {
        let raw = parse_type_expr("tuple[int | str, bool,]").unwrap();
        assert_eq!(
            raw,
            generic(
                "tuple",
                vec![RawType::Union(vec![name("int"), name("str")]), name("bool")]
            )
        );
    }

    #[test]
    fn literal_values() {
        let raw = parse_type_expr("Literal['a', \"b\", 1, -2.5, True, None, Literal[3]]").unwrap();
        assert_eq!(
            raw,
            RawType::Literal(vec![
                LiteralItem::Value(Value::from("a")),
                LiteralItem::Value(Value::from("b")),
                LiteralItem::Value(Value::Int(1)),
                LiteralItem::Value(Value::Float(-2.5)),
                LiteralItem::Value(Value::Bool(true)),
                LiteralItem::Value(Value::None),
                LiteralItem::Nested(vec![LiteralItem::Value(Value::Int(3))]),
            ])
        );
    }

    #[test]
    fn special_forms() {
        assert_eq!(
            parse_type_expr("Optional[int]").unwrap(),
            RawType::Optional(Box::new(name("int")))
        );
        assert_eq!(
            parse_type_expr("Union[int, str]").unwrap(),
            RawType::Union(vec![name("int"), name("str")])
        );
        assert_eq!(
            parse_type_expr("typing.Final[int]").unwrap(),
            RawType::Wrapped {
                kind: WrapperKind::Final,
                inner: Box::new(name("int")),
            }
        );
        assert_eq!(
            parse_type_expr("ClassVar[str]").unwrap(),
            RawType::Wrapped {
                kind: WrapperKind::Shared,
                inner: Box::new(name("str")),
            }
        );
    }

    #[test]
    fn annotated_keeps_metadata_text() {
        assert_eq!(
            parse_type_expr("Annotated[int, 'unit', 3]").unwrap(),
            RawType::Annotated {
                inner: Box::new(name("int")),
                metadata: vec!["'unit'".to_string(), "3".to_string()],
            }
        );
    }

    #[test]
    fn quoted_forward_reference() {
        assert_eq!(
            parse_type_expr("list['Point']").unwrap(),
            generic("list", vec![RawType::Forward("Point".to_string())])
        );
    }

    #[test]
    fn ellipsis_is_parsed() {
        assert_eq!(
            parse_type_expr("tuple[int, ...]").unwrap(),
            generic("tuple", vec![name("int"), RawType::Ellipsis])
        );
    }

    #[test]
    fn missing_bracket_reports_offset() {
        let err = parse_type_expr("list[int").unwrap_err();
        assert_eq!(
            err,
            UnresolvableDescriptorError::Syntax {
                input: "list[int".to_string(),
                offset: 8,
                message: "expected ']'".to_string(),
            }
        );
    }

    #[test]
    fn trailing_input_is_rejected() {
        match parse_type_expr("int]").unwrap_err() {
            UnresolvableDescriptorError::Syntax { offset, message, .. } => {
                assert_eq!(offset, 3);
                assert_eq!(message, "unexpected trailing input");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            parse_type_expr(""),
            Err(UnresolvableDescriptorError::Syntax { offset: 0, .. })
        ));
    }

    #[test]
    fn non_type_argument_is_rejected() {
        assert!(matches!(
            parse_type_expr("list[3]"),
            Err(UnresolvableDescriptorError::Syntax { offset: 5, .. })
        ));
    }
}
