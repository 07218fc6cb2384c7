//! Parser for the dictionary text of a located object.
//!
//! This operates on the dictionary slice carved out by [`crate::scanner`],
//! never on whole documents, so it needs no cross-reference machinery. A
//! slice that fails to parse is reported with the byte offset of the first
//! unparsable position.

use crate::{Dictionary, Error, ObjectId, Result, Value};
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of};
use nom::combinator::{map, map_opt, map_res, opt, verify};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{fold_many0, many0};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{AsChar, IResult, Parser};

type NomError<'a> = nom::error::Error<&'a [u8]>;
type NomResult<'a, O, E = NomError<'a>> = IResult<&'a [u8], O, E>;

/// Nesting limit for balanced parentheses inside literal strings.
const MAX_BRACKET: usize = 100;

#[inline]
fn convert_result<'a, O, E>(result: std::result::Result<O, E>, input: &'a [u8], error_kind: ErrorKind) -> NomResult<'a, O> {
    result
        .map(|o| (input, o))
        .map_err(|_| nom::Err::Error(NomError::from_error_kind(input, error_kind)))
}

fn eol(input: &[u8]) -> NomResult<'_, &[u8]> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

fn comment(input: &[u8]) -> NomResult<'_, ()> {
    map(
        (tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), eol),
        |_| (),
    )
    .parse(input)
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

#[inline]
fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

#[inline]
fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: &[u8]) -> NomResult<'_, ()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

fn space(input: &[u8]) -> NomResult<'_, ()> {
    fold_many0(
        alt((map(take_while1(is_whitespace), |_| ()), comment)),
        || {},
        |_, _| (),
    )
    .parse(input)
}

fn integer(input: &[u8]) -> NomResult<'_, i64> {
    let (i, _) = pair(opt(one_of("+-")), digit1).parse(input)?;

    let int_input = &input[..input.len() - i.len()];
    convert_result(i64::from_str(str::from_utf8(int_input).unwrap()), i, ErrorKind::Digit)
}

fn real(input: &[u8]) -> NomResult<'_, f64> {
    let (i, _) = pair(
        opt(one_of("+-")),
        alt((
            map((digit1, tag(&b"."[..]), digit0), |_| ()),
            map(pair(tag(&b"."[..]), digit1), |_| ()),
        )),
    )
    .parse(input)?;

    let float_input = &input[..input.len() - i.len()];
    convert_result(f64::from_str(str::from_utf8(float_input).unwrap()), i, ErrorKind::Digit)
}

fn hex_char(input: &[u8]) -> NomResult<'_, u8> {
    map_res(
        verify(take(2usize), |h: &&[u8]| h.iter().copied().all(AsChar::is_hex_digit)),
        |x: &[u8]| u8::from_str_radix(str::from_utf8(x).unwrap(), 16),
    )
    .parse(input)
}

fn oct_char(input: &[u8]) -> NomResult<'_, u8> {
    map_res(
        take_while_m_n(1, 3, AsChar::is_oct_digit),
        // Overflow past one byte is ignored, not rejected.
        |x: &[u8]| u16::from_str_radix(str::from_utf8(x).unwrap(), 8).map(|o| o as u8),
    )
    .parse(input)
}

fn name(input: &[u8]) -> NomResult<'_, Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: &[u8]| {
                if c[0] != b'#' && is_regular(c[0]) {
                    Some(c[0])
                } else {
                    None
                }
            }),
        ))),
    )
    .parse(input)
}

fn escape_sequence(input: &[u8]) -> NomResult<'_, Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: &[u8]| Some(c[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(&'a [u8]),
    Escape(Option<u8>),
    Eol(&'a [u8]),
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) | InnerLiteralString::Eol(s) => output.extend_from_slice(s),
            InnerLiteralString::Escape(e) => output.extend(e),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(&[u8]) -> NomResult<'_, Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(&[u8]) -> NomResult<'_, Vec<u8>> {
    move |input| {
        if depth == 0 {
            map(verify(tag(&b"too deep"[..]), |_: &&[u8]| false), |_| vec![]).parse(input)
        } else {
            map(
                delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])),
                |mut content| {
                    content.insert(0, b'(');
                    content.push(b')');
                    content
                },
            )
            .parse(input)
        }
    }
}

fn literal_string(input: &[u8]) -> NomResult<'_, Vec<u8>> {
    delimited(tag(&b"("[..]), inner_literal_string(MAX_BRACKET), tag(&b")"[..])).parse(input)
}

#[inline]
fn hex_digit(input: &[u8]) -> NomResult<'_, u8> {
    map_opt(take(1usize), |c: &[u8]| {
        str::from_utf8(c).ok().and_then(|c| u8::from_str_radix(c, 16).ok())
    })
    .parse(input)
}

fn hexadecimal_string(input: &[u8]) -> NomResult<'_, Value> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |state, c| match state {
                        (mut out, false) => {
                            out.push(c << 4);
                            (out, true)
                        }
                        (mut out, true) => {
                            *out.last_mut().unwrap() |= c;
                            (out, false)
                        }
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(bytes, _)| Value::String(bytes),
    )
    .parse(input)
}

fn boolean(input: &[u8]) -> NomResult<'_, Value> {
    alt((
        map(tag(&b"true"[..]), |_| Value::Boolean(true)),
        map(tag(&b"false"[..]), |_| Value::Boolean(false)),
    ))
    .parse(input)
}

fn null(input: &[u8]) -> NomResult<'_, Value> {
    map(tag(&b"null"[..]), |_| Value::Null).parse(input)
}

fn array(input: &[u8]) -> NomResult<'_, Vec<Value>> {
    delimited(pair(tag(&b"["[..]), space), many0(direct_value), tag(&b"]"[..])).parse(input)
}

fn dictionary(input: &[u8]) -> NomResult<'_, Dictionary> {
    delimited(pair(tag(&b"<<"[..]), space), inner_dictionary, tag(&b">>"[..])).parse(input)
}

fn inner_dictionary(input: &[u8]) -> NomResult<'_, Dictionary> {
    fold_many0(
        pair(terminated(name, space), direct_value),
        Dictionary::new,
        |mut dict, (key, value)| {
            dict.set(key, value);
            dict
        },
    )
    .parse(input)
}

fn unsigned_int<I: FromStr>(input: &[u8]) -> NomResult<'_, I> {
    map_res(digit1, |digits: &[u8]| I::from_str(str::from_utf8(digits).unwrap())).parse(input)
}

fn object_id(input: &[u8]) -> NomResult<'_, ObjectId> {
    pair(terminated(unsigned_int, space), terminated(unsigned_int, space)).parse(input)
}

fn reference(input: &[u8]) -> NomResult<'_, Value> {
    map(terminated(object_id, tag(&b"R"[..])), Value::Reference).parse(input)
}

fn direct_values(input: &[u8]) -> NomResult<'_, Value> {
    alt((
        null,
        boolean,
        reference,
        map(real, Value::Real),
        map(integer, Value::Integer),
        map(name, Value::Name),
        map(literal_string, Value::String),
        hexadecimal_string,
        map(array, Value::Array),
        map(dictionary, Value::Dictionary),
    ))
    .parse(input)
}

fn direct_value(input: &[u8]) -> NomResult<'_, Value> {
    terminated(direct_values, space).parse(input)
}

/// Parse the dictionary text of one object, `<<` through `>>`.
///
/// Leading whitespace is accepted. On failure the reported offset is
/// relative to `input`; the caller rebases it when it knows where the slice
/// sits in the document.
pub fn parse_dictionary(input: &[u8]) -> Result<Dictionary> {
    match preceded(space, dictionary).parse(input) {
        Ok((_, dict)) => Ok(dict),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::Syntax {
            offset: input.len() - e.input.len(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(Error::Syntax { offset: input.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Dictionary {
        parse_dictionary(text.as_bytes()).expect("dictionary should parse")
    }

    #[test]
    fn parse_minimal_dictionary() {
        let dict = parsed("<< /Type /Page >>");
        assert_eq!(dict.len(), 1);
        assert!(dict.type_is(b"Page"));
    }

    #[test]
    fn parse_stream_dictionary() {
        let dict = parsed("<</Filter /FlateDecode /Length 52>>");
        assert_eq!(dict.get(b"Filter").unwrap(), &Value::Name(b"FlateDecode".to_vec()));
        assert_eq!(dict.get(b"Length").unwrap().as_i64().unwrap(), 52);
    }

    #[test]
    fn parse_reference_values() {
        let dict = parsed("<< /Contents 4 0 R /Parent 2 0 R >>");
        assert_eq!(dict.get(b"Contents").unwrap().as_reference().unwrap(), (4, 0));
        assert_eq!(dict.get(b"Parent").unwrap().as_reference().unwrap(), (2, 0));
    }

    #[test]
    fn parse_reference_array() {
        let dict = parsed("<< /Contents [4 0 R 5 0 R] >>");
        let contents = dict.get(b"Contents").unwrap();
        assert_eq!(contents.referenced_objects(), vec![4, 5]);
    }

    #[test]
    fn parse_nested_dictionary() {
        let dict = parsed("<< /Resources << /XObject << /Im1 8 0 R >> >> /MediaBox [0 0 612 792] >>");
        let resources = dict.get(b"Resources").unwrap().as_dict().unwrap();
        let xobject = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobject.get(b"Im1").unwrap().as_reference().unwrap(), (8, 0));
    }

    #[test]
    fn parse_name_with_hex_escape() {
        let dict = parsed("<< /A#42 1 >>");
        assert!(dict.has(b"AB"));
    }

    #[test]
    fn parse_strings_and_numbers() {
        let dict = parsed("<< /T (pa(ren)s) /H <4E6F74> /R 3.14 /N -2 >>");
        assert_eq!(dict.get(b"T").unwrap(), &Value::String(b"pa(ren)s".to_vec()));
        assert_eq!(dict.get(b"H").unwrap(), &Value::String(b"Not".to_vec()));
        assert_eq!(dict.get(b"R").unwrap(), &Value::Real(3.14));
        assert_eq!(dict.get(b"N").unwrap().as_i64().unwrap(), -2);
    }

    #[test]
    fn literal_string_nesting_is_bounded() {
        fn parens(depth: usize) -> Vec<u8> {
            let mut text = vec![b'('; depth];
            text.resize(depth * 2, b')');
            text
        }
        // One level for the outer string plus MAX_BRACKET nested pairs.
        assert!(literal_string(&parens(MAX_BRACKET + 1)).is_ok());
        assert!(literal_string(&parens(MAX_BRACKET + 2)).is_err());
    }

    #[test]
    fn reject_garbage_with_offset() {
        match parse_dictionary(b"<< /Key ?? >>") {
            Err(Error::Syntax { offset }) => assert_eq!(offset, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn reject_unterminated_dictionary() {
        assert!(matches!(parse_dictionary(b"<< /Key 1"), Err(Error::Syntax { .. })));
    }
}
