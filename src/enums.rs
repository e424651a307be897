//! Parser for the free-text enum source (`enums.txt`).
//!
//! ```text
//! enum WeaponType
//!     Unarmed
//!     Pistol = 22
//!     Name = "brass knuckles"
//! end
//! ```
//!
//! Members without a value continue a running counter. A numeric value moves
//! the counter to `value + 1`; a string or other non-numeric value resets it
//! to zero.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::errors::IndexError;

static ENUM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\benum\s+(\w+)(.*?)\bend\b").expect("valid regex"));

static ENUM_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*enum\s+(\w+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum EnumValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if is_integral(*n) => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for EnumValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) if is_integral(*n) => serializer.serialize_i64(*n as i64),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

fn is_integral(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < 9.0e15
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: String,
    pub value: EnumValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    pub name: String,
    pub members: Vec<EnumMember>,
}

impl Enum {
    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Parse a numeric enum value: decimal, float, optional sign, or `0x` hex.
fn parse_number(text: &str) -> Option<f64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()? as f64
    } else if digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        digits.parse::<f64>().ok()?
    } else {
        return None;
    };

    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Split a one-line block body (`a b=5 c`) into `name[=value]` items.
fn split_inline_items(line: &str) -> Vec<(&str, &str)> {
    let bytes = line.as_bytes();
    let mut items = Vec::new();
    let mut pos = 0;

    let skip_ws = |mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    };

    loop {
        pos = skip_ws(pos);
        if pos >= bytes.len() {
            break;
        }

        let name_start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'=' {
            pos += 1;
        }
        let name = &line[name_start..pos];

        let after_name = skip_ws(pos);
        if after_name >= bytes.len() || bytes[after_name] != b'=' {
            items.push((name, ""));
            continue;
        }

        let value_start = skip_ws(after_name + 1);
        pos = value_start;
        match bytes.get(value_start) {
            Some(&quote @ (b'"' | b'\'')) => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != quote {
                    pos += 1;
                }
                pos = (pos + 1).min(bytes.len());
            },
            _ => {
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
            },
        }
        items.push((name, &line[value_start..pos]));
    }

    items
}

/// One member per line; the value is everything after the first `=`.
fn split_line_item(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line.split_once('=') {
        Some((name, rhs)) => (name.trim_end(), rhs.trim()),
        None => (line, ""),
    })
}

fn body_items(body: &str) -> Vec<(&str, &str)> {
    if body.contains('\n') {
        body.lines().filter_map(split_line_item).collect()
    } else {
        split_inline_items(body)
    }
}

fn parse_members(body: &str) -> Vec<EnumMember> {
    let mut counter = 0f64;
    let mut members = Vec::new();

    for (name, rhs) in body_items(body) {
        let value = if rhs.is_empty() {
            let value = EnumValue::Number(counter);
            counter += 1.0;
            value
        } else if let Some(quote) = rhs.chars().next().filter(|c| *c == '"' || *c == '\'') {
            counter = 0.0;
            let inner = &rhs[quote.len_utf8()..];
            EnumValue::Text(inner.strip_suffix(quote).unwrap_or(inner).to_string())
        } else if let Some(number) = parse_number(rhs) {
            counter = number + 1.0;
            EnumValue::Number(number)
        } else {
            counter = 0.0;
            EnumValue::Text(rhs.to_string())
        };

        members.push(EnumMember {
            name: name.to_string(),
            value,
        });
    }

    members
}

fn line_of(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].matches('\n').count() + 1
}

/// Parse every `enum NAME ... end` block of `text`, in encounter order.
pub fn parse_enums(text: &str) -> Result<IndexMap<String, Enum>, IndexError> {
    let mut enums = IndexMap::new();
    let mut covered_until = 0;

    for block in ENUM_BLOCK.captures_iter(text) {
        let (Some(whole), Some(name), Some(body)) = (block.get(0), block.get(1), block.get(2))
        else {
            continue;
        };

        check_no_open_header(text, covered_until, whole.start())?;
        covered_until = whole.end();

        let name = name.as_str().to_string();
        let members = parse_members(body.as_str());
        enums.insert(name.clone(), Enum { name, members });
    }

    check_no_open_header(text, covered_until, text.len())?;
    Ok(enums)
}

/// Reject an `enum` header that sits outside every matched block.
fn check_no_open_header(text: &str, from: usize, to: usize) -> Result<(), IndexError> {
    let Some(gap) = text.get(from..to) else {
        return Ok(());
    };
    match ENUM_HEADER.captures(gap) {
        Some(header) => {
            let at = from + header.get(0).map_or(0, |m| m.start());
            let name = header.get(1).map_or("", |m| m.as_str()).to_string();
            Err(IndexError::UnterminatedEnum {
                name,
                line: line_of(text, at) + leading_newlines(&text[at..]),
            })
        },
        None => Ok(()),
    }
}

fn leading_newlines(text: &str) -> usize {
    text.chars()
        .take_while(|c| c.is_whitespace())
        .filter(|c| *c == '\n')
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(text: &str, name: &str) -> Vec<(String, EnumValue)> {
        let enums = parse_enums(text).expect("enum source should parse");
        enums[name]
            .members
            .iter()
            .map(|m| (m.name.clone(), m.value.clone()))
            .collect()
    }

    fn num(n: f64) -> EnumValue {
        EnumValue::Number(n)
    }

    fn text(s: &str) -> EnumValue {
        EnumValue::Text(s.to_string())
    }

    #[test]
    fn test_counter_resets_after_string() {
        let src = "enum E\n a\n b=\"x\"\n c\nend";
        assert_eq!(
            values(src, "E"),
            vec![
                ("a".to_string(), num(0.0)),
                ("b".to_string(), text("x")),
                ("c".to_string(), num(0.0)),
            ]
        );
    }

    #[test]
    fn test_counter_continues_after_number() {
        let src = "enum E\n a\n b=5\n c\nend";
        assert_eq!(
            values(src, "E"),
            vec![
                ("a".to_string(), num(0.0)),
                ("b".to_string(), num(5.0)),
                ("c".to_string(), num(6.0)),
            ]
        );
    }

    #[test]
    fn test_raw_text_and_single_quotes() {
        let src = "enum Mixed\n  One = 'first'\n  Two = SOME_CONST\n  Three\n  Four = -2\n  Five\n  Six = 0x10\nend";
        assert_eq!(
            values(src, "Mixed"),
            vec![
                ("One".to_string(), text("first")),
                ("Two".to_string(), text("SOME_CONST")),
                ("Three".to_string(), num(0.0)),
                ("Four".to_string(), num(-2.0)),
                ("Five".to_string(), num(-1.0)),
                ("Six".to_string(), num(16.0)),
            ]
        );
    }

    #[test]
    fn test_members_on_one_line() {
        let src = r#"enum E a b="x" c end"#;
        assert_eq!(
            values(src, "E"),
            vec![
                ("a".to_string(), num(0.0)),
                ("b".to_string(), text("x")),
                ("c".to_string(), num(0.0)),
            ]
        );
        assert_eq!(
            values("enum E a b=5 c end", "E"),
            vec![
                ("a".to_string(), num(0.0)),
                ("b".to_string(), num(5.0)),
                ("c".to_string(), num(6.0)),
            ]
        );
    }

    #[test]
    fn test_quoted_value_with_spaces() {
        let src = "enum Weapon\n  Name = \"brass knuckles\"\n  Next\nend";
        assert_eq!(
            values(src, "Weapon"),
            vec![
                ("Name".to_string(), text("brass knuckles")),
                ("Next".to_string(), num(0.0)),
            ]
        );
    }

    #[test]
    fn test_raw_value_keeps_whole_line() {
        let src = "enum E\n A = B C\n D\nend";
        assert_eq!(
            values(src, "E"),
            vec![("A".to_string(), text("B C")), ("D".to_string(), num(0.0))]
        );
    }

    #[test]
    fn test_block_order_is_kept() {
        let src = "enum Zeta\n a\nend\n\nenum Alpha\n b\nend\n";
        let enums = parse_enums(src).unwrap();
        let names: Vec<_> = enums.keys().cloned().collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_end_inside_member_name_does_not_close_block() {
        let src = "enum Town\n  Legend\n  Friend = 3\nend";
        let members = values(src, "Town");
        assert_eq!(members.len(), 2);
        assert_eq!(members[1], ("Friend".to_string(), num(3.0)));
    }

    #[test]
    fn test_unterminated_block_is_an_error() {
        let src = "enum Ok\n a\nend\n\nenum Broken\n b\n c\n";
        let err = parse_enums(src).unwrap_err();
        match err {
            IndexError::UnterminatedEnum { name, line } => {
                assert_eq!(name, "Broken");
                assert_eq!(line, 5);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_source() {
        assert!(parse_enums("").unwrap().is_empty());
        assert!(parse_enums("// nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(num(6.0).to_string(), "6");
        assert_eq!(num(1.5).to_string(), "1.5");
        assert_eq!(text("x").to_string(), "x");
        assert_eq!(serde_json::to_string(&num(3.0)).unwrap(), "3");
    }
}
