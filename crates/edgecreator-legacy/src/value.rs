//! Grammar for legacy option values.
//!
//! Legacy records store every option either as a JSON number or as a string
//! whose content follows a small grammar:
//!
//! - numbers: `12`, `-3.5`, ` 4 ` (surrounding whitespace is ignored)
//! - colors: a hexadecimal string (`ABCDEF`) or an RGB triple (`255,0,0` or
//!   `255, 0, 0`)
//! - coordinate lists: comma-separated numbers (`0,7.5,15`)
//!
//! [`LegacyFields`] wraps the options of one step and exposes typed accessors
//! built on this grammar.

use serde_json::Value;
use thiserror::Error;
use winnow::{
    Parser as _,
    ascii::space0,
    combinator::{delimited, opt, separated},
    error::{ContextError, ErrMode},
    token::take_while,
};

use crate::{NormalizeError, record::LegacyOptions};

type IResult<O> = std::result::Result<O, ErrMode<ContextError>>;

/// Error returned by [`rgb_to_hex`] for strings that are not legacy colors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid legacy color `{0}`")]
pub struct InvalidColor(pub String);

/// Parse a decimal number, optionally signed.
fn number(input: &mut &str) -> IResult<f64> {
    (
        opt(take_while(1..=1, |c: char| c == '-' || c == '+')),
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.'),
        opt((
            take_while(1..=1, |c: char| c == 'e' || c == 'E'),
            opt(take_while(1..=1, |c: char| c == '-' || c == '+')),
            take_while(1.., |c: char| c.is_ascii_digit()),
        )),
    )
        .take()
        .verify_map(|text: &str| text.parse::<f64>().ok())
        .parse_next(input)
}

/// Parse a number surrounded by optional whitespace.
fn padded_number(input: &mut &str) -> IResult<f64> {
    delimited(space0, number, space0).parse_next(input)
}

/// Parse the comma separating list items and color channels.
fn comma(input: &mut &str) -> IResult<char> {
    ','.parse_next(input)
}

/// Parse one color channel (0-255).
fn channel(input: &mut &str) -> IResult<u8> {
    delimited(
        space0,
        take_while(1..=3, |c: char| c.is_ascii_digit()).verify_map(|text: &str| text.parse().ok()),
        space0,
    )
    .parse_next(input)
}

/// Parse an RGB triple: `r,g,b` with optional spaces around each channel.
fn rgb_triple(input: &mut &str) -> IResult<(u8, u8, u8)> {
    let red = channel.parse_next(input)?;
    comma.parse_next(input)?;
    let green = channel.parse_next(input)?;
    comma.parse_next(input)?;
    let blue = channel.parse_next(input)?;
    Ok((red, green, blue))
}

/// Parse a hexadecimal color body (without `#`).
fn hex_color<'i>(input: &mut &'i str) -> IResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_hexdigit())
        .verify(|hex: &str| matches!(hex.len(), 3 | 6 | 8))
        .parse_next(input)
}

/// Parse a comma-separated list of numbers.
fn coordinate_list(input: &mut &str) -> IResult<Vec<f64>> {
    separated(1.., padded_number, comma).parse_next(input)
}

/// Run `parser` against the whole of `text`, failing on trailing input.
fn parse_complete<'i, O>(
    text: &'i str,
    parser: impl FnOnce(&mut &'i str) -> IResult<O>,
) -> Option<O> {
    let mut input = text;
    match parser(&mut input) {
        Ok(value) if input.is_empty() => Some(value),
        _ => None,
    }
}

/// Parse a legacy number string.
pub fn parse_number(text: &str) -> Option<f64> {
    parse_complete(text, padded_number)
}

/// Parse a legacy comma-separated coordinate list.
pub fn parse_coordinates(text: &str) -> Option<Vec<f64>> {
    parse_complete(text, coordinate_list)
}

/// Convert a legacy color to a `#`-prefixed hexadecimal color.
///
/// Hexadecimal input is kept as-is; RGB triples are converted to uppercase
/// two-digit channels.
///
/// # Examples
///
/// ```
/// # use edgecreator_legacy::value::rgb_to_hex;
/// assert_eq!(rgb_to_hex("0,0,0").unwrap(), "#000000");
/// assert_eq!(rgb_to_hex("255, 128, 9").unwrap(), "#FF8009");
/// assert_eq!(rgb_to_hex("ABCDEF").unwrap(), "#ABCDEF");
/// ```
pub fn rgb_to_hex(color: &str) -> Result<String, InvalidColor> {
    let trimmed = color.trim();
    if trimmed.contains(',') {
        parse_complete(trimmed, rgb_triple)
            .map(|(red, green, blue)| format!("#{red:02X}{green:02X}{blue:02X}"))
    } else {
        parse_complete(trimmed, hex_color).map(|hex| format!("#{hex}"))
    }
    .ok_or_else(|| InvalidColor(color.to_string()))
}

/// Typed, validated access to the options of one legacy step.
#[derive(Debug, Clone, Copy)]
pub struct LegacyFields<'a> {
    options: &'a LegacyOptions,
}

impl<'a> LegacyFields<'a> {
    pub fn new(options: &'a LegacyOptions) -> Self {
        Self { options }
    }

    /// Returns the raw value of `field`, treating `null` as absent.
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.options.get(field).filter(|value| !value.is_null())
    }

    /// Fails with [`NormalizeError::MissingField`] on the first absent field.
    pub fn require_all(&self, fields: &[&'static str]) -> Result<(), NormalizeError> {
        match fields.iter().find(|field| self.get(field).is_none()) {
            Some(field) => Err(NormalizeError::MissingField(*field)),
            None => Ok(()),
        }
    }

    fn require(&self, field: &'static str) -> Result<&'a Value, NormalizeError> {
        self.get(field).ok_or(NormalizeError::MissingField(field))
    }

    /// Returns `field` as text; numbers are rendered in their JSON form.
    pub fn text(&self, field: &'static str) -> Result<String, NormalizeError> {
        Ok(match self.require(field)? {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    /// Returns `field` as a number.
    pub fn number(&self, field: &'static str) -> Result<f64, NormalizeError> {
        let value = self.require(field)?;
        let parsed = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => parse_number(text),
            _ => None,
        };
        parsed.ok_or_else(|| NormalizeError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }

    /// Returns `field` as a number, or `default` when it is absent, empty or
    /// zero.
    pub fn number_or(&self, field: &'static str, default: f64) -> Result<f64, NormalizeError> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(default),
            Some(_) => {
                let number = self.number(field)?;
                Ok(if number == 0.0 { default } else { number })
            }
        }
    }

    /// Returns whether `field` holds the legacy affirmative `"Oui"`.
    pub fn flag(&self, field: &'static str) -> Result<bool, NormalizeError> {
        Ok(self.text(field)? == "Oui")
    }

    /// Returns `field` converted with [`rgb_to_hex`].
    pub fn color(&self, field: &'static str) -> Result<String, NormalizeError> {
        let text = self.text(field)?;
        rgb_to_hex(&text).map_err(|_| NormalizeError::InvalidColor { field, value: text })
    }

    /// Returns `field` parsed as a coordinate list.
    pub fn coordinates(&self, field: &'static str) -> Result<Vec<f64>, NormalizeError> {
        let text = self.text(field)?;
        parse_coordinates(&text).ok_or(NormalizeError::InvalidNumber { field, value: text })
    }
}
