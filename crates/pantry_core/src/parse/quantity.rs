//! Free-text ingredient quantity parser.
//!
//! Accepts two orderings:
//! - quantity, unit, name: `20kg potatoes`, `1,5 l milk`, `1/2 cup sugar`
//! - name, quantity, unit: `potatoes 20 kg`, `milk 1.5l`
//!
//! # Invariants
//! - Input that matches neither ordering is an error, never a default.
//! - Input that matches both orderings is reported as ambiguous.
//! - Quantities are finite and strictly positive.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static QUANTITY_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<qty>[0-9]+(?:[.,][0-9]+)?(?:/[0-9]+)?)\s*(?P<unit>\p{L}+)\.?\s+(?P<name>.+)$")
        .expect("valid quantity-first regex")
});
static NAME_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+?)\s+(?P<qty>[0-9]+(?:[.,][0-9]+)?(?:/[0-9]+)?)\s*(?P<unit>\p{L}+)\.?$")
        .expect("valid name-first regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Structured result of [`parse_quantity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuantity {
    pub quantity: f64,
    /// Unit text as typed, without a trailing period.
    pub unit: String,
    /// Item name, whitespace-collapsed.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuantityParseError {
    Empty,
    NoMatch(String),
    Ambiguous {
        input: String,
        quantity_first: ParsedQuantity,
        name_first: ParsedQuantity,
    },
    InvalidQuantity(String),
}

impl Display for QuantityParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "quantity text is empty"),
            Self::NoMatch(input) => write!(
                f,
                "`{input}` is not `<quantity><unit> <name>` or `<name> <quantity><unit>`"
            ),
            Self::Ambiguous { input, .. } => {
                write!(f, "`{input}` can be read both as quantity-first and name-first")
            }
            Self::InvalidQuantity(raw) => write!(f, "invalid quantity `{raw}`"),
        }
    }
}

impl Error for QuantityParseError {}

/// Parses free text such as `20kg potatoes` or `potatoes 20 kg`.
pub fn parse_quantity(input: &str) -> Result<ParsedQuantity, QuantityParseError> {
    let normalized = WHITESPACE_RE.replace_all(input.trim(), " ").into_owned();
    if normalized.is_empty() {
        return Err(QuantityParseError::Empty);
    }

    let quantity_first = match_pattern(&QUANTITY_FIRST_RE, &normalized);
    let name_first = match_pattern(&NAME_FIRST_RE, &normalized);

    // A reading with a valid quantity wins over one whose quantity is rejected.
    match (quantity_first, name_first) {
        (Some(Ok(first)), Some(Ok(second))) if first == second => Ok(first),
        (Some(Ok(quantity_first)), Some(Ok(name_first))) => Err(QuantityParseError::Ambiguous {
            input: normalized,
            quantity_first,
            name_first,
        }),
        (Some(Ok(parsed)), _) | (_, Some(Ok(parsed))) => Ok(parsed),
        (Some(Err(err)), _) | (None, Some(Err(err))) => Err(err),
        (None, None) => Err(QuantityParseError::NoMatch(normalized)),
    }
}

fn match_pattern(
    pattern: &Regex,
    text: &str,
) -> Option<Result<ParsedQuantity, QuantityParseError>> {
    let caps = pattern.captures(text)?;
    let (qty, unit, name) = (caps.name("qty")?, caps.name("unit")?, caps.name("name")?);

    let name = name.as_str().trim();
    if name.is_empty() {
        return None;
    }

    Some(parse_amount(qty.as_str()).map(|quantity| ParsedQuantity {
        quantity,
        unit: unit.as_str().to_string(),
        name: name.to_string(),
    }))
}

/// Parses `12`, `1.5`, `1,5` or `3/4` into a positive finite number.
pub fn parse_amount(raw: &str) -> Result<f64, QuantityParseError> {
    let invalid = || QuantityParseError::InvalidQuantity(raw.to_string());
    let text = raw.trim().replace(',', ".");

    let value = match text.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f64 = numerator.parse().map_err(|_| invalid())?;
            let denominator: f64 = denominator.parse().map_err(|_| invalid())?;
            if denominator == 0.0 {
                return Err(invalid());
            }
            numerator / denominator
        }
        None => text.parse::<f64>().map_err(|_| invalid())?,
    };

    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{parse_amount, parse_quantity, ParsedQuantity, QuantityParseError};

    fn triple(quantity: f64, unit: &str, name: &str) -> ParsedQuantity {
        ParsedQuantity {
            quantity,
            unit: unit.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn parses_quantity_first_with_and_without_space() {
        assert_eq!(
            parse_quantity("20kg potatoes").unwrap(),
            triple(20.0, "kg", "potatoes")
        );
        assert_eq!(
            parse_quantity("20 kg potatoes").unwrap(),
            triple(20.0, "kg", "potatoes")
        );
    }

    #[test]
    fn parses_name_first_ordering() {
        assert_eq!(
            parse_quantity("potatoes 20 kg").unwrap(),
            triple(20.0, "kg", "potatoes")
        );
        assert_eq!(
            parse_quantity("potatoes 20kg").unwrap(),
            triple(20.0, "kg", "potatoes")
        );
    }

    #[test]
    fn both_orderings_agree() {
        let inputs = [
            ("3 l whole milk", "whole milk 3 l"),
            ("250g dark chocolate", "dark chocolate 250 g"),
            ("1.5 cups brown rice", "brown rice 1.5 cups"),
        ];
        for (quantity_first, name_first) in inputs {
            assert_eq!(
                parse_quantity(quantity_first).unwrap(),
                parse_quantity(name_first).unwrap(),
                "{quantity_first} vs {name_first}"
            );
        }
    }

    #[test]
    fn accepts_decimal_comma_fraction_and_trailing_period() {
        assert_eq!(parse_quantity("1,5 l milk").unwrap().quantity, 1.5);
        assert_eq!(parse_quantity("1/2 cup sugar").unwrap().quantity, 0.5);
        assert_eq!(
            parse_quantity("2 tbsp. olive oil").unwrap(),
            triple(2.0, "tbsp", "olive oil")
        );
    }

    #[test]
    fn collapses_whitespace_in_names() {
        assert_eq!(
            parse_quantity("  2   kg   sweet    potatoes ").unwrap(),
            triple(2.0, "kg", "sweet potatoes")
        );
    }

    #[test]
    fn rejects_text_matching_neither_ordering() {
        for input in ["potatoes", "20", "kg potatoes", "20 potatoes", "potatoes kg 20"] {
            assert!(
                matches!(parse_quantity(input), Err(QuantityParseError::NoMatch(_))),
                "{input} should not parse"
            );
        }
    }

    #[test]
    fn rejects_blank_input() {
        assert_eq!(parse_quantity("   "), Err(QuantityParseError::Empty));
    }

    #[test]
    fn reports_ambiguous_input() {
        let err = parse_quantity("2 kg potatoes 3 kg").unwrap_err();
        match err {
            QuantityParseError::Ambiguous {
                quantity_first,
                name_first,
                ..
            } => {
                assert_eq!(quantity_first, triple(2.0, "kg", "potatoes 3 kg"));
                assert_eq!(name_first, triple(3.0, "kg", "2 kg potatoes"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_and_divide_by_zero_quantities() {
        assert!(matches!(
            parse_quantity("0 kg potatoes"),
            Err(QuantityParseError::InvalidQuantity(_))
        ));
        assert!(matches!(
            parse_quantity("1/0 cup flour"),
            Err(QuantityParseError::InvalidQuantity(_))
        ));
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn valid_reading_wins_over_rejected_quantity() {
        assert_eq!(
            parse_quantity("2 kg potatoes 0 kg").unwrap(),
            triple(2.0, "kg", "potatoes 0 kg")
        );
        assert_eq!(
            parse_quantity("0 kg potatoes 3 kg").unwrap(),
            triple(3.0, "kg", "0 kg potatoes")
        );
        assert!(matches!(
            parse_quantity("0 kg potatoes 0 kg"),
            Err(QuantityParseError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn only_ascii_digits_count_as_quantities() {
        for input in ["\u{0662} kg potatoes", "potatoes \u{0662} kg"] {
            assert!(
                matches!(parse_quantity(input), Err(QuantityParseError::NoMatch(_))),
                "{input} should not parse"
            );
        }
    }
}
