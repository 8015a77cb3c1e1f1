//! Tolerant numeric parsing for filer-supplied amounts.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse a monetary amount, falling back to zero.
///
/// Accepts currency symbols, thousands separators, surrounding whitespace,
/// accounting-style negatives (`(1,234)`) and scientific notation.
///
/// ```
/// use nport_holdings::parser::parse_money;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_money("$1,234.50"), Decimal::new(123450, 2));
/// assert_eq!(parse_money("n/a"), Decimal::ZERO);
/// ```
pub fn parse_money(text: &str) -> Decimal {
    parse_quantity(text).unwrap_or(Decimal::ZERO)
}

/// Parse a numeric quantity with the same rules as [`parse_money`],
/// returning `None` when the text holds no number.
pub fn parse_quantity(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | ','))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    let value = Decimal::from_str(digits)
        .or_else(|_| Decimal::from_scientific(digits))
        .ok()?;

    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_and_separators() {
        assert_eq!(parse_money("$1,234.50"), dec!(1234.50));
        assert_eq!(parse_money("  2,000,000 "), dec!(2000000));
        assert_eq!(parse_money("$ 12"), dec!(12));
    }

    #[test]
    fn test_parentheses_are_negative() {
        assert_eq!(parse_money("(1,234)"), dec!(-1234));
        assert_eq!(parse_money("-45.5"), dec!(-45.5));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(parse_money("1.5E7"), dec!(15000000));
        assert_eq!(parse_money("2.5e-2"), dec!(0.025));
    }

    #[test]
    fn test_unparsable_falls_back() {
        assert_eq!(parse_money("N/A"), Decimal::ZERO);
        assert_eq!(parse_money(""), Decimal::ZERO);
        assert_eq!(parse_money("12abc"), Decimal::ZERO);
        assert_eq!(parse_quantity("N/A"), None);
        assert_eq!(parse_quantity("   "), None);
    }

    #[test]
    fn test_long_fractional_values() {
        assert_eq!(parse_quantity("10000.000000000000"), Some(dec!(10000)));
    }
}
