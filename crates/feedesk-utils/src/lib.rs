//! Utility functions and helpers

use rust_decimal::Decimal;

/// Format a number with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    let s = n.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut result = String::new();
    let mut count = 0;
    for c in int_part.chars().rev() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    let mut out: String = result.chars().rev().collect();
    out.insert_str(0, sign);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a money amount with a currency symbol, dropping a zero fraction
pub fn format_amount(symbol: &str, amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let grouped = format_number(rounded.abs());
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}{}", symbol, grouped)
    } else {
        format!("{}{}", symbol, grouped)
    }
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1300), "1,300");
        assert_eq!(format_number(-1234567), "-1,234,567");
        assert_eq!(format_number("1234.5"), "1,234.5");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount("₹", Decimal::from(1300)), "₹1,300");
        assert_eq!(format_amount("₹", Decimal::from_str("1250.50").unwrap()), "₹1,250.5");
        assert_eq!(format_amount("₹", Decimal::from(-200)), "-₹200");
        assert_eq!(format_amount("₹", Decimal::ZERO), "₹0");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>O'Neil & \"Sons\"</b>"),
            "&lt;b&gt;O&#39;Neil &amp; &quot;Sons&quot;&lt;/b&gt;"
        );
    }
}
