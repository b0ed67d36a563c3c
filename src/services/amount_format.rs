use alloy::primitives::U256;

/// Format a raw token amount for display.
///
/// Integer part gets `,` thousands separators; at most two fractional digits
/// are kept (truncated, trailing zeros trimmed). `format_amount(1_234_500, 3)`
/// is `"1,234.5"`.
pub fn format_amount(raw: U256, decimals: u8) -> String {
    let decimals = usize::from(decimals);
    let digits = raw.to_string();

    if decimals == 0 {
        return group_thousands(&digits);
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);

    let fraction: String = frac_part.chars().take(2).collect();
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        group_thousands(int_part)
    } else {
        format!("{}.{}", group_thousands(int_part), fraction)
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(raw: &str) -> U256 {
        U256::from_str_radix(raw, 10).unwrap()
    }

    #[test]
    fn test_format_whole_tokens() {
        assert_eq!(format_amount(amount("1000000000000000000"), 18), "1");
        assert_eq!(format_amount(amount("1234567000000000000000000"), 18), "1,234,567");
    }

    #[test]
    fn test_format_fraction_truncated_to_two_digits() {
        assert_eq!(format_amount(amount("1234500"), 3), "1,234.5");
        assert_eq!(format_amount(amount("1239999"), 6), "1.23");
        assert_eq!(format_amount(amount("1005000"), 6), "1");
    }

    #[test]
    fn test_format_below_one() {
        assert_eq!(format_amount(amount("250000"), 6), "0.25");
        assert_eq!(format_amount(amount("5"), 6), "0");
        assert_eq!(format_amount(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_format_zero_decimals() {
        assert_eq!(format_amount(amount("1234567"), 0), "1,234,567");
        assert_eq!(format_amount(amount("999"), 0), "999");
    }
}
