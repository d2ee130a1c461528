//! Display formatting for bill amounts: Indian-numbering words and en-IN
//! digit grouping. Rendering only; never used in totals computation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn under_hundred(n: u64, out: &mut Vec<String>) {
    if n >= 20 {
        out.push(TENS[(n / 10) as usize].to_string());
        if n % 10 != 0 {
            out.push(ONES[(n % 10) as usize].to_string());
        }
    } else if n > 0 {
        out.push(ONES[n as usize].to_string());
    }
}

fn under_thousand(n: u64, out: &mut Vec<String>) {
    if n >= 100 {
        out.push(ONES[(n / 100) as usize].to_string());
        out.push("Hundred".to_string());
    }
    under_hundred(n % 100, out);
}

/// English words for a whole number in the Indian numbering system
/// (crore, lakh, thousand).
pub fn number_in_words(n: u64) -> String {
    if n == 0 {
        return "Zero".to_string();
    }
    let mut out = Vec::new();
    let (crore, rest) = (n / 1_00_00_000, n % 1_00_00_000);
    if crore > 0 {
        out.push(number_in_words(crore));
        out.push("Crore".to_string());
    }
    let (lakh, rest) = (rest / 1_00_000, rest % 1_00_000);
    if lakh > 0 {
        under_hundred(lakh, &mut out);
        out.push("Lakh".to_string());
    }
    let (thousand, rest) = (rest / 1_000, rest % 1_000);
    if thousand > 0 {
        under_hundred(thousand, &mut out);
        out.push("Thousand".to_string());
    }
    under_thousand(rest, &mut out);
    out.join(" ")
}

/// Rupee/paise amount in words, e.g.
/// `"Two Thousand One Hundred Seventy Four Rupees Only"` or
/// `"Five Rupees and Fifty Paise Only"`. Negative amounts are rendered by
/// their magnitude.
pub fn amount_in_words(amount: Decimal) -> String {
    let amount = amount.abs().round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let rupees = amount.trunc().to_u64().unwrap_or(0);
    let paise = ((amount - amount.trunc()) * Decimal::from(100)).to_u64().unwrap_or(0);
    if paise == 0 {
        format!("{} Rupees Only", number_in_words(rupees))
    } else {
        format!("{} Rupees and {} Paise Only", number_in_words(rupees), number_in_words(paise))
    }
}

/// Two-decimal display with Indian digit grouping: the last three integer
/// digits, then two-digit groups (`12,34,567.80`).
pub fn format_inr(amount: Decimal) -> String {
    let negative = amount < Decimal::ZERO;
    let amount = amount.abs().round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let rupees = amount.trunc().to_u128().unwrap_or(0);
    let paise = ((amount - amount.trunc()) * Decimal::from(100)).to_u64().unwrap_or(0);

    let digits = rupees.to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            groups.push(&head[end - 2..end]);
            end -= 2;
        }
        groups.push(&head[..end]);
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{paise:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_small_numbers() {
        assert_eq!(number_in_words(0), "Zero");
        assert_eq!(number_in_words(7), "Seven");
        assert_eq!(number_in_words(14), "Fourteen");
        assert_eq!(number_in_words(40), "Forty");
        assert_eq!(number_in_words(99), "Ninety Nine");
    }

    #[test]
    fn test_hundreds_and_thousands() {
        assert_eq!(number_in_words(105), "One Hundred Five");
        assert_eq!(number_in_words(999), "Nine Hundred Ninety Nine");
        assert_eq!(number_in_words(2174), "Two Thousand One Hundred Seventy Four");
        assert_eq!(number_in_words(45000), "Forty Five Thousand");
    }

    #[test]
    fn test_lakh_and_crore() {
        assert_eq!(number_in_words(1_00_000), "One Lakh");
        assert_eq!(number_in_words(12_34_567), "Twelve Lakh Thirty Four Thousand Five Hundred Sixty Seven");
        assert_eq!(number_in_words(1_00_00_000), "One Crore");
        assert_eq!(
            number_in_words(125_00_00_000),
            "One Hundred Twenty Five Crore"
        );
    }

    #[test]
    fn test_amount_in_words() {
        assert_eq!(amount_in_words(Decimal::ZERO), "Zero Rupees Only");
        assert_eq!(amount_in_words(dec("2174.0")), "Two Thousand One Hundred Seventy Four Rupees Only");
        assert_eq!(amount_in_words(dec("5.50")), "Five Rupees and Fifty Paise Only");
        assert_eq!(
            amount_in_words(dec("1234.05")),
            "One Thousand Two Hundred Thirty Four Rupees and Five Paise Only"
        );
    }

    #[test]
    fn test_inr_grouping() {
        assert_eq!(format_inr(dec("0")), "0.00");
        assert_eq!(format_inr(dec("999")), "999.00");
        assert_eq!(format_inr(dec("1000")), "1,000.00");
        assert_eq!(format_inr(dec("123456")), "1,23,456.00");
        assert_eq!(format_inr(dec("1234567.8")), "12,34,567.80");
        assert_eq!(format_inr(dec("100000000")), "10,00,00,000.00");
        assert_eq!(format_inr(dec("-2174.5")), "-2,174.50");
    }
}
