use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::core::money;

const UNITS: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];
const TEENS: [&str; 10] = [
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];
const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Render an amount for the "total in words" field.
///
/// The integer part is spelled out below 100 and written as digits from
/// 100 upwards. Cents, when present, follow as `NN/100`. Exactly one unit
/// takes the singular currency name.
///
/// ```
/// use facturador::fiscal::amount_in_words;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(amount_in_words(dec!(1.00), "dollar", "dollars"), "one dollar");
/// assert_eq!(amount_in_words(dec!(58.74), "dollar", "dollars"), "fifty-eight dollars and 74/100");
/// assert_eq!(amount_in_words(dec!(107.48), "dollar", "dollars"), "107 dollars and 48/100");
/// ```
pub fn amount_in_words(amount: Decimal, singular: &str, plural: &str) -> String {
    let rounded = money::round_money(amount.abs());
    let integer = rounded.trunc();
    let cents = ((rounded - integer) * Decimal::ONE_HUNDRED)
        .trunc()
        .to_u32()
        .unwrap_or(0);

    let unit = if integer == Decimal::ONE { singular } else { plural };
    let number = match integer.to_u64() {
        Some(n) if n < 100 => integer_words(n),
        _ => integer.to_string(),
    };

    let mut words = format!("{number} {unit}");
    if cents > 0 {
        words.push_str(&format!(" and {cents:02}/100"));
    }
    if amount.is_sign_negative() && !rounded.is_zero() {
        words.insert_str(0, "minus ");
    }
    words
}

fn integer_words(n: u64) -> String {
    match n {
        0..=9 => UNITS[n as usize].to_string(),
        10..=19 => TEENS[(n - 10) as usize].to_string(),
        _ => {
            let tens = TENS[(n / 10) as usize];
            match n % 10 {
                0 => tens.to_string(),
                unit => format!("{tens}-{}", UNITS[unit as usize]),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn words(amount: Decimal) -> String {
        amount_in_words(amount, "dollar", "dollars")
    }

    #[test]
    fn singular_unit() {
        assert_eq!(words(dec!(1.00)), "one dollar");
        assert_eq!(words(dec!(1)), "one dollar");
        assert_eq!(words(dec!(1.50)), "one dollar and 50/100");
    }

    #[test]
    fn small_numbers_are_spelled_out() {
        assert_eq!(words(dec!(0)), "zero dollars");
        assert_eq!(words(dec!(7)), "seven dollars");
        assert_eq!(words(dec!(13)), "thirteen dollars");
        assert_eq!(words(dec!(40)), "forty dollars");
        assert_eq!(words(dec!(99.99)), "ninety-nine dollars and 99/100");
    }

    #[test]
    fn large_numbers_pass_through() {
        assert_eq!(words(dec!(100)), "100 dollars");
        assert_eq!(words(dec!(1234567.05)), "1234567 dollars and 05/100");
    }

    #[test]
    fn cents_only() {
        assert_eq!(words(dec!(0.01)), "zero dollars and 01/100");
    }

    #[test]
    fn custom_currency_names() {
        assert_eq!(amount_in_words(dec!(1), "colón", "colones"), "one colón");
        assert_eq!(amount_in_words(dec!(2), "colón", "colones"), "two colones");
    }
}
