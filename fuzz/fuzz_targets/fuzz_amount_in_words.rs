#![no_main]

use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;

fuzz_target!(|data: (i64, u8)| {
    let (mantissa, scale) = data;
    if let Ok(amount) = Decimal::try_new(mantissa, u32::from(scale % 29)) {
        let words = facturador::fiscal::amount_in_words(amount, "dollar", "dollars");
        assert!(!words.is_empty());
    }
});
