#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // A document that parses must serialize and parse back to itself.
        if let Ok(doc) = facturador::fiscal::from_xml(s) {
            if let Ok(xml) = facturador::fiscal::to_xml(&doc) {
                let reparsed = facturador::fiscal::from_xml(&xml);
                assert!(reparsed.is_ok());
            }
        }
    }
});
