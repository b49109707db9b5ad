#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(doc) = xsort::parse(s) {
            let out = xsort::serialize(&doc);
            assert!(xsort::parse(&out).is_ok(), "serialized output must reparse");
        }
    }
});
