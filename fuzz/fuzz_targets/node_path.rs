#![no_main]
use libfuzzer_sys::fuzz_target;
use xsort::{KeyType, SortOptions};

const DOC: &str = r#"<r xmlns:p="urn:p"><g n="2"><i n="3"/><i n="1"/></g><p:g n="1"><i/><i n="x"/></p:g></r>"#;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let (path, key) = s.split_once('\n').unwrap_or((s, "n"));
    let Ok(mut doc) = xsort::parse(DOC) else {
        return;
    };
    for key_type in [KeyType::Plain, KeyType::Decimal, KeyType::DateTime] {
        let options = SortOptions::new().with_key_type(key_type);
        let _ = xsort::sort(&mut doc, path, key, &options);
    }
});
