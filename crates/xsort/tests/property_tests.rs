#![allow(clippy::panic_in_result_fn)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use proptest::collection::vec;
use proptest::prelude::*;
use xsort::{parse, serialize, sort, Document, KeyType, SortOptions};

// Each child carries its original position in `id` so stability can be checked
fn items_xml(keys: &[Option<String>]) -> String {
    let mut xml = String::from("<items>");
    for (id, key) in keys.iter().enumerate() {
        match key {
            Some(key) => xml.push_str(&format!(r#"<item id="{id}" k="{key}"/>"#)),
            None => xml.push_str(&format!(r#"<item id="{id}"/>"#)),
        }
    }
    xml.push_str("</items>");
    xml
}

fn children(doc: &Document) -> Vec<(Option<String>, usize)> {
    doc.root
        .children
        .iter()
        .map(|c| {
            (
                c.get("k").map(str::to_string),
                c.get("id").and_then(|id| id.parse().ok()).unwrap_or(usize::MAX),
            )
        })
        .collect()
}

fn key_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::weighted(0.8, "[a-e]{0,3}")
}

fn decimal_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::weighted(
        0.8,
        (-50i64..50, 0u8..100).prop_map(|(whole, cents)| format!("{whole}.{cents:02}")),
    )
}

proptest! {
    #[test]
    fn test_sort_is_idempotent(keys in vec(key_strategy(), 0..20), descending in any::<bool>()) {
        let options = SortOptions::new().with_descending(descending);
        let mut doc = parse(&items_xml(&keys)).unwrap();
        sort(&mut doc, ".", "k", &options).unwrap();
        let once = serialize(&doc);
        sort(&mut doc, ".", "k", &options).unwrap();
        prop_assert_eq!(serialize(&doc), once);
    }

    #[test]
    fn test_sorted_and_stable(keys in vec(key_strategy(), 0..20), descending in any::<bool>()) {
        let mut doc = parse(&items_xml(&keys)).unwrap();
        sort(&mut doc, ".", "k", &SortOptions::new().with_descending(descending)).unwrap();
        let result = children(&doc);
        prop_assert_eq!(result.len(), keys.len());

        for pair in result.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            if descending {
                prop_assert!(left.0 >= right.0);
            } else {
                prop_assert!(left.0 <= right.0);
            }
            if left.0 == right.0 {
                prop_assert!(left.1 < right.1, "equal keys changed relative order");
            }
        }
    }

    #[test]
    fn test_decimal_keys_sort_numerically(keys in vec(decimal_strategy(), 0..20)) {
        let mut doc = parse(&items_xml(&keys)).unwrap();
        let options = SortOptions::new().with_key_type(KeyType::Decimal);
        sort(&mut doc, ".", "k", &options).unwrap();

        let numbers: Vec<Option<f64>> = children(&doc)
            .into_iter()
            .map(|(key, _)| key.map(|k| k.parse::<f64>().unwrap()))
            .collect();
        for pair in numbers.windows(2) {
            match (pair[0], pair[1]) {
                (Some(left), Some(right)) => prop_assert!(left <= right),
                (Some(_), None) => prop_assert!(false, "absent key after a present one"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_roundtrip_without_sorting(keys in vec(key_strategy(), 1..10), text in "[a-z <>&\"\r]{0,12}") {
        let mut xml = items_xml(&keys);
        let escaped = text
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('\r', "&#13;");
        xml.insert_str(xml.len() - "</items>".len(), &escaped);
        let doc = parse(&xml).unwrap();
        prop_assert_eq!(serialize(&doc), xml);
    }

    #[test]
    fn test_parser_never_panics(input in "[<>a-z/=\"' :&;]{0,40}") {
        let _ = parse(&input);
    }
}
