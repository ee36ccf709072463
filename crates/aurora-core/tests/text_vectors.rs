//! Exposition parser vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use aurora_core::exposition::parse_text;

mod vector_loader;
use vector_loader::{expected_value, load};

#[test]
fn exposition_vectors() {
    let files = [
        "untyped_single.json",
        "gauge_with_type.json",
        "counter_with_help.json",
        "labelled_samples.json",
        "summary_family.json",
        "special_values.json",
        "bad_value.json",
        "bad_label_set.json",
        "duplicate_help.json",
        "unknown_type.json",
        "trailing_data.json",
        "bad_timestamp.json",
    ];

    for f in files {
        let v = load(f);
        let res = parse_text(&v.input);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.kind.as_str(), err.code, "vector={}", v.description);
            assert_eq!(e.line, err.line, "vector={}", v.description);
            continue;
        }

        let families = res.expect("expected ok families");
        let ex = v.expect.expect("missing expect block");
        assert_eq!(families.len(), ex.len(), "vector={}", v.description);

        for (family, want) in families.iter().zip(ex.iter()) {
            assert_eq!(family.name, want.name, "vector={}", v.description);
            assert_eq!(family.kind.as_str(), want.kind, "vector={}", v.description);
            assert_eq!(family.help, want.help, "vector={}", v.description);
            assert_eq!(family.samples.len(), want.values.len(), "vector={}", v.description);

            for (sample, value) in family.samples.iter().zip(want.values.iter()) {
                let want = expected_value(value);
                if want.is_nan() {
                    assert!(sample.value.is_nan(), "vector={}", v.description);
                } else {
                    assert_eq!(sample.value, want, "vector={}", v.description);
                }
            }
        }
    }
}

#[test]
fn failing_file_returns_nothing() {
    // The valid family before the bad line must not leak out.
    let v = load("bad_value.json");
    assert!(v.input.starts_with("ok_metric"));
    assert!(parse_text(&v.input).is_err());
}
