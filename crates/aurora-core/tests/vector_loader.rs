//! JSON test vector loader shared by exposition tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::fs;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub input: String,
    #[serde(default)]
    pub expect: Option<Vec<ExpectFamily>>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectFamily {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub help: String,
    /// Sample values in file order; `"NaN"`, `"+Inf"` and `"-Inf"` as strings.
    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
    pub line: usize,
}

pub fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

/// Decode an expected value, accepting the special float spellings as strings.
pub fn expected_value(v: &serde_json::Value) -> f64 {
    match v {
        serde_json::Value::Number(n) => n.as_f64().unwrap(),
        serde_json::Value::String(s) => s.parse().expect("special float in test vector"),
        other => panic!("unsupported expected value: {other}"),
    }
}
