//! Property-based tests for classifier reply parsing.

use aide::domain::models::classification::clamp_confidence;
use aide::domain::models::QueryIntent;
use aide::services::classifier::parse_classification;
use proptest::prelude::*;
use test_strategy::proptest;

fn intent_name() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(QueryIntent::all().to_vec()).prop_map(|i| i.as_str().to_string()),
        "[a-z_]{1,20}",
    ]
}

#[proptest]
fn parse_never_panics(raw: String) {
    let _ = parse_classification(&raw);
}

/// Text mixing think tags with characters whose lowercase form changes byte length.
fn tagged_text() -> impl Strategy<Value = String> {
    let pieces = prop::sample::select(vec![
        "<think>", "</think>", "<THINK>", "</Think>", "İ", "\u{212A}", "ẞ", "ß", "Σ", "a", " ", "\n", "{", "}",
    ]);
    prop::collection::vec(pieces, 0..24).prop_map(|parts| parts.concat())
}

fn reasoning_prefix() -> impl Strategy<Value = String> {
    let pieces = prop::sample::select(vec!["<think>", "</think>", "<THINK>", "İ", "\u{212A}", "ẞ", "Σ", "x", " "]);
    prop::collection::vec(pieces, 0..16).prop_map(|parts| parts.concat())
}

#[proptest]
fn parse_never_panics_on_think_tags(#[strategy(tagged_text())] raw: String) {
    let _ = parse_classification(&raw);
}

#[proptest]
fn json_after_closing_think_tag_is_kept(
    #[strategy(reasoning_prefix())] prefix: String,
    #[strategy(prop::sample::select(QueryIntent::all().to_vec()))] intent: QueryIntent,
) {
    let raw = format!("{prefix}</think>{{\"intent\": \"{}\", \"confidence\": 0.9}}", intent.as_str());
    let result = parse_classification(&raw).unwrap();
    prop_assert_eq!(result.intent, intent);
}

#[proptest]
fn confidence_is_always_clamped(#[strategy(intent_name())] intent: String, confidence: f64) {
    let raw = serde_json::json!({ "intent": intent, "confidence": confidence }).to_string();
    // Non-finite floats serialize as null and take the fallback path.
    let result = parse_classification(&raw).unwrap();
    prop_assert!((0.0..=1.0).contains(&result.confidence));
}

#[proptest]
fn unknown_intents_become_general_chat(#[strategy("[a-z]{3,12}_x")] intent: String) {
    let raw = format!(r#"{{"intent": "{intent}", "confidence": 0.9}}"#);
    let result = parse_classification(&raw).unwrap();
    prop_assert_eq!(result.intent, QueryIntent::GeneralChat);
}

#[proptest]
fn known_intents_survive_fences_and_prose(
    #[strategy(prop::sample::select(QueryIntent::all().to_vec()))] intent: QueryIntent,
    #[strategy(0.0f64..=1.0)] confidence: f64,
    #[strategy("[A-Za-z ,.]{0,40}")] preamble: String,
) {
    let raw = format!(
        "{preamble}\n```json\n{{\"intent\": \"{}\", \"confidence\": {confidence}, \"reasoning\": \"r\"}}\n```",
        intent.as_str()
    );
    let result = parse_classification(&raw).unwrap();
    prop_assert_eq!(result.intent, intent);
    prop_assert!((result.confidence - confidence).abs() < 1e-9);
}

#[proptest]
fn clamp_stays_in_unit_interval(value: f64) {
    let clamped = clamp_confidence(value);
    prop_assert!((0.0..=1.0).contains(&clamped));
    if (0.0..=1.0).contains(&value) {
        prop_assert_eq!(clamped, value);
    }
}
