//! Shared proptest generators.

use proptest::prelude::*;

/// Generate subject identifiers in the shapes callers actually send:
/// hyphenated GUIDs, compact hex ids and short handles.
pub fn subject_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<u128>().prop_map(|n| uuid::Uuid::from_u128(n).to_string()),
        "[a-f0-9]{32}",
        "[a-zA-Z0-9_-]{1,64}",
    ]
}

/// Generate strings that must be rejected as subjects.
pub fn invalid_subject_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        "[a-z]{1,8}[\\x00-\\x1f][a-z]{1,8}",
        "[a-z]{257,300}",
    ]
}

/// Generate HMAC secrets of at least 32 bytes.
pub fn secret_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#%^&*_+=-]{32,96}"
}

/// Generate a pair of distinct HMAC secrets.
pub fn secret_pair_strategy() -> impl Strategy<Value = (String, String)> {
    (secret_strategy(), secret_strategy()).prop_filter("secrets must differ", |(a, b)| a != b)
}

/// Generate token lifetimes in seconds, from one minute to thirty days.
pub fn ttl_seconds_strategy() -> impl Strategy<Value = i64> {
    60i64..2_592_000
}
