//! SCRAM attribute-pair codec
//!
//! SCRAM messages are comma-separated `key=value` pairs, e.g.
//! `r=abc,s=XYZ==,i=4096`. The codec splits and joins; attribute order is
//! fixed per message type by the callers, never here.

use std::collections::HashMap;

/// Parse an attribute-pair string into a key → value map.
///
/// Splits on `,`, then each element on the *first* `=`; values may themselves
/// contain `=` (base64 padding). Elements without an `=` are ignored.
/// Duplicate keys resolve last-wins.
pub fn parse(message: &str) -> HashMap<&str, &str> {
    message
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .collect()
}

/// Join ordered `(key, value)` pairs into an attribute-pair string.
pub fn format(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Escape a username for the `n=` attribute: `=` becomes `=3D`, then `,`
/// becomes `=2C`.
///
/// Only the first occurrence of each character is substituted, preserving
/// the wire behavior of the original driver line. Usernames with repeated
/// `=` or `,` are therefore only partially escaped; strict RFC 5802 would
/// replace every occurrence.
pub fn escape_username(username: &str) -> String {
    username.replacen('=', "=3D", 1).replacen(',', "=2C", 1)
}
