//! Channel-id obfuscation
//!
//! Projects can be embedded with their source hidden ("no source" mode). To
//! keep viewers from reaching the full project page by twiddling the embed
//! URL, the channel id in that URL is passed through a fixed substitution
//! cipher. The id is encoded when an embed URL is generated and decoded when
//! the page path is parsed.
//!
//! This is obfuscation, not security: it only makes recovering the real
//! channel id slightly less trivial than editing the URL.

/// Plain channel-id alphabet.
pub const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Fixed permutation of [`ALPHABET`] used in no-source embed URLs.
pub const CIPHER: &str = "t9uvbq2wxn0mzr1ceyl7k8afd3gh6ij5os4p";

/// Encode a channel id for use in a no-source embed URL.
pub fn encode_channel_id(id: &str) -> String {
    substitute(id, ALPHABET, CIPHER)
}

/// Decode a channel id taken from a no-source embed URL.
pub fn decode_channel_id(id: &str) -> String {
    substitute(id, CIPHER, ALPHABET)
}

/// Character-by-character lookup of `from` against `to`. Characters outside
/// `from` pass through unchanged. Both alphabets are ASCII, so the byte index
/// returned by `find` is also the character index.
fn substitute(input: &str, from: &str, to: &str) -> String {
    input
        .chars()
        .map(|c| match from.find(c) {
            Some(i) => to.as_bytes()[i] as char,
            None => c,
        })
        .collect()
}
