//! Reversible encoding of emoji into storage-safe reaction keys.
//!
//! An emoji is split into its Unicode scalar values, each rendered as
//! lowercase hex, joined with `_` and prefixed with `u_`:
//!
//! ```
//! use hearth_shared::reaction;
//!
//! assert_eq!(reaction::encode("\u{2764}\u{fe0f}"), "u_2764_fe0f");
//! assert_eq!(reaction::decode("u_2764_fe0f").unwrap(), "\u{2764}\u{fe0f}");
//! ```
//!
//! Keys without the prefix are legacy plain-emoji keys and decode to
//! themselves.

use crate::constants::{REACTION_KEY_PREFIX, REACTION_KEY_SEPARATOR};
use crate::error::ReactionKeyError;

/// Encode an emoji (or any grapheme sequence) as a reaction key.
pub fn encode(emoji: &str) -> String {
    let mut key = String::with_capacity(REACTION_KEY_PREFIX.len() + emoji.len() * 3);
    key.push_str(REACTION_KEY_PREFIX);
    for (i, c) in emoji.chars().enumerate() {
        if i > 0 {
            key.push(REACTION_KEY_SEPARATOR);
        }
        key.push_str(&format!("{:x}", c as u32));
    }
    key
}

/// Decode a reaction key back into the emoji it represents.
pub fn decode(key: &str) -> Result<String, ReactionKeyError> {
    let Some(body) = key.strip_prefix(REACTION_KEY_PREFIX) else {
        return Ok(key.to_string());
    };

    body.split(REACTION_KEY_SEPARATOR)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let value = u32::from_str_radix(token, 16)
                .map_err(|_| ReactionKeyError::InvalidHex(token.to_string()))?;
            char::from_u32(value).ok_or(ReactionKeyError::InvalidCodepoint(value))
        })
        .collect()
}

/// Whether `key` is already in encoded form.
pub fn is_encoded(key: &str) -> bool {
    key.starts_with(REACTION_KEY_PREFIX)
}

/// Bring a stored key into encoded form. Encoded keys pass through.
pub fn normalize(key: &str) -> String {
    if is_encoded(key) {
        key.to_string()
    } else {
        encode(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_heart_with_selector() {
        assert_eq!(encode("❤️"), "u_2764_fe0f");
    }

    #[test]
    fn test_encode_is_lowercase_hex() {
        assert_eq!(encode("😀"), "u_1f600");
    }

    #[test]
    fn test_decode_reverses_multi_codepoint_sequences() {
        let samples = [
            "👍",
            "👍🏽",
            "👨‍👩‍👧‍👦",
            "🏳️‍🌈",
            "🇫🇷",
            "a",
            "",
        ];
        for emoji in samples {
            assert_eq!(decode(&encode(emoji)).unwrap(), emoji, "emoji {emoji:?}");
        }
    }

    #[test]
    fn test_distinct_emoji_get_distinct_keys() {
        // Same leading codepoint, different modifiers.
        assert_ne!(encode("👍"), encode("👍🏽"));
        assert_ne!(encode("❤"), encode("❤️"));
        // Concatenation boundaries cannot collide because `_` is not hex.
        assert_ne!(encode("\u{1}\u{23}"), encode("\u{12}\u{3}"));
    }

    #[test]
    fn test_legacy_key_passes_through() {
        assert_eq!(decode("🔥").unwrap(), "🔥");
        assert_eq!(decode("thumbsup").unwrap(), "thumbsup");
    }

    #[test]
    fn test_decode_skips_empty_tokens() {
        assert_eq!(decode("u_").unwrap(), "");
        assert_eq!(decode("u__1f600_").unwrap(), "😀");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(
            decode("u_zz"),
            Err(ReactionKeyError::InvalidHex("zz".to_string()))
        );
        assert_eq!(decode("u_d800"), Err(ReactionKeyError::InvalidCodepoint(0xd800)));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("👍"), "u_1f44d");
        assert_eq!(normalize("u_1f44d"), "u_1f44d");
        assert!(is_encoded(&normalize("🎉")));
    }
}
