//! Constant Naming
//!
//! Maps attribute keys to the identifiers emitted in generated modules and
//! detects keys that would collapse onto the same identifier. Naming is
//! shared by every target: all three emit `SCREAMING_SNAKE_CASE` constants.

use std::collections::BTreeMap;

/// Constant identifier for an attribute key.
///
/// `media.song.duration_ms` becomes `MEDIA_SONG_DURATION_MS`.
pub fn constant_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '.' | '-' | ' ' => name.push('_'),
            c => name.push(c.to_ascii_uppercase()),
        }
    }
    name
}

/// Constant names claimed by more than one key, with the keys claiming them
pub fn find_collisions<'a>(keys: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, Vec<&'a str>> {
    let mut by_name: BTreeMap<String, Vec<&'a str>> = BTreeMap::new();
    for key in keys {
        by_name.entry(constant_name(key)).or_default().push(key);
    }
    by_name.retain(|_, keys| keys.len() > 1);
    for keys in by_name.values_mut() {
        keys.sort_unstable();
    }
    by_name
}
