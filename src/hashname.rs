//! Human-readable names from content digests.
//!
//! A value is serialized canonically, hashed into one 64-bit word per
//! requested name chunk, and every word picks an entry of a fixed word
//! list. Chunks alternate adjective / noun, so two chunks give
//! `"Fluffy Dragon"` and three give `"Fluffy Dragon Merry"`.
//!
//! Names are labels, not identifiers with a uniqueness guarantee: with
//! 128 adjectives and 128 nouns, three words give about two million names,
//! which keeps accidental merges rare for result sets of a few hundred
//! models.

use serde::Serialize;

use crate::canonical::canonical_digest;

/// Smallest accepted number of words in a name.
pub const MIN_WORDS: usize = 1;

/// Largest accepted number of words in a name.
pub const MAX_WORDS: usize = 6;

/// Default number of words in a name.
pub const DEFAULT_WORDS: usize = 3;

/// Adjective list (even chunks).
pub const ADJECTIVES: [&str; 128] = [
    "adoptive", "amber", "ancient", "anomalous", "awesome", "back", "bitter", "black",
    "blue", "bold", "brave", "brisk", "broken", "bronze", "calm", "candid",
    "cheerful", "clever", "cloned", "cold", "cool", "cosmic", "crimson", "crisp",
    "curious", "daring", "deep", "dizzy", "dusty", "eager", "early", "electric",
    "emerald", "endless", "fancy", "fierce", "firing", "flying", "fluffy", "foggy",
    "frosty", "gentle", "giant", "gilded", "glad", "golden", "good", "grand",
    "green", "grey", "happy", "hidden", "holy", "honest", "hot", "humble",
    "hungry", "icy", "idle", "jolly", "keen", "kind", "lazy", "little",
    "lively", "lonely", "loud", "lowcost", "lucky", "magnificent", "majestic", "malevolent",
    "merry", "mighty", "misty", "modern", "mounted", "narrow", "ninja", "noble",
    "odd", "orange", "pale", "patient", "pink", "polite", "proofread", "proud",
    "pure", "purple", "quick", "quiet", "rapid", "real", "red", "regular",
    "rusty", "secret", "seismic", "short", "shy", "silent", "silver", "simple",
    "singing", "sleepy", "small", "soft", "solar", "sunny", "swift", "tall",
    "tiny", "tormenting", "twisted", "urban", "velvet", "venomous", "violet", "vivid",
    "walking", "wandering", "warm", "wild", "wise", "witty", "yellow", "yodelling",
];

/// Noun list (odd chunks).
pub const NOUNS: [&str; 128] = [
    "anchor", "apple", "archetype", "atom", "badger", "base", "battery", "bean",
    "bear", "bell", "book", "bridge", "burger", "bus", "cactus", "canyon",
    "castle", "cat", "cloud", "comet", "compass", "computer", "course", "cube",
    "dog", "dragon", "dress", "driver", "eagle", "engine", "eye", "falcon",
    "feather", "forest", "fox", "galaxy", "garden", "gears", "glacier", "god",
    "harbor", "hawk", "heart", "horse", "invasion", "island", "jean", "jewelry",
    "juice", "kettle", "lantern", "lead", "leaf", "light", "lighthouse", "luck",
    "meadow", "meteor", "micro", "monday", "moon", "mountain", "mustache", "night",
    "nitrite", "nose", "number", "ocean", "office", "orchard", "otter", "owl",
    "paper", "paw", "pebble", "pepper", "pine", "plane", "polder", "predator",
    "purity", "queen", "rain", "ritual", "river", "rock", "roof", "saint",
    "santa", "scream", "sheep", "shield", "shock", "spice", "spouse", "star",
    "storm", "submarine", "sun", "sunday", "teapot", "thief", "thunder", "tiger",
    "tower", "tree", "trope", "turtle", "unicorn", "valley", "velvet", "vessel",
    "violin", "volcano", "walrus", "watchtower", "waters", "well", "whale", "willow",
    "window", "wings", "wizard", "wolf", "yodeler", "zebra", "zephyr", "zeppelin",
];

/// Derive a pronounceable name from any serializable value.
///
/// `words` is clamped to `MIN_WORDS..=MAX_WORDS`.
pub fn from_value<T: Serialize>(value: &T, words: usize) -> String {
    let words = words.clamp(MIN_WORDS, MAX_WORDS);
    canonical_digest(value, words)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| title_case(word_for(i, chunk)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn word_for(position: usize, chunk: u64) -> &'static str {
    let list: &[&str] = if position % 2 == 0 { &ADJECTIVES } else { &NOUNS };
    list[(chunk % list.len() as u64) as usize]
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_name_shape() {
        let name = from_value(&("assign", 1, 2), 3);
        let parts: Vec<&str> = name.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert!(ADJECTIVES.contains(&parts[0].to_lowercase().as_str()));
        assert!(NOUNS.contains(&parts[1].to_lowercase().as_str()));
        assert!(ADJECTIVES.contains(&parts[2].to_lowercase().as_str()));
        assert!(parts.iter().all(|p| p.chars().next().unwrap().is_uppercase()));
    }

    #[test]
    fn test_word_count_is_clamped() {
        assert_eq!(from_value(&1, 0).split(' ').count(), MIN_WORDS);
        assert_eq!(from_value(&1, 99).split(' ').count(), MAX_WORDS);
    }

    #[test]
    fn test_word_lists_have_no_duplicates() {
        let adjectives: BTreeSet<_> = ADJECTIVES.iter().collect();
        let nouns: BTreeSet<_> = NOUNS.iter().collect();
        assert_eq!(adjectives.len(), ADJECTIVES.len());
        assert_eq!(nouns.len(), NOUNS.len());
    }

    #[test]
    fn test_few_collisions_for_realistic_result_sizes() {
        let names: BTreeSet<String> = (0..300).map(|i| from_value(&vec![i, i * 7], 3)).collect();
        // 300 draws over ~2M names: a couple of merges at most.
        assert!(names.len() >= 297, "too many collisions: {}", 300 - names.len());
    }
}
