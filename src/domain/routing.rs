//! Topic Routing
//!
//! Dot-delimited routing keys matched against binding patterns with AMQP
//! topic-exchange semantics: `*` matches exactly one word, `#` matches zero
//! or more words.

/// Check whether a binding pattern matches a concrete routing key.
pub fn topic_matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = key.split('.').collect();
    matches_words(&pattern, &key)
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match (pattern.first(), key.first()) {
        (None, None) => true,
        (Some(&"#"), _) => {
            // `#` absorbs zero words or one word and stays active
            matches_words(&pattern[1..], key)
                || (!key.is_empty() && matches_words(pattern, &key[1..]))
        }
        (Some(&"*"), Some(_)) => matches_words(&pattern[1..], &key[1..]),
        (Some(word), Some(first)) if word == first => matches_words(&pattern[1..], &key[1..]),
        _ => false,
    }
}
