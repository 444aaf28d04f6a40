//! Placeholder keys for new map entries

use crate::node::Entries;
use ulid::Ulid;

/// Generate a key of the form `{prefix}_{ulid}` not present in `existing`
///
/// The ULID carries a millisecond timestamp plus random bits, so keys are
/// distinct across sessions without any shared counter.
#[must_use]
pub fn generate_key(prefix: &str, existing: &Entries) -> String {
    loop {
        let key = format!("{prefix}_{}", Ulid::new().to_string().to_lowercase());
        if !existing.contains_key(&key) {
            return key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use std::sync::Arc;

    #[test]
    fn keys_carry_prefix() {
        let key = generate_key("new_item", &Entries::new());
        assert!(key.starts_with("new_item_"));
        assert_eq!(key.len(), "new_item_".len() + 26);
    }

    #[test]
    fn keys_are_distinct_in_a_burst() {
        let mut entries = Entries::new();
        for _ in 0..200 {
            let key = generate_key("new_detail", &entries);
            assert!(!entries.contains_key(&key));
            entries.insert(key, Arc::new(Node::Null));
        }
        assert_eq!(entries.len(), 200);
    }
}
