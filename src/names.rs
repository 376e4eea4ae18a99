//! Generated node names.
//!
//! The `name` setting has no static default: a fresh `node-<suffix>` is
//! generated per request. The supplier is injected so callers (and tests)
//! can control the suffixes deterministically.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Source of generated node names.
pub trait NodeNameSupplier {
    /// Produce a fresh node name of the form `node-<suffix>`. Every call
    /// must return a distinct suffix.
    fn generate(&self) -> String;
}

/// Default supplier: an 8-character alphanumeric suffix from the thread
/// RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNodeName;

impl NodeNameSupplier for RandomNodeName {
    fn generate(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("node-{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_have_node_prefix() {
        let name = RandomNodeName.generate();
        assert!(name.starts_with("node-"), "unexpected name: {name}");
        assert_eq!(name.len(), "node-".len() + 8);
    }
}
