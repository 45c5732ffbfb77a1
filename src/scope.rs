use std::collections::HashMap;

use crate::registry::{DecoderKey, DecoderRegistry};

/// Which identifiers currently stand for which decoder.
///
/// One environment is live per lexical function scope. Entering a function
/// clones the enclosing environment, so bindings made inside never leak out.
#[derive(Debug, Clone, Default)]
pub struct AliasEnvironment {
    aliases: HashMap<String, DecoderKey>,
}

impl AliasEnvironment {
    /// Root environment where every decoder is reachable under its own name.
    pub fn seeded(registry: &DecoderRegistry) -> Self {
        let aliases = registry
            .keys()
            .into_iter()
            .map(|key| (key.as_str().to_owned(), key))
            .collect();
        Self { aliases }
    }

    pub fn resolve(&self, name: &str) -> Option<&DecoderKey> {
        self.aliases.get(name)
    }

    /// Makes `target` an alias of whatever `source` currently resolves to.
    ///
    /// Returns the propagated key, or `None` (leaving `target` untouched) when
    /// `source` is not a known alias.
    pub fn propagate(&mut self, target: &str, source: &str) -> Option<DecoderKey> {
        let key = self.resolve(source)?.clone();
        self.aliases.insert(target.to_owned(), key.clone());
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    fn registry() -> DecoderRegistry {
        let noop = |_: i64| -> Result<String, DecodeError> { Ok(String::new()) };
        DecoderRegistry::new().with("Ot", noop).with("mt", noop)
    }

    #[test]
    fn test_seeded_identity() {
        let env = AliasEnvironment::seeded(&registry());
        assert_eq!(env.resolve("Ot").map(DecoderKey::as_str), Some("Ot"));
        assert_eq!(env.resolve("mt").map(DecoderKey::as_str), Some("mt"));
        assert!(env.resolve("xt").is_none());
    }

    #[test]
    fn test_propagate_transitive() {
        let mut env = AliasEnvironment::seeded(&registry());

        assert!(env.propagate("x", "Ot").is_some());
        assert!(env.propagate("y", "x").is_some());
        assert!(env.propagate("z", "y").is_some());
        assert_eq!(env.resolve("z").map(DecoderKey::as_str), Some("Ot"));
    }

    #[test]
    fn test_propagate_unknown_source() {
        let mut env = AliasEnvironment::seeded(&registry());
        env.propagate("a", "Ot");

        assert!(env.propagate("a", "console").is_none());
        assert_eq!(env.resolve("a").map(DecoderKey::as_str), Some("Ot"));
    }

    #[test]
    fn test_clone_isolation() {
        let mut outer = AliasEnvironment::seeded(&registry());
        outer.propagate("a", "Ot");

        let mut inner = outer.clone();
        inner.propagate("a", "mt");
        inner.propagate("b", "mt");

        assert_eq!(outer.resolve("a").map(DecoderKey::as_str), Some("Ot"));
        assert!(outer.resolve("b").is_none());
        assert_eq!(inner.resolve("a").map(DecoderKey::as_str), Some("mt"));
    }
}
