use std::collections::HashMap;
use string_cache::DefaultAtom as Atom;

/// Identifies a derived image: the source it came from and the brightness
/// factor applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    base: Atom,
    factor_bits: u64,
}

impl VariantKey {
    /// Factors are clamped to 0..=1 before keying; NaN maps to 0.
    pub fn new(base: &str, factor: f64) -> Self {
        Self {
            base: Atom::from(base),
            factor_bits: normalize_factor(factor).to_bits(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn factor(&self) -> f64 {
        f64::from_bits(self.factor_bits)
    }
}

pub fn normalize_factor(factor: f64) -> f64 {
    if factor.is_nan() || factor <= 0.0 {
        0.0
    } else {
        factor.min(1.0)
    }
}

/// Memoises brightness-adjusted variants within a trial.
#[derive(Debug)]
pub struct VariantCache<V> {
    entries: HashMap<VariantKey, V>,
    hits: u64,
    misses: u64,
}

impl<V: Clone> VariantCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_insert_with<F>(&mut self, key: VariantKey, build: F) -> V
    where
        F: FnOnce(f64) -> V,
    {
        if let Some(v) = self.entries.get(&key) {
            self.hits += 1;
            return v.clone();
        }
        self.misses += 1;
        let value = build(key.factor());
        self.entries.insert(key, value.clone());
        value
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl<V: Clone> Default for VariantCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_variant_once() {
        let mut cache: VariantCache<String> = VariantCache::new();
        let mut builds = 0;
        for _ in 0..3 {
            let v = cache.get_or_insert_with(VariantKey::new("board_a.png", 0.4), |f| {
                builds += 1;
                format!("a@{f}")
            });
            assert_eq!(v, "a@0.4");
        }
        assert_eq!(builds, 1);
        assert_eq!((cache.hits(), cache.misses()), (2, 1));

        cache.get_or_insert_with(VariantKey::new("board_b.png", 0.4), |f| format!("b@{f}"));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn factors_are_clamped_before_keying() {
        assert_eq!(VariantKey::new("a", 1.7), VariantKey::new("a", 1.0));
        assert_eq!(VariantKey::new("a", -0.0), VariantKey::new("a", 0.0));
        assert_eq!(VariantKey::new("a", f64::NAN).factor(), 0.0);
        assert_ne!(VariantKey::new("a", 0.5), VariantKey::new("b", 0.5));
    }
}
