//! Shared RSA key pool.

use std::sync::OnceLock;

use safehall_core::KeyPair;

/// Number of distinct key pairs in the pool.
pub const POOL_SIZE: usize = 6;

static POOL: OnceLock<Vec<KeyPair>> = OnceLock::new();

/// All pooled key pairs, generated on first use.
pub fn key_pool() -> &'static [KeyPair] {
    POOL.get_or_init(|| {
        (0..POOL_SIZE)
            .map(|_| KeyPair::generate().expect("RSA key generation failed"))
            .collect()
    })
}

/// The `index`-th pooled key pair. Panics if `index >= POOL_SIZE`.
pub fn pooled_key(index: usize) -> KeyPair {
    key_pool()[index].clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_keys_are_distinct() {
        let pool = key_pool();
        assert_eq!(pool.len(), POOL_SIZE);
        for (i, a) in pool.iter().enumerate() {
            for b in &pool[i + 1..] {
                assert_ne!(a.fingerprint(), b.fingerprint());
            }
        }
    }
}
