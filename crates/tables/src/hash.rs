use xxhash_rust::xxh3::xxh3_64;

/// A 64-bit non-cryptographic content hash (spec §4.6: "a hash (64-bit
/// non-cryptographic; xxHash-family)"). Used by the cache to fingerprint an
/// entity's own definition and to combine it with its dependency closure.
pub fn content_hash(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Combine a sequence of upstream hashes with this entity's own hash into
/// one dependency-closure hash, order-independent (spec §4.6: "recursively
/// merged definitions of all entities it depends on"). XOR-folding keeps the
/// combination commutative and associative so that closure hashing doesn't
/// depend on traversal order.
pub fn combine_hashes(own: u64, upstream: impl IntoIterator<Item = u64>) -> u64 {
    upstream.into_iter().fold(own, |acc, h| acc ^ h.rotate_left(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }

    #[test]
    fn combine_is_order_independent() {
        let a = combine_hashes(1, vec![2, 3]);
        let b = combine_hashes(1, vec![3, 2]);
        assert_eq!(a, b);
    }
}
