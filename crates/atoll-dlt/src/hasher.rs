//! Mapping from object keys to tokens.
//!
//! The DLT does not own the key hash; the request layer supplies one through
//! [`TokenHasher`]. [`Blake3TokenHasher`] is the default used by the tooling.

/// Maps an arbitrary key onto the `2^num_bits_for_token` token keyspace.
///
/// Implementations must be pure: every node must compute the same token for
/// the same key.
pub trait TokenHasher {
    /// Token index for `key`, expected in `0..2^num_bits_for_token`.
    fn token(&self, key: &[u8], num_bits_for_token: u32) -> u32;
}

impl<F> TokenHasher for F
where
    F: Fn(&[u8], u32) -> u32,
{
    fn token(&self, key: &[u8], num_bits_for_token: u32) -> u32 {
        self(key, num_bits_for_token)
    }
}

/// Takes the top `num_bits_for_token` bits of `blake3(key)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3TokenHasher;

impl TokenHasher for Blake3TokenHasher {
    fn token(&self, key: &[u8], num_bits_for_token: u32) -> u32 {
        if num_bits_for_token == 0 {
            return 0;
        }
        let hash = blake3::hash(key);
        let bytes: [u8; 4] = [
            hash.as_bytes()[0],
            hash.as_bytes()[1],
            hash.as_bytes()[2],
            hash.as_bytes()[3],
        ];
        u32::from_be_bytes(bytes) >> (32 - num_bits_for_token.min(32))
    }
}
