//! Canonical content digests for deterministic fingerprints.
//!
//! Parameter hashes and graph fingerprints must be reproducible
//! across platforms and serializer versions, so hashed content never
//! goes through a float formatter or a serializer: callers fold
//! fields into a [`CanonicalDigest`] directly. Strings are
//! length-prefixed so adjacent fields cannot alias, integers are
//! folded little-endian, and floats are quantized to integers via
//! [`quantize`] first.

use std::hash::Hasher;

use xxhash_rust::xxh64::Xxh64;

/// Quantization factor applied to floats before hashing.
/// Floats are multiplied by this value and rounded to i64.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float for deterministic hashing.
///
/// Multiplies by 1e6 and rounds to i64, so digests do not depend on
/// float formatting differences between platforms.
pub fn quantize(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Accumulates canonical content into an xxh64 digest.
///
/// Field order is significant: callers must fold fields in a fixed,
/// documented order (sorted map order for collections).
pub struct CanonicalDigest {
    hasher: Xxh64,
}

impl std::fmt::Debug for CanonicalDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalDigest").finish()
    }
}

impl CanonicalDigest {
    /// Start an empty digest.
    pub fn new() -> Self {
        Self {
            hasher: Xxh64::new(0),
        }
    }

    /// Fold in a string, length-prefixed.
    pub fn write_str(&mut self, value: &str) {
        self.hasher.write(&(value.len() as u64).to_le_bytes());
        self.hasher.write(value.as_bytes());
    }

    /// Fold in a signed integer.
    pub fn write_i64(&mut self, value: i64) {
        self.hasher.write(&value.to_le_bytes());
    }

    /// Fold in a float via [`quantize`].
    pub fn write_f64(&mut self, value: f64) {
        self.write_i64(quantize(value));
    }

    /// Fold in a boolean.
    pub fn write_bool(&mut self, value: bool) {
        self.hasher.write(&[u8::from(value)]);
    }

    /// The digest value.
    pub fn finish(&self) -> u64 {
        self.hasher.finish()
    }

    /// The digest value as a hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:016x}", self.finish())
    }
}

impl Default for CanonicalDigest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_determinism() {
        let mut first = CanonicalDigest::new();
        first.write_str("alpha");
        first.write_f64(0.1);
        first.write_bool(true);

        let mut second = CanonicalDigest::new();
        second.write_str("alpha");
        second.write_f64(0.1);
        second.write_bool(true);

        assert_eq!(first.finish(), second.finish());
        assert_eq!(first.finish_hex().len(), 16);
    }

    #[test]
    fn test_digest_distinguishes_content() {
        let mut first = CanonicalDigest::new();
        first.write_str("alpha");
        let mut second = CanonicalDigest::new();
        second.write_str("beta");
        assert_ne!(first.finish(), second.finish());
    }

    #[test]
    fn test_length_prefix_prevents_aliasing() {
        let mut joined = CanonicalDigest::new();
        joined.write_str("ab");
        joined.write_str("c");

        let mut split = CanonicalDigest::new();
        split.write_str("a");
        split.write_str("bc");

        assert_ne!(joined.finish(), split.finish());
    }

    #[test]
    fn test_quantize_rounds() {
        assert_eq!(quantize(0.1), 100_000);
        assert_eq!(quantize(0.0000004), 0);
        assert_eq!(quantize(-0.25), -250_000);
    }

    #[test]
    fn test_quantized_floats_ignore_sub_resolution_noise() {
        let mut first = CanonicalDigest::new();
        first.write_f64(0.25);
        let mut second = CanonicalDigest::new();
        second.write_f64(0.25 + 1e-9);
        assert_eq!(first.finish(), second.finish());
    }
}
