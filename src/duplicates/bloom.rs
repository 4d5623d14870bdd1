//! Fixed-size bloom filter keyed by digest hex strings.
//!
//! # Overview
//!
//! The filter is sized exactly once, from the number of candidates found by
//! the walk and a target false-positive probability:
//!
//! ```text
//! m = ceil(n / ln2 * -log2(p))     bits
//! k = ceil(ln2 * m / n)            probes
//! ```
//!
//! Probe positions come from double hashing over a BLAKE3 digest of the
//! lowercased key, `h1 + i * h2 mod m` for `i` in `0..k`. Keys are hex
//! digests, so lowercasing makes membership case-insensitive.
//!
//! Bit `i` lives in byte `i / 8` at bit `i % 8`; this is also the on-disk
//! layout used by [`crate::persist`].
//!
//! # Example
//!
//! ```
//! use bloomdupe::duplicates::{BloomConfig, BloomFilter};
//!
//! let mut filter = BloomFilter::with_capacity(1000, &BloomConfig::default());
//! assert!(!filter.query("abc123"));
//! filter.insert("ABC123");
//! assert!(filter.query("abc123"));
//! ```

use std::f64::consts::LN_2;

/// Default target false-positive probability.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Filter sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomConfig {
    /// Target false-positive probability, in (0, 1).
    pub false_positive_rate: f64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
        }
    }
}

impl BloomConfig {
    /// Set the target false-positive probability.
    #[must_use]
    pub fn with_false_positive_rate(mut self, rate: f64) -> Self {
        self.false_positive_rate = rate;
        self
    }
}

/// Errors loading raw bits into a filter.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BloomError {
    /// The byte slice does not match the filter's sized length.
    #[error("Filter holds {expected} bytes, snapshot has {actual}")]
    LengthMismatch {
        /// Byte length of the freshly sized filter
        expected: usize,
        /// Byte length offered
        actual: usize,
    },
}

/// Bit array with `k` probes per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u8>,
    bit_count: usize,
    hash_count: u32,
}

impl BloomFilter {
    /// Compute `(m, k)` for `n` expected keys at false-positive rate `p`.
    ///
    /// `n` is treated as at least 1 and both results are at least 1.
    ///
    /// # Example
    ///
    /// ```
    /// use bloomdupe::duplicates::BloomFilter;
    ///
    /// assert_eq!(BloomFilter::size_for(1000, 0.0001), (19171, 14));
    /// ```
    #[must_use]
    pub fn size_for(n: usize, p: f64) -> (usize, u32) {
        let n = n.max(1) as f64;
        let p = p.clamp(f64::MIN_POSITIVE, 1.0);

        let m = (n / LN_2 * -p.log2()).ceil();
        let m = if m.is_finite() && m >= 1.0 { m as usize } else { 1 };

        let k = (LN_2 * m as f64 / n).ceil();
        let k = if k.is_finite() && k >= 1.0 { k as u32 } else { 1 };

        (m, k)
    }

    /// Build an empty filter sized for `n` keys.
    #[must_use]
    pub fn with_capacity(n: usize, config: &BloomConfig) -> Self {
        let (bit_count, hash_count) = Self::size_for(n, config.false_positive_rate);
        log::debug!(
            "'{} {} {}' (bloom filter parameters)",
            bit_count,
            n,
            hash_count
        );
        Self {
            bits: vec![0u8; bit_count.div_ceil(8)],
            bit_count,
            hash_count,
        }
    }

    /// Number of bits, `m`.
    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// Number of probes per key, `k`.
    #[must_use]
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Length of the backing byte array, `ceil(m / 8)`.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bits.len()
    }

    /// Number of set bits.
    #[must_use]
    pub fn ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Add `key`. Inserting twice has no further effect.
    pub fn insert(&mut self, key: &str) {
        for bit in self.probes(key) {
            self.bits[bit / 8] |= 1 << (bit % 8);
        }
    }

    /// Whether every probe position for `key` is set.
    ///
    /// Never false for a key that was inserted.
    #[must_use]
    pub fn query(&self, key: &str) -> bool {
        self.probes(key)
            .all(|bit| self.bits[bit / 8] & (1 << (bit % 8)) != 0)
    }

    /// Raw bit array.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Replace the bit array with `bytes`.
    ///
    /// Bits past `m` in the final byte are cleared.
    ///
    /// # Errors
    ///
    /// Returns [`BloomError::LengthMismatch`] unless `bytes` is exactly
    /// [`BloomFilter::byte_len`] long. The filter is left unchanged.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), BloomError> {
        if bytes.len() != self.bits.len() {
            return Err(BloomError::LengthMismatch {
                expected: self.bits.len(),
                actual: bytes.len(),
            });
        }
        self.bits.copy_from_slice(bytes);

        let tail = self.bit_count % 8;
        if tail != 0 {
            if let Some(last) = self.bits.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }
        Ok(())
    }

    fn probes(&self, key: &str) -> impl Iterator<Item = usize> {
        let digest = blake3::hash(key.to_ascii_lowercase().as_bytes());
        let bytes = digest.as_bytes();
        let h1 = u64::from_le_bytes(word(bytes, 0));
        let h2 = u64::from_le_bytes(word(bytes, 8));
        let m = self.bit_count as u64;

        (0..u64::from(self.hash_count))
            .map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
    }
}

fn word(bytes: &[u8; 32], offset: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes[offset..offset + 8]);
    out
}
