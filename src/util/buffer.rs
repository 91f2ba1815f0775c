//! Payload buffer management
//!
//! This module provides input/output payload buffers for operations and the
//! fill patterns used to initialize them. Random fill produces incompressible
//! payloads; sequential fill produces highly regular ones. The pattern matters
//! for operations whose cost depends on payload entropy (e.g. checksum over
//! cached vs. streamed data is insensitive, a real compressor is not).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fill pattern for payload initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPattern {
    /// All zeros
    Zeros,
    /// Pseudo-random data with a specific seed (deterministic across runs)
    Random(u64),
    /// Sequential bytes (0x00, 0x01, ..., 0xFF, 0x00, ...)
    Sequential,
}

/// Allocate and fill a payload buffer
///
/// # Example
///
/// ```
/// use accelpulse::util::buffer::{make_payload, FillPattern};
///
/// let payload = make_payload(4096, FillPattern::Sequential);
/// assert_eq!(payload.len(), 4096);
/// assert_eq!(payload[0], 0x00);
/// assert_eq!(payload[255], 0xFF);
/// assert_eq!(payload[256], 0x00);
/// ```
pub fn make_payload(size: usize, pattern: FillPattern) -> Vec<u8> {
    let mut buf = vec![0u8; size];
    fill(&mut buf, pattern);
    buf
}

/// Fill an existing buffer with the given pattern
pub fn fill(buf: &mut [u8], pattern: FillPattern) {
    match pattern {
        FillPattern::Zeros => {
            buf.fill(0);
        }
        FillPattern::Random(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            rng.fill(buf);
        }
        FillPattern::Sequential => {
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = (i % 256) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let buf = make_payload(128, FillPattern::Zeros);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sequential() {
        let buf = make_payload(512, FillPattern::Sequential);
        assert_eq!(buf[0], 0);
        assert_eq!(buf[255], 255);
        assert_eq!(buf[256], 0);
        assert_eq!(buf[511], 255);
    }

    #[test]
    fn test_random_deterministic() {
        let a = make_payload(256, FillPattern::Random(42));
        let b = make_payload(256, FillPattern::Random(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_seed_varies() {
        let a = make_payload(256, FillPattern::Random(1));
        let b = make_payload(256, FillPattern::Random(2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_buffer() {
        let buf = make_payload(0, FillPattern::Random(7));
        assert!(buf.is_empty());
    }
}
