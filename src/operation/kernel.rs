//! Work kernels
//!
//! The synthetic data-processing payloads executed per submission. Both the
//! software path and the offload executors run the same kernels, so path
//! comparisons measure dispatch and queueing cost, not payload differences.

use super::WorkKind;
use std::sync::OnceLock;

/// CRC-64/XZ polynomial (reflected)
const CRC64_POLY: u64 = 0xC96C_5795_D787_0F42;

fn crc64_table() -> &'static [u64; 256] {
    static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u64;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ CRC64_POLY
                } else {
                    crc >> 1
                };
            }
            *entry = crc;
        }
        table
    })
}

/// CRC-64 digest over a byte slice
pub fn crc64(data: &[u8]) -> u64 {
    let table = crc64_table();
    let mut crc = u64::MAX;
    for &byte in data {
        let idx = ((crc ^ byte as u64) & 0xFF) as usize;
        crc = (crc >> 8) ^ table[idx];
    }
    !crc
}

/// Execute a kernel, returning (bytes_read, bytes_written)
///
/// The output buffer is resized to the kernel's production; its capacity is
/// reserved at init time so steady-state executions do not allocate.
pub fn run_kernel(kind: WorkKind, input: &[u8], output: &mut Vec<u8>) -> (u64, u64) {
    match kind {
        WorkKind::Checksum => {
            let digest = crc64(input);
            output.clear();
            output.extend_from_slice(&digest.to_le_bytes());
            (input.len() as u64, output.len() as u64)
        }
        WorkKind::Copy => {
            output.clear();
            output.extend_from_slice(input);
            (input.len() as u64, output.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc64_empty() {
        assert_eq!(crc64(&[]), 0);
    }

    #[test]
    fn test_crc64_known_value() {
        // CRC-64/XZ check value for "123456789"
        assert_eq!(crc64(b"123456789"), 0x995D_C9BB_DF19_39FA);
    }

    #[test]
    fn test_crc64_deterministic() {
        let data = vec![0xAB; 1024];
        assert_eq!(crc64(&data), crc64(&data));
    }

    #[test]
    fn test_checksum_kernel_bytes() {
        let input = vec![1u8; 4096];
        let mut output = Vec::new();

        let (read, written) = run_kernel(WorkKind::Checksum, &input, &mut output);
        assert_eq!(read, 4096);
        assert_eq!(written, 8);
        assert_eq!(output.len(), 8);
    }

    #[test]
    fn test_copy_kernel_bytes() {
        let input: Vec<u8> = (0..=255).collect();
        let mut output = Vec::new();

        let (read, written) = run_kernel(WorkKind::Copy, &input, &mut output);
        assert_eq!(read, 256);
        assert_eq!(written, 256);
        assert_eq!(output, input);
    }

    #[test]
    fn test_kernel_reuses_output_buffer() {
        let input = vec![7u8; 128];
        let mut output = Vec::with_capacity(128);

        run_kernel(WorkKind::Copy, &input, &mut output);
        let cap = output.capacity();
        run_kernel(WorkKind::Copy, &input, &mut output);
        assert_eq!(output.capacity(), cap);
    }
}
