//! XOR masking of client-to-server payloads (RFC 6455 Section 5.3).

/// Length of a masking key in bytes.
pub const MASK_KEY_LEN: usize = 4;

/// XOR `data` with `mask`, cycling through the key.
///
/// Masking is its own inverse, so the same call masks and unmasks.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; MASK_KEY_LEN]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % MASK_KEY_LEN];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masking_reversible() {
        let mask = [0x12, 0x34, 0x56, 0x78];
        let original = b"Hello, WebSocket!".to_vec();
        let mut data = original.clone();

        apply_mask(&mut data, mask);
        assert_ne!(data, original);

        apply_mask(&mut data, mask);
        assert_eq!(data, original);
    }

    #[test]
    fn test_masking_example_from_rfc() {
        let mask = [0x37, 0xfa, 0x21, 0x3d];
        let mut data = b"Hello".to_vec();

        apply_mask(&mut data, mask);
        assert_eq!(data, vec![0x7f, 0x9f, 0x4d, 0x51, 0x58]);
    }

    #[test]
    fn test_masking_empty() {
        let mut data: Vec<u8> = vec![];
        apply_mask(&mut data, [0x12, 0x34, 0x56, 0x78]);
        assert!(data.is_empty());
    }

    #[test]
    fn test_masking_cycles_key() {
        let mask = [0x11, 0x22, 0x33, 0x44];
        let mut data = vec![0x00; 6];
        apply_mask(&mut data, mask);
        assert_eq!(data, vec![0x11, 0x22, 0x33, 0x44, 0x11, 0x22]);
    }
}
