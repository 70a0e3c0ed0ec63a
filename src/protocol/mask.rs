//! Payload masking (RFC 6455 Section 5.3).
//!
//! Masking operates strictly at the wire layer on raw bytes, independent of
//! any text/binary tagging. Applying the same key twice restores the input.

/// Byte-by-byte XOR masking: byte `i` is XORed with `key[i % 4]`.
#[inline]
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// XOR masking processing four bytes at a time using `u32` operations.
///
/// Equivalent to [`apply_mask`] for every input length.
#[inline]
pub fn apply_mask_fast(data: &mut [u8], key: [u8; 4]) {
    let key_word = u32::from_ne_bytes(key);
    let (chunks, tail) = data.split_at_mut(data.len() - data.len() % 4);

    for chunk in chunks.chunks_exact_mut(4) {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(word ^ key_word).to_ne_bytes());
    }

    for (i, byte) in tail.iter_mut().enumerate() {
        *byte ^= key[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masking_involutive() {
        let key = [0x12, 0x34, 0x56, 0x78];
        let original = b"Hello, WebSocket!".to_vec();
        let mut data = original.clone();

        apply_mask(&mut data, key);
        assert_ne!(data, original);

        apply_mask(&mut data, key);
        assert_eq!(data, original);
    }

    #[test]
    fn test_masking_example_from_rfc() {
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let mut data = b"Hello".to_vec();

        apply_mask(&mut data, key);
        assert_eq!(data, vec![0x7f, 0x9f, 0x4d, 0x51, 0x58]);
    }

    #[test]
    fn test_masking_empty() {
        let key = [0x12, 0x34, 0x56, 0x78];
        let mut data: Vec<u8> = vec![];
        apply_mask(&mut data, key);
        assert_eq!(data, Vec::<u8>::new());
        apply_mask_fast(&mut data, key);
        assert_eq!(data, Vec::<u8>::new());
    }

    #[test]
    fn test_masking_single_byte() {
        let key = [0xff, 0x00, 0x00, 0x00];
        let mut data = vec![0xaa];
        apply_mask(&mut data, key);
        assert_eq!(data, vec![0x55]);
    }

    #[test]
    fn test_masking_aligned() {
        let key = [0x11, 0x22, 0x33, 0x44];
        let mut data = vec![0x00; 8];
        apply_mask(&mut data, key);
        assert_eq!(data, vec![0x11, 0x22, 0x33, 0x44, 0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_masking_fast_equivalent() {
        let key = [0xab, 0xcd, 0xef, 0x12];
        // Sizes chosen to cover the word loop and every tail length
        let test_sizes = [0, 1, 2, 3, 4, 5, 7, 8, 15, 16, 17, 63, 64, 65, 255, 256, 1000];

        for size in test_sizes {
            let original: Vec<u8> = (0..size).map(|i| (i & 0xff) as u8).collect();

            let mut data_scalar = original.clone();
            let mut data_fast = original.clone();

            apply_mask(&mut data_scalar, key);
            apply_mask_fast(&mut data_fast, key);

            assert_eq!(data_scalar, data_fast, "mismatch at size {size}");
        }
    }

    #[test]
    fn test_masking_fast_involutive() {
        let key = [0x12, 0x34, 0x56, 0x78];
        let original = b"A somewhat longer payload exercising the word loop".to_vec();
        let mut data = original.clone();

        apply_mask_fast(&mut data, key);
        assert_ne!(data, original);

        apply_mask_fast(&mut data, key);
        assert_eq!(data, original);
    }
}
