// PKCS#7 padding: N trailing bytes, each of value N, 1 <= N <= block size.
use crate::AttackError;

pub fn pkcs7_pad(bytes: &[u8], block_size: u8) -> Vec<u8> {
    let n_pad = block_size - (bytes.len() % block_size as usize) as u8;
    let mut out = Vec::with_capacity(bytes.len() + n_pad as usize);
    out.extend_from_slice(bytes);
    (0..n_pad).for_each(|_| out.push(n_pad));
    out
}

/// Length of the padding on `bytes`, or `None` if the padding is invalid.
pub fn pkcs7_padding_len(bytes: &[u8], block_size: usize) -> Option<u8> {
    let &n_pad = bytes.last()?;
    if n_pad == 0 || n_pad as usize > block_size || n_pad as usize > bytes.len() {
        return None;
    }
    let padded = &bytes[(bytes.len() - n_pad as usize)..];
    if padded.iter().all(|&el| el == n_pad) {
        return Some(n_pad);
    }
    None
}

pub fn pkcs7_unpad(bytes: &[u8], block_size: usize) -> Result<Vec<u8>, AttackError> {
    match pkcs7_padding_len(bytes, block_size) {
        Some(n_pad) => Ok(bytes[..bytes.len() - n_pad as usize].to_vec()),
        None => Err(AttackError::PaddingIntegrity {
            last_byte: bytes.last().copied().unwrap_or(0),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("YELL", 4, "YELL\x04\x04\x04\x04")]
    #[case("YELLOWS!!!", 6, "YELLOWS!!!\x02\x02")]
    #[case("YELLOW SUBMARINE", 20, "YELLOW SUBMARINE\x04\x04\x04\x04")]
    #[case("", 3, "\x03\x03\x03")]
    fn pkcs7_pad_pads_message(#[case] msg: &str, #[case] block_size: u8, #[case] expected: &str) {
        let padded = pkcs7_pad(msg.as_bytes(), block_size);

        assert_eq!(padded, expected.as_bytes());
    }

    #[test]
    fn pkcs7_unpad_unpads_message() {
        let msg = b"ICE ICE BABY\x04\x04\x04\x04";

        let unpadded = pkcs7_unpad(msg, 16);

        assert_eq!(unpadded, Ok(b"ICE ICE BABY".to_vec()));
    }

    #[test]
    fn pkcs7_unpad_strips_full_padding_block() {
        let msg = [[0x41u8; 16], [0x10u8; 16]].concat();

        let unpadded = pkcs7_unpad(&msg, 16).unwrap();

        assert_eq!(unpadded, vec![0x41u8; 16]);
    }

    #[rstest]
    #[case(b"ICE ICE BABY\x05\x05\x05\x05".as_slice())]
    #[case(b"ICE ICE BABY\x01\x02\x03\x04".as_slice())]
    #[case(b"ICE ICE BABY\x00\x00\x00\x00".as_slice())]
    #[case(b"ICE ICE BABY\x11\x11\x11\x11".as_slice())]
    #[case(b"".as_slice())]
    fn pkcs7_unpad_returns_err_given_invalid_padding(#[case] padded: &[u8]) {
        let unpadded = pkcs7_unpad(padded, 16);

        assert!(matches!(
            unpadded,
            Err(AttackError::PaddingIntegrity { .. })
        ));
    }

    #[test]
    fn padding_longer_than_block_size_is_invalid() {
        let msg = [0x11u8; 32];

        assert_eq!(pkcs7_padding_len(&msg, 16), None);
        assert_eq!(pkcs7_padding_len(&msg, 32), Some(0x11));
    }
}
