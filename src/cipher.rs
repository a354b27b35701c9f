// AES in CBC mode, used to stand up oracles and fixtures. The attack never
// touches this module.
//
// The formula for CBC encryption is
//
//                  C_i = E(C_{i-1} ⊕ P_i)
//
// and for decryption
//
//                  P_i = D(C_i) ⊕ C_{i-1},
//
// with C_0 being the IV. D(C_i) is the "intermediate state" the padding
// oracle attack recovers.
use crate::{pkcs7_pad, pkcs7_padding_len, xor_blocks, Block, CipherError};

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

pub const AES_BLOCK_SIZE: usize = 16;

#[derive(Clone)]
enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

#[derive(Clone)]
pub struct AesCbc {
    cipher: BlockCipher,
}

impl AesCbc {
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let invalid = |_| CipherError::InvalidKeyLength(key.len());
        let cipher = match key.len() {
            16 => BlockCipher::Aes128(Aes128::new_from_slice(key).map_err(invalid)?),
            24 => BlockCipher::Aes192(Aes192::new_from_slice(key).map_err(invalid)?),
            32 => BlockCipher::Aes256(Aes256::new_from_slice(key).map_err(invalid)?),
            n => return Err(CipherError::InvalidKeyLength(n)),
        };
        Ok(Self { cipher })
    }

    pub fn encrypt_block(&self, block: &Block<AES_BLOCK_SIZE>) -> Block<AES_BLOCK_SIZE> {
        let mut buf = GenericArray::clone_from_slice(block);
        match &self.cipher {
            BlockCipher::Aes128(c) => c.encrypt_block(&mut buf),
            BlockCipher::Aes192(c) => c.encrypt_block(&mut buf),
            BlockCipher::Aes256(c) => c.encrypt_block(&mut buf),
        }
        let mut out = [0u8; AES_BLOCK_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    pub fn decrypt_block(&self, block: &Block<AES_BLOCK_SIZE>) -> Block<AES_BLOCK_SIZE> {
        let mut buf = GenericArray::clone_from_slice(block);
        match &self.cipher {
            BlockCipher::Aes128(c) => c.decrypt_block(&mut buf),
            BlockCipher::Aes192(c) => c.decrypt_block(&mut buf),
            BlockCipher::Aes256(c) => c.decrypt_block(&mut buf),
        }
        let mut out = [0u8; AES_BLOCK_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// PKCS#7 pad then CBC encrypt.
    pub fn encrypt(&self, iv: &Block<AES_BLOCK_SIZE>, plaintext: &[u8]) -> Vec<u8> {
        let padded = pkcs7_pad(plaintext, AES_BLOCK_SIZE as u8);
        let mut ciphertext = Vec::with_capacity(padded.len());
        let mut last_block = *iv;
        for chunk in padded.chunks_exact(AES_BLOCK_SIZE) {
            let mut message_buf = [0u8; AES_BLOCK_SIZE];
            message_buf.copy_from_slice(chunk);
            last_block = self.encrypt_block(&xor_blocks(&message_buf, &last_block));
            ciphertext.extend_from_slice(&last_block);
        }
        ciphertext
    }

    /// CBC decrypt without touching the padding.
    pub fn decrypt_unchecked(
        &self,
        iv: &Block<AES_BLOCK_SIZE>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
            return Err(CipherError::InvalidLength(ciphertext.len()));
        }
        let mut message = Vec::with_capacity(ciphertext.len());
        let mut last_block = *iv;
        for chunk in ciphertext.chunks_exact(AES_BLOCK_SIZE) {
            let mut ciphertext_buf = [0u8; AES_BLOCK_SIZE];
            ciphertext_buf.copy_from_slice(chunk);
            message.extend_from_slice(&xor_blocks(
                &self.decrypt_block(&ciphertext_buf),
                &last_block,
            ));
            last_block = ciphertext_buf;
        }
        Ok(message)
    }

    /// CBC decrypt and strip PKCS#7 padding.
    pub fn decrypt(
        &self,
        iv: &Block<AES_BLOCK_SIZE>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let mut message = self.decrypt_unchecked(iv, ciphertext)?;
        let n_pad =
            pkcs7_padding_len(&message, AES_BLOCK_SIZE).ok_or(CipherError::InvalidPadding)?;
        message.truncate(message.len() - n_pad as usize);
        Ok(message)
    }
}

impl std::fmt::Debug for AesCbc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = match self.cipher {
            BlockCipher::Aes128(_) => 128,
            BlockCipher::Aes192(_) => 192,
            BlockCipher::Aes256(_) => 256,
        };
        f.debug_struct("AesCbc").field("key_bits", &bits).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fixtures;

    use rstest::rstest;

    // NIST SP 800-38A, F.2.1 CBC-AES128.Encrypt
    const NIST_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
    const NIST_IV: &str = "000102030405060708090a0b0c0d0e0f";
    const NIST_PLAINTEXT: &str = "6bc1bee22e409f96e93d7e117393172a\
                                  ae2d8a571e03ac9c9eb76fac45af8e51";
    const NIST_CIPHERTEXT: &str = "7649abac8119b246cee98e9b12e9197d\
                                   5086cb9b507219ee95db113a917678b2";

    #[test]
    fn decrypt_unchecked_matches_nist_vector() {
        let cipher = AesCbc::new(&hex::decode(NIST_KEY).unwrap()).unwrap();
        let iv: [u8; 16] = hex::decode(NIST_IV).unwrap().try_into().unwrap();

        let plaintext = cipher
            .decrypt_unchecked(&iv, &hex::decode(NIST_CIPHERTEXT).unwrap())
            .unwrap();

        assert_eq!(hex::encode(plaintext), NIST_PLAINTEXT);
    }

    #[test]
    fn encrypt_matches_nist_vector_before_padding_block() {
        let cipher = AesCbc::new(&hex::decode(NIST_KEY).unwrap()).unwrap();
        let iv: [u8; 16] = hex::decode(NIST_IV).unwrap().try_into().unwrap();

        let ciphertext = cipher.encrypt(&iv, &hex::decode(NIST_PLAINTEXT).unwrap());

        // Block aligned input gains a whole block of padding.
        assert_eq!(ciphertext.len(), 48);
        assert_eq!(hex::encode(&ciphertext[..32]), NIST_CIPHERTEXT);
    }

    #[test]
    fn decrypt_recovers_fixture_plaintext_with_aes_256() {
        let cipher = AesCbc::new(&fixtures::key()).unwrap();

        let plaintext = cipher
            .decrypt(&fixtures::iv(), &fixtures::ciphertext_v1())
            .unwrap();

        assert_eq!(plaintext, fixtures::PLAINTEXT_V1.as_bytes());
    }

    #[rstest]
    #[case(16)]
    #[case(24)]
    #[case(32)]
    fn decrypt_then_encrypt_returns_same_ciphertext(#[case] key_len: usize) {
        let key: Vec<u8> = (0..key_len as u8).collect();
        let iv = [7u8; 16];
        let cipher = AesCbc::new(&key).unwrap();
        let ciphertext = cipher.encrypt(&iv, b"We all live on a yellow submarine");

        let plaintext = cipher.decrypt(&iv, &ciphertext).unwrap();

        assert_eq!(plaintext, b"We all live on a yellow submarine");
        assert_eq!(cipher.encrypt(&iv, &plaintext), ciphertext);
    }

    #[rstest]
    #[case(0)]
    #[case(15)]
    #[case(64)]
    fn new_rejects_unsupported_key_lengths(#[case] key_len: usize) {
        let key = vec![0u8; key_len];

        assert_eq!(
            AesCbc::new(&key).unwrap_err(),
            CipherError::InvalidKeyLength(key_len)
        );
    }

    #[test]
    fn decrypt_rejects_partial_blocks() {
        let cipher = AesCbc::new(&[0u8; 16]).unwrap();

        assert_eq!(
            cipher.decrypt(&[0u8; 16], &[0u8; 17]),
            Err(CipherError::InvalidLength(17))
        );
    }

    #[test]
    fn debug_output_hides_key() {
        let cipher = AesCbc::new(&fixtures::key()).unwrap();

        assert_eq!(format!("{cipher:?}"), "AesCbc { key_bits: 256 }");
    }
}
