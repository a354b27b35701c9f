// A fixed AES-256 key and IV with two ciphertexts under them, and the
// plaintexts they decrypt to.
use crate::{Block, AES_BLOCK_SIZE};

const KEY_HEX: &str = "81f8b5f0f0f0aa6e07bd81c539bc33554756964af32d7eff3047843206edada8";

const IV_HEX: &str = "7566d17fcef22735fef2d5744e73a24c";

const CIPHERTEXT_V1_HEX: &str = "f59509a113bf8254c9f178ec9d4f1aed3177fb48f7d47dd5a3f5f8d53cef79e7\
    5b26026a82d459ff5a6469822c04145ac9a982d39cad7bb4bef0fd53a44b7b64";

const CIPHERTEXT_V2_HEX: &str = "a269be0d3de8a09d241f9dfee003fb2822b81c8902bcf7892f03715e2b867377\
    46999a4c5082256feef53e9a292b4574a07f11947f1a07bde3e871b7c2fa2871\
    a2fb4638fc322d1bb6678f8d16f01c6c6a302e0b7b2a49be70044a606c4b0d72\
    0a0d978356a30c3d50d0e46641df99852bbb79d49900ab859cd8da7f12ee6f2d\
    1257938f74235822ff1d81c3765e75691e4a1a750c56fd95d703807af277104c\
    3df9bf1e0dd815ad0c366c4696bf7b07db5c414d171850e2cde8f0280880c51b\
    286b12d73293f6a0fbb26097b5c882b3";

pub const PLAINTEXT_V1: &str = "COMMAND --- SET REMINDER --- Shouldn't roll my own crypto";
pub const PLAINTEXT_V2: &str = "[Chef Brown]: Fine. They want us to have zero waste? Might as \
    well throw these egg shells into the pancake batter as well, huh?! [.....30 minutes \
    later.....] wait, this actually has a good crunch to it!";

fn decode(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).expect("fixture constants are valid hex")
}

pub fn key() -> Vec<u8> {
    decode(KEY_HEX)
}

pub fn iv() -> Block<AES_BLOCK_SIZE> {
    let mut iv = [0u8; AES_BLOCK_SIZE];
    iv.copy_from_slice(&decode(IV_HEX));
    iv
}

pub fn ciphertext_v1() -> Vec<u8> {
    decode(CIPHERTEXT_V1_HEX)
}

pub fn ciphertext_v2() -> Vec<u8> {
    decode(CIPHERTEXT_V2_HEX)
}
