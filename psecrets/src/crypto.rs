//! Passphrase-derived AES-256-GCM cipher for secret payloads.
//!
//! Payloads are stored as `<nonce-hex>:<ciphertext-hex>`; the ciphertext carries
//! the GCM tag.

use std::num::NonZeroU32;

use pprovider::SecretString;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use crate::SecretError;

pub const DEFAULT_ITERATIONS: u32 = 600_000;
pub const SALT_LEN: usize = 16;
pub const KDF_ALGORITHM: &str = "pbkdf2-hmac-sha256";

const KEY_LEN: usize = 32;

pub(crate) struct SecretCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl SecretCipher {
    pub(crate) fn derive(
        passphrase: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Self, SecretError> {
        let iterations = NonZeroU32::new(iterations)
            .ok_or_else(|| SecretError::invalid_request("kdf iterations must be positive"))?;

        let mut key_bytes = [0_u8; KEY_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            passphrase.as_bytes(),
            &mut key_bytes,
        );

        let unbound = UnboundKey::new(&AES_256_GCM, &key_bytes);
        key_bytes.fill(0);
        let unbound = unbound.map_err(|_| SecretError::crypto("failed to build encryption key"))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    pub(crate) fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        let mut nonce_bytes = [0_u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| SecretError::crypto("failed to generate nonce"))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| SecretError::crypto("encryption failed"))?;

        Ok(format!("{}:{}", encode_hex(&nonce_bytes), encode_hex(&in_out)))
    }

    pub(crate) fn decrypt(&self, payload: &str) -> Result<SecretString, SecretError> {
        let (nonce_hex, ciphertext_hex) = payload
            .split_once(':')
            .ok_or_else(|| SecretError::crypto("malformed encrypted payload"))?;

        let nonce_bytes: [u8; NONCE_LEN] = decode_hex(nonce_hex)?
            .try_into()
            .map_err(|_| SecretError::crypto("nonce has the wrong length"))?;
        let mut buffer = decode_hex(ciphertext_hex)?;

        let plaintext_len = self
            .key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut buffer,
            )
            .map_err(|_| SecretError::crypto("decryption failed; wrong passphrase or tampered data"))?
            .len();
        buffer.truncate(plaintext_len);

        match String::from_utf8(buffer) {
            Ok(plaintext) => Ok(SecretString::from(plaintext)),
            Err(error) => {
                let mut bytes = error.into_bytes();
                bytes.fill(0);
                Err(SecretError::crypto("decrypted secret is not valid UTF-8"))
            }
        }
    }
}

pub(crate) fn random_salt() -> Result<[u8; SALT_LEN], SecretError> {
    let mut salt = [0_u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| SecretError::crypto("failed to generate salt"))?;
    Ok(salt)
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(DIGITS[(byte >> 4) as usize] as char);
        out.push(DIGITS[(byte & 0x0f) as usize] as char);
    }
    out
}

pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>, SecretError> {
    if value.len() % 2 != 0 {
        return Err(SecretError::crypto("hex value has odd length"));
    }

    value
        .as_bytes()
        .chunks(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

fn nibble(digit: u8) -> Result<u8, SecretError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(SecretError::crypto("invalid hex digit")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecretErrorKind;

    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let cipher = SecretCipher::derive("hunter2", b"0123456789abcdef", TEST_ITERATIONS)
            .expect("cipher should derive");
        let payload = cipher.encrypt("sk-live-123").expect("encrypt");

        assert!(!payload.contains("sk-live-123"));
        let (nonce, _) = payload.split_once(':').expect("payload separator");
        assert_eq!(nonce.len(), NONCE_LEN * 2);
        assert_eq!(cipher.decrypt(&payload).expect("decrypt").expose(), "sk-live-123");
    }

    #[test]
    fn each_encryption_uses_a_fresh_nonce() {
        let cipher =
            SecretCipher::derive("pw", b"salt-salt-salt-1", TEST_ITERATIONS).expect("derive");
        let first = cipher.encrypt("same").expect("encrypt");
        let second = cipher.encrypt("same").expect("encrypt");
        assert_ne!(first, second);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let salt = b"salt-salt-salt-2";
        let right = SecretCipher::derive("right", salt, TEST_ITERATIONS).expect("derive");
        let wrong = SecretCipher::derive("wrong", salt, TEST_ITERATIONS).expect("derive");
        let payload = right.encrypt("value").expect("encrypt");

        let error = wrong.decrypt(&payload).expect_err("wrong key must fail");
        assert_eq!(error.kind, SecretErrorKind::Crypto);
    }

    #[test]
    fn malformed_payloads_are_crypto_errors() {
        let cipher = SecretCipher::derive("pw", b"salt", TEST_ITERATIONS).expect("derive");
        for payload in ["no-separator", "abc:00", "zz:00", "00:0"] {
            let error = cipher.decrypt(payload).expect_err("malformed payload");
            assert_eq!(error.kind, SecretErrorKind::Crypto, "payload {payload}");
        }
    }

    #[test]
    fn hex_round_trips_bytes() {
        let bytes = [0x00, 0x7f, 0xff, 0x10];
        assert_eq!(encode_hex(&bytes), "007fff10");
        assert_eq!(decode_hex("007FFF10").expect("decode"), bytes);
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let error = SecretCipher::derive("pw", b"salt", 0)
            .err()
            .expect("zero iterations must fail");
        assert_eq!(error.kind, SecretErrorKind::InvalidRequest);
    }
}
