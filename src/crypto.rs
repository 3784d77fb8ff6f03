// MIT License - Copyright (c) 2026 Peter Wright
// RainBird request encryption

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constants::{BLOCK_SIZE, HASH_LEN, IV_LEN, PAD_BYTE, REQUEST_TRAILER};
use crate::error::{RainbirdError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// RainBird encryption/decryption engine.
///
/// The key is the SHA-256 digest of the controller password, used as an
/// AES-256-CBC key. Every request carries a fresh random IV; there is no
/// handshake and no session state.
#[derive(Clone)]
pub struct RainbirdCrypt {
    key: [u8; 32],
}

impl std::fmt::Debug for RainbirdCrypt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RainbirdCrypt").finish_non_exhaustive()
    }
}

impl RainbirdCrypt {
    /// Create a crypto engine for the given controller password.
    pub fn new(password: &str) -> Self {
        Self {
            key: Self::derive_key(password),
        }
    }

    /// Derive the 32-byte key: SHA-256 over the UTF-8 password.
    pub fn derive_key(password: &str) -> [u8; 32] {
        Sha256::digest(password.as_bytes()).into()
    }

    /// SHA-256 of the unpadded request text, sent ahead of the IV.
    pub fn request_hash(request: &[u8]) -> [u8; HASH_LEN] {
        Sha256::digest(request).into()
    }

    /// Append the `00 10` trailer, then pad to the block size with 0x10
    /// bytes. Unlike PKCS#7 every pad byte is 0x10 whatever the pad length,
    /// and an already aligned message gets no extra block.
    pub fn pad(data: &[u8]) -> Vec<u8> {
        let mut padded = Vec::with_capacity(data.len() + REQUEST_TRAILER.len() + BLOCK_SIZE);
        padded.extend_from_slice(data);
        padded.extend_from_slice(&REQUEST_TRAILER);
        let pad_len = (BLOCK_SIZE - padded.len() % BLOCK_SIZE) % BLOCK_SIZE;
        padded.resize(padded.len() + pad_len, PAD_BYTE);
        padded
    }

    /// Strip trailing 0x10, 0x0A and 0x00 bytes left by padding.
    pub fn strip_control(data: &[u8]) -> &[u8] {
        let end = data
            .iter()
            .rposition(|b| !matches!(b, 0x10 | 0x0A | 0x00))
            .map_or(0, |pos| pos + 1);
        &data[..end]
    }

    /// Pad and encrypt a plaintext with the given IV.
    pub fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
        let mut buf = Self::pad(plaintext);
        let len = buf.len();
        Aes256CbcEnc::new(&self.key.into(), &(*iv).into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|e| RainbirdError::Crypto {
                details: format!("encrypt failed: {}", e),
            })?;
        Ok(buf)
    }

    /// Decrypt a ciphertext and strip the trailing control bytes.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(RainbirdError::Crypto {
                details: format!(
                    "ciphertext length {} is not a positive multiple of {}",
                    ciphertext.len(),
                    BLOCK_SIZE
                ),
            });
        }
        let mut buf = ciphertext.to_vec();
        let plain = Aes256CbcDec::new(&self.key.into(), &(*iv).into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|e| RainbirdError::Crypto {
                details: format!("decrypt failed: {}", e),
            })?;
        Ok(Self::strip_control(plain).to_vec())
    }

    /// Build the wire body for a formatted request using a random IV.
    pub fn seal(&self, request: &str) -> Result<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);
        self.seal_with_iv(request, &iv)
    }

    /// Build the wire body `hash(32) ‖ iv(16) ‖ ciphertext`.
    pub fn seal_with_iv(&self, request: &str, iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
        let hash = Self::request_hash(request.as_bytes());
        let ciphertext = self.encrypt(request.as_bytes(), iv)?;

        let mut body = Vec::with_capacity(HASH_LEN + IV_LEN + ciphertext.len());
        body.extend_from_slice(&hash);
        body.extend_from_slice(iv);
        body.extend_from_slice(&ciphertext);
        debug!("Sealed {} byte request into {} byte body", request.len(), body.len());
        Ok(body)
    }

    /// Decrypt a response body laid out as `hash(32) ‖ iv(16) ‖ ciphertext`.
    pub fn open(&self, body: &[u8]) -> Result<Vec<u8>> {
        if body.len() <= HASH_LEN + IV_LEN {
            return Err(RainbirdError::Crypto {
                details: format!("response body too short ({} bytes)", body.len()),
            });
        }
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&body[HASH_LEN..HASH_LEN + IV_LEN]);
        self.decrypt(&body[HASH_LEN + IV_LEN..], &iv)
    }
}
