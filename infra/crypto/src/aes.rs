//! AES-CBC with PKCS#7 padding, plus an OpenSSL-compatible passphrase mode.

use crate::error::CryptoError;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use md5::{Digest, Md5};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Initialization vector used when none is given, matching the systems this
/// crate interoperates with.
pub const DEFAULT_IV: &str = "0123456789abcdef";

const IV_LEN: usize = 16;
const SALT_LEN: usize = 8;
const SALT_HEADER: &[u8; 8] = b"Salted__";
const PASS_KEY_LEN: usize = 32;

/// AES-CBC cipher with a fixed key and IV.
///
/// The key length selects the variant: 16 bytes for AES-128, 24 for
/// AES-192, 32 for AES-256. Padding is PKCS#7. Key material is wiped when
/// the cipher is dropped.
///
/// With a fixed IV, equal plaintexts produce equal ciphertexts. That is the
/// interoperability contract here, not a recommendation; use
/// [`encrypt_with_passphrase`] when a fresh salt per message is wanted.
pub struct Aes {
    key: Vec<u8>,
    iv: [u8; IV_LEN],
}

impl fmt::Debug for Aes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes").field("key_len", &self.key.len()).finish_non_exhaustive()
    }
}

impl Drop for Aes {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl Aes {
    /// Creates a cipher with the default IV.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] unless the key is 16, 24 or 32
    /// bytes long.
    pub fn new(key: &str) -> Result<Self, CryptoError> {
        Self::with_iv(key, DEFAULT_IV)
    }

    /// Creates a cipher with an explicit 16-byte IV.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] for a bad key or IV length.
    pub fn with_iv(key: &str, iv: &str) -> Result<Self, CryptoError> {
        let key = key.as_bytes().to_vec();
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(CryptoError::InvalidKey {
                message: format!("AES key must be 16, 24 or 32 bytes, got {}", key.len()).into(),
                context: None,
            });
        }

        let iv_bytes = iv.as_bytes();
        if iv_bytes.len() != IV_LEN {
            return Err(CryptoError::InvalidKey {
                message: format!("IV must be {IV_LEN} bytes, got {}", iv_bytes.len()).into(),
                context: None,
            });
        }
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(iv_bytes);

        Ok(Self { key, iv })
    }

    /// Encrypts and pads `plaintext`.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] if the key material is rejected
    /// by the cipher.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = match self.key.len() {
            16 => Aes128CbcEnc::new_from_slices(&self.key, &self.iv)
                .map_err(key_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            24 => Aes192CbcEnc::new_from_slices(&self.key, &self.iv)
                .map_err(key_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            _ => Aes256CbcEnc::new_from_slices(&self.key, &self.iv)
                .map_err(key_error)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        };
        Ok(ciphertext)
    }

    /// Encrypts text and returns the ciphertext as base64.
    ///
    /// # Errors
    /// See [`Aes::encrypt`].
    pub fn encrypt_base64(&self, text: &str) -> Result<String, CryptoError> {
        Ok(STANDARD.encode(self.encrypt(text.as_bytes())?))
    }

    /// Decrypts and unpads `ciphertext`.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidData`] when the input is not a whole
    /// number of blocks or the padding is wrong, which is what a mismatched
    /// key usually looks like.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let result = match self.key.len() {
            16 => Aes128CbcDec::new_from_slices(&self.key, &self.iv)
                .map_err(key_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            24 => Aes192CbcDec::new_from_slices(&self.key, &self.iv)
                .map_err(key_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            _ => Aes256CbcDec::new_from_slices(&self.key, &self.iv)
                .map_err(key_error)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        };

        result.map_err(|_| CryptoError::InvalidData {
            message: "bad padding or corrupt ciphertext".into(),
            context: None,
        })
    }

    /// Decodes base64 ciphertext and decrypts it to text.
    ///
    /// # Errors
    /// Returns [`CryptoError::Base64`], [`CryptoError::InvalidData`] or
    /// [`CryptoError::Utf8`] depending on which stage fails.
    pub fn decrypt_base64(&self, encoded: &str) -> Result<String, CryptoError> {
        let raw = STANDARD.decode(encoded.trim())?;
        let plain = self.decrypt(&raw)?;
        Ok(String::from_utf8(plain)?)
    }
}

/// Encrypts text with a passphrase of any length.
///
/// Output format interoperates with `openssl enc -aes-256-cbc -md md5 -base64`:
/// a fresh 8-byte salt, an EVP `BytesToKey` MD5 derivation to a 32-byte key
/// and 16-byte IV, the literal `Salted__` header, all base64-encoded.
///
/// # Errors
/// Returns [`CryptoError::InvalidKey`] if the derived key material is
/// rejected by the cipher.
pub fn encrypt_with_passphrase(text: &str, passphrase: &str) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let (key, iv) = evp_key_iv(passphrase.as_bytes(), &salt);
    let ciphertext = Aes256CbcEnc::new_from_slices(&key, &iv)
        .map_err(key_error)?
        .encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes());

    let mut packed = Vec::with_capacity(SALT_HEADER.len() + SALT_LEN + ciphertext.len());
    packed.extend_from_slice(SALT_HEADER);
    packed.extend_from_slice(&salt);
    packed.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(packed))
}

/// Decrypts text produced by [`encrypt_with_passphrase`] or by OpenSSL in
/// the same mode.
///
/// # Errors
/// Returns [`CryptoError::Base64`] for bad base64,
/// [`CryptoError::InvalidData`] when the `Salted__` header is missing or the
/// passphrase does not fit, and [`CryptoError::Utf8`] when the plaintext is
/// not UTF-8.
pub fn decrypt_with_passphrase(encoded: &str, passphrase: &str) -> Result<String, CryptoError> {
    let raw = STANDARD.decode(encoded.trim())?;
    if raw.len() < SALT_HEADER.len() + SALT_LEN || !raw.starts_with(SALT_HEADER) {
        return Err(CryptoError::InvalidData {
            message: "missing Salted__ header".into(),
            context: None,
        });
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&raw[SALT_HEADER.len()..SALT_HEADER.len() + SALT_LEN]);

    let (key, iv) = evp_key_iv(passphrase.as_bytes(), &salt);
    let plain = Aes256CbcDec::new_from_slices(&key, &iv)
        .map_err(key_error)?
        .decrypt_padded_vec_mut::<Pkcs7>(&raw[SALT_HEADER.len() + SALT_LEN..])
        .map_err(|_| CryptoError::InvalidData {
            message: "bad padding or wrong passphrase".into(),
            context: None,
        })?;

    Ok(String::from_utf8(plain)?)
}

/// EVP `BytesToKey` with MD5: `d_i = MD5(d_{i-1} || pass || salt)`,
/// concatenated until 48 bytes cover the key and IV.
fn evp_key_iv(pass: &[u8], salt: &[u8; SALT_LEN]) -> (Zeroizing<Vec<u8>>, [u8; IV_LEN]) {
    let mut derived = Zeroizing::new(Vec::with_capacity(PASS_KEY_LEN + IV_LEN));
    let mut block = Vec::new();

    while derived.len() < PASS_KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&block);
        hasher.update(pass);
        hasher.update(salt);
        block = hasher.finalize().to_vec();
        derived.extend_from_slice(&block);
    }
    block.zeroize();

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&derived[PASS_KEY_LEN..PASS_KEY_LEN + IV_LEN]);
    let key = Zeroizing::new(derived[..PASS_KEY_LEN].to_vec());
    (key, iv)
}

fn key_error(e: aes::cipher::InvalidLength) -> CryptoError {
    CryptoError::InvalidKey { message: e.to_string().into(), context: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evp_derivation_is_deterministic() {
        let salt = *b"\x01\x02\x03\x04\x05\x06\x07\x08";
        let (key_a, iv_a) = evp_key_iv(b"secret", &salt);
        let (key_b, iv_b) = evp_key_iv(b"secret", &salt);
        assert_eq!(*key_a, *key_b);
        assert_eq!(iv_a, iv_b);
        assert_eq!(key_a.len(), PASS_KEY_LEN);

        let (key_c, _) = evp_key_iv(b"other", &salt);
        assert_ne!(*key_a, *key_c);
    }
}
