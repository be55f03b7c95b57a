//! # Crypto
//!
//! RSA, AES and hash helpers over the RustCrypto stack.
//!
//! * [`Rsa`]: PKCS#1 v1.5 encryption and signatures, PEM key handling.
//! * [`Aes`]: AES-CBC with PKCS#7 padding; [`encrypt_with_passphrase`] adds
//!   the OpenSSL `Salted__` passphrase mode.
//! * [`hash`]/[`md5`]/[`sha256`]/...: hex-encoded digests, also for files.
//! * [`base64_encode`]/[`base64_decode`]: plain base64 plumbing.
//!
//! ## Example
//!
//! ```rust
//! use shed_crypto::{Aes, HashAlg};
//!
//! assert_eq!(
//!     shed_crypto::hash("abc", HashAlg::Sha256),
//!     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
//! );
//!
//! let aes = Aes::new("0123456789abcdef").unwrap();
//! let secret = aes.encrypt_base64("hello").unwrap();
//! assert_eq!(aes.decrypt_base64(&secret).unwrap(), "hello");
//! ```

mod aes;
mod error;
mod hash;
mod rsa;

pub use crate::aes::{Aes, DEFAULT_IV, decrypt_with_passphrase, encrypt_with_passphrase};
pub use crate::error::{CryptoError, CryptoErrorExt};
pub use crate::hash::{
    HashAlg, hash, hash_file, md5, md5_file, md5_salted, sha1, sha224, sha256, sha384, sha512,
};
pub use crate::rsa::{DEFAULT_RSA_BITS, Rsa};

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Standard base64 encoding of arbitrary bytes.
#[must_use]
pub fn base64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Standard base64 decoding to bytes. Surrounding whitespace is tolerated.
///
/// # Errors
/// Returns [`CryptoError::Base64`] for malformed input.
pub fn base64_decode(text: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(STANDARD.decode(text.trim())?)
}

/// Standard base64 decoding to a UTF-8 string.
///
/// # Errors
/// Returns [`CryptoError::Base64`] for malformed input and
/// [`CryptoError::Utf8`] when the bytes are not UTF-8.
pub fn base64_decode_string(text: &str) -> Result<String, CryptoError> {
    Ok(String::from_utf8(base64_decode(text)?)?)
}
