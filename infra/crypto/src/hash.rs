//! Hex-encoded digests over the RustCrypto hash implementations.

use crate::error::{CryptoError, CryptoErrorExt};
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use std::path::Path;
use strum_macros::{Display, EnumIter, EnumString};

/// Supported digest algorithms.
///
/// Parses from both the hyphenated and the compact spelling, case
/// insensitive (`"SHA-256"`, `"sha256"`). [`HashAlg::default`] is SHA-1,
/// the signature algorithm of the systems this crate interoperates with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum HashAlg {
    #[strum(to_string = "MD5")]
    Md5,
    #[default]
    #[strum(to_string = "SHA-1", serialize = "sha1")]
    Sha1,
    #[strum(to_string = "SHA-224", serialize = "sha224")]
    Sha224,
    #[strum(to_string = "SHA-256", serialize = "sha256")]
    Sha256,
    #[strum(to_string = "SHA-384", serialize = "sha384")]
    Sha384,
    #[strum(to_string = "SHA-512", serialize = "sha512")]
    Sha512,
}

/// Lowercase hex digest of `data` under the chosen algorithm.
#[must_use]
pub fn hash(data: impl AsRef<[u8]>, alg: HashAlg) -> String {
    let data = data.as_ref();
    match alg {
        HashAlg::Md5 => hex::encode(Md5::digest(data)),
        HashAlg::Sha1 => hex::encode(Sha1::digest(data)),
        HashAlg::Sha224 => hex::encode(Sha224::digest(data)),
        HashAlg::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlg::Sha384 => hex::encode(Sha384::digest(data)),
        HashAlg::Sha512 => hex::encode(Sha512::digest(data)),
    }
}

/// Lowercase hex digest of a file's contents.
///
/// # Errors
/// Returns [`CryptoError::Io`] when the file cannot be read.
pub fn hash_file(path: impl AsRef<Path>, alg: HashAlg) -> Result<String, CryptoError> {
    let path = path.as_ref();
    let data = std::fs::read(path).context(format!("Hashing {}", path.display()))?;
    Ok(hash(data, alg))
}

/// MD5 hex digest of `data`.
#[must_use]
pub fn md5(data: impl AsRef<[u8]>) -> String {
    hash(data, HashAlg::Md5)
}

/// Salted MD5 digest.
///
/// The salt bytes are fed to the hasher before the data, so
/// `md5_salted(data, "", false)` equals [`md5`]. The `uppercase` flag
/// matches systems that store uppercase hex.
#[must_use]
pub fn md5_salted(data: impl AsRef<[u8]>, salt: &str, uppercase: bool) -> String {
    let mut hasher = Md5::new();
    hasher.update(salt.as_bytes());
    hasher.update(data.as_ref());

    let digest = hex::encode(hasher.finalize());
    if uppercase { digest.to_uppercase() } else { digest }
}

/// MD5 hex digest of a file's contents.
///
/// # Errors
/// Returns [`CryptoError::Io`] when the file cannot be read.
pub fn md5_file(path: impl AsRef<Path>) -> Result<String, CryptoError> {
    hash_file(path, HashAlg::Md5)
}

/// SHA-1 hex digest of `data`.
#[must_use]
pub fn sha1(data: impl AsRef<[u8]>) -> String {
    hash(data, HashAlg::Sha1)
}

/// SHA-224 hex digest of `data`.
#[must_use]
pub fn sha224(data: impl AsRef<[u8]>) -> String {
    hash(data, HashAlg::Sha224)
}

/// SHA-256 hex digest of `data`.
#[must_use]
pub fn sha256(data: impl AsRef<[u8]>) -> String {
    hash(data, HashAlg::Sha256)
}

/// SHA-384 hex digest of `data`.
#[must_use]
pub fn sha384(data: impl AsRef<[u8]>) -> String {
    hash(data, HashAlg::Sha384)
}

/// SHA-512 hex digest of `data`.
#[must_use]
pub fn sha512(data: impl AsRef<[u8]>) -> String {
    hash(data, HashAlg::Sha512)
}
