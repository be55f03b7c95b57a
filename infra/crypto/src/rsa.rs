//! RSA encryption and signatures, PKCS#1 v1.5.

use crate::error::CryptoError;
use crate::hash::HashAlg;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rsa::pkcs1::{
    DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding,
};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::{Sha224, Sha256, Sha384, Sha512};
use std::fmt;

/// Key size used by [`Rsa::generate`] and the systems this crate
/// interoperates with.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// An RSA key pair, or a lone public key.
///
/// Encryption and signature padding is PKCS#1 v1.5. A handle built from a
/// public key alone can encrypt and verify; decrypting or signing then
/// fails with [`CryptoError::InvalidKey`].
///
/// # Example
///
/// ```rust
/// use shed_crypto::{HashAlg, Rsa};
///
/// let rsa = Rsa::generate_with_bits(1024).unwrap();
/// let secret = rsa.encrypt_base64("top secret").unwrap();
/// assert_eq!(rsa.decrypt_base64(&secret).unwrap(), "top secret");
///
/// let signature = rsa.sign(b"message", HashAlg::default()).unwrap();
/// assert!(rsa.verify(b"message", &signature, HashAlg::default()));
/// ```
pub struct Rsa {
    private: Option<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl fmt::Debug for Rsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rsa")
            .field("bits", &(self.public.size() * 8))
            .field("has_private", &self.private.is_some())
            .finish()
    }
}

impl Rsa {
    /// Generates a fresh key pair and returns it as `(private_pem,
    /// public_pem)` in PKCS#1 PEM form.
    ///
    /// # Errors
    /// Returns [`CryptoError::Rsa`] when generation fails (e.g. an
    /// unsupported bit size).
    pub fn generate_keys(bits: usize) -> Result<(String, String), CryptoError> {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)?;
        let public = RsaPublicKey::from(&private);

        let private_pem = private.to_pkcs1_pem(LineEnding::LF).map_err(key_error)?;
        let public_pem = public.to_pkcs1_pem(LineEnding::LF).map_err(key_error)?;
        Ok((private_pem.as_str().to_owned(), public_pem))
    }

    /// Generates a fresh in-memory key pair of [`DEFAULT_RSA_BITS`] bits.
    ///
    /// # Errors
    /// Returns [`CryptoError::Rsa`] when generation fails.
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with_bits(DEFAULT_RSA_BITS)
    }

    /// Generates a fresh in-memory key pair.
    ///
    /// # Errors
    /// Returns [`CryptoError::Rsa`] when generation fails.
    pub fn generate_with_bits(bits: usize) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private: Some(private), public })
    }

    /// Loads a private key from PEM, accepting PKCS#1 or PKCS#8. The public
    /// half is derived from it.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] when the text is neither.
    pub fn from_private_pem(pem: &str) -> Result<Self, CryptoError> {
        let private = match RsaPrivateKey::from_pkcs1_pem(pem) {
            Ok(key) => key,
            Err(_) => RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::InvalidKey {
                message: format!("not a PKCS#1 or PKCS#8 private key: {e}").into(),
                context: None,
            })?,
        };

        let public = RsaPublicKey::from(&private);
        Ok(Self { private: Some(private), public })
    }

    /// Loads a public key from PEM, accepting PKCS#1 or SPKI (PKCS#8).
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] when the text is neither.
    pub fn from_public_pem(pem: &str) -> Result<Self, CryptoError> {
        let public = match RsaPublicKey::from_pkcs1_pem(pem) {
            Ok(key) => key,
            Err(_) => RsaPublicKey::from_public_key_pem(pem).map_err(|e| {
                CryptoError::InvalidKey {
                    message: format!("not a PKCS#1 or SPKI public key: {e}").into(),
                    context: None,
                }
            })?,
        };

        Ok(Self { private: None, public })
    }

    /// Encrypts with the public key.
    ///
    /// # Errors
    /// Returns [`CryptoError::Rsa`] when the plaintext is too long for the
    /// key size.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.public.encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, plaintext)?)
    }

    /// Encrypts text and returns the ciphertext as base64.
    ///
    /// # Errors
    /// See [`Rsa::encrypt`].
    pub fn encrypt_base64(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(STANDARD.encode(self.encrypt(plaintext.as_bytes())?))
    }

    /// Decrypts with the private key.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] without a private key, or
    /// [`CryptoError::Rsa`] for an undecryptable ciphertext.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.private_key()?.decrypt(Pkcs1v15Encrypt, ciphertext)?)
    }

    /// Decodes base64 ciphertext and decrypts it to text.
    ///
    /// # Errors
    /// See [`Rsa::decrypt`]; additionally [`CryptoError::Base64`] and
    /// [`CryptoError::Utf8`] for decoding failures.
    pub fn decrypt_base64(&self, encoded: &str) -> Result<String, CryptoError> {
        let raw = STANDARD.decode(encoded.trim())?;
        Ok(String::from_utf8(self.decrypt(&raw)?)?)
    }

    /// Signs the digest of `data` with the private key.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] without a private key and
    /// [`CryptoError::Unsupported`] for [`HashAlg::Md5`].
    pub fn sign(&self, data: &[u8], alg: HashAlg) -> Result<Vec<u8>, CryptoError> {
        let key = self.private_key()?;
        let signature = match alg {
            HashAlg::Md5 => {
                return Err(CryptoError::Unsupported {
                    message: "MD5 signatures are not supported".into(),
                    context: None,
                });
            },
            HashAlg::Sha1 => key.sign(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(data))?,
            HashAlg::Sha224 => key.sign(Pkcs1v15Sign::new::<Sha224>(), &Sha224::digest(data))?,
            HashAlg::Sha256 => key.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data))?,
            HashAlg::Sha384 => key.sign(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(data))?,
            HashAlg::Sha512 => key.sign(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(data))?,
        };
        Ok(signature)
    }

    /// Signs and returns the signature as base64.
    ///
    /// # Errors
    /// See [`Rsa::sign`].
    pub fn sign_base64(&self, data: &[u8], alg: HashAlg) -> Result<String, CryptoError> {
        Ok(STANDARD.encode(self.sign(data, alg)?))
    }

    /// Verifies a signature against the public key. Any failure, including
    /// an unsupported algorithm, reads as `false`.
    #[must_use]
    pub fn verify(&self, data: &[u8], signature: &[u8], alg: HashAlg) -> bool {
        let result = match alg {
            HashAlg::Md5 => return false,
            HashAlg::Sha1 => {
                self.public.verify(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(data), signature)
            },
            HashAlg::Sha224 => {
                self.public.verify(Pkcs1v15Sign::new::<Sha224>(), &Sha224::digest(data), signature)
            },
            HashAlg::Sha256 => {
                self.public.verify(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data), signature)
            },
            HashAlg::Sha384 => {
                self.public.verify(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(data), signature)
            },
            HashAlg::Sha512 => {
                self.public.verify(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(data), signature)
            },
        };
        result.is_ok()
    }

    /// Verifies a base64-encoded signature. Bad base64 reads as `false`.
    #[must_use]
    pub fn verify_base64(&self, data: &[u8], signature: &str, alg: HashAlg) -> bool {
        STANDARD.decode(signature.trim()).is_ok_and(|raw| self.verify(data, &raw, alg))
    }

    fn private_key(&self) -> Result<&RsaPrivateKey, CryptoError> {
        self.private.as_ref().ok_or_else(|| CryptoError::InvalidKey {
            message: "operation requires the private key".into(),
            context: None,
        })
    }
}

fn key_error(e: impl fmt::Display) -> CryptoError {
    CryptoError::InvalidKey { message: e.to_string().into(), context: None }
}
