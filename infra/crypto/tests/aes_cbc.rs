use hex_literal::hex;
use proptest::prelude::*;
use shed_crypto::{Aes, CryptoError};

const KEY_128: &str = "0123456789abcdef";
const KEY_192: &str = "0123456789abcdef01234567";
const KEY_256: &str = "0123456789abcdef0123456789abcdef";

// Reference ciphertexts produced by `openssl enc`.
#[test]
fn matches_openssl_ciphertexts() {
    let aes = Aes::new(KEY_128).unwrap();
    assert_eq!(
        aes.encrypt(b"block cipher payload").unwrap(),
        hex!("b2826462b8f8e109cafe1713e97ba37d753eeb3e38f63cd74959a3f10419f8d5")
    );

    let aes = Aes::new(KEY_256).unwrap();
    assert_eq!(
        aes.encrypt(b"block cipher payload").unwrap(),
        hex!("2a8a9da25cae3a60ff212ba9ed7c99cfac2c9779b61111e3ef4a4708ef7c5eec")
    );

    let aes = Aes::with_iv(KEY_128, "fedcba9876543210").unwrap();
    assert_eq!(
        aes.encrypt(b"block cipher payload").unwrap(),
        hex!("511e1cc47024f2dce5406bcc9543284849b85a607e39066a7942340edfee1c0f")
    );
}

#[test]
fn round_trips_for_every_key_size() {
    for key in [KEY_128, KEY_192, KEY_256] {
        let aes = Aes::new(key).unwrap();

        let ciphertext = aes.encrypt(b"block cipher payload").unwrap();
        assert_ne!(ciphertext, b"block cipher payload");
        assert_eq!(ciphertext.len() % 16, 0);
        assert_eq!(aes.decrypt(&ciphertext).unwrap(), b"block cipher payload");

        let encoded = aes.encrypt_base64("text payload, 中文 too").unwrap();
        assert_eq!(aes.decrypt_base64(&encoded).unwrap(), "text payload, 中文 too");
    }
}

#[test]
fn fixed_iv_is_deterministic() {
    let a = Aes::new(KEY_128).unwrap();
    let b = Aes::new(KEY_128).unwrap();
    assert_eq!(a.encrypt(b"same").unwrap(), b.encrypt(b"same").unwrap());

    let c = Aes::with_iv(KEY_128, "fedcba9876543210").unwrap();
    assert_ne!(a.encrypt(b"same").unwrap(), c.encrypt(b"same").unwrap());
}

#[test]
fn empty_plaintext_pads_to_one_block() {
    let aes = Aes::new(KEY_128).unwrap();
    let ciphertext = aes.encrypt(b"").unwrap();
    assert_eq!(ciphertext.len(), 16);
    assert_eq!(aes.decrypt(&ciphertext).unwrap(), b"");
}

#[test]
fn bad_key_and_iv_lengths_are_rejected() {
    assert!(matches!(Aes::new("short").unwrap_err(), CryptoError::InvalidKey { .. }));
    assert!(matches!(
        Aes::new("0123456789abcdef0").unwrap_err(),
        CryptoError::InvalidKey { .. }
    ));
    assert!(matches!(
        Aes::with_iv(KEY_128, "short iv").unwrap_err(),
        CryptoError::InvalidKey { .. }
    ));
}

#[test]
fn corrupt_ciphertext_is_detected() {
    let aes = Aes::new(KEY_128).unwrap();
    let mut ciphertext = aes.encrypt(b"payload").unwrap();

    // Not a whole number of blocks.
    ciphertext.push(0);
    assert!(matches!(aes.decrypt(&ciphertext).unwrap_err(), CryptoError::InvalidData { .. }));

    assert!(matches!(
        aes.decrypt_base64("not base64 at all!").unwrap_err(),
        CryptoError::Base64 { .. }
    ));
}

#[test]
fn wrong_key_does_not_round_trip() {
    let aes = Aes::new(KEY_128).unwrap();
    let other = Aes::new("fedcba9876543210").unwrap();

    let encoded = aes.encrypt_base64("secret").unwrap();
    let decoded = other.decrypt_base64(&encoded);
    assert!(decoded.is_err() || decoded.is_ok_and(|text| text != "secret"));
}

proptest! {
    #[test]
    fn round_trips_arbitrary_payloads(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let aes = Aes::new(KEY_256).unwrap();
        let ciphertext = aes.encrypt(&data).unwrap();
        prop_assert_eq!(aes.decrypt(&ciphertext).unwrap(), data);
    }
}
