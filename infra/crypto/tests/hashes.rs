use shed_crypto::{HashAlg, hash, hash_file, md5, md5_file, md5_salted, sha1, sha256};
use std::str::FromStr;
use strum::IntoEnumIterator;

#[test]
fn known_digests() {
    assert_eq!(md5(""), "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(md5("abc"), "900150983cd24fb0d6963f7d28e17f72");

    assert_eq!(sha1(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    assert_eq!(sha1("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");

    assert_eq!(
        hash("abc", HashAlg::Sha224),
        "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
    );
    assert_eq!(sha256(""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    assert_eq!(sha256("abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    assert_eq!(
        hash("abc", HashAlg::Sha384),
        "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed\
         8086072ba1e7cc2358baeca134c825a7"
    );
    assert_eq!(
        hash("abc", HashAlg::Sha512),
        "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
         2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
    );
}

#[test]
fn salted_md5() {
    assert_eq!(md5_salted("abc", "", false), md5("abc"));
    assert_eq!(md5_salted("abc", "pepper", false), md5("pepperabc"));
    assert_eq!(md5_salted("abc", "", true), md5("abc").to_uppercase());
    assert_ne!(md5_salted("abc", "a", false), md5_salted("abc", "b", false));
}

#[test]
fn file_digests() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    std::fs::write(&path, "abc").unwrap();

    assert_eq!(hash_file(&path, HashAlg::Sha256).unwrap(), sha256("abc"));
    assert_eq!(md5_file(&path).unwrap(), md5("abc"));
    assert!(hash_file(dir.path().join("missing"), HashAlg::Md5).is_err());
}

#[test]
fn algorithm_names_parse() {
    assert_eq!(HashAlg::from_str("SHA-256").unwrap(), HashAlg::Sha256);
    assert_eq!(HashAlg::from_str("sha256").unwrap(), HashAlg::Sha256);
    assert_eq!(HashAlg::from_str("Sha-1").unwrap(), HashAlg::Sha1);
    assert_eq!(HashAlg::from_str("md5").unwrap(), HashAlg::Md5);
    assert_eq!(HashAlg::from_str("MD5").unwrap(), HashAlg::Md5);
    assert!(HashAlg::from_str("crc32").is_err());

    assert_eq!(HashAlg::Sha256.to_string(), "SHA-256");
    assert_eq!(HashAlg::default(), HashAlg::Sha1);

    // Every algorithm round-trips through its display name.
    for alg in HashAlg::iter() {
        assert_eq!(HashAlg::from_str(&alg.to_string()).unwrap(), alg);
    }
}

#[test]
fn digest_lengths() {
    for (alg, hex_len) in [
        (HashAlg::Md5, 32),
        (HashAlg::Sha1, 40),
        (HashAlg::Sha224, 56),
        (HashAlg::Sha256, 64),
        (HashAlg::Sha384, 96),
        (HashAlg::Sha512, 128),
    ] {
        assert_eq!(hash("payload", alg).len(), hex_len, "{alg}");
    }
}
