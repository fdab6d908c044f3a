//! Integration tests for vellum
//!
//! End-to-end encrypt/decrypt behaviour and interoperability with files
//! produced by other implementations of the format.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use proptest::prelude::*;
use rstest::rstest;
use vellum_crypto::{
    armor, header::b64_encode, stream::CHUNK_SIZE, AnyIdentity, CryptoError, Decrypter,
    Encrypter, ErrorKind, FileKey, Header, Identity, ScryptIdentity, Stanza, Stream,
    X25519Identity,
};

const SCRYPT_PASSPHRASE: &str =
    "light-original-energy-average-wish-blind-vendor-pencil-illness-scorpion";

/// scrypt (logN = 8) encryption of "test\n"
const SCRYPT_FILE: &str = "YWdlLWVuY3J5cHRpb24ub3JnL3YxCi0+IHNjcnlwdCB4Y2lkcXJQdmwwZzRROEZ5eXU4dHNnIDgKNnM2Ylp2Vlg2b0NBSVp2QkxCZEhJbEJrYUcreWRIZHVHWVpBaUJkUy9ZMAotLS0gZ280TkNGT05VTDEwZW5WRjVPMnkxem05eWQwdkM0S09hSU1nV05aYW5QSQom4WH7RYXsjlDm3HNKCe9gY2IfCjTY/2t6PF4bzUkeWZWkE7kd";

const X25519_IDENTITY: &str =
    "AGE-SECRET-KEY-1L27NYJDYRNDSCCELNZE8C6JTSH22TLQJVPGD7289KDLMZA5HWN6SZPEHGF";

/// A valid identity that is not a recipient of `X25519_FILE`
const OTHER_IDENTITY: &str =
    "AGE-SECRET-KEY-1RKH0DGHQ0FU6VLXX2VW6Y3W2TKK7KR4J36N9SNDXK75JHCJ3N6JQNZJF5J";

/// X25519 encryption of "test\n"
const X25519_FILE: &str = "YWdlLWVuY3J5cHRpb24ub3JnL3YxCi0+IFgyNTUxOSBOb280UHUyVWZwTllzY3Z5OU1tTjlscHV1Smt4Nng0MEZkdGZoQzd1dVFZCmk0VUNvVmoxbEhHalV0bVR2MHFyRGl0YzNtMXdoY1oyVUtvWDU3MUQwR1EKLS0tIGJ1RTZSYmR6ZlNHSk5tSGl3U2hqR1FFUDF4eEdjSGZtbXlYQUN4SnM4RDAKyqdZXpg65sTtmakjxLONtEgaSwXeS8t+7jAWvlleVEFO4/9QIQ";

/// The header of `X25519_FILE` alone
const X25519_HEADER: &str = "YWdlLWVuY3J5cHRpb24ub3JnL3YxCi0+IFgyNTUxOSBOb280UHUyVWZwTllzY3Z5OU1tTjlscHV1Smt4Nng0MEZkdGZoQzd1dVFZCmk0VUNvVmoxbEhHalV0bVR2MHFyRGl0YzNtMXdoY1oyVUtvWDU3MUQwR1EKLS0tIGJ1RTZSYmR6ZlNHSk5tSGl3U2hqR1FFUDF4eEdjSGZtbXlYQUN4SnM4RDAK";

/// File key wrapped in `X25519_HEADER`
const X25519_FILE_KEY: &str = "QEXcQCDq9Zzp2lj+S7omjA";

fn unb64(s: &str) -> Vec<u8> {
    STANDARD_NO_PAD.decode(s).unwrap()
}

fn passphrase_encrypter(passphrase: &str) -> Encrypter {
    Encrypter::builder()
        .with_work_factor(4)
        .unwrap()
        .set_passphrase(passphrase)
        .unwrap()
        .build()
        .unwrap()
}

fn decrypter_for(identity: impl Into<AnyIdentity>) -> Decrypter {
    let mut decrypter = Decrypter::new();
    decrypter.add_identity(identity);
    decrypter
}

/// Rebuild a file with a new MAC, keeping the header text and payload
fn replace_mac(file: &[u8], mac: &[u8]) -> Vec<u8> {
    let parsed = Header::parse(file).unwrap();
    let mut out = parsed.header_no_mac.to_vec();
    out.push(b' ');
    out.extend_from_slice(b64_encode(mac).as_bytes());
    out.push(b'\n');
    out.extend_from_slice(parsed.rest);
    out
}

// Interoperability

#[test_log::test]
fn test_decrypt_foreign_scrypt_file() {
    let mut decrypter = Decrypter::new();
    decrypter.add_passphrase(SCRYPT_PASSPHRASE);
    assert_eq!(decrypter.decrypt(&unb64(SCRYPT_FILE)).unwrap(), b"test\n");
}

#[test]
fn test_decrypt_foreign_scrypt_file_wrong_passphrase() {
    let mut decrypter = Decrypter::new();
    decrypter.add_passphrase("wrong-passphrase");
    let err = decrypter.decrypt(&unb64(SCRYPT_FILE)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMatch);
}

#[test_log::test]
fn test_decrypt_foreign_x25519_file() {
    let mut decrypter = Decrypter::new();
    decrypter.add_identity_str(X25519_IDENTITY).unwrap();
    assert_eq!(decrypter.decrypt(&unb64(X25519_FILE)).unwrap(), b"test\n");
}

#[test]
fn test_decrypt_foreign_x25519_file_wrong_identity() {
    let mut decrypter = Decrypter::new();
    decrypter.add_identity_str(OTHER_IDENTITY).unwrap();
    let err = decrypter.decrypt(&unb64(X25519_FILE)).unwrap_err();
    assert!(matches!(err, CryptoError::NoMatch));
    assert_eq!(err.to_string(), "no identity matched any of the file's recipients");
}

#[test_log::test]
fn test_decrypt_foreign_detached_header() {
    let mut decrypter = Decrypter::new();
    decrypter.add_identity_str(X25519_IDENTITY).unwrap();
    let file_key = decrypter.decrypt_header(&unb64(X25519_HEADER)).unwrap();
    assert_eq!(file_key.as_bytes().as_slice(), unb64(X25519_FILE_KEY));
}

#[test]
fn test_foreign_header_reencodes_identically() {
    let header = unb64(X25519_HEADER);
    let parsed = Header::parse(&header).unwrap();
    assert!(parsed.rest.is_empty());
    assert_eq!(parsed.header.encode().unwrap().as_bytes(), header.as_slice());
}

// Round trips

#[rstest]
#[case::empty(0)]
#[case::short(13)]
#[case::one_chunk(CHUNK_SIZE)]
#[case::chunk_plus_one(CHUNK_SIZE + 1)]
#[case::two_chunks_plus_one(2 * CHUNK_SIZE + 1)]
fn test_roundtrip_single_recipient(#[case] len: usize) {
    let identity = X25519Identity::generate();
    let encrypter = Encrypter::with_recipients([identity.to_recipient()]).unwrap();
    let plaintext: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();

    let file = encrypter.encrypt(&plaintext).unwrap();
    let parsed = Header::parse(&file).unwrap();
    assert_eq!(
        parsed.rest.len() as u64,
        16 + Stream::ciphertext_size(len as u64).unwrap()
    );

    assert_eq!(decrypter_for(identity).decrypt(&file).unwrap(), plaintext);
}

#[test]
fn test_roundtrip_multiple_recipients() {
    let identities: Vec<X25519Identity> = (0..3).map(|_| X25519Identity::generate()).collect();
    let encrypter =
        Encrypter::with_recipients(identities.iter().map(X25519Identity::to_recipient)).unwrap();
    let file = encrypter.encrypt(b"shared secret").unwrap();

    assert_eq!(Header::parse(&file).unwrap().header.stanzas.len(), 3);
    for identity in identities {
        assert_eq!(decrypter_for(identity).decrypt(&file).unwrap(), b"shared secret");
    }
}

#[test]
fn test_roundtrip_recipient_strings() {
    let identity = vellum_crypto::generate_identity().unwrap();
    let recipient = vellum_crypto::identity_to_recipient(&identity).unwrap();

    let encrypter = Encrypter::builder()
        .add_recipient_str(&recipient)
        .unwrap()
        .build()
        .unwrap();
    let file = encrypter.encrypt(b"via strings").unwrap();

    let mut decrypter = Decrypter::new();
    decrypter.add_identity_str(&identity).unwrap();
    assert_eq!(decrypter.decrypt(&file).unwrap(), b"via strings");
}

#[rstest]
#[case::empty(0)]
#[case::two_chunks_plus_one(2 * CHUNK_SIZE + 1)]
fn test_roundtrip_passphrase(#[case] len: usize) {
    let plaintext = vec![0x5a; len];
    let file = passphrase_encrypter("open sesame").encrypt(&plaintext).unwrap();

    let stanzas = Header::parse(&file).unwrap().header.stanzas;
    assert_eq!(stanzas.len(), 1);
    assert_eq!(stanzas[0].args[2], "4");

    let mut decrypter = Decrypter::new();
    decrypter.add_passphrase("open sesame");
    assert_eq!(decrypter.decrypt(&file).unwrap(), plaintext);
}

// Armor

#[test]
fn test_armored_roundtrip_passphrase() {
    let plaintext = vec![0x42; CHUNK_SIZE + 7];
    let text = passphrase_encrypter("armored").encrypt_armored(&plaintext).unwrap();
    assert!(text.lines().all(|line| line.len() <= armor::ARMOR_COLUMNS));

    let mut decrypter = Decrypter::new();
    decrypter.add_passphrase("armored");
    assert_eq!(decrypter.decrypt(text.as_bytes()).unwrap(), plaintext);
}

#[test]
fn test_armor_of_foreign_file() {
    let text = armor::encode(&unb64(X25519_FILE));
    let decrypter = decrypter_for(X25519_IDENTITY.parse::<X25519Identity>().unwrap());
    assert_eq!(decrypter.decrypt(text.as_bytes()).unwrap(), b"test\n");
}

#[test]
fn test_armored_payload_tampering_rejected() {
    let identity = X25519Identity::generate();
    let encrypter = Encrypter::with_recipients([identity.to_recipient()]).unwrap();
    let mut file = armor::decode(&encrypter.encrypt_armored(b"payload").unwrap()).unwrap();
    let last = file.len() - 1;
    file[last] ^= 0x80;

    let err = decrypter_for(identity)
        .decrypt(armor::encode(&file).as_bytes())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

// Tampering

#[test_log::test]
fn test_every_mac_bit_flip_rejected() {
    let identity = X25519Identity::generate();
    let file = Encrypter::with_recipients([identity.to_recipient()])
        .unwrap()
        .encrypt(b"payload")
        .unwrap();
    let decrypter = decrypter_for(identity);
    let mac = Header::parse(&file).unwrap().header.mac;

    for bit in 0..mac.len() * 8 {
        let mut flipped = mac.clone();
        flipped[bit / 8] ^= 1 << (bit % 8);
        let err = decrypter.decrypt(&replace_mac(&file, &flipped)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication, "bit {bit}");
    }
}

#[test]
fn test_payload_bit_flips_rejected() {
    let identity = X25519Identity::generate();
    let file = Encrypter::with_recipients([identity.to_recipient()])
        .unwrap()
        .encrypt(&vec![1u8; CHUNK_SIZE + 100])
        .unwrap();
    let decrypter = decrypter_for(identity);
    let payload_start = Header::parse(&file).unwrap().header_len() + 16;

    for pos in [payload_start, payload_start + CHUNK_SIZE, file.len() - 1] {
        let mut tampered = file.clone();
        tampered[pos] ^= 0x80;
        let err = decrypter.decrypt(&tampered).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication, "offset {pos}");
    }
}

#[test]
fn test_nonce_bit_flip_rejected() {
    let identity = X25519Identity::generate();
    let mut file = Encrypter::with_recipients([identity.to_recipient()])
        .unwrap()
        .encrypt(b"payload")
        .unwrap();
    let nonce_start = Header::parse(&file).unwrap().header_len();
    file[nonce_start] ^= 0x01;

    let err = decrypter_for(identity).decrypt(&file).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[test]
fn test_truncated_at_chunk_boundary_rejected() {
    let identity = X25519Identity::generate();
    let file = Encrypter::with_recipients([identity.to_recipient()])
        .unwrap()
        .encrypt(&vec![9u8; 2 * CHUNK_SIZE + 1])
        .unwrap();
    let payload_start = Header::parse(&file).unwrap().header_len() + 16;
    let truncated = &file[..payload_start + CHUNK_SIZE + 16];

    let err = decrypter_for(identity).decrypt(truncated).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[test]
fn test_stanza_swap_breaks_mac() {
    let a = X25519Identity::generate();
    let b = X25519Identity::generate();
    let file = Encrypter::with_recipients([a.to_recipient(), b.to_recipient()])
        .unwrap()
        .encrypt(b"x")
        .unwrap();

    let parsed = Header::parse(&file).unwrap();
    let mut stanzas = parsed.header.stanzas.clone();
    stanzas.swap(0, 1);
    let mut swapped = Header {
        stanzas,
        mac: parsed.header.mac.clone(),
    }
    .encode()
    .unwrap()
    .into_bytes();
    swapped.extend_from_slice(parsed.rest);

    let err = decrypter_for(a).decrypt(&swapped).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

// Malformed input

#[rstest]
#[case::padded_body("age-encryption.org/v1\n-> X25519 AAAA\nAA==\n--- AAAA\n")]
#[case::non_canonical_body("age-encryption.org/v1\n-> X25519 AAAA\nAB\n--- AAAA\n")]
#[case::non_ascii("age-encryption.org/v1\n-> X25519 \u{e9}\nAA\n--- AAAA\n")]
#[case::bad_version("age-encryption.org/v2\n--- AAAA\n")]
#[case::truncated("age-encryption.org/v1\n-> X25519 AAAA\n")]
fn test_malformed_header_rejected(#[case] file: &str) {
    let err = decrypter_for(X25519Identity::generate())
        .decrypt(file.as_bytes())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_passphrase_with_extra_stanza_rejected() {
    let file = passphrase_encrypter("pw").encrypt(b"x").unwrap();
    let parsed = Header::parse(&file).unwrap();

    let mut stanzas = parsed.header.stanzas.clone();
    stanzas.push(Stanza::new(["X25519", "AAAA"], vec![0u8; 32]));
    let mut forged = Header {
        stanzas,
        mac: parsed.header.mac.clone(),
    }
    .encode()
    .unwrap()
    .into_bytes();
    forged.extend_from_slice(parsed.rest);

    let mut decrypter = Decrypter::new();
    decrypter.add_passphrase("pw");
    let err = decrypter.decrypt(&forged).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_passphrase_identity_only_tried_when_alone() {
    // A passphrase identity must not choke on an ordinary multi-recipient file
    let a = X25519Identity::generate();
    let b = X25519Identity::generate();
    let file = Encrypter::with_recipients([a.to_recipient(), b.to_recipient()])
        .unwrap()
        .encrypt(b"x")
        .unwrap();

    let mut decrypter = Decrypter::new();
    decrypter.add_passphrase("pw").add_identity(a);
    assert_eq!(decrypter.decrypt(&file).unwrap(), b"x");
}

// Configuration

#[test]
fn test_recipient_and_passphrase_conflict() {
    let recipient = X25519Identity::generate().to_recipient();
    let err = Encrypter::builder()
        .add_recipient(recipient.clone())
        .unwrap()
        .set_passphrase("pw")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = Encrypter::builder()
        .set_passphrase("pw")
        .unwrap()
        .add_recipient(recipient)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test_log::test]
fn test_custom_identity_tried_in_order() {
    struct Declines;

    impl Identity for Declines {
        fn unwrap_file_key(&self, _stanzas: &[Stanza]) -> vellum_crypto::Result<Option<FileKey>> {
            Ok(None)
        }
    }

    let identity = X25519Identity::generate();
    let file = Encrypter::with_recipients([identity.to_recipient()])
        .unwrap()
        .encrypt(b"custom")
        .unwrap();

    let mut decrypter = Decrypter::new();
    decrypter
        .add_identity(AnyIdentity::custom(Declines))
        .add_identity(ScryptIdentity::new("unused"))
        .add_identity(identity);
    assert_eq!(decrypter.decrypt(&file).unwrap(), b"custom");
}

// Size helpers

proptest! {
    #[test]
    fn prop_size_helpers_roundtrip(n in 0u64..(1 << 40)) {
        let ciphertext_len = Stream::ciphertext_size(n).unwrap();
        prop_assert_eq!(Stream::plaintext_size(ciphertext_len).unwrap(), n);
    }

    #[test]
    fn prop_roundtrip_small(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let identity = X25519Identity::generate();
        let file = Encrypter::with_recipients([identity.to_recipient()])
            .unwrap()
            .encrypt(&plaintext)
            .unwrap();
        prop_assert_eq!(decrypter_for(identity).decrypt(&file).unwrap(), plaintext);
    }
}
