//! Basic usage example for vellum
//!
//! This example demonstrates:
//! - Generating an identity and deriving its recipient
//! - Encrypting to several recipients at once
//! - Decrypting with any one of them
//! - Recovering the file key from a detached header
//! - ASCII armor for text channels
//!
//! Run with: cargo run --example basic_usage

use tracing_subscriber::EnvFilter;
use vellum_crypto::{generate_identity, identity_to_recipient, Decrypter, Encrypter, Header};

fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG=vellum_crypto=debug to see the spans)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Vellum - Basic Usage Example\n");

    // ==================== Keys ====================

    let alice = generate_identity()?;
    let bob = generate_identity()?;
    let alice_recipient = identity_to_recipient(&alice)?;
    let bob_recipient = identity_to_recipient(&bob)?;

    println!("Alice's recipient: {alice_recipient}");
    println!("Bob's recipient:   {bob_recipient}");

    // ==================== Encrypt ====================

    let encrypter = Encrypter::builder()
        .add_recipient_str(&alice_recipient)?
        .add_recipient_str(&bob_recipient)?
        .build()?;

    let message = b"Meet me at the usual place at ten.";
    let file = encrypter.encrypt(message)?;

    let parsed = Header::parse(&file)?;
    println!(
        "\nEncrypted {} bytes into {} bytes ({} header bytes, {} stanzas)",
        message.len(),
        file.len(),
        parsed.header_len(),
        parsed.header.stanzas.len()
    );
    println!("{}", String::from_utf8_lossy(&file[..parsed.header_len()]));

    // ==================== Decrypt ====================

    let mut decrypter = Decrypter::new();
    decrypter.add_identity_str(&bob)?;
    let plaintext = decrypter.decrypt(&file)?;
    println!("Bob decrypted: {}", String::from_utf8_lossy(&plaintext));

    // A stranger's identity matches nothing
    let mut stranger = Decrypter::new();
    stranger.add_identity_str(&generate_identity()?)?;
    match stranger.decrypt(&file) {
        Ok(_) => println!("Stranger decrypted the file?!"),
        Err(e) => println!("Stranger failed as expected: {e}"),
    }

    // ==================== Detached header ====================

    let file_key = decrypter.decrypt_header(&file[..parsed.header_len()])?;
    println!(
        "\nRecovered the {}-byte file key from the header alone",
        file_key.as_bytes().len()
    );

    // ==================== Armor ====================

    let armored = encrypter.encrypt_armored(message)?;
    println!("\nArmored file:\n{armored}");
    let plaintext = decrypter.decrypt(armored.as_bytes())?;
    println!("Bob decrypted the armored file: {}", String::from_utf8_lossy(&plaintext));

    Ok(())
}
