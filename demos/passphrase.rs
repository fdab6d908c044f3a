//! Passphrase encryption example for vellum
//!
//! Encrypts with scrypt at a configurable work factor and shows what a
//! decrypter does with the wrong passphrase or an over-expensive file.
//!
//! Run with: cargo run --example passphrase -- [work_factor]

use std::time::Instant;
use tracing_subscriber::EnvFilter;
use vellum_crypto::{Decrypter, Encrypter, ScryptConfig, ScryptIdentity};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(arg) => ScryptConfig {
            work_factor: arg.parse()?,
        },
        None => ScryptConfig { work_factor: 14 },
    };

    println!("Vellum - Passphrase Example (work factor {})\n", config.work_factor);

    let encrypter = Encrypter::builder()
        .with_scrypt_config(config.clone())?
        .set_passphrase("correct horse battery staple")?
        .build()?;

    let started = Instant::now();
    let file = encrypter.encrypt(b"The vault combination is 31-7-22.")?;
    println!("Encrypted in {:?}", started.elapsed());

    let mut decrypter = Decrypter::new();
    decrypter.add_passphrase("correct horse battery staple");
    let started = Instant::now();
    let plaintext = decrypter.decrypt(&file)?;
    println!(
        "Decrypted in {:?}: {}",
        started.elapsed(),
        String::from_utf8_lossy(&plaintext)
    );

    let mut wrong = Decrypter::new();
    wrong.add_passphrase("incorrect horse");
    if let Err(e) = wrong.decrypt(&file) {
        println!("Wrong passphrase: {e}");
    }

    // A cautious decrypter can refuse work factors above its own limit
    let mut cautious = Decrypter::new();
    cautious.add_identity(
        ScryptIdentity::new("correct horse battery staple")
            .with_max_work_factor(config.work_factor.saturating_sub(1)),
    );
    if let Err(e) = cautious.decrypt(&file) {
        println!("Cautious decrypter: {e}");
    }

    Ok(())
}
