//! Encryption primitives for the credential vault.
//!
//! The symmetric key is derived from identifying values of the current host
//! and user. None of those inputs are secret: the derived key keeps the vault
//! file from being plaintext-readable when it is casually inspected or leaks
//! into a backup or a repository, and nothing more. A local attacker who can
//! run code as this user can derive the same key; treat the vault as
//! obfuscation, not secret storage.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha2::{Digest, Sha256};
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use crate::error::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;
const SEPARATOR: char = ':';

/// Derives the vault's symmetric key from host-intrinsic values.
///
/// Deterministic for a given host and user: hostname, OS, architecture, CPU
/// model, and user name are folded through SHA-256. Moving the vault file to
/// a different machine (or user account) therefore makes every stored entry
/// undecryptable, which surfaces as an authentication failure.
pub fn derive_encryption_key() -> [u8; 32] {
    let sys = System::new_with_specifics(
        RefreshKind::new().with_cpu(CpuRefreshKind::everything()),
    );
    let hostname = System::host_name().unwrap_or_else(|| "unknown-host".to_string());
    let cpu_model = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().to_string())
        .unwrap_or_else(|| "unknown-cpu".to_string());
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());

    let mut hasher = Sha256::new();
    hasher.update("hostname:");
    hasher.update(hostname.as_bytes());
    hasher.update(";os:");
    hasher.update(std::env::consts::OS.as_bytes());
    hasher.update(";arch:");
    hasher.update(std::env::consts::ARCH.as_bytes());
    hasher.update(";cpu:");
    hasher.update(cpu_model.as_bytes());
    hasher.update(";user:");
    hasher.update(user.as_bytes());
    hasher.finalize().into()
}

/// Encrypts `plaintext` with AES-256-CBC under a fresh random IV.
///
/// Output is `ivHex:cipherHex`; two calls with the same plaintext produce
/// different ciphertexts because the IV is never reused.
pub fn encrypt(plaintext: &str, key: &[u8; 32]) -> Result<String> {
    let mut iv = [0u8; IV_LEN];
    getrandom::fill(&mut iv)
        .map_err(|e| Error::configuration(format!("could not source random bytes: {e}")))?;

    let cipher = Aes256CbcEnc::new(key.into(), &iv.into());
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    Ok(format!(
        "{}{SEPARATOR}{}",
        hex::encode(iv),
        hex::encode(ciphertext)
    ))
}

/// Decrypts an `ivHex:cipherHex` string produced by [`encrypt`].
///
/// Malformed input, a missing separator, or a key that no longer matches
/// (vault moved to another host) all surface as authentication failures.
pub fn decrypt(stored: &str, key: &[u8; 32]) -> Result<String> {
    let (iv_hex, cipher_hex) = stored
        .split_once(SEPARATOR)
        .ok_or_else(|| Error::authentication("stored credential is malformed"))?;

    let iv = hex::decode(iv_hex)
        .map_err(|_| Error::authentication("stored credential has an invalid IV"))?;
    if iv.len() != IV_LEN {
        return Err(Error::authentication("stored credential has an invalid IV"));
    }
    let ciphertext = hex::decode(cipher_hex)
        .map_err(|_| Error::authentication("stored credential is malformed"))?;

    let cipher = Aes256CbcDec::new_from_slices(key, &iv)
        .map_err(|_| Error::authentication("stored credential has an invalid IV"))?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| {
            Error::authentication(
                "could not decrypt stored credential; the vault may have been \
                 created on a different machine or user account",
            )
        })?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::authentication("decrypted credential is not valid text"))
}
