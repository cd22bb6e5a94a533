//! Persisted ed25519 key material: loading key files and deriving the text
//! identities used for wallets and the shared list account.

use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
pub use ed25519_dalek::SigningKey;
use ed25519_dalek::{VerifyingKey, SECRET_KEY_LENGTH};
use shared::domain::{AccountAddress, PublicKeyIdentity};
use zeroize::Zeroize;

/// Reads a key file holding the base64 encoding of a 32-byte ed25519 seed.
pub fn load_signing_key(path: &Path) -> Result<SigningKey> {
    let mut raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read key file '{}'", path.display()))?;
    let decoded = STANDARD.decode(raw.trim());
    raw.zeroize();
    let mut decoded =
        decoded.map_err(|e| anyhow!("invalid key file '{}': {e}", path.display()))?;

    if decoded.len() != SECRET_KEY_LENGTH {
        let actual = decoded.len();
        decoded.zeroize();
        return Err(anyhow!(
            "invalid key file '{}': expected {SECRET_KEY_LENGTH} bytes, got {actual}",
            path.display()
        ));
    }

    let mut seed = [0u8; SECRET_KEY_LENGTH];
    seed.copy_from_slice(&decoded);
    decoded.zeroize();
    let key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    Ok(key)
}

/// Writes `key` in the format `load_signing_key` reads.
pub fn write_signing_key(path: &Path, key: &SigningKey) -> Result<()> {
    let mut encoded = STANDARD.encode(key.to_bytes());
    let written = fs::write(path, &encoded)
        .with_context(|| format!("failed to write key file '{}'", path.display()));
    encoded.zeroize();
    written
}

pub fn encode_public_key(key: &VerifyingKey) -> String {
    URL_SAFE_NO_PAD.encode(key.as_bytes())
}

pub fn decode_public_key(text: &str) -> Result<VerifyingKey> {
    let bytes = URL_SAFE_NO_PAD
        .decode(text.as_bytes())
        .map_err(|e| anyhow!("invalid public key encoding: {e}"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow!("invalid public key length"))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| anyhow!("invalid public key: {e}"))
}

pub fn identity_for_key(key: &SigningKey) -> PublicKeyIdentity {
    PublicKeyIdentity(encode_public_key(&key.verifying_key()))
}

/// The shared list account is addressed by the public half of its persisted key.
pub fn account_address_from_key_file(path: &Path) -> Result<AccountAddress> {
    let key = load_signing_key(path)?;
    Ok(AccountAddress(encode_public_key(&key.verifying_key())))
}
