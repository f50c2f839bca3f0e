//! Development wallet
//!
//! [`DevSigner`] derives an address and keyed-hash signatures from a 32-byte
//! secret. It is only meaningful against the devnet gateway, which records
//! signatures without verifying them. Production wallets implement
//! [`Signer`] themselves.

use std::path::Path;

use rand::RngCore;
use tiny_keccak::{Hasher, Keccak};

use pado_core::{Error, Result};

use crate::remote::Signer;

pub struct DevSigner {
    secret: [u8; 32],
    address: String,
}

fn keccak(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

impl DevSigner {
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let hash = keccak(&[&secret[..]]);
        let address = format!("0x{}", hex::encode(&hash[12..]));
        Self { secret, address }
    }

    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::from_secret(secret)
    }

    /// Parse a hex secret, with or without `0x`
    pub fn from_hex(secret: &str) -> Result<Self> {
        let trimmed = secret.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|e| Error::Config(format!("invalid wallet key: {}", e)))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| Error::Config(format!("wallet key must be 32 bytes, got {}", b.len())))?;
        Ok(Self::from_secret(secret))
    }

    /// Read a hex secret from a key file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_hex(&contents)
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret)
    }
}

impl Signer for DevSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = keccak(&[message]);
        Ok(keccak(&[&self.secret[..], &digest[..]]).to_vec())
    }
}

impl std::fmt::Debug for DevSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevSigner").field("address", &self.address).finish()
    }
}
