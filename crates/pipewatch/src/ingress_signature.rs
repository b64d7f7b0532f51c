//! HMAC-SHA256 verification for signed ingress requests.

use anyhow::{anyhow, bail, Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub(crate) const SIGNATURE_HEADER: &str = "x-pipewatch-signature";

/// Checks `signature` (`sha256=<hex>`) against the HMAC of `payload` under `secret`.
pub(crate) fn verify_ingress_signature(
    payload: &[u8],
    signature: Option<&str>,
    secret: &str,
) -> Result<()> {
    let signature = signature
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing {SIGNATURE_HEADER} header"))?;
    let Some(digest_hex) = signature.strip_prefix("sha256=") else {
        bail!("ingress signature must use sha256=<hex> format");
    };
    let signature_bytes = decode_hex(digest_hex)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("failed to initialize ingress HMAC verifier")?;
    mac.update(payload);
    mac.verify_slice(&signature_bytes)
        .map_err(|_| anyhow!("ingress signature verification failed"))
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("signature digest cannot be empty");
    }
    if trimmed.len() % 2 != 0 {
        bail!("signature digest must have an even number of hex characters");
    }

    let mut bytes = Vec::with_capacity(trimmed.len() / 2);
    let raw = trimmed.as_bytes();
    let mut index = 0usize;
    while index < raw.len() {
        let hex = std::str::from_utf8(&raw[index..index + 2]).context("invalid utf-8 in digest")?;
        let byte = u8::from_str_radix(hex, 16)
            .with_context(|| format!("invalid hex byte '{hex}' in signature digest"))?;
        bytes.push(byte);
        index = index.saturating_add(2);
    }
    Ok(bytes)
}
