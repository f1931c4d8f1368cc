use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing x-line-signature header")]
    Missing,
    #[error("signature is not valid base64")]
    Malformed,
    #[error("signature does not match request body")]
    Mismatch,
    #[error("channel secret cannot key HMAC-SHA256")]
    InvalidSecret,
}

fn keyed_mac(secret: &SecretString, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(body);
    Ok(mac)
}

/// base64(HMAC-SHA256(channel secret, raw body)).
pub fn sign(secret: &SecretString, body: &[u8]) -> Result<String, SignatureError> {
    let mac = keyed_mac(secret, body)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn verify_signature(
    secret: &SecretString,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.map(str::trim).filter(|value| !value.is_empty()).ok_or(SignatureError::Missing)?;
    let expected = STANDARD.decode(header).map_err(|_| SignatureError::Malformed)?;

    keyed_mac(secret, body)?.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}
