//! Control API request signing.
//!
//! Each request carries the `X-Bili-*` headers below plus `Authorization`,
//! the hex HMAC-SHA256 (keyed with the app secret) of the canonical string:
//! the six signed header names lowercased, in sorted order, as `name:value`
//! lines joined by `\n`. A header that is not set signs as an empty value.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::error::{ApiError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_CONTENT_MD5: &str = "X-Bili-Content-MD5";
pub const HEADER_TIMESTAMP: &str = "X-Bili-Timestamp";
pub const HEADER_SIGNATURE_METHOD: &str = "X-Bili-Signature-Method";
pub const HEADER_SIGNATURE_NONCE: &str = "X-Bili-Signature-Nonce";
pub const HEADER_ACCESS_KEY_ID: &str = "X-Bili-AccessKeyId";
pub const HEADER_SIGNATURE_VERSION: &str = "X-Bili-Signature-Version";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

pub const SIGNATURE_METHOD: &str = "HMAC-SHA256";
pub const SIGNATURE_VERSION: &str = "1.0";

// Sorted by lowercase name.
const SIGNED_HEADERS: [&str; 6] = [
    HEADER_ACCESS_KEY_ID,
    HEADER_CONTENT_MD5,
    HEADER_SIGNATURE_METHOD,
    HEADER_SIGNATURE_NONCE,
    HEADER_SIGNATURE_VERSION,
    HEADER_TIMESTAMP,
];

/// App credentials issued by the open platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_key: String,
    pub app_secret: String,
}

impl Credentials {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field(
                "app_secret",
                &format_args!("<redacted:{} bytes>", self.app_secret.len()),
            )
            .finish()
    }
}

/// Headers to attach to one signed request, `Authorization` last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    headers: Vec<(&'static str, String)>,
}

impl SignedHeaders {
    /// Value of a header, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.headers.iter().map(|(key, value)| (*key, value.as_str()))
    }

    /// The string the signature is computed over.
    pub fn canonical_string(&self) -> String {
        SIGNED_HEADERS
            .iter()
            .map(|name| {
                format!(
                    "{}:{}",
                    name.to_ascii_lowercase(),
                    self.get(name).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Sign a request using the current time and a random nonce.
///
/// `body` is the POST body; `None` for requests without one.
pub fn sign_request(credentials: &Credentials, body: Option<&[u8]>) -> Result<SignedHeaders> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let nonce = format!(
        "{timestamp}{:08}",
        rand::thread_rng().gen_range(0..1_000_000_000u32)
    );
    sign_request_at(credentials, body, timestamp, &nonce)
}

/// Sign a request with an explicit timestamp and nonce.
pub fn sign_request_at(
    credentials: &Credentials,
    body: Option<&[u8]>,
    timestamp: u64,
    nonce: &str,
) -> Result<SignedHeaders> {
    let mut headers = vec![
        (HEADER_TIMESTAMP, timestamp.to_string()),
        (HEADER_SIGNATURE_METHOD, SIGNATURE_METHOD.to_string()),
        (HEADER_SIGNATURE_NONCE, nonce.to_string()),
        (HEADER_ACCESS_KEY_ID, credentials.app_key.clone()),
        (HEADER_SIGNATURE_VERSION, SIGNATURE_VERSION.to_string()),
    ];
    if let Some(body) = body {
        headers.push((HEADER_CONTENT_MD5, format!("{:x}", md5::compute(body))));
    }

    let mut signed = SignedHeaders { headers };
    let signature = hmac_sha256_hex(&credentials.app_secret, &signed.canonical_string())?;
    signed.headers.push((HEADER_AUTHORIZATION, signature));
    Ok(signed)
}

/// Hex-encoded HMAC-SHA256 of `data` keyed with `secret`.
pub fn hmac_sha256_hex(secret: &str, data: &str) -> Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| ApiError::InvalidKey)?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("key-123", "secret-456")
    }

    #[test]
    fn hmac_matches_rfc4231_vector() {
        assert_eq!(
            hmac_sha256_hex("Jefe", "what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn canonical_string_is_sorted_and_lowercased() {
        let signed = sign_request_at(&credentials(), Some(b"{}"), 1_700_000_000, "n0nce").unwrap();

        assert_eq!(
            signed.canonical_string(),
            "x-bili-accesskeyid:key-123\n\
             x-bili-content-md5:99914b932bd37a50b983c5e7c90ae93b\n\
             x-bili-signature-method:HMAC-SHA256\n\
             x-bili-signature-nonce:n0nce\n\
             x-bili-signature-version:1.0\n\
             x-bili-timestamp:1700000000"
        );
    }

    #[test]
    fn authorization_signs_canonical_string() {
        let signed = sign_request_at(&credentials(), Some(b"{}"), 1_700_000_000, "n0nce").unwrap();
        let expected = hmac_sha256_hex("secret-456", &signed.canonical_string()).unwrap();

        assert_eq!(signed.get(HEADER_AUTHORIZATION), Some(expected.as_str()));
        assert_eq!(signed.get("x-bili-accesskeyid"), Some("key-123"));
    }

    #[test]
    fn missing_body_signs_empty_md5() {
        let signed = sign_request_at(&credentials(), None, 1, "n").unwrap();
        assert_eq!(signed.get(HEADER_CONTENT_MD5), None);
        assert!(signed
            .canonical_string()
            .contains("x-bili-content-md5:\n"));
    }

    #[test]
    fn nonce_starts_with_timestamp() {
        let signed = sign_request(&credentials(), Some(b"{}")).unwrap();
        let timestamp = signed.get(HEADER_TIMESTAMP).unwrap().to_string();
        let nonce = signed.get(HEADER_SIGNATURE_NONCE).unwrap();
        assert!(nonce.starts_with(&timestamp));
        assert!(nonce.len() >= timestamp.len() + 8);
    }

    #[test]
    fn any_secret_length_signs() {
        let long = "x".repeat(256);
        for secret in ["", "k", long.as_str()] {
            let signed = sign_request_at(&Credentials::new("key", secret), None, 1, "n").unwrap();
            let signature = signed.get(HEADER_AUTHORIZATION).unwrap();
            assert_eq!(signature.len(), 64);
            assert!(signature.bytes().all(|b| b.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("secret-456"));
        assert!(debug.contains("<redacted:10 bytes>"));
    }
}
