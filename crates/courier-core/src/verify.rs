//! Verification gate.
//!
//! Two modes authenticate an inbound request:
//!
//! - **Token**: a shared token embedded in the payload is compared in
//!   constant time with the configured one.
//! - **Signature**: an HMAC-SHA256 over `version:timestamp:raw-body` is
//!   compared with the header-supplied signature. This runs on raw bytes,
//!   before the payload is trusted or parsed.
//!
//! A third helper, [`HubSignatureVerifier`], covers `sha256=<hex>` style
//! signatures over the raw body alone.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::VerificationError;

type HmacSha256 = Hmac<Sha256>;

/// Default age after which a signed request is rejected.
pub const DEFAULT_SIGNATURE_MAX_AGE: Duration = Duration::from_secs(300);

// =============================================================================
// Token
// =============================================================================

/// Shared-token verification.
#[derive(Clone)]
pub struct TokenVerifier {
    token: String,
}

impl TokenVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Compares `presented` against the configured token.
    pub fn verify(&self, presented: &str) -> Result<(), VerificationError> {
        if self.token.as_bytes().ct_eq(presented.as_bytes()).into() {
            Ok(())
        } else {
            Err(VerificationError::Mismatch)
        }
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

// =============================================================================
// Versioned timestamp signature
// =============================================================================

/// HMAC-SHA256 request signing with a version prefix and timestamp.
///
/// The signed base string is `"{version}:{timestamp}:{body}"` and the
/// presented signature is `"{version}=" + hex(hmac)`.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    version: String,
    max_age: Duration,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            version: "v0".to_string(),
            max_age: DEFAULT_SIGNATURE_MAX_AGE,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Computes the signature a sender would present.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let digest = self.mac(timestamp, body).finalize().into_bytes();
        format!("{}={}", self.version, hex::encode(digest))
    }

    /// Verifies `signature` against the current wall clock.
    pub fn verify(&self, timestamp: &str, signature: &str, body: &[u8]) -> Result<(), VerificationError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        self.verify_at(now, timestamp, signature, body)
    }

    /// Verifies `signature` as of `now` (seconds since the epoch).
    pub fn verify_at(
        &self,
        now: i64,
        timestamp: &str,
        signature: &str,
        body: &[u8],
    ) -> Result<(), VerificationError> {
        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| VerificationError::MalformedHeader("timestamp"))?;
        if now.abs_diff(ts) > self.max_age.as_secs() {
            return Err(VerificationError::StaleTimestamp { timestamp: ts });
        }

        let hex_sig = signature
            .strip_prefix(self.version.as_str())
            .and_then(|rest| rest.strip_prefix('='))
            .ok_or(VerificationError::MalformedHeader("signature"))?;
        let expected = hex::decode(hex_sig).map_err(|_| VerificationError::MalformedHeader("signature"))?;

        self.mac(timestamp, body)
            .verify_slice(&expected)
            .map_err(|_| VerificationError::Mismatch)
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = keyed(&self.secret);
        mac.update(self.version.as_bytes());
        mac.update(b":");
        mac.update(timestamp.trim().as_bytes());
        mac.update(b":");
        mac.update(body);
        mac
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .field("version", &self.version)
            .field("max_age", &self.max_age)
            .finish()
    }
}

// =============================================================================
// Body-only signature
// =============================================================================

/// `sha256=<hex>` HMAC over the raw body.
#[derive(Clone)]
pub struct HubSignatureVerifier {
    secret: Vec<u8>,
}

impl HubSignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Computes the header value a sender would present.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = keyed(&self.secret);
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, header: &str, body: &[u8]) -> Result<(), VerificationError> {
        let hex_sig = header
            .trim()
            .strip_prefix("sha256=")
            .ok_or(VerificationError::MalformedHeader("signature"))?;
        let expected = hex::decode(hex_sig).map_err(|_| VerificationError::MalformedHeader("signature"))?;

        let mut mac = keyed(&self.secret);
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| VerificationError::Mismatch)
    }
}

impl fmt::Debug for HubSignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

fn keyed(secret: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC-SHA256 accepts keys of any length")
}

// =============================================================================
// Mode selection
// =============================================================================

/// Active verification mode of an adapter.
#[derive(Debug, Clone)]
pub enum Verification {
    Token(TokenVerifier),
    Signature(SignatureVerifier),
}

impl Verification {
    /// Signature mode wins whenever a signing secret is configured.
    pub fn select(token: &str, signing_secret: Option<&str>, max_age: Duration) -> Self {
        match signing_secret.filter(|s| !s.is_empty()) {
            Some(secret) => Self::Signature(SignatureVerifier::new(secret).with_max_age(max_age)),
            None => Self::Token(TokenVerifier::new(token)),
        }
    }

    pub fn is_signature(&self) -> bool {
        matches!(self, Self::Signature(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"type":"event_callback"}"#;

    #[test]
    fn token_match_and_mismatch() {
        let verifier = TokenVerifier::new("secret-token");
        assert!(verifier.verify("secret-token").is_ok());
        assert_eq!(verifier.verify("other"), Err(VerificationError::Mismatch));
        assert_eq!(verifier.verify(""), Err(VerificationError::Mismatch));
    }

    #[test]
    fn signature_round_trip() {
        let verifier = SignatureVerifier::new("shh");
        let sig = verifier.sign("1000", BODY);
        assert!(sig.starts_with("v0="));
        assert!(verifier.verify_at(1000, "1000", &sig, BODY).is_ok());
    }

    #[test]
    fn signature_over_tampered_body_is_rejected() {
        let verifier = SignatureVerifier::new("shh");
        let sig = verifier.sign("1000", BODY);
        assert_eq!(
            verifier.verify_at(1000, "1000", &sig, b"{}"),
            Err(VerificationError::Mismatch)
        );
    }

    #[test]
    fn signature_with_wrong_secret_is_rejected() {
        let sig = SignatureVerifier::new("other").sign("1000", BODY);
        assert_eq!(
            SignatureVerifier::new("shh").verify_at(1000, "1000", &sig, BODY),
            Err(VerificationError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let verifier = SignatureVerifier::new("shh").with_max_age(Duration::from_secs(60));
        let sig = verifier.sign("1000", BODY);
        assert_eq!(
            verifier.verify_at(1061, "1000", &sig, BODY),
            Err(VerificationError::StaleTimestamp { timestamp: 1000 })
        );
        assert!(verifier.verify_at(1060, "1000", &sig, BODY).is_ok());
    }

    #[test]
    fn malformed_headers_are_reported() {
        let verifier = SignatureVerifier::new("shh");
        assert_eq!(
            verifier.verify_at(1000, "soon", "v0=00", BODY),
            Err(VerificationError::MalformedHeader("timestamp"))
        );
        assert_eq!(
            verifier.verify_at(1000, "1000", "v1=00", BODY),
            Err(VerificationError::MalformedHeader("signature"))
        );
        assert_eq!(
            verifier.verify_at(1000, "1000", "v0=zz", BODY),
            Err(VerificationError::MalformedHeader("signature"))
        );
    }

    #[test]
    fn hub_signature_round_trip() {
        let verifier = HubSignatureVerifier::new("hook-secret");
        let header = verifier.sign(BODY);
        assert!(verifier.verify(&header, BODY).is_ok());
        assert_eq!(verifier.verify(&header, b"x"), Err(VerificationError::Mismatch));
        assert_eq!(
            verifier.verify("sha1=abcd", BODY),
            Err(VerificationError::MalformedHeader("signature"))
        );
    }

    #[test]
    fn secrets_of_any_length_can_sign() {
        let long = "k".repeat(200);
        for secret in ["", "k", long.as_str()] {
            let verifier = SignatureVerifier::new(secret);
            let sig = verifier.sign("1000", BODY);
            assert!(verifier.verify_at(1000, "1000", &sig, BODY).is_ok());

            let hub = HubSignatureVerifier::new(secret);
            assert!(hub.verify(&hub.sign(BODY), BODY).is_ok());
        }
    }

    #[test]
    fn signing_secret_selects_signature_mode() {
        assert!(Verification::select("t", Some("s"), DEFAULT_SIGNATURE_MAX_AGE).is_signature());
        assert!(!Verification::select("t", None, DEFAULT_SIGNATURE_MAX_AGE).is_signature());
        assert!(!Verification::select("t", Some(""), DEFAULT_SIGNATURE_MAX_AGE).is_signature());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let debug = format!("{:?}", SignatureVerifier::new("top-secret"));
        assert!(!debug.contains("top-secret"));
        let debug = format!("{:?}", TokenVerifier::new("top-secret"));
        assert!(!debug.contains("top-secret"));
    }
}
