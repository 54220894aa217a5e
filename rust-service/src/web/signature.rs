//! Handshake signature verification.
//!
//! The platform signs requests with SHA-1 over the shared token, timestamp
//! and nonce. Reference: https://developers.weixin.qq.com/doc/offiaccount/Basic_Information/Access_Overview.html

use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::warn;

/// Signature query parameters sent with every webhook request.
///
/// `echostr` is only present on the GET handshake.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandshakeRequest {
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub echostr: String,
    /// Alternate challenge name, ignored when `echostr` is set
    #[serde(default)]
    pub echo: String,
}

impl HandshakeRequest {
    /// The challenge string to echo back.
    pub fn challenge(&self) -> &str {
        if self.echostr.is_empty() {
            &self.echo
        } else {
            &self.echostr
        }
    }
}

/// Verifies request signatures against the configured token.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    token: String,
}

impl SignatureVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Check a full handshake, including the presence of the echo string.
    pub fn verify_handshake(&self, request: &HandshakeRequest) -> bool {
        if request.challenge().is_empty() {
            warn!("handshake_echo_missing");
            return false;
        }
        self.verify(request)
    }

    /// Check only the signature fields of a request.
    pub fn verify(&self, request: &HandshakeRequest) -> bool {
        verify_signature(
            &self.token,
            &request.timestamp,
            &request.nonce,
            &request.signature,
        )
    }
}

/// Verify a webhook signature.
///
/// The signature is the lowercase hex SHA-1 of token, timestamp and nonce
/// sorted lexicographically and concatenated without a separator.
///
/// Returns `false` if any input is empty or the digest does not match.
pub fn verify_signature(token: &str, timestamp: &str, nonce: &str, signature: &str) -> bool {
    // Check for empty inputs
    if token.is_empty() || timestamp.is_empty() || nonce.is_empty() || signature.is_empty() {
        warn!(
            has_token = !token.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            has_nonce = !nonce.is_empty(),
            has_signature = !signature.is_empty(),
            "signature_missing_fields"
        );
        return false;
    }

    let expected_signature = compute_signature(token, timestamp, nonce);

    let valid = constant_time_compare(&expected_signature, signature);

    if !valid {
        warn!(
            timestamp = %timestamp,
            nonce = %nonce,
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            "signature_mismatch"
        );
    }

    valid
}

/// Compute the expected signature for a token, timestamp and nonce.
pub fn compute_signature(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha1("1234561700000000wechat-token")
    const KNOWN_SIGNATURE: &str = "609db367c6e053dc92d88484bba73c71adf6aed6";

    #[test]
    fn test_compute_signature_known_vectors() {
        assert_eq!(
            compute_signature("wechat-token", "1700000000", "123456"),
            KNOWN_SIGNATURE
        );
        assert_eq!(
            compute_signature("abc", "1", "2"),
            "2809f5614d4b6b0c4e1bb4c3f67ef361c7ef7281"
        );
        assert_eq!(
            compute_signature("token", "1348831860", "987654321"),
            "b42b0f227250f66a8f70d8af9caa4d2b6f557f87"
        );
    }

    #[test]
    fn test_compute_signature_order_independent() {
        // Sorting makes the argument positions irrelevant
        assert_eq!(
            compute_signature("123456", "wechat-token", "1700000000"),
            KNOWN_SIGNATURE
        );
    }

    #[test]
    fn test_verify_signature_valid() {
        assert!(verify_signature(
            "wechat-token",
            "1700000000",
            "123456",
            KNOWN_SIGNATURE
        ));
    }

    #[test]
    fn test_verify_signature_single_char_mutation() {
        for i in 0..KNOWN_SIGNATURE.len() {
            let mut mutated: Vec<u8> = KNOWN_SIGNATURE.bytes().collect();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(
                !verify_signature("wechat-token", "1700000000", "123456", &mutated),
                "mutation at {} accepted",
                i
            );
        }
    }

    #[test]
    fn test_verify_signature_uppercase_rejected() {
        assert!(!verify_signature(
            "wechat-token",
            "1700000000",
            "123456",
            &KNOWN_SIGNATURE.to_uppercase()
        ));
    }

    #[test]
    fn test_verify_signature_missing_fields() {
        assert!(!verify_signature("", "1700000000", "123456", KNOWN_SIGNATURE));
        assert!(!verify_signature("wechat-token", "", "123456", KNOWN_SIGNATURE));
        assert!(!verify_signature("wechat-token", "1700000000", "", KNOWN_SIGNATURE));
        assert!(!verify_signature("wechat-token", "1700000000", "123456", ""));
    }

    #[test]
    fn test_verifier_handshake_requires_echo() {
        let verifier = SignatureVerifier::new("wechat-token");
        let mut request = HandshakeRequest {
            signature: KNOWN_SIGNATURE.to_string(),
            timestamp: "1700000000".to_string(),
            nonce: "123456".to_string(),
            ..Default::default()
        };

        assert!(verifier.verify(&request));
        assert!(!verifier.verify_handshake(&request));

        request.echostr = "challenge".to_string();
        assert!(verifier.verify_handshake(&request));
    }

    #[test]
    fn test_challenge_prefers_echostr() {
        let mut request = HandshakeRequest {
            echo: "fallback".to_string(),
            ..Default::default()
        };
        assert_eq!(request.challenge(), "fallback");

        request.echostr = "primary".to_string();
        assert_eq!(request.challenge(), "primary");
    }

    #[test]
    fn test_verifier_wrong_token() {
        let verifier = SignatureVerifier::new("other-token");
        let request = HandshakeRequest {
            signature: KNOWN_SIGNATURE.to_string(),
            timestamp: "1700000000".to_string(),
            nonce: "123456".to_string(),
            echostr: "challenge".to_string(),
            ..Default::default()
        };

        assert!(!verifier.verify_handshake(&request));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
