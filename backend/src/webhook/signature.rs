//! Webhook signature verification
//!
//! The provider signs every callback with an HMAC-SHA256 over the exact raw
//! request body, hex-encoded into the `x-didit-signature` header. The
//! comparison is constant-time; verification happens before the body is
//! parsed so a forged payload never reaches any state-mutating code.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a hex-encoded HMAC-SHA256 signature over the raw body bytes.
///
/// Returns false for undecodable signatures; the underlying comparison is
/// constant-time.
#[must_use]
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Computes the hex-encoded HMAC-SHA256 signature the provider would send
/// for a body. Used when registering webhooks against sandbox environments
/// and by the receiver tests.
#[must_use]
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test_secret";
    const BODY: &[u8] = br#"{"session_id":"abc","status":"Approved"}"#;

    #[test]
    fn accepts_a_matching_signature() {
        let signature = sign(SECRET, BODY);
        assert!(verify_signature(SECRET, BODY, &signature));
    }

    #[test]
    fn rejects_a_single_flipped_body_byte() {
        let signature = sign(SECRET, BODY);

        let mut tampered = BODY.to_vec();
        for i in 0..tampered.len() {
            tampered[i] ^= 0x01;
            assert!(
                !verify_signature(SECRET, &tampered, &signature),
                "byte {i} flip was not detected"
            );
            tampered[i] ^= 0x01;
        }
    }

    #[test]
    fn rejects_a_single_mutated_signature_character() {
        let signature = sign(SECRET, BODY);

        for i in 0..signature.len() {
            let mut tampered: Vec<char> = signature.chars().collect();
            tampered[i] = if tampered[i] == '0' { '1' } else { '0' };
            let tampered: String = tampered.into_iter().collect();
            if tampered == signature {
                continue;
            }
            assert!(
                !verify_signature(SECRET, BODY, &tampered),
                "signature char {i} mutation was not detected"
            );
        }
    }

    #[test]
    fn rejects_the_wrong_secret() {
        let signature = sign(SECRET, BODY);
        assert!(!verify_signature(b"some_other_secret", BODY, &signature));
    }

    #[test]
    fn rejects_non_hex_and_truncated_signatures() {
        let signature = sign(SECRET, BODY);

        assert!(!verify_signature(SECRET, BODY, "not-hex!"));
        assert!(!verify_signature(SECRET, BODY, ""));
        assert!(!verify_signature(SECRET, BODY, &signature[..32]));
    }

    #[test]
    fn tolerates_surrounding_whitespace_in_the_header() {
        let signature = sign(SECRET, BODY);
        assert!(verify_signature(SECRET, BODY, &format!(" {signature}\n")));
    }
}
