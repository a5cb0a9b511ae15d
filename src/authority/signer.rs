use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::core::FacturaError;

type HmacSha256 = Hmac<Sha256>;

/// Content hash and signature over a serialized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSignature {
    /// Hex-encoded SHA-256 of the payload.
    pub content_hash: String,
    pub signature: String,
}

/// Signing capability used by the gateway.
///
/// Swap in a certificate-based implementation for production without
/// touching the gateway.
pub trait Signer: Send + Sync {
    /// Short name of the scheme, for logs.
    fn algorithm(&self) -> &'static str;

    fn sign(&self, payload: &[u8]) -> Result<DocumentSignature, FacturaError>;

    /// Check `signature` against `payload`. Mismatches return `Ok(false)`.
    fn verify(&self, payload: &[u8], signature: &DocumentSignature) -> Result<bool, FacturaError>;
}

/// Placeholder scheme: `base64(HMAC-SHA256(secret, hex(SHA-256(payload))))`.
pub struct HmacSigner {
    secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, FacturaError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(FacturaError::Config("signing secret must not be empty".into()));
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn mac(&self) -> Result<HmacSha256, FacturaError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| FacturaError::Config(format!("invalid signing key: {e}")))
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

/// Hex-encoded SHA-256 digest.
pub fn content_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

impl Signer for HmacSigner {
    fn algorithm(&self) -> &'static str {
        "hmac-sha256"
    }

    fn sign(&self, payload: &[u8]) -> Result<DocumentSignature, FacturaError> {
        let content_hash = content_hash(payload);
        let mut mac = self.mac()?;
        mac.update(content_hash.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        Ok(DocumentSignature {
            content_hash,
            signature,
        })
    }

    fn verify(&self, payload: &[u8], signature: &DocumentSignature) -> Result<bool, FacturaError> {
        let expected_hash = content_hash(payload);
        if expected_hash != signature.content_hash {
            return Ok(false);
        }
        let Ok(raw) = BASE64.decode(signature.signature.as_bytes()) else {
            return Ok(false);
        };
        let mut mac = self.mac()?;
        mac.update(expected_hash.as_bytes());
        // Constant-time comparison
        Ok(mac.verify_slice(&raw).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let signer = HmacSigner::new("clave_simulada").unwrap();
        let payload = b"<DTE>...</DTE>";
        let sig = signer.sign(payload).unwrap();

        assert_eq!(sig.content_hash.len(), 64);
        assert_eq!(sig.content_hash, content_hash(payload));
        assert!(signer.verify(payload, &sig).unwrap());
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = HmacSigner::new("k").unwrap();
        assert_eq!(signer.sign(b"abc").unwrap(), signer.sign(b"abc").unwrap());
    }

    #[test]
    fn tampered_payload_fails() {
        let signer = HmacSigner::new("clave_simulada").unwrap();
        let sig = signer.sign(b"<DTE>1</DTE>").unwrap();
        assert!(!signer.verify(b"<DTE>2</DTE>", &sig).unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let sig = HmacSigner::new("a").unwrap().sign(b"doc").unwrap();
        assert!(!HmacSigner::new("b").unwrap().verify(b"doc", &sig).unwrap());
    }

    #[test]
    fn garbage_signature_fails() {
        let signer = HmacSigner::new("k").unwrap();
        let mut sig = signer.sign(b"doc").unwrap();
        sig.signature = "not base64!".into();
        assert!(!signer.verify(b"doc", &sig).unwrap());
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(HmacSigner::new("").is_err());
    }
}
