//! Hash functions used by the crypto opcodes and script identity, and the
//! host hook for signature verification.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Computes SHA-1 of the input data.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    use sha1::Sha1;
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-256 of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes RIPEMD-160 of the input data.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RIPEMD-160 of SHA-256; the script hash function.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Double SHA-256.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Signature verification supplied by the host.
///
/// The engine knows nothing about curves or key formats; CHECKSIG, VERIFY
/// and CHECKMULTISIG hand raw bytes to this trait and push its answer.
pub trait Crypto: Send + Sync {
    /// Returns true when `signature` over `message` verifies against `pubkey`.
    /// Malformed keys or signatures verify as false.
    fn verify_signature(&self, message: &[u8], signature: &[u8], pubkey: &[u8]) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hex::encode(sha1(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(ripemd160(b"")),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
    }

    #[test]
    fn test_composed_hashes() {
        assert_eq!(hash160(b"neo"), ripemd160(&sha256(b"neo")));
        assert_eq!(hash256(b"neo"), sha256(&sha256(b"neo")));
    }
}
