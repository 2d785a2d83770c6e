use std::fmt;

use hex::encode as hex_encode;
use k256::ecdsa::{signature::Signer, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Sha3_256};

/// Length in bytes of an account reference.
pub const ACCOUNT_REF_LENGTH: usize = 20;

/// Public account reference derived from a signing key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountRef([u8; ACCOUNT_REF_LENGTH]);

impl AccountRef {
    /// Takes the leading bytes of the SHA3-256 digest of the compressed
    /// public key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(key.to_encoded_point(true).as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; ACCOUNT_REF_LENGTH];
        bytes.copy_from_slice(&digest[..ACCOUNT_REF_LENGTH]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_REF_LENGTH] {
        &self.0
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex_encode(self.0))
    }
}

impl fmt::Debug for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountRef({self})")
    }
}

/// Signing identity of a service: the private key plus its account.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    account: AccountRef,
}

impl Identity {
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let account = AccountRef::from_verifying_key(signing_key.verifying_key());
        Self {
            signing_key,
            account,
        }
    }

    /// Generates a throwaway key pair. Nothing is written anywhere.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    pub fn account(&self) -> AccountRef {
        self.account
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Compressed SEC1 public key (33 bytes).
    pub fn public_key(&self) -> [u8; 33] {
        let point = self.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        bytes
    }

    /// Signer handed to the pool so requests are attributed to this identity.
    pub fn request_signer(&self) -> RequestSigner {
        RequestSigner {
            signing_key: self.signing_key.clone(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Deterministic (RFC 6979) ECDSA request signer.
#[derive(Clone)]
pub struct RequestSigner {
    signing_key: SigningKey,
}

impl RequestSigner {
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}
