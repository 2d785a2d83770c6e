//! Identifiers and key material shared by the fetcher services.

mod identity;

use std::{fmt, str::FromStr};

use thiserror::Error;

pub use identity::{AccountRef, Identity, RequestSigner, ACCOUNT_REF_LENGTH};

/// Size in bytes of a decoded container identifier.
pub const CONTAINER_ID_LENGTH: usize = 32;

/// Errors emitted when a container id string fails to decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerIdError {
    #[error("empty container ID string")]
    Empty,
    #[error("decode base58: {0}")]
    InvalidBase58(String),
    #[error("invalid length {0}, expected {CONTAINER_ID_LENGTH}")]
    WrongLength(usize),
}

/// Identifier of a logical object collection inside the storage network.
///
/// The canonical string form is base58 over the 32 raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId([u8; CONTAINER_ID_LENGTH]);

impl ContainerId {
    pub fn from_bytes(bytes: [u8; CONTAINER_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn parse(value: &str) -> Result<Self, ContainerIdError> {
        if value.is_empty() {
            return Err(ContainerIdError::Empty);
        }
        let decoded = bs58::decode(value)
            .into_vec()
            .map_err(|err| ContainerIdError::InvalidBase58(err.to_string()))?;
        let bytes: [u8; CONTAINER_ID_LENGTH] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| ContainerIdError::WrongLength(decoded.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; CONTAINER_ID_LENGTH] {
        &self.0
    }
}

impl FromStr for ContainerId {
    type Err = ContainerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerId({self})")
    }
}
