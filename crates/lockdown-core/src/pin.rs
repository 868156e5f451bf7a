//! Parental PIN storage and verification.
//!
//! The PIN is kept as a SHA-256 hex digest under `masterPin`. Until a PIN
//! is configured the fixed rescue code unlocks.

use sha2::{Digest, Sha256};

use crate::error::{CoreError, ValidationError};
use crate::storage::{StateKey, StateStore, StateStoreExt};

/// Accepted only while no PIN is configured.
pub const RESCUE_PIN: &str = "0000";

pub const PIN_MIN_LEN: usize = 4;
pub const PIN_MAX_LEN: usize = 6;

pub trait PinVault {
    fn verify(&self, candidate: &str) -> bool;
    fn set(&self, new_pin: &str) -> Result<(), CoreError>;
    fn is_set(&self) -> bool;
}

/// PIN vault backed by the shared state store.
#[derive(Debug, Clone)]
pub struct StorePinVault<S> {
    store: S,
}

impl<S: StateStore> StorePinVault<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn stored_digest(&self) -> Option<String> {
        self.store
            .read_string(StateKey::MasterPin)
            .filter(|digest| !digest.is_empty())
    }
}

impl<S: StateStore> PinVault for StorePinVault<S> {
    fn verify(&self, candidate: &str) -> bool {
        match self.stored_digest() {
            None => candidate == RESCUE_PIN,
            Some(digest) => digest == hash_pin(candidate),
        }
    }

    fn set(&self, new_pin: &str) -> Result<(), CoreError> {
        validate_pin(new_pin)?;
        self.store.set(StateKey::MasterPin, &hash_pin(new_pin))?;
        Ok(())
    }

    fn is_set(&self) -> bool {
        self.stored_digest().is_some()
    }
}

/// 4 to 6 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() < PIN_MIN_LEN || pin.len() > PIN_MAX_LEN {
        return Err(ValidationError::InvalidPin(format!(
            "must be {PIN_MIN_LEN} to {PIN_MAX_LEN} digits"
        )));
    }
    if !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidPin("digits only".into()));
    }
    Ok(())
}

fn hash_pin(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()))
}
