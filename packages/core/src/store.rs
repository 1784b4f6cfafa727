//! In-memory store of product submissions awaiting email verification.
//!
//! `PendingProductStore` maps a random temporary id to the validated
//! creator form plus the 6-digit code mailed to the creator. Entries are
//! never evicted; one leaves the map only when it is verified (or when the
//! verification email could not be sent).
//!
//! The store itself is not `Sync`. Callers wrap it in
//! `Arc<RwLock<PendingProductStore>>` so the Axum handlers can share it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::validation::ProductInfo;

/// Length of the temporary submission id.
pub const SUBMISSION_ID_LEN: usize = 24;
/// Wrong codes tolerated before a submission is discarded.
pub const MAX_VERIFY_ATTEMPTS: u8 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingProduct {
    pub info: ProductInfo,
    pub verification_code: String,
    pub failed_attempts: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("Unknown or expired product submission")]
    UnknownSubmission,
    #[error("Account does not match the product submission")]
    AccountMismatch,
    #[error("Invalid verification code")]
    CodeMismatch,
    #[error("Too many invalid verification codes. Please submit the product again.")]
    TooManyAttempts,
}

#[derive(Debug, Default)]
pub struct PendingProductStore {
    entries: HashMap<String, PendingProduct>,
}

/// Random six-digit code, never starting with zero.
pub fn generate_verification_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

fn generate_submission_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUBMISSION_ID_LEN)
        .map(char::from)
        .collect()
}

impl PendingProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a validated submission. Returns the temporary id and the code
    /// the creator must echo back.
    pub fn insert(&mut self, info: ProductInfo) -> (String, String) {
        let mut id = generate_submission_id();
        while self.entries.contains_key(&id) {
            id = generate_submission_id();
        }
        let code = generate_verification_code();

        self.entries.insert(
            id.clone(),
            PendingProduct {
                info,
                verification_code: code.clone(),
                failed_attempts: 0,
                created_at: Utc::now(),
            },
        );
        (id, code)
    }

    pub fn get(&self, id: &str) -> Option<&PendingProduct> {
        self.entries.get(id)
    }

    /// Check `code` for the submission `id` made by `account`.
    ///
    /// On success the entry is removed and returned. A wrong code leaves
    /// the entry in place so the creator can retry, until the
    /// `MAX_VERIFY_ATTEMPTS`th miss drops it.
    pub fn verify(
        &mut self,
        id: &str,
        account: &Pubkey,
        code: &str,
    ) -> Result<PendingProduct, VerifyError> {
        let pending = self
            .entries
            .get_mut(id)
            .ok_or(VerifyError::UnknownSubmission)?;
        if pending.info.account != *account {
            return Err(VerifyError::AccountMismatch);
        }
        if pending.verification_code != code.trim() {
            pending.failed_attempts += 1;
            if pending.failed_attempts >= MAX_VERIFY_ATTEMPTS {
                self.entries.remove(id);
                return Err(VerifyError::TooManyAttempts);
            }
            return Err(VerifyError::CodeMismatch);
        }
        self.entries.remove(id).ok_or(VerifyError::UnknownSubmission)
    }

    pub fn remove(&mut self, id: &str) -> Option<PendingProduct> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
