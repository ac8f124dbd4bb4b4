//! # Persistence gateway
//!
//! The contract for a remote store of saved scenes, one collection per owning account.
//! Calls are blocking request/response; the application runs them off the editing thread.

use crate::io::payload::Payload;
use crate::session::{Credential, OwnerID};

/// ID the store gave a saved record.
#[derive(Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RecordID(pub String);
impl RecordID {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}
impl std::fmt::Display for RecordID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A listing entry, without the heavy parts of the record.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    #[serde(alias = "_id")]
    pub id: RecordID,
    pub name: String,
    #[serde(rename = "userId")]
    pub owner: OwnerID,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("credential rejected")]
    Unauthorized,
    #[error("no record {0}")]
    NotFound(RecordID),
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("could not reach the store: {0}")]
    Transport(String),
}

pub trait PersistenceGateway: Send + Sync {
    fn save(&self, credential: &Credential, payload: &Payload) -> Result<RecordID, GatewayError>;
    fn load(&self, credential: &Credential, id: &RecordID) -> Result<Payload, GatewayError>;
    /// Records owned by `owner`, newest first.
    fn list(
        &self,
        credential: &Credential,
        owner: &OwnerID,
    ) -> Result<Vec<RecordSummary>, GatewayError>;
}

/// A store held in memory, with a fixed table of accepted tokens. For tests and offline use.
#[derive(Default)]
pub struct InMemoryGateway {
    accounts: parking_lot::RwLock<hashbrown::HashMap<String, OwnerID>>,
    records: parking_lot::RwLock<hashbrown::HashMap<RecordID, Payload>>,
}
impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Accept `token` as signing in as `owner`.
    pub fn add_account(&self, token: impl Into<String>, owner: OwnerID) {
        self.accounts.write().insert(token.into(), owner);
    }
    fn authenticate(&self, credential: &Credential) -> Result<OwnerID, GatewayError> {
        self.accounts
            .read()
            .get(credential.secret())
            .cloned()
            .ok_or(GatewayError::Unauthorized)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl PersistenceGateway for InMemoryGateway {
    fn save(&self, credential: &Credential, payload: &Payload) -> Result<RecordID, GatewayError> {
        let owner = self.authenticate(credential)?;
        if owner != payload.owner {
            return Err(GatewayError::Rejected(format!(
                "record belongs to {}, signed in as {owner}",
                payload.owner
            )));
        }
        let id = RecordID::generate();
        self.records.write().insert(id.clone(), payload.clone());
        log::debug!("stored {id} for {owner}");
        Ok(id)
    }
    fn load(&self, credential: &Credential, id: &RecordID) -> Result<Payload, GatewayError> {
        let owner = self.authenticate(credential)?;
        self.records
            .read()
            .get(id)
            // Other accounts' records don't exist, as far as this caller is concerned.
            .filter(|payload| payload.owner == owner)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }
    fn list(
        &self,
        credential: &Credential,
        owner: &OwnerID,
    ) -> Result<Vec<RecordSummary>, GatewayError> {
        if &self.authenticate(credential)? != owner {
            return Err(GatewayError::Unauthorized);
        }
        let mut summaries: Vec<_> = self
            .records
            .read()
            .iter()
            .filter(|(_, payload)| &payload.owner == owner)
            .map(|(id, payload)| RecordSummary {
                id: id.clone(),
                name: payload.name.clone(),
                owner: payload.owner.clone(),
                created_at: payload.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
