//! Stores for saved logos: a directory of JSON files, and the web backend.
//!
//! Both are blocking. The worker calls them from `spawn_blocking`.

use logoforge_core::gateway::{GatewayError, PersistenceGateway, RecordID, RecordSummary};
use logoforge_core::io::Payload;
use logoforge_core::session::{Credential, OwnerID};

/// Default location of the [`DirectoryGateway`].
#[must_use]
pub fn default_logo_dir() -> Option<std::path::PathBuf> {
    let mut data = dirs::data_dir()?;
    data.push(env!("CARGO_PKG_NAME"));
    data.push("logos");
    Some(data)
}

/// Refuse anything that could escape the directory it's joined onto.
fn path_component(raw: &str) -> Option<&str> {
    let safe = !raw.is_empty()
        && raw != "."
        && raw != ".."
        && !raw.contains(['/', '\\', ':', '\0']);
    safe.then_some(raw)
}

fn transport(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

/// Keeps each owner's logos as `<root>/<owner>/<id>.json`.
///
/// There is nobody to check credentials against, so the gateway is bound to one local owner and
/// only ever acts as them.
pub struct DirectoryGateway {
    root: std::path::PathBuf,
    owner: OwnerID,
}
/// The parts of a stored payload a listing needs.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSummary {
    name: String,
    #[serde(rename = "userId")]
    owner: OwnerID,
    created_at: chrono::DateTime<chrono::Utc>,
}
impl DirectoryGateway {
    #[must_use]
    pub fn new(root: impl Into<std::path::PathBuf>, owner: OwnerID) -> Self {
        Self {
            root: root.into(),
            owner,
        }
    }
    fn owner_dir(&self, owner: &OwnerID) -> Result<std::path::PathBuf, GatewayError> {
        let component = path_component(owner.as_str()).ok_or_else(|| {
            GatewayError::Rejected(format!("{owner:?} can't be used as a directory name"))
        })?;
        Ok(self.root.join(component))
    }
    fn authorize(&self, owner: &OwnerID) -> Result<(), GatewayError> {
        if owner == &self.owner {
            Ok(())
        } else {
            Err(GatewayError::Unauthorized)
        }
    }
}
impl PersistenceGateway for DirectoryGateway {
    fn save(&self, _: &Credential, payload: &Payload) -> Result<RecordID, GatewayError> {
        if payload.owner != self.owner {
            return Err(GatewayError::Rejected(format!(
                "record belongs to {}, this store is {}'s",
                payload.owner, self.owner
            )));
        }
        let dir = self.owner_dir(&payload.owner)?;
        std::fs::create_dir_all(&dir).map_err(transport)?;

        let id = RecordID::generate();
        let json = payload
            .to_json()
            .map_err(|e| GatewayError::Rejected(e.to_string()))?;
        // Write aside and rename, so a crash never leaves half a record.
        let partial = dir.join(format!("{id}.json.partial"));
        std::fs::write(&partial, json).map_err(transport)?;
        std::fs::rename(&partial, dir.join(format!("{id}.json"))).map_err(transport)?;
        log::debug!("stored {id} in {dir:?}");
        Ok(id)
    }
    fn load(&self, _: &Credential, id: &RecordID) -> Result<Payload, GatewayError> {
        let not_found = || GatewayError::NotFound(id.clone());
        let file = path_component(&id.0).ok_or_else(not_found)?;
        let path = self.owner_dir(&self.owner)?.join(format!("{file}.json"));
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(transport(e)),
        };
        Payload::from_json(&json).map_err(|e| transport(format!("{path:?} is corrupt: {e}")))
    }
    fn list(&self, _: &Credential, owner: &OwnerID) -> Result<Vec<RecordSummary>, GatewayError> {
        self.authorize(owner)?;
        let dir = self.owner_dir(owner)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            // Nothing saved yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(transport(e)),
        };
        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry.map_err(transport)?.path();
            let Some(id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(".json"))
            else {
                continue;
            };
            let summary: anyhow::Result<StoredSummary> = try_block::try_block! {
                let json = std::fs::read_to_string(&path)?;
                let summary = serde_json::from_str(&json)?;
                Ok(summary)
            };
            match summary {
                Ok(summary) => summaries.push(RecordSummary {
                    id: RecordID(id.to_owned()),
                    name: summary.name,
                    owner: summary.owner,
                    created_at: summary.created_at,
                }),
                Err(e) => log::warn!("skipping unreadable record {path:?}: {e:#}"),
            }
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

/// The web backend: `POST /api/saveLogo` and `GET /api/logos`, authenticated with a bearer token.
pub struct HttpGateway {
    client: reqwest::blocking::Client,
    base_url: String,
}
#[derive(serde::Deserialize)]
struct SaveResponse {
    logo: SavedLogo,
}
#[derive(serde::Deserialize)]
struct SavedLogo {
    #[serde(rename = "_id")]
    id: RecordID,
}
#[derive(serde::Deserialize)]
struct StoredLogo {
    #[serde(rename = "_id")]
    id: RecordID,
    #[serde(flatten)]
    payload: Payload,
}
impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
    fn ensure_success(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(GatewayError::Unauthorized)
            }
            _ => Err(GatewayError::Rejected(format!("{status} {body}"))),
        }
    }
    fn logos(&self, credential: &Credential) -> Result<Vec<StoredLogo>, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/logos"))
            .bearer_auth(credential.secret())
            .send()
            .map_err(transport)?;
        Self::ensure_success(response)?
            .json()
            .map_err(transport)
    }
}
impl PersistenceGateway for HttpGateway {
    fn save(&self, credential: &Credential, payload: &Payload) -> Result<RecordID, GatewayError> {
        let response = self
            .client
            .post(self.url("/api/saveLogo"))
            .bearer_auth(credential.secret())
            .json(payload)
            .send()
            .map_err(transport)?;
        let saved: SaveResponse = Self::ensure_success(response)?
            .json()
            .map_err(transport)?;
        Ok(saved.logo.id)
    }
    fn load(&self, credential: &Credential, id: &RecordID) -> Result<Payload, GatewayError> {
        // The backend only lists; there is no fetch by ID.
        self.logos(credential)?
            .into_iter()
            .find(|logo| &logo.id == id)
            .map(|logo| logo.payload)
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }
    fn list(&self, credential: &Credential, owner: &OwnerID) -> Result<Vec<RecordSummary>, GatewayError> {
        let mut summaries: Vec<_> = self
            .logos(credential)?
            .into_iter()
            .filter(|logo| &logo.payload.owner == owner)
            .map(|logo| RecordSummary {
                id: logo.id,
                name: logo.payload.name,
                owner: logo.payload.owner,
                created_at: logo.payload.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
