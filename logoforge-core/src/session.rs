//! Who is editing. Passed explicitly to whatever needs the account, there is no global "current user".

use std::sync::Arc;

/// Identifier of the account that owns saved scenes.
#[derive(Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OwnerID(String);
impl OwnerID {
    pub fn new(raw: impl Into<String>) -> Result<Self, SessionError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(SessionError::EmptyOwner);
        }
        Ok(Self(raw))
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for OwnerID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);
impl Credential {
    #[must_use]
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }
    /// The raw token, for putting on the wire.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("not signed in")]
    NoOwner,
    #[error("no credential")]
    NoCredential,
    #[error("owner id is empty")]
    EmptyOwner,
}

#[derive(Clone, Debug, Default)]
pub struct Session {
    owner: Option<OwnerID>,
    credential: Option<Credential>,
}
impl Session {
    /// Nobody signed in. Editing works, saving does not.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn new(owner: Option<OwnerID>, credential: Option<Credential>) -> Self {
        Self { owner, credential }
    }
    pub fn owner(&self) -> Result<&OwnerID, SessionError> {
        self.owner.as_ref().ok_or(SessionError::NoOwner)
    }
    pub fn credential(&self) -> Result<&Credential, SessionError> {
        self.credential.as_ref().ok_or(SessionError::NoCredential)
    }
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.owner.is_some() && self.credential.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn anonymous_has_nothing() {
        let session = Session::anonymous();
        assert_eq!(session.owner(), Err(SessionError::NoOwner));
        assert_eq!(session.credential(), Err(SessionError::NoCredential));
        assert!(!session.is_signed_in());
    }
    #[test]
    fn credential_not_printed() {
        let credential = Credential::new("hunter2");
        assert!(!format!("{credential:?}").contains("hunter2"));
        assert_eq!(credential.secret(), "hunter2");
        assert_eq!(OwnerID::new("  "), Err(SessionError::EmptyOwner));
    }
}
