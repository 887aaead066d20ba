//! Normalized principal identity consumed from external identity providers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Already-authenticated identity on whose behalf a request is evaluated.
///
/// Warden never authenticates; the identity provider hands over this record
/// and the engine only authorizes against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    email: String,
    role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    teams: Vec<String>,
}

impl Principal {
    /// Creates a principal record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrincipal`] when the identifier is empty.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidPrincipal {
                reason: "principal id cannot be empty".into(),
            });
        }

        Ok(Self {
            id,
            email: email.into(),
            role: role.into(),
            teams: Vec::new(),
        })
    }

    /// Attaches team memberships.
    #[must_use]
    pub fn with_teams<I, S>(mut self, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.teams = teams.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the principal identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the principal email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the principal role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns the team identifiers the principal belongs to.
    #[must_use]
    pub fn teams(&self) -> &[String] {
        &self.teams
    }
}
