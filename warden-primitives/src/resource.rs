//! Governed resource descriptors and sensitivity classification.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Classification of a governed tool or server.
///
/// Sensitivity drives the decision cache TTL: the more sensitive the
/// resource, the shorter a cached decision may be served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    /// Openly accessible resources.
    Public,
    /// Low-impact resources.
    Low,
    /// Default classification when no tier is declared.
    #[default]
    Medium,
    /// Internal-only resources.
    Internal,
    /// Confidential resources.
    Confidential,
    /// Critical resources with the tightest freshness requirements.
    Critical,
}

impl SensitivityLevel {
    /// Returns the cache TTL, in seconds, for decisions about resources of
    /// this tier.
    #[must_use]
    pub const fn cache_ttl_secs(self) -> u64 {
        match self {
            Self::Public | Self::Medium => 300,
            Self::Low => 1800,
            Self::Internal => 180,
            Self::Confidential => 120,
            Self::Critical => 60,
        }
    }
}

/// Descriptor for a tool exposed through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRef {
    name: String,
    #[serde(default)]
    sensitivity: SensitivityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    managers: Vec<String>,
}

impl ToolRef {
    /// Creates a tool descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResource`] when the name is empty.
    pub fn new(name: impl Into<String>, sensitivity: SensitivityLevel) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidResource {
                reason: "tool name cannot be empty".into(),
            });
        }
        Ok(Self {
            name,
            sensitivity,
            owner: None,
            managers: Vec::new(),
        })
    }

    /// Sets the owning principal identifier.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the team identifiers that manage the tool.
    #[must_use]
    pub fn with_managers<I, S>(mut self, managers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.managers = managers.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared sensitivity tier.
    #[must_use]
    pub const fn sensitivity(&self) -> SensitivityLevel {
        self.sensitivity
    }

    /// Returns the owning principal, when declared.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Returns the managing team identifiers.
    #[must_use]
    pub fn managers(&self) -> &[String] {
        &self.managers
    }
}

/// Descriptor for a server registered with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRef {
    name: String,
    #[serde(default)]
    sensitivity: SensitivityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owning_team: Option<String>,
}

impl ServerRef {
    /// Creates a server descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResource`] when the name is empty.
    pub fn new(name: impl Into<String>, sensitivity: SensitivityLevel) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidResource {
                reason: "server name cannot be empty".into(),
            });
        }
        Ok(Self {
            name,
            sensitivity,
            owning_team: None,
        })
    }

    /// Sets the team that owns the server.
    #[must_use]
    pub fn with_owning_team(mut self, team: impl Into<String>) -> Self {
        self.owning_team = Some(team.into());
        self
    }

    /// Returns the server name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared sensitivity tier.
    #[must_use]
    pub const fn sensitivity(&self) -> SensitivityLevel {
        self.sensitivity
    }

    /// Returns the owning team, when declared.
    #[must_use]
    pub fn owning_team(&self) -> Option<&str> {
        self.owning_team.as_deref()
    }
}
