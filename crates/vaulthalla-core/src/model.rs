//! Domain records carried by catalog payloads and responses.
//!
//! These mirror the JSON the backend emits. Field names are `snake_case` on
//! the wire. Vault subtypes are a tagged union discriminated by `type`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Identity ─────────────────────────────────────────────────────────

/// A dashboard user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A single grantable permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Bit index of this permission in the backend's permission mask.
    #[serde(default)]
    pub bit_position: u16,
}

/// A group of users sharing access to volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<User>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Session returned by `auth.login`, `auth.register`, and `auth.refresh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

// ── Storage ──────────────────────────────────────────────────────────

/// Attributes shared by every vault type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultCommon {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A storage vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Vault {
    /// Vault backed by a directory on the server's disk.
    Local {
        #[serde(flatten)]
        common: VaultCommon,
        mount_point: String,
    },
    /// Vault backed by an S3-compatible bucket.
    S3 {
        #[serde(flatten)]
        common: VaultCommon,
        api_key_id: u32,
        bucket: String,
    },
}

impl Vault {
    pub fn common(&self) -> &VaultCommon {
        match self {
            Self::Local { common, .. } | Self::S3 { common, .. } => common,
        }
    }

    pub fn id(&self) -> u32 {
        self.common().id
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    /// Wire discriminator of this vault.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::S3 { .. } => "s3",
        }
    }
}

/// A volume carved out of a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: u32,
    pub vault_id: u32,
    pub name: String,
    #[serde(default)]
    pub path_prefix: Option<String>,
    #[serde(default)]
    pub quota_bytes: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Credentials for an S3-compatible provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: u32,
    pub user_id: u32,
    pub name: String,
    pub provider: String,
    pub access_key: String,
    /// Only present on creation; list responses omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    pub region: String,
    pub endpoint: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

// ── Settings ─────────────────────────────────────────────────────────

/// Server settings document.
///
/// Sections the dashboard edits are typed; anything else round-trips in
/// `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}
