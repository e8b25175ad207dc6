//! Statically-typed command catalog.
//!
//! Each remote operation is a zero-sized type implementing [`Command`], which
//! binds the wire name to its payload and response types. The channel itself
//! only sees names and JSON values; typing happens at the call site.
//!
//! ```
//! use vaulthalla_core::catalog::{Command, VolumeGet};
//!
//! assert_eq!(VolumeGet::NAME, "storage.volume.get");
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ApiKey, AuthSession, Group, Permission, Role, Settings, User, Vault, Volume};

/// A remote operation in the catalog.
pub trait Command {
    /// Wire name sent in the envelope's `command` field.
    const NAME: &'static str;
    /// Payload shape; `()` serializes to `null`.
    type Payload: Serialize + Send + Sync;
    /// Shape of the `data` field of a successful response.
    type Response: DeserializeOwned + Send;
}

/// Response body for commands whose result carries no typed content.
pub type Ack = Value;

// ── Payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ById {
    pub id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByUserId {
    pub user_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByVaultId {
    pub vault_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByVolumeId {
    pub volume_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByApiKeyId {
    pub api_key_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByRoleId {
    pub role_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByPermissionId {
    pub permission_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByGroupId {
    pub group_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ByName {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub id: u32,
    pub old_password: String,
    pub new_password: String,
}

/// Payload of `storage.vault.add`; the backend assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewVault {
    Local {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        mount_point: String,
    },
    S3 {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        api_key_id: u32,
        bucket: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVolume {
    pub vault_id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NewApiKey {
    pub name: String,
    pub provider: String,
    pub access_key: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint: String,
}

impl std::fmt::Debug for NewApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewApiKey")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Permission names granted by the role.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub group_id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupMemberRequest {
    pub group_id: u32,
    pub user_id: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupVolumeRequest {
    pub group_id: u32,
    pub volume_id: u32,
}

fn active_by_default() -> bool {
    true
}

// ── Registry ─────────────────────────────────────────────────────────

macro_rules! catalog {
    ($( $(#[$meta:meta])* $ty:ident => $name:literal ($payload:ty) -> $response:ty; )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $ty;

            impl Command for $ty {
                const NAME: &'static str = $name;
                type Payload = $payload;
                type Response = $response;
            }
        )*

        /// Every command name registered in the catalog, in declaration order.
        pub const COMMANDS: &[&str] = &[$($name),*];
    };
}

catalog! {
    // auth
    AuthLogin => "auth.login" (LoginRequest) -> AuthSession;
    AuthRegister => "auth.register" (RegisterRequest) -> AuthSession;
    AuthRefresh => "auth.refresh" (()) -> AuthSession;
    AuthLogout => "auth.logout" (()) -> Ack;
    AuthMe => "auth.me" (()) -> User;
    AuthIsAuthenticated => "auth.isAuthenticated" (()) -> AuthStatus;
    UsersList => "auth.users.list" (()) -> Vec<User>;
    UserGet => "auth.user.get" (ById) -> User;
    UserUpdate => "auth.user.update" (UpdateUserRequest) -> User;
    UserChangePassword => "auth.user.change_password" (ChangePasswordRequest) -> Ack;

    // storage: vaults
    VaultList => "storage.vault.list" (()) -> Vec<Vault>;
    VaultGet => "storage.vault.get" (ByVaultId) -> Vault;
    VaultAdd => "storage.vault.add" (NewVault) -> Vault;
    VaultUpdate => "storage.vault.update" (Vault) -> Vault;
    VaultRemove => "storage.vault.remove" (ByVaultId) -> Ack;

    // storage: volumes
    VolumeList => "storage.volume.list" (()) -> Vec<Volume>;
    VolumeListByVault => "storage.volume.list.vault" (ByVaultId) -> Vec<Volume>;
    VolumeListByUser => "storage.volume.list.user" (ByUserId) -> Vec<Volume>;
    VolumeGet => "storage.volume.get" (ByVolumeId) -> Volume;
    VolumeAdd => "storage.volume.add" (NewVolume) -> Volume;
    VolumeUpdate => "storage.volume.update" (Volume) -> Volume;
    VolumeRemove => "storage.volume.remove" (ByVolumeId) -> Ack;

    // storage: api keys
    ApiKeyList => "storage.apiKey.list" (()) -> Vec<ApiKey>;
    ApiKeyListByUser => "storage.apiKey.list.user" (ByUserId) -> Vec<ApiKey>;
    ApiKeyGet => "storage.apiKey.get" (ByApiKeyId) -> ApiKey;
    ApiKeyAdd => "storage.apiKey.add" (NewApiKey) -> ApiKey;
    ApiKeyRemove => "storage.apiKey.remove" (ByApiKeyId) -> Ack;

    // authorization
    RoleAdd => "role.add" (NewRole) -> Role;
    RoleGet => "role.get" (ByRoleId) -> Role;
    RoleGetByName => "role.get.byName" (ByName) -> Role;
    RoleUpdate => "role.update" (Role) -> Role;
    RoleDelete => "role.delete" (ByRoleId) -> Ack;
    RolesList => "roles.list" (()) -> Vec<Role>;
    PermissionGet => "permission.get" (ByPermissionId) -> Permission;
    PermissionGetByName => "permission.get.byName" (ByName) -> Permission;
    PermissionsList => "permissions.list" (()) -> Vec<Permission>;

    // groups
    GroupAdd => "group.add" (NewGroup) -> Group;
    GroupGet => "group.get" (ByGroupId) -> Group;
    GroupGetByName => "group.get.byName" (ByName) -> Group;
    GroupUpdate => "group.update" (UpdateGroupRequest) -> Group;
    GroupRemove => "group.remove" (ByGroupId) -> Ack;
    GroupMemberAdd => "group.member.add" (GroupMemberRequest) -> Group;
    GroupMemberRemove => "group.member.remove" (GroupMemberRequest) -> Group;
    GroupVolumeAdd => "group.volume.add" (GroupVolumeRequest) -> Group;
    GroupVolumeRemove => "group.volume.remove" (GroupVolumeRequest) -> Group;
    GroupsList => "groups.list" (()) -> Vec<Group>;
    GroupsListByUser => "groups.list.user" (ByUserId) -> Vec<Group>;

    // settings
    SettingsGet => "settings.get" (()) -> Settings;
    SettingsUpdate => "settings.update" (Settings) -> Settings;
}

/// Returns `true` if `name` is registered in the catalog.
pub fn is_known_command(name: &str) -> bool {
    COMMANDS.contains(&name)
}
