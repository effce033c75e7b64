//! Roles, permission tags and the static role → permission table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of user roles.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    MasterAdmin,
    SubAdmin,
    #[default]
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::MasterAdmin, Role::SubAdmin, Role::User];

    /// Roles allowed to act on other users' records.
    pub const PRIVILEGED: &'static [Role] = &[Role::MasterAdmin, Role::SubAdmin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::MasterAdmin => "master_admin",
            Role::SubAdmin => "sub_admin",
            Role::User => "user",
        }
    }

    pub fn is_privileged(self) -> bool {
        Self::PRIVILEGED.contains(&self)
    }

    fn rank(self) -> u8 {
        match self {
            Role::MasterAdmin => 2,
            Role::SubAdmin => 1,
            Role::User => 0,
        }
    }

    /// Strictly more privileged than `other`.
    pub fn outranks(self, other: Role) -> bool {
        self.rank() > other.rank()
    }

    /// Names accepted by [`FromStr`], in table order.
    pub fn names() -> [&'static str; 3] {
        Self::ALL.map(Role::as_str)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// One allowed action on one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "list:users")]
    ListUsers,
    #[serde(rename = "read:user")]
    ReadUser,
    #[serde(rename = "update:user")]
    UpdateUser,
    #[serde(rename = "delete:user")]
    DeleteUser,
    #[serde(rename = "list:roles")]
    ListRoles,
    #[serde(rename = "assign:role")]
    AssignRole,
    #[serde(rename = "list:products")]
    ListProducts,
    #[serde(rename = "read:product")]
    ReadProduct,
    #[serde(rename = "create:product")]
    CreateProduct,
    #[serde(rename = "update:product")]
    UpdateProduct,
    #[serde(rename = "delete:product")]
    DeleteProduct,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::ListUsers => "list:users",
            Permission::ReadUser => "read:user",
            Permission::UpdateUser => "update:user",
            Permission::DeleteUser => "delete:user",
            Permission::ListRoles => "list:roles",
            Permission::AssignRole => "assign:role",
            Permission::ListProducts => "list:products",
            Permission::ReadProduct => "read:product",
            Permission::CreateProduct => "create:product",
            Permission::UpdateProduct => "update:product",
            Permission::DeleteProduct => "delete:product",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MASTER_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ListUsers,
    Permission::ReadUser,
    Permission::UpdateUser,
    Permission::DeleteUser,
    Permission::ListRoles,
    Permission::AssignRole,
    Permission::ListProducts,
    Permission::ReadProduct,
    Permission::CreateProduct,
    Permission::UpdateProduct,
    Permission::DeleteProduct,
];

const SUB_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ListUsers,
    Permission::ReadUser,
    Permission::UpdateUser,
    Permission::ListRoles,
    Permission::ListProducts,
    Permission::ReadProduct,
    Permission::CreateProduct,
    Permission::UpdateProduct,
];

const USER_PERMISSIONS: &[Permission] = &[
    Permission::ReadUser,
    Permission::UpdateUser,
    Permission::ListProducts,
    Permission::ReadProduct,
];

pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::MasterAdmin => MASTER_ADMIN_PERMISSIONS,
        Role::SubAdmin => SUB_ADMIN_PERMISSIONS,
        Role::User => USER_PERMISSIONS,
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// The whole table, for listing roles.
pub fn role_table() -> BTreeMap<Role, Vec<Permission>> {
    Role::ALL
        .into_iter()
        .map(|role| (role, permissions_for(role).to_vec()))
        .collect()
}
