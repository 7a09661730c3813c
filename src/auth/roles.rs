// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles and the role hierarchy.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Everything below
/// - `Issuer` - Issue and manage certificates; implies `User`
/// - `Auditor` - Read-only access to users and certificates; implies `User`
/// - `User` - Own profile and certificates addressed to them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Issuer,
    #[default]
    User,
    Auditor,
}

impl Role {
    /// Roles whose permissions this role carries, itself included.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Role::Admin => &[Role::Admin, Role::Issuer, Role::User, Role::Auditor],
            Role::Issuer => &[Role::Issuer, Role::User],
            Role::Auditor => &[Role::Auditor, Role::User],
            Role::User => &[Role::User],
        }
    }

    pub fn has_privilege(&self, required: Role) -> bool {
        self.allowed_roles().contains(&required)
    }

    /// Passes if any of `required` is granted. An empty requirement passes.
    pub fn satisfies_any(&self, required: &[Role]) -> bool {
        required.is_empty() || required.iter().any(|r| self.has_privilege(*r))
    }

    /// Parse role from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "issuer" => Some(Role::Issuer),
            "user" => Some(Role::User),
            "auditor" => Some(Role::Auditor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Issuer => "issuer",
            Role::User => "user",
            Role::Auditor => "auditor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        for role in [Role::Admin, Role::Issuer, Role::User, Role::Auditor] {
            assert!(Role::Admin.has_privilege(role));
        }
    }

    #[test]
    fn issuer_implies_user_only() {
        assert!(Role::Issuer.has_privilege(Role::Issuer));
        assert!(Role::Issuer.has_privilege(Role::User));
        assert!(!Role::Issuer.has_privilege(Role::Admin));
        assert!(!Role::Issuer.has_privilege(Role::Auditor));
    }

    #[test]
    fn auditor_implies_user_only() {
        assert!(Role::Auditor.has_privilege(Role::User));
        assert!(!Role::Auditor.has_privilege(Role::Issuer));
    }

    #[test]
    fn user_has_no_elevated_privileges() {
        assert!(Role::User.has_privilege(Role::User));
        assert!(!Role::User.has_privilege(Role::Issuer));
        assert!(!Role::User.has_privilege(Role::Auditor));
    }

    #[test]
    fn satisfies_any_checks_each_requirement() {
        assert!(Role::Auditor.satisfies_any(&[Role::Issuer, Role::Auditor]));
        assert!(!Role::User.satisfies_any(&[Role::Issuer, Role::Auditor]));
        assert!(Role::User.satisfies_any(&[]));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("Issuer"), Some(Role::Issuer));
        assert_eq!(Role::parse("client"), None);
        assert_eq!(Role::default(), Role::User);
    }
}
