//! Viewer roles and the rules that derive them.
//!
//! A role is the coarse privilege tier of whoever is browsing the storefront.
//! Roles are read from user records held in the document store; the store is
//! never written by this system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse privilege tier of a viewer.
///
/// The three values are mutually exclusive: an admin is not also a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No signed-in identity.
    #[default]
    Guest,
    /// Signed-in shopper. Also the default for identities without a record.
    Customer,
    /// Store administrator.
    Admin,
}

impl Role {
    /// Returns the role's stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Self::Guest),
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// A user's role record as read from the store.
///
/// `role` holds the raw attribute. It is `None` when the field is missing or
/// not a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role: Option<String>,
}

impl RoleRecord {
    /// Build a record from a stored document's fields.
    #[must_use]
    pub fn from_fields(fields: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            role: fields
                .get("role")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// Resolve the role for a signed-in identity from its (possibly absent) record.
///
/// A missing record, a missing or empty `role` attribute, and an unrecognized
/// role string all resolve to [`Role::Customer`].
#[must_use]
pub fn resolve_role(record: Option<&RoleRecord>) -> Role {
    record
        .and_then(|r| r.role.as_deref())
        .filter(|role| !role.is_empty())
        .and_then(|role| role.parse().ok())
        .unwrap_or(Role::Customer)
}

/// Whether a viewer with `role` may see a view that requires `required`.
///
/// Admin views need [`Role::Admin`]; customer views accept any signed-in role.
#[must_use]
pub const fn can_access(role: Role, required: Role) -> bool {
    match required {
        Role::Guest => true,
        Role::Customer => !matches!(role, Role::Guest),
        Role::Admin => matches!(role, Role::Admin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: Option<&str>) -> RoleRecord {
        RoleRecord {
            role: role.map(str::to_owned),
        }
    }

    #[test]
    fn test_resolve_role_missing_record_is_customer() {
        assert_eq!(resolve_role(None), Role::Customer);
    }

    #[test]
    fn test_resolve_role_missing_field_is_customer() {
        assert_eq!(resolve_role(Some(&record(None))), Role::Customer);
    }

    #[test]
    fn test_resolve_role_empty_field_is_customer() {
        assert_eq!(resolve_role(Some(&record(Some("")))), Role::Customer);
    }

    #[test]
    fn test_resolve_role_reads_stored_value() {
        assert_eq!(resolve_role(Some(&record(Some("admin")))), Role::Admin);
        assert_eq!(resolve_role(Some(&record(Some("customer")))), Role::Customer);
        assert_eq!(resolve_role(Some(&record(Some("guest")))), Role::Guest);
    }

    #[test]
    fn test_resolve_role_unknown_value_is_customer() {
        assert_eq!(resolve_role(Some(&record(Some("Admin")))), Role::Customer);
        assert_eq!(resolve_role(Some(&record(Some("owner")))), Role::Customer);
    }

    #[test]
    fn test_record_from_fields_ignores_non_string_role() {
        let mut fields = serde_json::Map::new();
        fields.insert("role".to_string(), serde_json::Value::Bool(true));
        assert_eq!(RoleRecord::from_fields(&fields), record(None));

        fields.insert("role".to_string(), serde_json::json!("admin"));
        assert_eq!(RoleRecord::from_fields(&fields), record(Some("admin")));
    }

    #[test]
    fn test_can_access_admin_views() {
        assert!(can_access(Role::Admin, Role::Admin));
        assert!(!can_access(Role::Customer, Role::Admin));
        assert!(!can_access(Role::Guest, Role::Admin));
    }

    #[test]
    fn test_can_access_customer_views() {
        assert!(can_access(Role::Customer, Role::Customer));
        assert!(can_access(Role::Admin, Role::Customer));
        assert!(!can_access(Role::Guest, Role::Customer));
    }

    #[test]
    fn test_can_access_public_views() {
        for role in [Role::Guest, Role::Customer, Role::Admin] {
            assert!(can_access(role, Role::Guest));
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Guest, Role::Customer, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "root".parse::<Role>(),
            Err(RoleParseError("root".to_string()))
        );
    }

    #[test]
    fn test_role_default_is_guest() {
        assert_eq!(Role::default(), Role::Guest);
    }
}
