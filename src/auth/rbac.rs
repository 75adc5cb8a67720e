/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Static mapping from role identifier to the capabilities it grants. A user
 * carries exactly one role; unknown roles grant nothing.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::warn;

use super::permissions::ALL_CAPABILITIES;

/// Role definition with associated capabilities
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

fn role(name: &str, description: &str, permissions: &[&str]) -> (String, Role) {
    (
        name.to_string(),
        Role {
            name: name.to_string(),
            description: description.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        },
    )
}

lazy_static! {
    pub static ref ROLES: HashMap<String, Role> = [
        role("admin", "Administrator with full access", &["*"]),
        role(
            "manager",
            "Plant manager; runs work, reviews ECOs and shipping",
            &[
                "machines:*",
                "workorders:*",
                "ecos:*",
                "documents:read",
                "components:read",
                "shipping:*",
                "alerts:*",
                "users:read",
            ],
        ),
        role(
            "engineer",
            "Manufacturing engineer; raises ECOs and work orders",
            &[
                "machines:read",
                "workorders:read",
                "workorders:create",
                "ecos:read",
                "ecos:create",
                "documents:read",
                "components:read",
                "alerts:read",
            ],
        ),
        role(
            "technician",
            "Maintenance technician; works orders and machine status",
            &[
                "machines:read",
                "machines:update",
                "workorders:read",
                "workorders:update",
                "documents:read",
                "components:read",
                "alerts:read",
                "alerts:dismiss",
            ],
        ),
        role(
            "shipping",
            "Shipping clerk; fulfilment and deliveries",
            &[
                "shipping:*",
                "components:read",
                "workorders:read",
                "alerts:read",
            ],
        ),
        role(
            "viewer",
            "Read-only access to the dashboard",
            &[
                "machines:read",
                "workorders:read",
                "ecos:read",
                "documents:read",
                "components:read",
                "shipping:read",
                "alerts:read",
            ],
        ),
    ]
    .into_iter()
    .collect();
}

/// RBAC service for looking up roles and checking capabilities
#[derive(Clone, Debug, Default)]
pub struct RbacService;

impl RbacService {
    pub fn new() -> Self {
        Self
    }

    /// Get a role by name
    pub fn get_role(&self, role_name: &str) -> Option<&'static Role> {
        ROLES.get(role_name)
    }

    /// All roles, sorted by name
    pub fn get_all_roles(&self) -> Vec<&'static Role> {
        let mut roles: Vec<_> = ROLES.values().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    /// Capability grants (possibly wildcards) for a role
    pub fn get_role_permissions(&self, role_name: &str) -> Vec<String> {
        match ROLES.get(role_name) {
            Some(role) => role.permissions.clone(),
            None => {
                warn!("Role not found: {}", role_name);
                vec![]
            }
        }
    }

    /// Concrete capabilities a role ends up with once wildcards are expanded
    pub fn effective_capabilities(&self, role_name: &str) -> Vec<String> {
        let grants = self.get_role_permissions(role_name);
        ALL_CAPABILITIES
            .iter()
            .filter(|cap| grants.iter().any(|g| self.check_permission(g, cap)))
            .map(|cap| cap.to_string())
            .collect()
    }

    pub fn role_has_capability(&self, role_name: &str, required: &str) -> bool {
        ROLES.get(role_name).map_or(false, |role| {
            role.permissions
                .iter()
                .any(|granted| self.check_permission(granted, required))
        })
    }

    /// Check if a granted permission covers a required one
    pub fn check_permission(&self, user_permission: &str, required_permission: &str) -> bool {
        // Direct match
        if user_permission == required_permission {
            return true;
        }

        // Super wildcard (admin)
        if user_permission == "*" {
            return true;
        }

        // Resource wildcard: `shipping:*` covers `shipping:update`, not `shippingx:read`
        if let Some(resource) = user_permission.strip_suffix(":*") {
            return required_permission
                .split_once(':')
                .map_or(false, |(required_resource, _)| required_resource == resource);
        }

        false
    }
}
