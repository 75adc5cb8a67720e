/*!
 * # Capabilities
 *
 * Capability strings have the form `resource:action`. A role grants a set
 * of them; `resource:*` grants every action on a resource and `*` grants
 * everything.
 */

/// Capability actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const REVIEW: &'static str = "review";
    pub const DISMISS: &'static str = "dismiss";
    pub const REFRESH: &'static str = "refresh";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const MACHINES: &'static str = "machines";
    pub const WORK_ORDERS: &'static str = "workorders";
    pub const ECOS: &'static str = "ecos";
    pub const DOCUMENTS: &'static str = "documents";
    pub const COMPONENTS: &'static str = "components";
    pub const SHIPPING: &'static str = "shipping";
    pub const ALERTS: &'static str = "alerts";
    pub const USERS: &'static str = "users";
}

/// Capability string constants for compile-time safety
pub mod consts {
    pub const MACHINES_READ: &str = "machines:read";
    pub const MACHINES_UPDATE: &str = "machines:update";

    pub const WORKORDERS_READ: &str = "workorders:read";
    pub const WORKORDERS_CREATE: &str = "workorders:create";
    pub const WORKORDERS_UPDATE: &str = "workorders:update";

    pub const ECOS_READ: &str = "ecos:read";
    pub const ECOS_CREATE: &str = "ecos:create";
    pub const ECOS_REVIEW: &str = "ecos:review";

    pub const DOCUMENTS_READ: &str = "documents:read";
    pub const COMPONENTS_READ: &str = "components:read";

    pub const SHIPPING_READ: &str = "shipping:read";
    pub const SHIPPING_UPDATE: &str = "shipping:update";

    pub const ALERTS_READ: &str = "alerts:read";
    pub const ALERTS_DISMISS: &str = "alerts:dismiss";
    pub const ALERTS_REFRESH: &str = "alerts:refresh";

    pub const USERS_READ: &str = "users:read";
}

/// Every concrete capability, in display order.
pub const ALL_CAPABILITIES: &[&str] = &[
    consts::MACHINES_READ,
    consts::MACHINES_UPDATE,
    consts::WORKORDERS_READ,
    consts::WORKORDERS_CREATE,
    consts::WORKORDERS_UPDATE,
    consts::ECOS_READ,
    consts::ECOS_CREATE,
    consts::ECOS_REVIEW,
    consts::DOCUMENTS_READ,
    consts::COMPONENTS_READ,
    consts::SHIPPING_READ,
    consts::SHIPPING_UPDATE,
    consts::ALERTS_READ,
    consts::ALERTS_DISMISS,
    consts::ALERTS_REFRESH,
    consts::USERS_READ,
];

/// Builds `resource:action`
pub fn capability(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}
