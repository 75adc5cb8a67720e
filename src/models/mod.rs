//! Plain records served to the dashboard.
//!
//! JSON field names are camelCase to match the wire shape the dashboard and
//! the live REST backend already agree on.

pub mod catalog;
pub mod eco;
pub mod machine;
pub mod production_event;
pub mod shipping;
pub mod user;
pub mod work_order;

pub use catalog::{Component, Document, DocumentKind};
pub use eco::{CreateEcoRequest, Eco, EcoStatus};
pub use machine::{Machine, MachineStatus, UpdateMachineStatusRequest};
pub use production_event::ProductionEvent;
pub use shipping::{
    Delivery, DeliveryStatus, PartReadiness, PartReadinessView, ShippingLine, ShippingOrder,
    ShippingStatus, UpdateShippingStatusRequest,
};
pub use user::UserProfile;
pub use work_order::{
    AssignWorkOrderRequest, CreateWorkOrderRequest, UpdateWorkOrderStatusRequest, WorkOrder,
    WorkOrderPriority, WorkOrderStatus,
};
