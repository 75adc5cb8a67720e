// Shop-floor records
pub mod catalog;
pub mod ecos;
pub mod machines;
pub mod shipping;
pub mod work_orders;

// Alerting and aggregate views
pub mod alerts;
pub mod dashboard;
