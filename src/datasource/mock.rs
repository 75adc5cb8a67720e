use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::cmp::Ordering;
use tracing::debug;

use super::DataSource;
use crate::errors::ServiceError;
use crate::models::{
    Component, Delivery, DeliveryStatus, Document, DocumentKind, Eco, EcoStatus, Machine,
    MachineStatus, PartReadiness, ProductionEvent, ShippingLine, ShippingOrder, ShippingStatus,
    UserProfile, WorkOrder, WorkOrderPriority, WorkOrderStatus,
};

/// Plain collections a [`MockDataSource`] starts from.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub machines: Vec<Machine>,
    pub work_orders: Vec<WorkOrder>,
    pub ecos: Vec<Eco>,
    pub documents: Vec<Document>,
    pub components: Vec<Component>,
    pub shipping_orders: Vec<ShippingOrder>,
    pub deliveries: Vec<Delivery>,
    pub part_readiness: Vec<PartReadiness>,
    pub users: Vec<UserProfile>,
    pub events: Vec<ProductionEvent>,
}

/// In-memory data source.
///
/// Mutable collections are keyed maps so that each write only locks the
/// record it touches; reference data is immutable after construction.
pub struct MockDataSource {
    machines: DashMap<String, Machine>,
    work_orders: DashMap<String, WorkOrder>,
    ecos: DashMap<String, Eco>,
    shipping_orders: DashMap<String, ShippingOrder>,
    documents: Vec<Document>,
    components: Vec<Component>,
    deliveries: Vec<Delivery>,
    part_readiness: Vec<PartReadiness>,
    users: Vec<UserProfile>,
    events: Vec<ProductionEvent>,
}

fn keyed<T, F>(items: Vec<T>, key: F) -> DashMap<String, T>
where
    F: Fn(&T) -> String,
{
    items.into_iter().map(|item| (key(&item), item)).collect()
}

fn sorted_values<T: Clone>(map: &DashMap<String, T>, cmp: impl Fn(&T, &T) -> Ordering) -> Vec<T> {
    let mut values: Vec<T> = map.iter().map(|entry| entry.value().clone()).collect();
    values.sort_by(cmp);
    values
}

impl MockDataSource {
    pub fn new(fixtures: Fixtures) -> Self {
        Self {
            machines: keyed(fixtures.machines, |m| m.id.clone()),
            work_orders: keyed(fixtures.work_orders, |wo| wo.id.clone()),
            ecos: keyed(fixtures.ecos, |eco| eco.id.clone()),
            shipping_orders: keyed(fixtures.shipping_orders, |so| so.id.clone()),
            documents: fixtures.documents,
            components: fixtures.components,
            deliveries: fixtures.deliveries,
            part_readiness: fixtures.part_readiness,
            users: fixtures.users,
            events: fixtures.events,
        }
    }

    /// Demo fixtures relative to the current time.
    pub fn seeded() -> Self {
        Self::new(Fixtures::seeded(Utc::now()))
    }

    pub fn seeded_at(now: DateTime<Utc>) -> Self {
        Self::new(Fixtures::seeded(now))
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn machines(&self) -> Result<Vec<Machine>, ServiceError> {
        Ok(sorted_values(&self.machines, |a, b| a.id.cmp(&b.id)))
    }

    async fn work_orders(&self) -> Result<Vec<WorkOrder>, ServiceError> {
        Ok(sorted_values(&self.work_orders, |a, b| {
            a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
        }))
    }

    async fn ecos(&self) -> Result<Vec<Eco>, ServiceError> {
        Ok(sorted_values(&self.ecos, |a, b| {
            a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
        }))
    }

    async fn documents(&self) -> Result<Vec<Document>, ServiceError> {
        Ok(self.documents.clone())
    }

    async fn components(&self) -> Result<Vec<Component>, ServiceError> {
        Ok(self.components.clone())
    }

    async fn shipping_orders(&self) -> Result<Vec<ShippingOrder>, ServiceError> {
        Ok(sorted_values(&self.shipping_orders, |a, b| a.id.cmp(&b.id)))
    }

    async fn deliveries(&self) -> Result<Vec<Delivery>, ServiceError> {
        Ok(self.deliveries.clone())
    }

    async fn part_readiness(&self) -> Result<Vec<PartReadiness>, ServiceError> {
        Ok(self.part_readiness.clone())
    }

    async fn users(&self) -> Result<Vec<UserProfile>, ServiceError> {
        Ok(self.users.clone())
    }

    async fn production_events(&self) -> Result<Vec<ProductionEvent>, ServiceError> {
        Ok(self.events.clone())
    }

    async fn create_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError> {
        if self.work_orders.contains_key(&order.id) {
            return Err(ServiceError::Conflict(format!(
                "Work order {} already exists",
                order.id
            )));
        }
        debug!(work_order_id = %order.id, "mock: work order created");
        self.work_orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn update_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError> {
        let mut entry = self
            .work_orders
            .get_mut(&order.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {} not found", order.id)))?;
        *entry = order.clone();
        Ok(order)
    }

    async fn set_machine_status(
        &self,
        id: &str,
        status: MachineStatus,
    ) -> Result<Machine, ServiceError> {
        let mut entry = self
            .machines
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Machine {} not found", id)))?;
        entry.status = status;
        Ok(entry.clone())
    }

    async fn create_eco(&self, eco: Eco) -> Result<Eco, ServiceError> {
        if self.ecos.contains_key(&eco.id) {
            return Err(ServiceError::Conflict(format!("ECO {} already exists", eco.id)));
        }
        self.ecos.insert(eco.id.clone(), eco.clone());
        Ok(eco)
    }

    async fn update_eco(&self, eco: Eco) -> Result<Eco, ServiceError> {
        let mut entry = self
            .ecos
            .get_mut(&eco.id)
            .ok_or_else(|| ServiceError::NotFound(format!("ECO {} not found", eco.id)))?;
        *entry = eco.clone();
        Ok(eco)
    }

    async fn update_shipping_status(
        &self,
        id: &str,
        status: ShippingStatus,
    ) -> Result<ShippingOrder, ServiceError> {
        let mut entry = self
            .shipping_orders
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Shipping order {} not found", id)))?;
        entry.status = status;
        Ok(entry.clone())
    }
}

impl Fixtures {
    /// A plant with enough going wrong that the alert rules have something
    /// to say: three machines down, a work-order backlog, late shipments,
    /// a full ECO review queue and a scrap spike on the laser cutter.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let h = Duration::hours;
        let d = Duration::days;

        let machine = |id: &str, name: &str, kind: &str, location: &str, status, util| Machine {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            location: location.into(),
            status,
            utilization: util,
            last_maintenance: Some(now - d(30)),
            next_maintenance: Some(now + d(5)),
        };
        let mut machines = vec![
            machine("M-101", "CNC Mill 1", "cnc_mill", "Bay A", MachineStatus::Running, Some(0.82)),
            machine("M-102", "CNC Mill 2", "cnc_mill", "Bay A", MachineStatus::Down, Some(0.0)),
            machine("M-103", "Lathe 1", "lathe", "Bay A", MachineStatus::Down, Some(0.0)),
            machine("M-104", "Press Brake", "press", "Bay B", MachineStatus::Down, Some(0.0)),
            machine("M-105", "Robot Welder", "welder", "Bay B", MachineStatus::Running, Some(0.64)),
            machine("M-106", "Laser Cutter", "laser", "Bay C", MachineStatus::Running, Some(0.91)),
            machine("M-107", "Paint Booth", "paint", "Bay C", MachineStatus::Maintenance, None),
            machine("M-108", "Assembly Cell", "assembly", "Bay D", MachineStatus::Idle, Some(0.12)),
        ];
        machines[6].next_maintenance = Some(now - d(2));

        let work_order = |n: u32,
                          machine: Option<&str>,
                          title: &str,
                          status: WorkOrderStatus,
                          priority: WorkOrderPriority,
                          age_days: i64,
                          due_in_days: i64| WorkOrder {
            id: format!("WO-{n}"),
            machine_id: machine.map(Into::into),
            title: title.into(),
            description: None,
            status,
            priority,
            assigned_to: None,
            created_at: now - d(age_days),
            due_date: Some(now + d(due_in_days)),
            completed_at: (status == WorkOrderStatus::Completed).then(|| now - d(1)),
        };
        use WorkOrderPriority::*;
        use WorkOrderStatus::*;
        let mut work_orders = vec![
            work_order(2001, Some("M-102"), "Spindle bearing replacement", InProgress, Critical, 3, -1),
            work_order(2002, Some("M-103"), "Chuck hydraulic leak", Open, High, 2, 1),
            work_order(2003, Some("M-104"), "Backgauge encoder fault", Open, Critical, 1, 0),
            work_order(2004, Some("M-101"), "Coolant concentration check", Open, Low, 6, 4),
            work_order(2005, Some("M-105"), "Replace torch liner", OnHold, Medium, 9, -3),
            work_order(2006, Some("M-106"), "Lens cleaning and alignment", Open, High, 1, 1),
            work_order(2007, Some("M-107"), "Filter change", InProgress, Medium, 4, -2),
            work_order(2008, Some("M-108"), "Torque tool calibration", Open, Medium, 5, 2),
            work_order(2009, None, "Forklift inspection", Open, Low, 8, 6),
            work_order(2010, Some("M-101"), "Way oil top-up", Open, Low, 2, 3),
            work_order(2011, Some("M-106"), "Nozzle inventory", Open, Low, 1, 7),
            work_order(2012, Some("M-102"), "Post-repair run-off", OnHold, High, 1, 2),
            work_order(2013, Some("M-105"), "Wire feed roller swap", Completed, Medium, 12, -8),
            work_order(2014, Some("M-101"), "Tool changer lubrication", Completed, Low, 20, -15),
            work_order(2015, Some("M-108"), "Duplicate of WO-2008", Cancelled, Low, 5, 2),
        ];
        work_orders[0].assigned_to = Some("U-4".into());
        work_orders[6].assigned_to = Some("U-4".into());

        let eco = |n: u32, title: &str, status: EcoStatus, machines: &[&str], age_days: i64| Eco {
            id: format!("ECO-{n}"),
            title: title.into(),
            description: None,
            status,
            requested_by: "U-3".into(),
            affected_machines: machines.iter().map(|m| m.to_string()).collect(),
            affected_documents: vec![],
            created_at: now - d(age_days),
            submitted_at: matches!(
                status,
                EcoStatus::InReview | EcoStatus::Approved | EcoStatus::Rejected | EcoStatus::Implemented
            )
            .then(|| now - d(age_days - 1)),
            decided_at: matches!(
                status,
                EcoStatus::Approved | EcoStatus::Rejected | EcoStatus::Implemented
            )
            .then(|| now - d(1)),
        };
        let mut ecos = vec![
            eco(301, "Upgrade spindle to 15k rpm", EcoStatus::InReview, &["M-101", "M-102"], 9),
            eco(302, "Revise weld fixture clamp", EcoStatus::InReview, &["M-105"], 8),
            eco(303, "New nozzle standoff for 6mm plate", EcoStatus::InReview, &["M-106"], 6),
            eco(304, "Change primer supplier", EcoStatus::InReview, &["M-107"], 5),
            eco(305, "Add poka-yoke to cell fixture", EcoStatus::InReview, &["M-108"], 3),
            eco(306, "Lathe guard redesign", EcoStatus::Draft, &["M-103"], 2),
            eco(307, "Press tonnage limit", EcoStatus::Approved, &["M-104"], 15),
            eco(308, "Switch cutting fluid", EcoStatus::Rejected, &["M-101"], 20),
            eco(309, "Laser lens upgrade", EcoStatus::Implemented, &["M-106"], 40),
        ];
        ecos[2].affected_documents = vec!["DOC-12".into()];

        let documents = vec![
            Document {
                id: "DOC-10".into(),
                title: "Bracket BR-220 drawing".into(),
                revision: "C".into(),
                kind: DocumentKind::Drawing,
                url: Some("https://docs.example.com/DOC-10".into()),
                updated_at: now - d(14),
            },
            Document {
                id: "DOC-11".into(),
                title: "Lockout/tagout procedure".into(),
                revision: "F".into(),
                kind: DocumentKind::Procedure,
                url: None,
                updated_at: now - d(90),
            },
            Document {
                id: "DOC-12".into(),
                title: "Laser cut quality specification".into(),
                revision: "B".into(),
                kind: DocumentKind::Specification,
                url: None,
                updated_at: now - d(7),
            },
            Document {
                id: "DOC-13".into(),
                title: "Weld cell setup".into(),
                revision: "A".into(),
                kind: DocumentKind::WorkInstruction,
                url: None,
                updated_at: now - d(3),
            },
        ];

        let component = |id: &str, pn: &str, name: &str, on_hand, reorder_point, supplier: &str| {
            Component {
                id: id.into(),
                part_number: pn.into(),
                name: name.into(),
                on_hand,
                reorder_point,
                supplier: Some(supplier.into()),
            }
        };
        let components = vec![
            component("C-1", "BRG-6205", "Spindle bearing", 2, 4, "Kaydon"),
            component("C-2", "NZL-15", "Laser nozzle 1.5mm", 40, 20, "Trumpf"),
            component("C-3", "LNR-062", "Torch liner", 6, 6, "Lincoln"),
            component("C-4", "FLT-2020", "Booth intake filter", 12, 8, "Donaldson"),
            component("C-5", "BR-220", "Bracket BR-220", 150, 50, "In-house"),
        ];

        let shipping = |n: u32, customer: &str, status, ship_by_days: i64, part: &str, qty| {
            ShippingOrder {
                id: format!("SO-{n}"),
                customer: customer.into(),
                status,
                ship_by: Some(now + d(ship_by_days)),
                items: vec![ShippingLine {
                    part_number: part.into(),
                    quantity: qty,
                }],
                created_at: now - d(10),
            }
        };
        let shipping_orders = vec![
            shipping(5001, "Northwind Tractors", ShippingStatus::Pending, -3, "BR-220", 40),
            shipping(5002, "Contoso Marine", ShippingStatus::Picking, -2, "BR-220", 25),
            shipping(5003, "Fabrikam Rail", ShippingStatus::Packed, -1, "BR-220", 60),
            shipping(5004, "Tailspin Aero", ShippingStatus::Pending, -1, "BR-220", 10),
            shipping(5005, "Litware Farm", ShippingStatus::Shipped, -4, "BR-220", 30),
            shipping(5006, "Adventure Works", ShippingStatus::Pending, 3, "BR-220", 80),
            shipping(5007, "Wide World Freight", ShippingStatus::Delivered, -6, "BR-220", 15),
        ];

        let deliveries = vec![
            Delivery {
                id: "DL-1".into(),
                shipping_order_id: "SO-5005".into(),
                carrier: "UPS Freight".into(),
                tracking_number: Some("1Z999AA10123456784".into()),
                status: DeliveryStatus::InTransit,
                eta: Some(now + d(1)),
            },
            Delivery {
                id: "DL-2".into(),
                shipping_order_id: "SO-5007".into(),
                carrier: "XPO".into(),
                tracking_number: Some("XPO-558120".into()),
                status: DeliveryStatus::Delivered,
                eta: Some(now - d(2)),
            },
            Delivery {
                id: "DL-3".into(),
                shipping_order_id: "SO-5003".into(),
                carrier: "Old Dominion".into(),
                tracking_number: None,
                status: DeliveryStatus::Scheduled,
                eta: Some(now + d(2)),
            },
        ];

        let part_readiness = vec![
            PartReadiness {
                part_number: "BRG-6205".into(),
                work_order_id: Some("WO-2001".into()),
                required: 4,
                available: 2,
            },
            PartReadiness {
                part_number: "LNR-062".into(),
                work_order_id: Some("WO-2005".into()),
                required: 1,
                available: 6,
            },
            PartReadiness {
                part_number: "BR-220".into(),
                work_order_id: None,
                required: 215,
                available: 150,
            },
        ];

        let user = |id: &str, name: &str, role: &str| UserProfile {
            id: id.into(),
            name: name.into(),
            email: format!("{}@plant.example.com", name.to_lowercase().replace(' ', ".")),
            role: role.into(),
        };
        let users = vec![
            user("U-1", "Ada Admin", "admin"),
            user("U-2", "Morgan Manager", "manager"),
            user("U-3", "Eli Engineer", "engineer"),
            user("U-4", "Tay Technician", "technician"),
            user("U-5", "Sam Shipping", "shipping"),
            user("U-6", "Vic Viewer", "viewer"),
        ];

        // Hourly output over the last 12h; M-106 scraps 6 of every 40.
        let mut events = Vec::new();
        for hour in 1..=12 {
            for (machine_id, produced, scrapped) in
                [("M-101", 40, 0), ("M-105", 20, 0), ("M-106", 40, 6)]
            {
                events.push(ProductionEvent {
                    id: format!("EV-{machine_id}-{hour}"),
                    machine_id: machine_id.into(),
                    occurred_at: now - h(hour),
                    produced,
                    scrapped,
                });
            }
        }

        Self {
            machines,
            work_orders,
            ecos,
            documents,
            components,
            shipping_orders,
            deliveries,
            part_readiness,
            users,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{rules, AlertEngine, AlertThresholds, Severity};
    use crate::datasource::fetch_snapshot;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn seeded_fixtures_trigger_every_rule() {
        let source = MockDataSource::seeded();
        let snapshot = fetch_snapshot(&source).await.unwrap();
        let engine = AlertEngine::new(AlertThresholds::default());
        let mut ids: Vec<_> = engine.evaluate(&snapshot).into_iter().map(|m| m.id).collect();
        ids.sort();
        assert_eq!(
            ids,
            vec![
                rules::ECO_REVIEW_BACKLOG,
                rules::MACHINES_DOWN,
                rules::SCRAP_RATE_SPIKE,
                rules::SHIPPING_BACKLOG,
                rules::WORK_ORDER_BACKLOG,
            ]
        );
    }

    #[tokio::test]
    async fn seeded_scrap_spike_points_at_laser() {
        let source = MockDataSource::seeded();
        let snapshot = fetch_snapshot(&source).await.unwrap();
        let m = rules::scrap_rate_spike(&snapshot, &AlertThresholds::default()).unwrap();
        assert_eq!(m.severity, Severity::Warning);
        assert_eq!(m.related.machines, vec!["M-106"]);
    }

    #[tokio::test]
    async fn writes_mutate_in_memory_records() {
        let source = MockDataSource::seeded();
        let machine = source
            .set_machine_status("M-102", MachineStatus::Running)
            .await
            .unwrap();
        assert_eq!(machine.status, MachineStatus::Running);
        let machines = source.machines().await.unwrap();
        assert_eq!(machines.iter().filter(|m| m.is_down()).count(), 2);

        assert_matches!(
            source.set_machine_status("M-999", MachineStatus::Idle).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn duplicate_work_order_is_conflict() {
        let source = MockDataSource::seeded();
        let existing = source.work_orders().await.unwrap().remove(0);
        assert_matches!(
            source.create_work_order(existing).await,
            Err(ServiceError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn empty_fixtures_serve_empty_lists() {
        let source = MockDataSource::new(Fixtures::default());
        assert!(source.machines().await.unwrap().is_empty());
        assert!(source.users().await.unwrap().is_empty());
    }
}
