use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{AlertMatch, RelatedEntities, Severity, Snapshot};

pub const MACHINES_DOWN: &str = "machines-down";
pub const WORK_ORDER_BACKLOG: &str = "work-order-backlog";
pub const SHIPPING_BACKLOG: &str = "shipping-backlog";
pub const ECO_REVIEW_BACKLOG: &str = "eco-review-backlog";
pub const SCRAP_RATE_SPIKE: &str = "scrap-rate-spike";

/// Longest accepted scrap window, one year
pub const MAX_SCRAP_WINDOW_HOURS: u32 = 24 * 365;

/// Counts at which each rule fires. A rule is `warning` from its warning
/// threshold and `critical` from its critical threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertThresholds {
    pub machines_down_warning: usize,
    pub machines_down_critical: usize,
    pub work_order_backlog_warning: usize,
    pub work_order_backlog_critical: usize,
    pub shipping_backlog_warning: usize,
    pub shipping_backlog_critical: usize,
    pub eco_review_warning: usize,
    pub eco_review_critical: usize,
    /// Scrap fraction (scrapped / produced), 0.0 - 1.0
    pub scrap_rate_warning: f64,
    pub scrap_rate_critical: f64,
    /// Below this many units produced in the window the scrap rule stays quiet
    pub scrap_min_produced: u64,
    pub scrap_window_hours: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            machines_down_warning: 3,
            machines_down_critical: 5,
            work_order_backlog_warning: 10,
            work_order_backlog_critical: 20,
            shipping_backlog_warning: 3,
            shipping_backlog_critical: 6,
            eco_review_warning: 5,
            eco_review_critical: 10,
            scrap_rate_warning: 0.05,
            scrap_rate_critical: 0.10,
            scrap_min_produced: 100,
            scrap_window_hours: 24,
        }
    }
}

impl AlertThresholds {
    /// Rejects orderings that would make a rule unreachable or always-on.
    pub fn check(&self) -> Result<(), &'static str> {
        let counts = [
            (self.machines_down_warning, self.machines_down_critical),
            (self.work_order_backlog_warning, self.work_order_backlog_critical),
            (self.shipping_backlog_warning, self.shipping_backlog_critical),
            (self.eco_review_warning, self.eco_review_critical),
        ];
        if counts.iter().any(|&(warning, _)| warning == 0) {
            return Err("warning thresholds must be at least 1");
        }
        if counts.iter().any(|&(warning, critical)| warning > critical) {
            return Err("warning thresholds must not exceed critical thresholds");
        }
        let rate_ok = |r: f64| r.is_finite() && r > 0.0 && r <= 1.0;
        if !rate_ok(self.scrap_rate_warning) || !rate_ok(self.scrap_rate_critical) {
            return Err("scrap rate thresholds must be within (0, 1]");
        }
        if self.scrap_rate_warning > self.scrap_rate_critical {
            return Err("scrap_rate_warning must not exceed scrap_rate_critical");
        }
        if self.scrap_window_hours == 0 {
            return Err("scrap_window_hours must be at least 1");
        }
        if self.scrap_window_hours > MAX_SCRAP_WINDOW_HOURS {
            return Err("scrap_window_hours must not exceed 8760 (one year)");
        }
        Ok(())
    }
}

/// A named, pure evaluation over a snapshot
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub evaluate: fn(&Snapshot, &AlertThresholds) -> Option<AlertMatch>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("id", &self.id).finish()
    }
}

static RULES: [Rule; 5] = [
    Rule {
        id: MACHINES_DOWN,
        evaluate: machines_down,
    },
    Rule {
        id: WORK_ORDER_BACKLOG,
        evaluate: work_order_backlog,
    },
    Rule {
        id: SHIPPING_BACKLOG,
        evaluate: shipping_backlog,
    },
    Rule {
        id: ECO_REVIEW_BACKLOG,
        evaluate: eco_review_backlog,
    },
    Rule {
        id: SCRAP_RATE_SPIKE,
        evaluate: scrap_rate_spike,
    },
];

pub fn default_rules() -> &'static [Rule] {
    &RULES
}

/// Runs every rule in order and keeps the ones that fired.
pub fn evaluate_rules(
    rules: &[Rule],
    snapshot: &Snapshot,
    thresholds: &AlertThresholds,
) -> Vec<AlertMatch> {
    rules
        .iter()
        .filter_map(|rule| {
            let matched = (rule.evaluate)(snapshot, thresholds);
            tracing::trace!(rule = rule.id, fired = matched.is_some(), "rule evaluated");
            matched
        })
        .collect()
}

fn count_severity(count: usize, warning: usize, critical: usize) -> Option<Severity> {
    if count >= critical {
        Some(Severity::Critical)
    } else if count >= warning {
        Some(Severity::Warning)
    } else {
        None
    }
}

fn rate_severity(rate: f64, warning: f64, critical: f64) -> Option<Severity> {
    if rate >= critical {
        Some(Severity::Critical)
    } else if rate >= warning {
        Some(Severity::Warning)
    } else {
        None
    }
}

fn dedup_sorted<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    ids.cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

pub fn machines_down(snapshot: &Snapshot, t: &AlertThresholds) -> Option<AlertMatch> {
    let down: Vec<_> = snapshot.machines.iter().filter(|m| m.is_down()).collect();
    let severity = count_severity(
        down.len(),
        t.machines_down_warning,
        t.machines_down_critical,
    )?;

    let machine_ids: Vec<String> = down.iter().map(|m| m.id.clone()).collect();
    let work_orders = snapshot
        .work_orders
        .iter()
        .filter(|wo| wo.is_open())
        .filter(|wo| {
            wo.machine_id
                .as_ref()
                .map_or(false, |id| machine_ids.contains(id))
        })
        .map(|wo| wo.id.clone())
        .collect();
    let names: Vec<&str> = down.iter().map(|m| m.name.as_str()).collect();

    Some(AlertMatch {
        id: MACHINES_DOWN.to_string(),
        title: "Machines down".to_string(),
        message: format!(
            "{} down: {}",
            plural(down.len(), "machine", "machines"),
            names.join(", ")
        ),
        severity,
        related: RelatedEntities {
            machines: machine_ids,
            work_orders,
            ..Default::default()
        },
    })
}

pub fn work_order_backlog(snapshot: &Snapshot, t: &AlertThresholds) -> Option<AlertMatch> {
    let open: Vec<_> = snapshot.work_orders.iter().filter(|wo| wo.is_open()).collect();
    let severity = count_severity(
        open.len(),
        t.work_order_backlog_warning,
        t.work_order_backlog_critical,
    )?;
    let overdue = open.iter().filter(|wo| wo.is_overdue(snapshot.as_of)).count();

    Some(AlertMatch {
        id: WORK_ORDER_BACKLOG.to_string(),
        title: "Work order backlog".to_string(),
        message: format!(
            "{} ({} overdue)",
            plural(open.len(), "open work order", "open work orders"),
            overdue
        ),
        severity,
        related: RelatedEntities {
            machines: dedup_sorted(open.iter().filter_map(|wo| wo.machine_id.as_ref())),
            work_orders: open.iter().map(|wo| wo.id.clone()).collect(),
            ..Default::default()
        },
    })
}

pub fn shipping_backlog(snapshot: &Snapshot, t: &AlertThresholds) -> Option<AlertMatch> {
    let overdue: Vec<_> = snapshot
        .shipping_orders
        .iter()
        .filter(|so| so.is_overdue(snapshot.as_of))
        .collect();
    let severity = count_severity(
        overdue.len(),
        t.shipping_backlog_warning,
        t.shipping_backlog_critical,
    )?;

    Some(AlertMatch {
        id: SHIPPING_BACKLOG.to_string(),
        title: "Shipping backlog".to_string(),
        message: format!(
            "{} past the ship-by date",
            plural(overdue.len(), "shipping order", "shipping orders")
        ),
        severity,
        related: RelatedEntities {
            shipping_orders: overdue.iter().map(|so| so.id.clone()).collect(),
            ..Default::default()
        },
    })
}

pub fn eco_review_backlog(snapshot: &Snapshot, t: &AlertThresholds) -> Option<AlertMatch> {
    let in_review: Vec<_> = snapshot
        .ecos
        .iter()
        .filter(|eco| eco.is_awaiting_review())
        .collect();
    let severity = count_severity(in_review.len(), t.eco_review_warning, t.eco_review_critical)?;

    Some(AlertMatch {
        id: ECO_REVIEW_BACKLOG.to_string(),
        title: "ECO review backlog".to_string(),
        message: format!(
            "{} awaiting review",
            plural(in_review.len(), "ECO", "ECOs")
        ),
        severity,
        related: RelatedEntities {
            machines: dedup_sorted(in_review.iter().flat_map(|eco| eco.affected_machines.iter())),
            ecos: in_review.iter().map(|eco| eco.id.clone()).collect(),
            ..Default::default()
        },
    })
}

pub fn scrap_rate_spike(snapshot: &Snapshot, t: &AlertThresholds) -> Option<AlertMatch> {
    let window_start = snapshot
        .as_of
        .checked_sub_signed(Duration::hours(i64::from(t.scrap_window_hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let in_window: Vec<_> = snapshot
        .events
        .iter()
        .filter(|e| e.occurred_at > window_start && e.occurred_at <= snapshot.as_of)
        .collect();

    let produced: u64 = in_window.iter().map(|e| u64::from(e.produced)).sum();
    let scrapped: u64 = in_window.iter().map(|e| u64::from(e.scrapped)).sum();
    if produced == 0 || produced < t.scrap_min_produced {
        return None;
    }

    let rate = scrapped as f64 / produced as f64;
    let severity = rate_severity(rate, t.scrap_rate_warning, t.scrap_rate_critical)?;

    Some(AlertMatch {
        id: SCRAP_RATE_SPIKE.to_string(),
        title: "Scrap rate spike".to_string(),
        message: format!(
            "Scrap rate {:.1}% over the last {}h ({} of {} units)",
            rate * 100.0,
            t.scrap_window_hours,
            scrapped,
            produced
        ),
        severity,
        related: RelatedEntities {
            machines: dedup_sorted(
                in_window
                    .iter()
                    .filter(|e| e.scrapped > 0)
                    .map(|e| &e.machine_id),
            ),
            ..Default::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Eco, EcoStatus, Machine, MachineStatus, ProductionEvent, ShippingOrder, ShippingStatus,
        WorkOrder, WorkOrderPriority, WorkOrderStatus,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn machine(i: usize, status: MachineStatus) -> Machine {
        Machine {
            id: format!("m-{i}"),
            name: format!("Cell {i}"),
            kind: "cnc".into(),
            location: "Bay A".into(),
            status,
            utilization: None,
            last_maintenance: None,
            next_maintenance: None,
        }
    }

    fn work_order(i: usize, status: WorkOrderStatus) -> WorkOrder {
        WorkOrder {
            id: format!("wo-{i}"),
            machine_id: Some(format!("m-{}", i % 3)),
            title: "Fix".into(),
            description: None,
            status,
            priority: WorkOrderPriority::Medium,
            assigned_to: None,
            created_at: as_of() - Duration::days(3),
            due_date: Some(as_of() - Duration::days(1)),
            completed_at: None,
        }
    }

    fn shipping(i: usize, status: ShippingStatus, days_from_now: i64) -> ShippingOrder {
        ShippingOrder {
            id: format!("so-{i}"),
            customer: "Acme".into(),
            status,
            ship_by: Some(as_of() + Duration::days(days_from_now)),
            items: vec![],
            created_at: as_of() - Duration::days(7),
        }
    }

    fn eco(i: usize, status: EcoStatus) -> Eco {
        Eco {
            id: format!("eco-{i}"),
            title: "Change".into(),
            description: None,
            status,
            requested_by: "u-1".into(),
            affected_machines: vec!["m-1".into()],
            affected_documents: vec![],
            created_at: as_of() - Duration::days(10),
            submitted_at: None,
            decided_at: None,
        }
    }

    fn event(machine: &str, hours_ago: i64, produced: u32, scrapped: u32) -> ProductionEvent {
        ProductionEvent {
            id: format!("ev-{machine}-{hours_ago}"),
            machine_id: machine.into(),
            occurred_at: as_of() - Duration::hours(hours_ago),
            produced,
            scrapped,
        }
    }

    fn snapshot_with_down(down: usize) -> Snapshot {
        let mut snapshot = Snapshot::empty(as_of());
        snapshot.machines = (0..down)
            .map(|i| machine(i, MachineStatus::Down))
            .chain((down..down + 4).map(|i| machine(i, MachineStatus::Running)))
            .collect();
        snapshot
    }

    #[rstest]
    #[case(0, None)]
    #[case(2, None)]
    #[case(3, Some(Severity::Warning))]
    #[case(4, Some(Severity::Warning))]
    #[case(5, Some(Severity::Critical))]
    #[case(9, Some(Severity::Critical))]
    fn machines_down_escalates_at_thresholds(
        #[case] down: usize,
        #[case] expected: Option<Severity>,
    ) {
        let matched = machines_down(&snapshot_with_down(down), &AlertThresholds::default());
        assert_eq!(matched.map(|m| m.severity), expected);
    }

    #[test]
    fn machines_down_relates_open_work_orders_on_down_machines() {
        let mut snapshot = snapshot_with_down(3);
        snapshot.work_orders = vec![
            work_order(0, WorkOrderStatus::Open),
            work_order(1, WorkOrderStatus::Completed),
        ];
        let matched = machines_down(&snapshot, &AlertThresholds::default()).unwrap();
        assert_eq!(matched.related.machines, vec!["m-0", "m-1", "m-2"]);
        assert_eq!(matched.related.work_orders, vec!["wo-0"]);
        assert!(matched.message.starts_with("3 machines down"));
    }

    #[rstest]
    #[case(9, None)]
    #[case(10, Some(Severity::Warning))]
    #[case(19, Some(Severity::Warning))]
    #[case(20, Some(Severity::Critical))]
    fn work_order_backlog_counts_only_open(
        #[case] open: usize,
        #[case] expected: Option<Severity>,
    ) {
        let mut snapshot = Snapshot::empty(as_of());
        snapshot.work_orders = (0..open)
            .map(|i| work_order(i, WorkOrderStatus::Open))
            .chain((100..130).map(|i| work_order(i, WorkOrderStatus::Completed)))
            .chain((200..205).map(|i| work_order(i, WorkOrderStatus::Cancelled)))
            .collect();
        let matched = work_order_backlog(&snapshot, &AlertThresholds::default());
        assert_eq!(matched.as_ref().map(|m| m.severity), expected);
        if let Some(m) = matched {
            assert_eq!(m.related.work_orders.len(), open);
            assert!(m.message.contains(&format!("({open} overdue)")));
        }
    }

    #[test]
    fn shipping_backlog_ignores_future_and_shipped_orders() {
        let mut snapshot = Snapshot::empty(as_of());
        snapshot.shipping_orders = vec![
            shipping(1, ShippingStatus::Pending, -1),
            shipping(2, ShippingStatus::Picking, -2),
            shipping(3, ShippingStatus::Packed, -3),
            shipping(4, ShippingStatus::Shipped, -3),
            shipping(5, ShippingStatus::Pending, 2),
            shipping(6, ShippingStatus::Cancelled, -5),
        ];
        let matched = shipping_backlog(&snapshot, &AlertThresholds::default()).unwrap();
        assert_eq!(matched.severity, Severity::Warning);
        assert_eq!(matched.related.shipping_orders, vec!["so-1", "so-2", "so-3"]);

        snapshot.shipping_orders.retain(|so| so.id != "so-3");
        assert!(shipping_backlog(&snapshot, &AlertThresholds::default()).is_none());
    }

    #[test]
    fn eco_review_backlog_counts_in_review_only() {
        let mut snapshot = Snapshot::empty(as_of());
        snapshot.ecos = (0..5)
            .map(|i| eco(i, EcoStatus::InReview))
            .chain((5..20).map(|i| eco(i, EcoStatus::Draft)))
            .collect();
        let matched = eco_review_backlog(&snapshot, &AlertThresholds::default()).unwrap();
        assert_eq!(matched.severity, Severity::Warning);
        assert_eq!(matched.related.ecos.len(), 5);
        assert_eq!(matched.related.machines, vec!["m-1"]);

        snapshot.ecos.extend((20..25).map(|i| eco(i, EcoStatus::InReview)));
        let matched = eco_review_backlog(&snapshot, &AlertThresholds::default()).unwrap();
        assert_eq!(matched.severity, Severity::Critical);
    }

    #[rstest]
    #[case(4, None)]
    #[case(5, Some(Severity::Warning))]
    #[case(9, Some(Severity::Warning))]
    #[case(10, Some(Severity::Critical))]
    fn scrap_rate_escalates_at_thresholds(
        #[case] scrapped_per_hundred: u32,
        #[case] expected: Option<Severity>,
    ) {
        let mut snapshot = Snapshot::empty(as_of());
        snapshot.events = vec![
            event("m-1", 2, 50, scrapped_per_hundred),
            event("m-2", 3, 50, 0),
        ];
        let matched = scrap_rate_spike(&snapshot, &AlertThresholds::default());
        assert_eq!(matched.as_ref().map(|m| m.severity), expected);
        if let Some(m) = matched {
            assert_eq!(m.related.machines, vec!["m-1"]);
        }
    }

    #[test]
    fn scrap_rate_needs_minimum_volume_inside_window() {
        let mut snapshot = Snapshot::empty(as_of());
        // 50% scrap, but only 20 units
        snapshot.events = vec![event("m-1", 1, 20, 10)];
        assert!(scrap_rate_spike(&snapshot, &AlertThresholds::default()).is_none());

        // Heavy scrap outside the 24h window does not count
        snapshot.events = vec![event("m-1", 30, 1000, 500), event("m-2", 1, 200, 1)];
        assert!(scrap_rate_spike(&snapshot, &AlertThresholds::default()).is_none());
    }

    #[test]
    fn rules_are_pure() {
        let mut snapshot = snapshot_with_down(5);
        snapshot.work_orders = (0..12).map(|i| work_order(i, WorkOrderStatus::Open)).collect();
        let thresholds = AlertThresholds::default();
        let first = evaluate_rules(default_rules(), &snapshot, &thresholds);
        let second = evaluate_rules(default_rules(), &snapshot, &thresholds);
        assert_eq!(first, second);
        let ids: Vec<_> = first.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![MACHINES_DOWN, WORK_ORDER_BACKLOG]);
    }

    #[test]
    fn empty_snapshot_raises_nothing() {
        let matches = evaluate_rules(
            default_rules(),
            &Snapshot::empty(as_of()),
            &AlertThresholds::default(),
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn custom_thresholds_shift_escalation() {
        let thresholds = AlertThresholds {
            machines_down_warning: 1,
            machines_down_critical: 2,
            ..AlertThresholds::default()
        };
        let matched = machines_down(&snapshot_with_down(2), &thresholds).unwrap();
        assert_eq!(matched.severity, Severity::Critical);
    }

    #[test]
    fn threshold_check_rejects_inverted_pairs() {
        assert!(AlertThresholds::default().check().is_ok());
        let inverted = AlertThresholds {
            eco_review_warning: 11,
            ..AlertThresholds::default()
        };
        assert!(inverted.check().is_err());
        let bad_rate = AlertThresholds {
            scrap_rate_critical: 1.5,
            ..AlertThresholds::default()
        };
        assert!(bad_rate.check().is_err());
    }

    #[test]
    fn scrap_window_is_bounded() {
        let year = AlertThresholds {
            scrap_window_hours: MAX_SCRAP_WINDOW_HOURS,
            ..AlertThresholds::default()
        };
        assert!(year.check().is_ok());
        let unbounded = AlertThresholds {
            scrap_window_hours: u32::MAX,
            ..AlertThresholds::default()
        };
        assert!(unbounded.check().is_err());
    }

    #[test]
    fn oversized_scrap_window_covers_all_history_without_panicking() {
        let thresholds = AlertThresholds {
            scrap_window_hours: u32::MAX,
            ..AlertThresholds::default()
        };
        let mut snapshot = Snapshot::empty(as_of());
        snapshot.events = vec![event("m-1", 5000, 100, 20)];
        let matched = scrap_rate_spike(&snapshot, &thresholds).unwrap();
        assert_eq!(matched.severity, Severity::Critical);
    }
}
