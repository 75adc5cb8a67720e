use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{evaluate_rules, Alert, AlertMatch, AlertThresholds, Rule, Severity, Snapshot};
use crate::errors::ServiceError;

/// What changed during one [`AlertEngine::refresh`].
///
/// `raised` and `escalated` are the alerts that should be sent to
/// notification channels.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub raised: Vec<Alert>,
    pub escalated: Vec<Alert>,
    pub resolved: Vec<String>,
}

impl RefreshOutcome {
    /// Alerts that warrant a notification, in severity order.
    pub fn to_notify(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .raised
            .iter()
            .chain(self.escalated.iter())
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.id.cmp(&b.id)));
        alerts
    }

    pub fn is_quiet(&self) -> bool {
        self.raised.is_empty() && self.escalated.is_empty() && self.resolved.is_empty()
    }
}

/// Tracks raised alerts across evaluations.
///
/// Alert ids are the ids of the rules that produced them, so a condition that
/// persists across refreshes keeps a single alert and its original
/// `triggered_at`.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    thresholds: AlertThresholds,
    rules: Vec<Rule>,
    alerts: BTreeMap<String, Alert>,
    // Highest severity already handed out for notification, per alert id
    notified: BTreeMap<String, Severity>,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self::with_rules(thresholds, super::default_rules().to_vec())
    }

    pub fn with_rules(thresholds: AlertThresholds, rules: Vec<Rule>) -> Self {
        Self {
            thresholds,
            rules,
            alerts: BTreeMap::new(),
            notified: BTreeMap::new(),
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Runs the rules without touching engine state.
    pub fn evaluate(&self, snapshot: &Snapshot) -> Vec<AlertMatch> {
        evaluate_rules(&self.rules, snapshot, &self.thresholds)
    }

    /// Reconciles a fresh evaluation with the tracked alerts.
    ///
    /// New matches are raised, matches whose severity rose above anything
    /// already notified are escalated (and un-dismissed), matches that no
    /// longer fire are resolved and dropped.
    pub fn refresh(&mut self, snapshot: &Snapshot) -> RefreshOutcome {
        let matches = self.evaluate(snapshot);
        self.apply(matches, snapshot.as_of)
    }

    fn apply(&mut self, matches: Vec<AlertMatch>, at: DateTime<Utc>) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();

        let firing: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();
        let gone: Vec<String> = self
            .alerts
            .keys()
            .filter(|id| !firing.contains(id))
            .cloned()
            .collect();
        for id in gone {
            self.alerts.remove(&id);
            self.notified.remove(&id);
            info!(alert_id = %id, "alert resolved");
            outcome.resolved.push(id);
        }

        for m in matches {
            match self.alerts.get_mut(&m.id) {
                None => {
                    let alert = Alert::raised(m, at);
                    info!(alert_id = %alert.id, severity = %alert.severity, "alert raised");
                    self.notified.insert(alert.id.clone(), alert.severity);
                    self.alerts.insert(alert.id.clone(), alert.clone());
                    outcome.raised.push(alert);
                }
                Some(existing) => {
                    let peak = self
                        .notified
                        .get(&m.id)
                        .copied()
                        .unwrap_or(existing.severity);
                    let escalated = m.severity > peak;
                    existing.title = m.title;
                    existing.message = m.message;
                    existing.related = m.related;
                    if m.severity != existing.severity {
                        existing.severity = m.severity;
                        existing.updated_at = at;
                    }
                    if escalated {
                        self.notified.insert(existing.id.clone(), existing.severity);
                        existing.dismissed = false;
                        info!(alert_id = %existing.id, severity = %existing.severity, "alert escalated");
                        outcome.escalated.push(existing.clone());
                    } else {
                        debug!(alert_id = %existing.id, "alert still active");
                    }
                }
            }
        }

        outcome
    }

    /// Hides an alert until it escalates or resolves and fires again.
    pub fn dismiss(&mut self, id: &str) -> Result<Alert, ServiceError> {
        let alert = self
            .alerts
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Alert {} not found", id)))?;
        alert.dismissed = true;
        info!(alert_id = %id, "alert dismissed");
        Ok(alert.clone())
    }

    /// Non-dismissed alerts, most severe first, then oldest first.
    pub fn active(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .values()
            .filter(|a| !a.dismissed)
            .cloned()
            .collect();
        sort_for_display(&mut alerts);
        alerts
    }

    /// Every tracked alert, dismissed ones included.
    pub fn all(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.values().cloned().collect();
        sort_for_display(&mut alerts);
        alerts
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.get(id)
    }
}

fn sort_for_display(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.triggered_at.cmp(&b.triggered_at))
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{rules, Severity};
    use crate::models::{Machine, MachineStatus, WorkOrder, WorkOrderPriority, WorkOrderStatus};
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn machines(down: usize) -> Vec<Machine> {
        (0..8)
            .map(|i| Machine {
                id: format!("m-{i}"),
                name: format!("Press {i}"),
                kind: "press".into(),
                location: "Line 1".into(),
                status: if i < down {
                    MachineStatus::Down
                } else {
                    MachineStatus::Running
                },
                utilization: Some(0.5),
                last_maintenance: None,
                next_maintenance: None,
            })
            .collect()
    }

    fn open_orders(n: usize) -> Vec<WorkOrder> {
        (0..n)
            .map(|i| WorkOrder {
                id: format!("wo-{i}"),
                machine_id: None,
                title: "Inspect".into(),
                description: None,
                status: WorkOrderStatus::Open,
                priority: WorkOrderPriority::Low,
                assigned_to: None,
                created_at: t0(),
                due_date: None,
                completed_at: None,
            })
            .collect()
    }

    fn snapshot(down: usize, open: usize, at: DateTime<Utc>) -> Snapshot {
        let mut s = Snapshot::empty(at);
        s.machines = machines(down);
        s.work_orders = open_orders(open);
        s
    }

    #[test]
    fn persistent_condition_keeps_one_alert_and_trigger_time() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        let first = engine.refresh(&snapshot(3, 0, t0()));
        assert_eq!(first.raised.len(), 1);

        let later = t0() + Duration::minutes(5);
        let second = engine.refresh(&snapshot(4, 0, later));
        assert!(second.is_quiet());

        let active = engine.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, rules::MACHINES_DOWN);
        assert_eq!(active[0].triggered_at, t0());
        assert!(active[0].message.starts_with("4 machines down"));
    }

    #[test]
    fn escalation_is_reported_and_clears_dismissal() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        engine.refresh(&snapshot(3, 0, t0()));
        engine.dismiss(rules::MACHINES_DOWN).unwrap();
        assert!(engine.active().is_empty());

        let outcome = engine.refresh(&snapshot(5, 0, t0() + Duration::minutes(1)));
        assert_eq!(outcome.escalated.len(), 1);
        assert_eq!(outcome.escalated[0].severity, Severity::Critical);
        assert_eq!(engine.active().len(), 1);
        assert_eq!(engine.active()[0].triggered_at, t0());
    }

    #[test]
    fn downgrade_keeps_dismissal_and_is_not_notified() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        engine.refresh(&snapshot(5, 0, t0()));
        engine.dismiss(rules::MACHINES_DOWN).unwrap();

        let outcome = engine.refresh(&snapshot(3, 0, t0() + Duration::minutes(1)));
        assert!(outcome.to_notify().is_empty());
        assert!(engine.active().is_empty());
        let all = engine.all();
        assert_eq!(all[0].severity, Severity::Warning);
        assert!(all[0].dismissed);
    }

    #[test]
    fn resolved_alert_is_forgotten_and_can_fire_again() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        engine.refresh(&snapshot(3, 0, t0()));
        engine.dismiss(rules::MACHINES_DOWN).unwrap();

        let outcome = engine.refresh(&snapshot(0, 0, t0() + Duration::minutes(1)));
        assert_eq!(outcome.resolved, vec![rules::MACHINES_DOWN.to_string()]);
        assert!(engine.all().is_empty());

        let again = t0() + Duration::minutes(2);
        let outcome = engine.refresh(&snapshot(3, 0, again));
        assert_eq!(outcome.raised.len(), 1);
        assert!(!outcome.raised[0].dismissed);
        assert_eq!(outcome.raised[0].triggered_at, again);
    }

    #[test]
    fn flapping_severity_notifies_each_level_once() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        let mut sent = Vec::new();
        for (step, down) in [5, 3, 5, 3, 5].into_iter().enumerate() {
            let at = t0() + Duration::minutes(step as i64);
            for alert in engine.refresh(&snapshot(down, 0, at)).to_notify() {
                sent.push((alert.id, alert.severity));
            }
        }
        assert_eq!(
            sent,
            vec![(rules::MACHINES_DOWN.to_string(), Severity::Critical)]
        );
        assert_eq!(engine.active()[0].severity, Severity::Critical);
    }

    #[test]
    fn warning_then_flapping_critical_escalates_once() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        engine.refresh(&snapshot(3, 0, t0()));
        let escalations: usize = [5, 3, 5]
            .into_iter()
            .enumerate()
            .map(|(step, down)| {
                let at = t0() + Duration::minutes(step as i64 + 1);
                engine.refresh(&snapshot(down, 0, at)).escalated.len()
            })
            .sum();
        assert_eq!(escalations, 1);
    }

    #[test]
    fn dismissing_unknown_alert_is_not_found() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        assert_matches!(engine.dismiss("nope"), Err(ServiceError::NotFound(_)));
    }

    #[test]
    fn active_sorts_by_severity_then_age() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        engine.refresh(&snapshot(0, 12, t0()));
        engine.refresh(&snapshot(3, 12, t0() + Duration::minutes(1)));
        engine.refresh(&snapshot(3, 25, t0() + Duration::minutes(2)));

        let ids: Vec<_> = engine.active().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![rules::WORK_ORDER_BACKLOG, rules::MACHINES_DOWN]);

        engine.refresh(&snapshot(6, 12, t0() + Duration::minutes(3)));
        let active = engine.active();
        assert_eq!(active[0].id, rules::MACHINES_DOWN);
        assert_eq!(active[1].id, rules::WORK_ORDER_BACKLOG);
        assert_eq!(active[1].severity, Severity::Warning);
    }

    #[test]
    fn to_notify_lists_raised_and_escalated_most_severe_first() {
        let mut engine = AlertEngine::new(AlertThresholds::default());
        engine.refresh(&snapshot(3, 0, t0()));
        let outcome = engine.refresh(&snapshot(5, 11, t0() + Duration::minutes(1)));
        let ids: Vec<_> = outcome.to_notify().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![rules::MACHINES_DOWN, rules::WORK_ORDER_BACKLOG]);
    }

    #[test]
    fn evaluate_does_not_mutate_state() {
        let engine = AlertEngine::new(AlertThresholds::default());
        assert_eq!(engine.evaluate(&snapshot(5, 0, t0())).len(), 1);
        assert!(engine.all().is_empty());
    }
}
