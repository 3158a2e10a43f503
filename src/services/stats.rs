//! Dashboard totals across customers, schedules and invoices.
//!
//! Each customer and each schedule is a unit of work. A unit that fails is
//! recorded as [`UnitOutcome::Skipped`] and contributes nothing; it never
//! aborts its siblings. The fold at the end turns the outcomes into the four
//! counters of [`DashboardStats`].
//!
//! In [`AggregationMode::Sequential`] there is at most one request in flight:
//! a customer's invoice fetches all finish before the next customer's
//! schedules are requested. That keeps load on the remote API minimal at the
//! cost of latency linear in customers × schedules.
//! [`AggregationMode::Concurrent`] runs up to `limit` customers at once
//! (schedules within a customer stay sequential) and produces the same
//! totals.

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::SonicError;
use crate::models::schedule::ACTIVE_STATUS;
use crate::models::{Connection, DashboardStats};
use crate::services::response::{self, DEFAULT_FALLBACK};
use crate::services::sonic_api::SonicApiService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationMode {
    #[default]
    Sequential,
    Concurrent {
        limit: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome<T> {
    Fetched(T),
    Skipped { unit: String, reason: String },
}

impl<T> UnitOutcome<T> {
    fn from_result(unit: &str, result: Result<T, SonicError>) -> Self {
        match result {
            Ok(value) => UnitOutcome::Fetched(value),
            Err(err) => {
                log::warn!("Skipping {} in dashboard stats: {}", unit, err);
                UnitOutcome::Skipped {
                    unit: unit.to_string(),
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, UnitOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceTally {
    pub total: u64,
    pub paid: u64,
}

impl InvoiceTally {
    /// Counts every entry; only an explicit `"is_paid": true` counts as paid.
    pub fn of(entries: &[Value]) -> Self {
        Self {
            total: entries.len() as u64,
            paid: entries
                .iter()
                .filter(|entry| entry.get("is_paid") == Some(&Value::Bool(true)))
                .count() as u64,
        }
    }
}

/// The two fields the tally reads from a schedule entry. Nulls are fine, so
/// a sparse entry still counts toward the totals.
#[derive(Debug, Clone, Deserialize)]
struct ScheduleRef {
    schedule_id: Option<String>,
    status: Option<String>,
}

impl ScheduleRef {
    fn is_active(&self) -> bool {
        self.status.as_deref() == Some(ACTIVE_STATUS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTally {
    pub active: bool,
    pub invoices: UnitOutcome<InvoiceTally>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerTally {
    pub schedules: Vec<ScheduleTally>,
}

pub fn fold_outcomes<I>(outcomes: I) -> DashboardStats
where
    I: IntoIterator<Item = UnitOutcome<CustomerTally>>,
{
    let mut stats = DashboardStats::default();

    for outcome in outcomes {
        let UnitOutcome::Fetched(customer) = outcome else {
            continue;
        };
        for schedule in customer.schedules {
            stats.total_schedules += 1;
            if schedule.active {
                stats.active_schedules += 1;
            }
            if let UnitOutcome::Fetched(invoices) = schedule.invoices {
                stats.total_invoices += invoices.total;
                stats.paid_invoices += invoices.paid;
            }
        }
    }

    stats
}

impl SonicApiService {
    /// Best-effort totals for the dashboard. Per-customer and per-schedule
    /// failures are skipped; only a missing key or email fails the call.
    pub async fn fetch_dashboard_stats(
        &self,
        connection: &Connection,
        user_email: &str,
    ) -> Result<DashboardStats, SonicError> {
        self.authorize(user_email)?;

        let outcomes = self.collect_outcomes(connection, user_email).await;
        let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
        let stats = fold_outcomes(outcomes);

        log::info!(
            "Dashboard stats for {}: {} schedules ({} active), {} invoices ({} paid), {} customers skipped",
            connection.organization_id,
            stats.total_schedules,
            stats.active_schedules,
            stats.total_invoices,
            stats.paid_invoices,
            skipped
        );
        Ok(stats)
    }

    pub async fn collect_outcomes(
        &self,
        connection: &Connection,
        user_email: &str,
    ) -> Vec<UnitOutcome<CustomerTally>> {
        match self.aggregation {
            AggregationMode::Sequential => {
                let mut outcomes = Vec::with_capacity(connection.customers.len());
                for customer in &connection.customers {
                    outcomes.push(self.tally_customer(&customer.id, user_email).await);
                }
                outcomes
            }
            AggregationMode::Concurrent { limit } => {
                stream::iter(&connection.customers)
                    .map(|customer| self.tally_customer(&customer.id, user_email))
                    .buffered(limit.max(1))
                    .collect()
                    .await
            }
        }
    }

    async fn tally_customer(&self, customer_id: &str, user_email: &str) -> UnitOutcome<CustomerTally> {
        let unit = format!("customer {}", customer_id);
        if customer_id.trim().is_empty() {
            return UnitOutcome::from_result(
                &unit,
                Err(SonicError::InvalidInput("Customer id is required.".to_string())),
            );
        }

        let schedules = match self
            .get_json(&["customers", customer_id, "schedules"], DEFAULT_FALLBACK, user_email)
            .await
        {
            Ok(value) => response::lenient_list::<ScheduleRef>(value, "schedule"),
            Err(err) => return UnitOutcome::from_result(&unit, Err(err)),
        };

        let mut tally = CustomerTally::default();
        for schedule in &schedules {
            tally.schedules.push(self.tally_schedule(schedule, user_email).await);
        }
        UnitOutcome::Fetched(tally)
    }

    async fn tally_schedule(&self, schedule: &ScheduleRef, user_email: &str) -> ScheduleTally {
        let schedule_id = schedule.schedule_id.as_deref().unwrap_or_default();
        let unit = format!("invoices of schedule {}", schedule_id);

        let invoices = if schedule_id.trim().is_empty() {
            Err(SonicError::InvalidInput("Schedule id is required.".to_string()))
        } else {
            self.tally_invoices(schedule_id, user_email).await
        };

        ScheduleTally {
            active: schedule.is_active(),
            invoices: UnitOutcome::from_result(&unit, invoices),
        }
    }

    async fn tally_invoices(&self, schedule_id: &str, user_email: &str) -> Result<InvoiceTally, SonicError> {
        let value = self
            .get_json(&["schedules", schedule_id, "invoices"], "Failed to fetch invoices", user_email)
            .await?;

        match value {
            Some(Value::Array(entries)) => Ok(InvoiceTally::of(&entries)),
            Some(_) => Err(SonicError::Protocol(format!(
                "Expected a list of invoices for schedule {}",
                schedule_id
            ))),
            None => Ok(InvoiceTally::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(active: bool, invoices: UnitOutcome<InvoiceTally>) -> ScheduleTally {
        ScheduleTally { active, invoices }
    }

    fn skipped<T>(unit: &str) -> UnitOutcome<T> {
        UnitOutcome::Skipped {
            unit: unit.to_string(),
            reason: "Request failed (status 500)".to_string(),
        }
    }

    #[test]
    fn folds_fetched_units_and_ignores_skipped_ones() {
        let outcomes = vec![
            UnitOutcome::Fetched(CustomerTally {
                schedules: vec![
                    schedule(true, UnitOutcome::Fetched(InvoiceTally { total: 3, paid: 2 })),
                    schedule(false, skipped("invoices of schedule s2")),
                ],
            }),
            skipped("customer c2"),
            UnitOutcome::Fetched(CustomerTally {
                schedules: vec![schedule(true, UnitOutcome::Fetched(InvoiceTally { total: 1, paid: 0 }))],
            }),
        ];

        let stats = fold_outcomes(outcomes);
        assert_eq!(
            stats,
            DashboardStats {
                total_schedules: 3,
                active_schedules: 2,
                total_invoices: 4,
                paid_invoices: 2,
            }
        );
    }

    #[test]
    fn empty_roster_yields_zeroes() {
        assert_eq!(fold_outcomes(Vec::new()), DashboardStats::default());
    }

    #[test]
    fn tallies_paid_invoices() {
        let entries = vec![
            serde_json::json!({"invoice_id": "i1", "is_paid": true}),
            serde_json::json!({"invoice_id": "i2", "is_paid": false}),
            serde_json::json!({"invoice_id": "i3", "currency": null, "amount_tax": null}),
            serde_json::json!({"invoice_id": "i4", "is_paid": null}),
        ];

        assert_eq!(InvoiceTally::of(&entries), InvoiceTally { total: 4, paid: 1 });
    }

    #[test]
    fn schedule_refs_tolerate_nulls() {
        let refs: Vec<ScheduleRef> = response::lenient_list(
            Some(serde_json::json!([
                {"schedule_id": "s1", "status": "active"},
                {"schedule_id": "s2", "status": null, "currency_code": null}
            ])),
            "schedule",
        );

        assert_eq!(refs.len(), 2);
        assert!(refs[0].is_active());
        assert!(!refs[1].is_active());
    }
}
