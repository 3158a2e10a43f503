use serde::{Deserialize, Serialize};

use super::money::format_minor_units;

pub const ACTIVE_STATUS: &str = "active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseProduct {
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity: Option<f64>,
    /// Unit price in minor currency units.
    pub price_base: Option<i64>,
    pub discount_percentage: Option<f64>,
    pub billing_frequency: Option<String>,
    pub currency_code: Option<String>,
}

impl PhaseProduct {
    pub fn formatted_price(&self) -> Option<String> {
        self.price_base
            .map(|amount| format_minor_units(amount, self.currency_code.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub phase_number: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub products: Vec<PhaseProduct>,
    pub phase_discount_percentage: Option<f64>,
    pub phase_discount_fixed: Option<i64>,
}

/// A billing schedule. The list endpoint omits `phases`; the detail endpoint
/// includes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub billing_schedule_label: Option<String>,
    #[serde(default)]
    pub status: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration: Option<String>,
    pub billing_day: Option<String>,
    pub currency_code: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub contract_id: Option<String>,
    pub contract_name: Option<String>,
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<Phase>>,
}

impl Schedule {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }

    pub fn sort_phases(&mut self) {
        if let Some(phases) = self.phases.as_mut() {
            phases.sort_by_key(|p| p.phase_number);
        }
    }

    pub fn phases(&self) -> &[Phase] {
        self.phases.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule_json(status: &str) -> serde_json::Value {
        serde_json::json!({
            "schedule_id": "s1",
            "status": status,
            "currency_code": "usd",
            "phases": [
                {"phase_number": 2, "start_date": "2025-07-01", "end_date": "2025-12-31", "products": []},
                {"phase_number": 1, "name": "Ramp", "start_date": "2025-01-01", "end_date": "2025-06-30",
                 "products": [{"product_id": "p1", "price_base": 125000, "currency_code": "USD"}]}
            ]
        })
    }

    #[test]
    fn only_exact_active_status_counts_as_active() {
        let active: Schedule = serde_json::from_value(schedule_json("active")).unwrap();
        let upper: Schedule = serde_json::from_value(schedule_json("ACTIVE")).unwrap();
        assert!(active.is_active());
        assert!(!upper.is_active());
    }

    #[test]
    fn sorts_phases_by_number() {
        let mut schedule: Schedule = serde_json::from_value(schedule_json("active")).unwrap();
        schedule.sort_phases();

        let numbers: Vec<u32> = schedule.phases().iter().map(|p| p.phase_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(
            schedule.phases()[0].products[0].formatted_price().as_deref(),
            Some("USD 1250.00")
        );
    }

    #[test]
    fn list_entries_have_no_phases() {
        let schedule: Schedule =
            serde_json::from_str(r#"{"schedule_id":"s9","status":"draft"}"#).unwrap();
        assert!(schedule.phases().is_empty());
        assert!(schedule.phases.is_none());
    }
}
