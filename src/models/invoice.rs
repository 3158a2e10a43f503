use serde::{Deserialize, Serialize};

use super::money::format_minor_units;

/// Invoice issued under a schedule. Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub status: String,
    pub schedule_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    #[serde(default)]
    pub amount_subtotal: i64,
    #[serde(default)]
    pub amount_discount: i64,
    #[serde(default)]
    pub amount_tax: i64,
    #[serde(default)]
    pub amount_total: i64,
    #[serde(default)]
    pub currency: String,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub paid_at: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    pub created_at: Option<String>,
}

impl Invoice {
    pub fn formatted_total(&self) -> String {
        format_minor_units(self.amount_total, Some(&self.currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_paid_flag_means_unpaid() {
        let invoice: Invoice = serde_json::from_value(serde_json::json!({
            "invoice_id": "inv_1",
            "status": "open",
            "amount_total": 4999,
            "currency": "usd"
        }))
        .unwrap();

        assert!(!invoice.is_paid);
        assert_eq!(invoice.formatted_total(), "USD 49.99");
    }
}
