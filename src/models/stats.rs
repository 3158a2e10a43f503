use serde::{Deserialize, Serialize};

/// Best-effort totals across every customer's schedules and invoices.
/// Sub-fetches that failed are not counted, so treat these as lower bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_schedules: u64,
    pub active_schedules: u64,
    pub total_invoices: u64,
    pub paid_invoices: u64,
}

impl DashboardStats {
    pub fn unpaid_invoices(&self) -> u64 {
        self.total_invoices.saturating_sub(self.paid_invoices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let stats = DashboardStats {
            total_schedules: 3,
            active_schedules: 2,
            total_invoices: 5,
            paid_invoices: 4,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["totalSchedules"], 3);
        assert_eq!(json["paidInvoices"], 4);
        assert_eq!(stats.unpaid_invoices(), 1);
    }
}
