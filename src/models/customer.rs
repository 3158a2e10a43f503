use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Tenant context returned by the key validation endpoint. Every later call
/// is scoped to the organization and customer roster described here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub connected: bool,
    pub organization_id: String,
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub total_customers: u64,
    #[serde(default)]
    pub customers: Vec<Customer>,
}

impl Connection {
    pub fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_connection_with_optional_contact_fields() {
        let connection: Connection = serde_json::from_value(serde_json::json!({
            "connected": true,
            "organization_id": "org_1",
            "organization_name": "Acme",
            "total_customers": 2,
            "customers": [
                {"id": "cust_1", "name": "Globex", "email": "billing@globex.test"},
                {"id": "cust_2", "name": "Initech", "phone": null}
            ]
        }))
        .unwrap();

        assert!(connection.connected);
        assert_eq!(connection.customers.len(), 2);
        assert_eq!(connection.customer("cust_2").map(|c| c.name.as_str()), Some("Initech"));
        assert!(connection.customer("cust_3").is_none());
    }

    #[test]
    fn missing_roster_defaults_to_empty() {
        let connection: Connection =
            serde_json::from_str(r#"{"organization_id":"org_1"}"#).unwrap();
        assert!(connection.customers.is_empty());
        assert_eq!(connection.total_customers, 0);
    }
}
