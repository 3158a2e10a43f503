use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::SonicError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMeter {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub seat_type: Option<String>,
    pub seat_type_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatEventType {
    Added,
    Removed,
}

/// Ledger entry as stored by the server. `balance_after` is computed
/// server-side from `balance_before` and the seat delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatEvent {
    pub id: String,
    pub seat_meter_id: String,
    pub customer_id: String,
    pub event_type: SeatEventType,
    #[serde(default)]
    pub seats_added: i64,
    #[serde(default)]
    pub seats_removed: i64,
    #[serde(default)]
    pub event_timestamp: String,
    #[serde(default)]
    pub balance_before: i64,
    #[serde(default)]
    pub balance_after: i64,
}

impl SeatEvent {
    pub fn signed_change(&self) -> i64 {
        match self.event_type {
            SeatEventType::Added => self.seats_added,
            SeatEventType::Removed => -self.seats_removed,
        }
    }
}

/// Direction and size of a seat change. Always strictly positive once built
/// through [`NewSeatEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatChange {
    Added(i64),
    Removed(i64),
}

impl SeatChange {
    pub fn event_type(self) -> SeatEventType {
        match self {
            SeatChange::Added(_) => SeatEventType::Added,
            SeatChange::Removed(_) => SeatEventType::Removed,
        }
    }

    pub fn seats(self) -> i64 {
        match self {
            SeatChange::Added(n) | SeatChange::Removed(n) => n,
        }
    }

    pub fn signed(self) -> i64 {
        match self {
            SeatChange::Added(n) => n,
            SeatChange::Removed(n) => -n,
        }
    }
}

/// Creation request for a seat event.
///
/// Only constructible through [`NewSeatEvent::added`] and
/// [`NewSeatEvent::removed`], so a request that reaches the wire always has
/// ids and a positive seat count for its own direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeatEvent {
    seat_meter_id: String,
    customer_id: String,
    change: SeatChange,
    event_timestamp: Option<DateTime<Utc>>,
}

impl NewSeatEvent {
    pub fn added(
        seat_meter_id: impl Into<String>,
        customer_id: impl Into<String>,
        seats: i64,
    ) -> Result<Self, SonicError> {
        Self::build(seat_meter_id.into(), customer_id.into(), SeatChange::Added(seats))
    }

    pub fn removed(
        seat_meter_id: impl Into<String>,
        customer_id: impl Into<String>,
        seats: i64,
    ) -> Result<Self, SonicError> {
        Self::build(seat_meter_id.into(), customer_id.into(), SeatChange::Removed(seats))
    }

    fn build(seat_meter_id: String, customer_id: String, change: SeatChange) -> Result<Self, SonicError> {
        if seat_meter_id.trim().is_empty() {
            return Err(SonicError::InvalidInput("Please select a seat meter.".to_string()));
        }
        if customer_id.trim().is_empty() {
            return Err(SonicError::InvalidInput("Please select a customer.".to_string()));
        }
        if change.seats() <= 0 {
            return Err(SonicError::InvalidInput(
                "Please enter a positive number of seats.".to_string(),
            ));
        }

        Ok(Self {
            seat_meter_id,
            customer_id,
            change,
            event_timestamp: None,
        })
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.event_timestamp = Some(timestamp);
        self
    }

    pub fn seat_meter_id(&self) -> &str {
        &self.seat_meter_id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn change(&self) -> SeatChange {
        self.change
    }

    pub fn event_timestamp(&self) -> Option<DateTime<Utc>> {
        self.event_timestamp
    }
}

#[derive(Serialize)]
struct SeatEventPayload<'a> {
    seat_meter_id: &'a str,
    customer_id: &'a str,
    event_type: SeatEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    seats_added: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seats_removed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_timestamp: Option<String>,
}

impl Serialize for NewSeatEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (seats_added, seats_removed) = match self.change {
            SeatChange::Added(n) => (Some(n), None),
            SeatChange::Removed(n) => (None, Some(n)),
        };

        SeatEventPayload {
            seat_meter_id: &self.seat_meter_id,
            customer_id: &self.customer_id,
            event_type: self.change.event_type(),
            seats_added,
            seats_removed,
            event_timestamp: self.event_timestamp.map(format_timestamp),
        }
        .serialize(serializer)
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-03-01T00:00:00.000Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Raw object returned after creating a seat event. The server guarantees
/// little beyond `balance_after`, so the body is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatEventCreated(pub Map<String, Value>);

impl SeatEventCreated {
    pub fn balance_after(&self) -> Option<i64> {
        self.0.get("balance_after").and_then(Value::as_i64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn confirmation(&self) -> String {
        match self.balance_after() {
            Some(balance) => format!("Seat event created. New balance: {} seats.", balance),
            None => "Seat event created successfully.".to_string(),
        }
    }
}

/// Invoice snapshot matching a customer and seat type, used to preview the
/// effect of a pending change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInvoiceInfo {
    #[serde(default)]
    pub invoice_id: String,
    pub invoice_number: Option<String>,
    pub product_id: Option<String>,
    pub seat_type_id: Option<String>,
    pub seat_meter_id: Option<String>,
    pub seats_balance: Option<i64>,
    pub minimum_seats: Option<i64>,
    pub billing_period_start: Option<String>,
    pub billing_period_end: Option<String>,
}

/// Projected effect of a seat change against the current invoice balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatChangePreview {
    pub change: i64,
    pub current_balance: Option<i64>,
    pub projected_balance: Option<i64>,
    pub minimum_seats: Option<i64>,
}

impl SeatChangePreview {
    pub fn new(change: SeatChange, invoice: Option<&SeatInvoiceInfo>) -> Self {
        let signed = change.signed();
        let current_balance = invoice.and_then(|i| i.seats_balance);

        Self {
            change: signed,
            current_balance,
            projected_balance: current_balance.and_then(|base| base.checked_add(signed)),
            minimum_seats: invoice.and_then(|i| i.minimum_seats),
        }
    }

    /// True when the projected total drops under the invoice minimum.
    pub fn below_minimum(&self) -> bool {
        matches!(
            (self.projected_balance, self.minimum_seats),
            (Some(total), Some(min)) if total < min
        )
    }

    pub fn describe(&self) -> String {
        let change = if self.change > 0 {
            format!("+{}", self.change)
        } else {
            self.change.to_string()
        };

        match (self.current_balance, self.projected_balance) {
            (Some(base), Some(total)) => format!(
                "Current seats_balance (from invoice): {} seats. Change: {} seats -> New total: {} seats",
                base, change, total
            ),
            _ => format!("Change: {} seats", change),
        }
    }
}
