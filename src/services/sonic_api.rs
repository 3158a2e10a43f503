use crate::config::{resolve_base_url, ClientConfig};
use crate::errors::SonicError;
use crate::models::{
    Connection, Invoice, NewSeatEvent, Schedule, SeatEvent, SeatEventCreated, SeatInvoiceInfo,
    SeatMeter,
};
use crate::services::response::{self, RawResponse, DEFAULT_FALLBACK};
use crate::services::stats::AggregationMode;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

pub const HEADER_API_KEY: &str = "X-Sonic-Api-Key";
pub const HEADER_USER_EMAIL: &str = "X-User-Email";
pub const PAGE_SIZE: &str = "100";

const API_PREFIX: [&str; 3] = ["api", "integrations", "api-keys"];

/// Authenticated gateway to the Sonic billing API.
///
/// Configuration is fixed at construction. Every call needs the signed-in
/// user's email; it is sent as-is and never cached.
#[derive(Clone)]
pub struct SonicApiService {
    client: Client,
    config: ClientConfig,
    base_url: Url,
    pub(crate) aggregation: AggregationMode,
}

// Generic request helpers
impl SonicApiService {
    pub fn new(config: ClientConfig) -> Result<Self, SonicError> {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: ClientConfig, client: Client) -> Result<Self, SonicError> {
        let base_url = Url::parse(&resolve_base_url(&config))?;
        if base_url.cannot_be_a_base() {
            return Err(SonicError::Config(format!("Base URL cannot carry paths: {}", base_url)));
        }

        Ok(Self {
            client,
            config,
            base_url,
            aggregation: AggregationMode::default(),
        })
    }

    pub fn with_aggregation_mode(mut self, mode: AggregationMode) -> Self {
        self.aggregation = mode;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Checks both credentials before any network I/O.
    pub(crate) fn authorize(&self, user_email: &str) -> Result<(), SonicError> {
        if !self.config.has_api_key() {
            return Err(SonicError::Config(
                "Sonic API key is required to initialize the client.".to_string(),
            ));
        }
        if user_email.trim().is_empty() {
            return Err(SonicError::InvalidInput("User email is required.".to_string()));
        }
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SonicError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SonicError::Config(format!("Base URL cannot carry paths: {}", self.base_url)))?
            .pop_if_empty()
            .extend(API_PREFIX.iter().chain(segments.iter()));
        Ok(url)
    }

    async fn send<T: Serialize>(
        &self,
        user_email: &str,
        method: Method,
        url: Url,
        body: Option<&T>,
    ) -> Result<RawResponse, SonicError> {
        self.authorize(user_email)?;

        log::debug!("Sonic API {} {}", method, url.path());
        let mut request_builder = self
            .client
            .request(method, url.clone())
            .header(HEADER_API_KEY, &self.config.api_key)
            .header(HEADER_USER_EMAIL, user_email);

        if let Some(body_data) = body {
            request_builder = request_builder.json(body_data);
        }

        let raw = RawResponse::read(request_builder.send().await?).await;
        if !raw.is_success() {
            log::error!("Sonic API Error on path {}: {} - {}", url.path(), raw.status, raw.body);
        }
        Ok(raw)
    }

    async fn get(&self, user_email: &str, url: Url) -> Result<RawResponse, SonicError> {
        self.send(user_email, Method::GET, url, None::<&()>).await
    }

    /// Untyped body of a GET; an empty 2xx body is `None`.
    pub(crate) async fn get_json(
        &self,
        segments: &[&str],
        fallback: &str,
        user_email: &str,
    ) -> Result<Option<Value>, SonicError> {
        let url = self.endpoint(segments)?;
        let body = self.get(user_email, url).await?.into_body(fallback)?;
        response::parse_json(&body)
    }
}

fn require_id(value: &str, what: &str) -> Result<(), SonicError> {
    if value.trim().is_empty() {
        return Err(SonicError::InvalidInput(format!("{} is required.", what)));
    }
    Ok(())
}

// API method implementations
impl SonicApiService {
    /// Confirms the key and returns the tenant with its customer roster.
    pub async fn validate_connection(&self, user_email: &str) -> Result<Connection, SonicError> {
        let url = self.endpoint(&["validate"])?;
        let body = self.get(user_email, url).await?.into_body(DEFAULT_FALLBACK)?;
        response::decode_required(&body, "connection")
    }

    // --- Seats ---

    pub async fn fetch_seat_meters(&self, user_email: &str) -> Result<Vec<SeatMeter>, SonicError> {
        let mut url = self.endpoint(&["seat", "seat-meters"])?;
        url.query_pairs_mut().append_pair("page_size", PAGE_SIZE);

        let body = self
            .get(user_email, url)
            .await?
            .into_body("Failed to load seat meters")?;
        Ok(response::envelope_list(response::parse_json(&body)?, "meters"))
    }

    /// Not idempotent: every successful call appends a ledger entry.
    pub async fn create_seat_event(
        &self,
        event: &NewSeatEvent,
        user_email: &str,
    ) -> Result<SeatEventCreated, SonicError> {
        let url = self.endpoint(&["seat", "seat-events"])?;
        let body = self
            .send(user_email, Method::POST, url, Some(event))
            .await?
            .into_body("Failed to create seat event")?;

        let created = response::decode_optional::<SeatEventCreated>(&body)?.unwrap_or_default();
        log::info!(
            "Created seat event for customer {} on meter {} (balance after: {:?})",
            event.customer_id(),
            event.seat_meter_id(),
            created.balance_after()
        );
        Ok(created)
    }

    pub async fn fetch_seat_events(&self, user_email: &str) -> Result<Vec<SeatEvent>, SonicError> {
        let mut url = self.endpoint(&["seat", "seat-events"])?;
        url.query_pairs_mut().append_pair("page_size", PAGE_SIZE);

        let body = self.get(user_email, url).await?.into_body(DEFAULT_FALLBACK)?;
        Ok(response::envelope_list(response::parse_json(&body)?, "events"))
    }

    /// Looks up the invoice a pending seat change would land on. A 404 means
    /// nothing matches the filters and resolves to `None`.
    pub async fn fetch_seat_invoice_for_event(
        &self,
        customer_id: &str,
        seat_type_id: &str,
        event_timestamp: Option<&str>,
        user_email: &str,
    ) -> Result<Option<SeatInvoiceInfo>, SonicError> {
        self.authorize(user_email)?;
        require_id(customer_id, "Customer id")?;
        require_id(seat_type_id, "Seat type id")?;

        let mut url = self.endpoint(&["seat", "seat-events", "invoices", "by-customer-seat-type"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("customer_id", customer_id)
                .append_pair("seat_type_id", seat_type_id);
            if let Some(ts) = event_timestamp.filter(|ts| !ts.is_empty()) {
                query.append_pair("event_timestamp", ts);
            }
        }

        let raw = self.get(user_email, url).await?;
        if raw.status == StatusCode::NOT_FOUND {
            log::debug!(
                "No seat invoice for customer {} and seat type {}",
                customer_id,
                seat_type_id
            );
            return Ok(None);
        }

        let body = raw.into_body("Failed to load invoice for seat event")?;
        match response::decode_optional::<SeatInvoiceInfo>(&body) {
            Ok(info) => Ok(info),
            Err(err) => {
                log::warn!("Ignoring unreadable seat invoice payload: {}", err);
                Ok(None)
            }
        }
    }

    // --- Schedules & invoices ---

    pub async fn fetch_customer_schedules(
        &self,
        customer_id: &str,
        user_email: &str,
    ) -> Result<Vec<Schedule>, SonicError> {
        self.authorize(user_email)?;
        require_id(customer_id, "Customer id")?;
        let url = self.endpoint(&["customers", customer_id, "schedules"])?;

        let body = self.get(user_email, url).await?.into_body(DEFAULT_FALLBACK)?;
        Ok(response::lenient_list(response::parse_json(&body)?, "schedule"))
    }

    /// Full schedule including its phases, ordered by phase number.
    pub async fn fetch_schedule_details(
        &self,
        schedule_id: &str,
        user_email: &str,
    ) -> Result<Schedule, SonicError> {
        self.authorize(user_email)?;
        require_id(schedule_id, "Schedule id")?;
        let url = self.endpoint(&["schedules", schedule_id])?;

        let body = self
            .get(user_email, url)
            .await?
            .into_body("Failed to fetch schedule details")?;
        let mut schedule: Schedule = response::decode_required(&body, "schedule details")?;
        schedule.sort_phases();
        Ok(schedule)
    }

    pub async fn fetch_schedule_invoices(
        &self,
        schedule_id: &str,
        user_email: &str,
    ) -> Result<Vec<Invoice>, SonicError> {
        self.authorize(user_email)?;
        require_id(schedule_id, "Schedule id")?;
        let url = self.endpoint(&["schedules", schedule_id, "invoices"])?;

        let body = self
            .get(user_email, url)
            .await?
            .into_body("Failed to fetch invoices")?;
        Ok(response::decode_optional::<Vec<Invoice>>(&body)?.unwrap_or_default())
    }
}
