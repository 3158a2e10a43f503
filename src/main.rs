use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::process::ExitCode;

use sonic_billing::config::Settings;
use sonic_billing::models::seat::format_timestamp;
use sonic_billing::models::{NewSeatEvent, SeatChange, SeatChangePreview};
use sonic_billing::{AggregationMode, SonicApiService};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, verbatim_doc_comment)]
/// Command-line client for the Sonic billing API.
/// Reads SONIC_API_KEY, SONIC_BASE_URL, SONIC_ENV and SONIC_USER_EMAIL
/// from the environment (or a .env file) and prints results as JSON.
struct Cli {
    /// Email of the acting user, sent with every request.
    #[arg(long, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validates the API key and lists the organization's customers.
    Validate,
    /// Totals schedules and invoices across every customer.
    Stats {
        /// Customers fetched in parallel; 1 keeps requests strictly sequential.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Lists seat meters.
    Meters,
    /// Lists recorded seat events.
    Events,
    /// Records a seat change for a customer.
    CreateEvent {
        #[command(flatten)]
        target: SeatTarget,
        #[command(flatten)]
        change: SeatChangeArgs,
    },
    /// Shows how a seat change would affect the matching invoice balance.
    Preview {
        #[command(flatten)]
        target: SeatTarget,
        #[command(flatten)]
        change: SeatChangeArgs,
    },
    /// Lists a customer's billing schedules.
    Schedules {
        customer_id: String,
    },
    /// Shows one schedule with its phases.
    Schedule {
        schedule_id: String,
    },
    /// Lists invoices issued under a schedule.
    Invoices {
        schedule_id: String,
    },
    /// Finds the invoice for a customer and seat type.
    SeatInvoice {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        seat_type: String,
        /// RFC 3339 timestamp or YYYY-MM-DD.
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },
}

#[derive(Args, Debug)]
struct SeatTarget {
    #[arg(long)]
    customer: String,
    #[arg(long)]
    meter: String,
    /// RFC 3339 timestamp or YYYY-MM-DD (start of day, UTC).
    #[arg(long, value_parser = parse_timestamp)]
    at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SeatChangeArgs {
    /// Number of seats to add.
    #[arg(long)]
    add: Option<i64>,
    /// Number of seats to remove.
    #[arg(long)]
    remove: Option<i64>,
}

impl SeatChangeArgs {
    fn change(&self) -> SeatChange {
        match (self.add, self.remove) {
            (Some(n), _) => SeatChange::Added(n),
            (None, Some(n)) => SeatChange::Removed(n),
            (None, None) => SeatChange::Added(0),
        }
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("Invalid timestamp: {}", value))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_event(target: &SeatTarget, change: SeatChange) -> Result<NewSeatEvent, sonic_billing::SonicError> {
    let event = match change {
        SeatChange::Added(n) => NewSeatEvent::added(&target.meter, &target.customer, n)?,
        SeatChange::Removed(n) => NewSeatEvent::removed(&target.meter, &target.customer, n)?,
    };
    Ok(match target.at {
        Some(ts) => event.at(ts),
        None => event,
    })
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    let email = cli
        .email
        .or_else(|| settings.user_email.clone())
        .filter(|e| !e.trim().is_empty())
        .ok_or("User email is required (pass --email or set SONIC_USER_EMAIL)")?;

    let api = SonicApiService::new(settings.client_config())?;
    log::debug!("Using Sonic API at {}", api.base_url());

    match cli.command {
        Commands::Validate => print_json(&api.validate_connection(&email).await?)?,
        Commands::Stats { concurrency } => {
            let mode = if concurrency > 1 {
                AggregationMode::Concurrent { limit: concurrency }
            } else {
                AggregationMode::Sequential
            };
            let api = api.with_aggregation_mode(mode);
            let connection = api.validate_connection(&email).await?;
            print_json(&api.fetch_dashboard_stats(&connection, &email).await?)?;
        }
        Commands::Meters => print_json(&api.fetch_seat_meters(&email).await?)?,
        Commands::Events => print_json(&api.fetch_seat_events(&email).await?)?,
        Commands::CreateEvent { target, change } => {
            let event = build_event(&target, change.change())?;
            let created = api.create_seat_event(&event, &email).await?;
            eprintln!("{}", created.confirmation());
            print_json(&created)?;
        }
        Commands::Preview { target, change } => {
            let change = change.change();
            build_event(&target, change)?;

            let meters = api.fetch_seat_meters(&email).await?;
            let seat_type_id = meters
                .iter()
                .find(|m| m.id == target.meter)
                .and_then(|m| m.seat_type_id.clone());

            let invoice = match seat_type_id {
                Some(seat_type_id) => {
                    let ts = target.at.map(format_timestamp);
                    api.fetch_seat_invoice_for_event(&target.customer, &seat_type_id, ts.as_deref(), &email)
                        .await?
                }
                None => {
                    log::warn!("Seat meter {} has no seat type; previewing without invoice", target.meter);
                    None
                }
            };

            let preview = SeatChangePreview::new(change, invoice.as_ref());
            eprintln!("{}", preview.describe());
            print_json(&preview)?;
        }
        Commands::Schedules { customer_id } => {
            print_json(&api.fetch_customer_schedules(&customer_id, &email).await?)?
        }
        Commands::Schedule { schedule_id } => {
            print_json(&api.fetch_schedule_details(&schedule_id, &email).await?)?
        }
        Commands::Invoices { schedule_id } => {
            print_json(&api.fetch_schedule_invoices(&schedule_id, &email).await?)?
        }
        Commands::SeatInvoice { customer, seat_type, at } => {
            let ts = at.map(format_timestamp);
            let info = api
                .fetch_seat_invoice_for_event(&customer, &seat_type, ts.as_deref(), &email)
                .await?;
            if info.is_none() {
                eprintln!("No invoice matches this customer and seat type.");
            }
            print_json(&info)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_dates_and_timestamps() {
        assert_eq!(
            format_timestamp(parse_timestamp("2025-03-01").unwrap()),
            "2025-03-01T00:00:00.000Z"
        );
        assert_eq!(
            format_timestamp(parse_timestamp("2025-03-01T10:30:00+02:00").unwrap()),
            "2025-03-01T08:30:00.000Z"
        );
        assert!(parse_timestamp("03/01/2025").is_err());
    }

    #[test]
    fn seat_change_flags_are_exclusive() {
        let ok = Cli::try_parse_from([
            "sonic-cli", "create-event", "--customer", "c1", "--meter", "m1", "--remove", "2",
        ])
        .unwrap();
        match ok.command {
            Commands::CreateEvent { change, .. } => assert_eq!(change.change(), SeatChange::Removed(2)),
            other => panic!("unexpected command: {:?}", other),
        }

        let both = Cli::try_parse_from([
            "sonic-cli", "create-event", "--customer", "c1", "--meter", "m1", "--add", "1", "--remove", "2",
        ]);
        assert!(both.is_err());
    }
}
