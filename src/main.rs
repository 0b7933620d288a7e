use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parking_ledger::config::FacilityConfig;
use parking_ledger::ledger::{Ledger, LocationSource};
use parking_ledger::models::{timestamp, NewVehicle, VehicleSession};
use parking_ledger::store::JsonFileStore;
use parking_ledger::{api, report};

#[derive(Parser)]
#[command(name = "parkd")]
#[command(about = "Parking facility ledger: entries, exits, fees and history")]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Facility data file, overriding the configuration
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "17020")]
        port: u16,

        /// Operator logged in at startup
        #[arg(short, long)]
        operator: Option<String>,
    },
    /// Register a vehicle entering the facility
    Enter {
        plate: String,
        /// Vehicle type (car, motorcycle, bicycle, ...)
        vehicle_type: String,
        /// Customer tier (normal, frequent, monthly)
        #[arg(short, long)]
        tier: Option<String>,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// Register a vehicle leaving the facility and print the fee
    Exit {
        plate: String,
        /// Operator billing the exit
        #[arg(short, long)]
        operator: Option<String>,
    },
    /// List parked vehicles
    Active,
    /// Show free slots per vehicle type
    Capacity,
    /// Show overstay and low-capacity alerts
    Alerts,
    /// List completed sessions
    History,
    /// Show where a vehicle is parked, or was last seen
    Locate { plate: String },
    /// Summaries over the facility state
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },
    /// Export the history as CSV
    Export {
        #[arg(default_value = "parking_report.csv")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum ReportKind {
    /// Revenue per operator
    Operators,
    /// Parked vehicles per type
    Occupancy,
}

/// Initialize tracing. One-shot commands log to stderr so stdout only carries
/// their output.
fn init_tracing(serving: bool) {
    let default = if serving {
        "parking_ledger=info,tower_http=debug"
    } else {
        "parking_ledger=warn"
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    if serving {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_ledger(config: &FacilityConfig) -> anyhow::Result<Ledger> {
    let path = config.data_path()?;
    let store = Arc::new(JsonFileStore::new(path));
    let (ledger, load_error) = Ledger::open_or_recover(config, store);
    if let Some(e) = load_error {
        eprintln!("warning: {} (starting from an empty facility)", e);
    }
    Ok(ledger)
}

fn print_session(session: &VehicleSession) {
    let location = session
        .location
        .map(|l| l.to_string())
        .unwrap_or_else(|| "no location".to_string());
    println!(
        "{} | {} | entered {} | {} (visit {}) | {}",
        session.vehicle_type.as_str().to_uppercase(),
        session.plate,
        timestamp::format(&session.entry_time),
        session.customer_tier,
        session.visit_count,
        location
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve { .. }));

    let mut config = FacilityConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_file = Some(data);
    }
    let ledger = open_ledger(&config)?;

    match cli.command {
        Commands::Serve { port, operator } => {
            if let Some(operator) = operator {
                ledger.login(&operator)?;
            }
            let app = api::create_router(ledger);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Parking ledger listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Enter {
            plate,
            vehicle_type,
            tier,
            lat,
            lon,
        } => {
            let vehicle = NewVehicle::parse(&plate, &vehicle_type, tier.as_deref(), lat, lon)?;
            let outcome = ledger.register_entry(vehicle)?;
            println!("Entry registered.");
            print_session(&outcome.session);
            for alert in &outcome.alerts {
                println!("{}", alert);
            }
            if let Some(e) = &outcome.write_failure {
                eprintln!("warning: {}", e);
            }
        }
        Commands::Exit { plate, operator } => {
            if let Some(operator) = operator {
                ledger.login(&operator)?;
            }
            let outcome = ledger.register_exit(&plate)?;
            println!(
                "Exit registered. Total due: ${} ({} hours).",
                outcome.record.total, outcome.record.billed_hours
            );
            if let Some(e) = &outcome.write_failure {
                eprintln!("warning: {}", e);
            }
        }
        Commands::Active => {
            let active = ledger.list_active();
            if active.is_empty() {
                println!("Facility is empty.");
            }
            for session in &active {
                print_session(session);
            }
        }
        Commands::Capacity => {
            let totals = ledger.configured_totals();
            for (vehicle_type, free) in ledger.list_capacity() {
                let total = totals.get(&vehicle_type).copied().unwrap_or(free);
                println!("{}: {} of {} free", vehicle_type, free, total);
            }
        }
        Commands::Alerts => {
            let alerts = ledger.compute_alerts();
            if alerts.is_empty() {
                println!("No alerts.");
            }
            for alert in alerts {
                println!("{}", alert);
            }
        }
        Commands::History => {
            for record in ledger.history() {
                println!(
                    "{} | {} | {} -> {} | {} h | ${} | {}",
                    record.plate,
                    record.vehicle_type,
                    timestamp::format(&record.entry_time),
                    timestamp::format(&record.exit_time),
                    record.billed_hours,
                    record.total,
                    record.operator.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Locate { plate } => match ledger.resolve_location(&plate) {
            Some(found) => {
                let label = match found.source {
                    LocationSource::Parked => "currently parked",
                    LocationSource::LastKnown => "last known",
                };
                println!("{} ({}): {}", found.plate, label, found.location);
            }
            None => println!("No location found for that plate."),
        },
        Commands::Report { kind } => match kind {
            ReportKind::Operators => {
                let revenue = report::revenue_by_operator(&ledger.history());
                if revenue.is_empty() {
                    println!("No data.");
                }
                for (operator, total) in revenue {
                    println!("{}: ${}", operator, total);
                }
            }
            ReportKind::Occupancy => {
                for (vehicle_type, count) in report::occupancy_by_type(&ledger.list_active()) {
                    println!("{}: {}", vehicle_type, count);
                }
            }
        },
        Commands::Export { path } => {
            let history = ledger.history();
            if history.is_empty() {
                println!("No history to export.");
            } else {
                let written = report::export_history_csv(&history, &path)?;
                println!("Exported {} records to {}", written, path.display());
            }
        }
    }

    Ok(())
}
