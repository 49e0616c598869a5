// ==========================================
// Fuel Dispatch - CLI entry point
// ==========================================

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fuel_dispatch::app::{get_default_db_path, AppState};
use fuel_dispatch::FuelType;

#[derive(Debug, Parser)]
#[command(name = "fuel-dispatch", version, about = "Tanker fleet dispatch simulator")]
struct Cli {
    /// SQLite database (default: user data directory)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seed demo data if empty, dispatch every idle truck and wait for completion
    Demo,
    /// Station inventory
    Stations,
    /// Delivery ledger
    Ledger {
        /// Only this truck
        #[arg(long)]
        truck: Option<String>,
    },
    /// Revenue by fuel type
    Report,
    /// Register stations from a CSV file
    ImportStations { path: PathBuf },
    /// Register trucks from a CSV file
    ImportTrucks { path: PathBuf },
    /// Set the price per liter of a fuel type
    SetPrice { fuel_type: String, price: f64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        fuel_dispatch::logging::init_json();
    } else {
        fuel_dispatch::logging::init();
    }

    tracing::info!(version = fuel_dispatch::VERSION, "{}", fuel_dispatch::APP_NAME);

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path)
        .await
        .map_err(anyhow::Error::msg)
        .context("startup failed")?;

    match cli.command {
        Command::Demo => run_demo(&state).await?,
        Command::Stations => print_stations(&state),
        Command::Ledger { truck } => print_ledger(&state, truck.as_deref()),
        Command::Report => print_report(&state),
        Command::ImportStations { path } => {
            let count = state.station_api.import_stations(&path)?;
            println!("{} station(s) imported", count);
        }
        Command::ImportTrucks { path } => {
            let count = state.fleet_api.import_trucks(&path)?;
            println!("{} truck(s) imported", count);
        }
        Command::SetPrice { fuel_type, price } => {
            let Some(fuel) = FuelType::from_label(&fuel_type) else {
                bail!("unknown fuel type: {}", fuel_type);
            };
            state.config_api.set_fuel_price(fuel, price)?;
            println!("{} = {:.2}", fuel, price);
        }
    }
    Ok(())
}

async fn run_demo(state: &AppState) -> Result<()> {
    if state.seed_demo_data()? {
        println!("demo fleet and stations created");
    }
    state.start_background();
    let started = chrono::Utc::now();

    for view in state.fleet_api.list_trucks() {
        if view.truck.retired || !view.status.is_idle() {
            continue;
        }
        match state.dispatch_api.plan_and_dispatch(&view.truck.id).await {
            Ok(Some(ticket)) => println!(
                "{} dispatched: {:.0} L {} ({})",
                ticket.truck_id, ticket.planned_unload_l, view.truck.fuel_type, ticket.dispatch_id
            ),
            Ok(None) => println!("{}: no station needs {}", view.truck.id, view.truck.fuel_type),
            Err(e) => println!("{}: {}", view.truck.id, e),
        }
    }

    state.dispatch_api.wait_all().await;
    for entry in state
        .dispatch_api
        .ledger(None)
        .into_iter()
        .filter(|e| e.logged_at >= started)
    {
        println!(
            "{} done: delivered {:.0} of {:.0} L, skipped {}",
            entry.truck_id,
            entry.delivered_volume_l,
            entry.total_volume_l,
            entry.skipped.len()
        );
    }

    state.shutdown().await?;
    print_stations(state);
    Ok(())
}

fn print_stations(state: &AppState) {
    for station in state.station_api.list_stations() {
        println!("{} {} ({})", station.id, station.name, station.address);
        for level in &station.fuel_levels {
            let flag = if level.needs_refuel() { "  LOW" } else { "" };
            println!(
                "    {:<6} {:>8.0} / {:>8.0} L  (min {:.0}){}",
                level.fuel_type.label(),
                level.current_l,
                level.max_l,
                level.min_l,
                flag
            );
        }
    }
}

fn print_ledger(state: &AppState, truck_id: Option<&str>) {
    let entries = state.dispatch_api.ledger(truck_id);
    if entries.is_empty() {
        println!("ledger is empty");
    }
    for entry in entries {
        println!("{}  {}", entry.logged_at.format("%Y-%m-%d %H:%M:%S"), entry.summary_text());
    }
}

fn print_report(state: &AppState) {
    let report = state.dispatch_api.revenue_report();
    println!(
        "deliveries: {}  volume: {:.0} L  revenue: {:.2}",
        report.deliveries, report.total_volume_l, report.total_revenue
    );
    for (fuel, revenue) in &report.by_fuel {
        println!(
            "    {:<6} {:>8.0} L  {:>10.2}  ({} deliveries)",
            fuel.label(),
            revenue.volume_l,
            revenue.revenue,
            revenue.deliveries
        );
    }
}
