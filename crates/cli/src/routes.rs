//! `milla routes`: propose and commit vehicle routes.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use milla_core::ports::VehicleRegistry;
use milla_core::{DespatchId, LoadStatus, RoutePlan};
use milla_routing::{commit_routes, pending_invoices, plan_routes};

use crate::exit_codes::{EXIT_ERROR, EXIT_ROUTES_UNASSIGNED, EXIT_USAGE};
use crate::{print_json, CliError, Context};

#[derive(Subcommand)]
pub enum RoutesCommands {
    /// Propose routes for accepted loads that are not on a despatch yet
    #[command(after_help = "\
Examples:
  milla routes plan
  milla routes plan --json
  milla routes plan --output plan.json --csv plan.csv")]
    Plan {
        /// Print the plan as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the plan JSON to a file (input for `routes commit`)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write one CSV row per invoice
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Persist an accepted plan as planned despatches
    #[command(after_help = "\
Examples:
  milla routes commit plan.json --created-by ana")]
    Commit {
        /// Plan file written by `routes plan --output`
        plan: PathBuf,

        /// User recorded on the despatches
        #[arg(long)]
        created_by: Option<String>,

        /// Print the created despatch ids as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_routes(ctx: &Context, cmd: RoutesCommands) -> Result<(), CliError> {
    match cmd {
        RoutesCommands::Plan { json, output, csv } => cmd_routes_plan(ctx, json, output, csv),
        RoutesCommands::Commit { plan, created_by, json } => cmd_routes_commit(ctx, plan, created_by, json),
    }
}

fn io_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_ERROR, message: msg.into(), hint: None }
}

fn cmd_routes_plan(
    ctx: &Context,
    json_output: bool,
    output_file: Option<PathBuf>,
    csv_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let loads = store.loads_with_status(LoadStatus::ValidatedOk)?;
    let dispatched = store.dispatched_refs()?;
    let invoices = pending_invoices(&loads, &dispatched);
    let vehicles = store.list_available()?;

    let plan = plan_routes(&invoices, &vehicles)?;

    let json_str = serde_json::to_string_pretty(&plan)
        .map_err(|e| io_err(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str).map_err(|e| io_err(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = csv_file {
        write_plan_csv(&plan, path)?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    } else {
        for route in &plan.routes {
            let usable = route
                .usable_capacity
                .map(|u| format!("{u:.2}"))
                .unwrap_or_else(|| "unbounded".into());
            let fill = route
                .utilization()
                .map(|u| format!(" ({:.0}% of capacity)", u * 100.0))
                .unwrap_or_default();
            println!(
                "vehicle {} ({}): {} invoice(s), {:.2} of {usable}{fill}",
                route.vehicle_id,
                route.plate,
                route.invoices.len(),
                route.assigned_volume
            );
            for inv in &route.invoices {
                println!("  {:<16} {:<32} {:>8.2}", inv.reference, inv.address, inv.volume);
            }
        }
        for inv in &plan.unassigned {
            println!("unassigned: {:<16} {:<32} {:>8.2}", inv.reference, inv.address, inv.volume);
        }
    }

    eprintln!(
        "route plan: {} invoice(s) ({:.2}) on {} of {} vehicle(s), {} unassigned ({:.2})",
        plan.assigned_invoice_count(),
        plan.assigned_volume(),
        plan.routes.len(),
        plan.vehicles_considered,
        plan.unassigned.len(),
        plan.unassigned_volume()
    );

    if !plan.unassigned.is_empty() {
        return Err(CliError {
            code: EXIT_ROUTES_UNASSIGNED,
            message: format!("{} invoice(s) fit no vehicle", plan.unassigned.len()),
            hint: Some("assign them manually or make more vehicles available".into()),
        });
    }
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    vehicle_id: Option<i64>,
    plate: Option<&'a str>,
    invoice_ref: &'a str,
    address: &'a str,
    volume: f64,
}

fn write_plan_csv(plan: &RoutePlan, path: &Path) -> Result<(), CliError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| io_err(format!("cannot create {}: {e}", path.display())))?;

    let assigned = plan.routes.iter().flat_map(|r| {
        r.invoices.iter().map(move |inv| CsvRow {
            vehicle_id: Some(r.vehicle_id.0),
            plate: Some(r.plate.as_str()),
            invoice_ref: &inv.reference,
            address: &inv.address,
            volume: inv.volume,
        })
    });
    let unassigned = plan.unassigned.iter().map(|inv| CsvRow {
        vehicle_id: None,
        plate: None,
        invoice_ref: &inv.reference,
        address: &inv.address,
        volume: inv.volume,
    });

    for row in assigned.chain(unassigned) {
        wtr.serialize(row).map_err(|e| io_err(format!("CSV write error: {e}")))?;
    }
    wtr.flush().map_err(|e| io_err(format!("CSV write error: {e}")))?;
    Ok(())
}

fn cmd_routes_commit(
    ctx: &Context,
    plan_path: PathBuf,
    created_by: Option<String>,
    json_output: bool,
) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&plan_path).map_err(|e| CliError {
        code: EXIT_USAGE,
        message: format!("cannot read {}: {e}", plan_path.display()),
        hint: None,
    })?;
    let plan: RoutePlan = serde_json::from_str(&text).map_err(|e| CliError {
        code: EXIT_USAGE,
        message: format!("{} is not a route plan: {e}", plan_path.display()),
        hint: Some("produce one with `milla routes plan --output plan.json`".into()),
    })?;

    let store = ctx.open_store()?;
    let ids = commit_routes(&plan, &store, created_by.as_deref())?;

    #[derive(Serialize)]
    struct CommitOutput {
        despatch_ids: Vec<DespatchId>,
        invoices: usize,
    }

    if json_output {
        print_json(&CommitOutput { despatch_ids: ids.clone(), invoices: plan.assigned_invoice_count() })?;
    }
    eprintln!(
        "committed {} despatch(es) carrying {} invoice(s)",
        ids.len(),
        plan.assigned_invoice_count()
    );
    Ok(())
}
