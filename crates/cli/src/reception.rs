//! `milla seed|loads|count|validate|progress`: reception commands.

use std::path::PathBuf;

use serde::Serialize;

use milla_core::{ArticleId, Load, LoadId, UnitTier};
use milla_recon::{ArticleRef, CountSubmission, ReconciliationEngine, ValidationOutcome};
use milla_store::Dataset;

use crate::exit_codes::{EXIT_RECEPTION_NOVELTY, EXIT_RECEPTION_RETRY};
use crate::notify::{notifier_from_settings, LogNotifier};
use crate::{print_json, CliError, Context};

// ============================================================================
// seed
// ============================================================================

pub fn cmd_seed(ctx: &Context, dataset: PathBuf, json: bool) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&dataset)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", dataset.display())))?;
    let dataset = Dataset::from_toml(&text)?;

    let store = ctx.open_store()?;
    let summary = store.seed(&dataset)?;

    #[derive(Serialize)]
    struct SeedOutput {
        articles: usize,
        vehicles: usize,
        recipients: usize,
        loads: usize,
    }

    if json {
        print_json(&SeedOutput {
            articles: summary.articles,
            vehicles: summary.vehicles,
            recipients: summary.recipients,
            loads: summary.loads,
        })?;
    }
    eprintln!(
        "seeded {} article(s), {} vehicle(s), {} recipient(s), {} load(s) into {}",
        summary.articles,
        summary.vehicles,
        summary.recipients,
        summary.loads,
        ctx.db.display()
    );
    Ok(())
}

// ============================================================================
// loads
// ============================================================================

#[derive(Serialize)]
struct LoadSummary<'a> {
    id: LoadId,
    load_number: &'a str,
    plate: &'a str,
    order_ref: Option<&'a str>,
    plan: &'static str,
    status: &'static str,
    lines: usize,
}

impl<'a> From<&'a Load> for LoadSummary<'a> {
    fn from(load: &'a Load) -> Self {
        Self {
            id: load.id,
            load_number: &load.load_number,
            plate: &load.plate,
            order_ref: load.order_ref.as_deref(),
            plan: load.plan.as_str(),
            status: load.status.as_str(),
            lines: load.lines.len(),
        }
    }
}

pub fn cmd_loads(ctx: &Context, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let loads = store.pending_loads()?;

    if json {
        let rows: Vec<LoadSummary> = loads.iter().map(LoadSummary::from).collect();
        return print_json(&rows);
    }

    if loads.is_empty() {
        eprintln!("no loads pending reception");
        return Ok(());
    }
    println!("{:>6}  {:<12} {:<10} {:<12} {:<6} {:>5}", "ID", "CARGA", "PLACA", "PEDIDO", "PLAN", "ITEMS");
    for load in &loads {
        println!(
            "{:>6}  {:<12} {:<10} {:<12} {:<6} {:>5}",
            load.id,
            load.load_number,
            load.plate,
            load.order_ref.as_deref().unwrap_or("-"),
            load.plan.as_str(),
            load.lines.len()
        );
    }
    Ok(())
}

// ============================================================================
// count
// ============================================================================

pub struct CountArgs {
    pub load: i64,
    pub article: String,
    pub quantity: f64,
    pub unit: String,
    pub by_id: bool,
    pub operator: Option<String>,
    pub json: bool,
}

pub fn cmd_count(ctx: &Context, args: CountArgs) -> Result<(), CliError> {
    let article = if args.by_id {
        let id: i64 = args
            .article
            .trim()
            .parse()
            .map_err(|_| CliError::usage(format!("--by-id expects a numeric article id, got '{}'", args.article)))?;
        ArticleRef::Id(ArticleId(id))
    } else {
        ArticleRef::Code(args.article.clone())
    };

    let submission = CountSubmission {
        article,
        quantity: args.quantity,
        unit: UnitTier::parse_lenient(&args.unit),
        operator: args.operator,
    };

    let store = ctx.open_store()?;
    let notifier = notifier_from_settings(&ctx.settings.notify);
    let engine = ReconciliationEngine::new(&store, &store, &store, notifier.as_ref()).with_policy(ctx.policy()?);
    let receipt = engine.record_count(LoadId(args.load), &submission)?;

    if args.json {
        return print_json(&receipt);
    }
    println!(
        "{} ({}): +{} -> total {}",
        receipt.article, receipt.description, receipt.added, receipt.running_total
    );
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

#[derive(Serialize)]
struct ValidateOutput<'a> {
    load_id: LoadId,
    #[serde(flatten)]
    outcome: &'a ValidationOutcome,
}

pub fn cmd_validate(ctx: &Context, load: i64, json: bool) -> Result<(), CliError> {
    let load_id = LoadId(load);
    let store = ctx.open_store()?;
    let notifier = notifier_from_settings(&ctx.settings.notify);
    let engine = ReconciliationEngine::new(&store, &store, &store, notifier.as_ref()).with_policy(ctx.policy()?);
    let outcome = engine.validate(load_id)?;

    if json {
        print_json(&ValidateOutput { load_id, outcome: &outcome })?;
    } else {
        for d in outcome.mismatches() {
            println!("{}: {}", d.article, d.message);
        }
    }

    match outcome {
        ValidationOutcome::Accepted => {
            eprintln!("load {load_id}: reception accepted");
            Ok(())
        }
        ValidationOutcome::RetryRequested { attempt, mismatches } => Err(CliError {
            code: EXIT_RECEPTION_RETRY,
            message: format!(
                "load {load_id}: {} article(s) differ from the document (attempt {attempt})",
                mismatches.len()
            ),
            hint: Some("recount the listed articles and validate again".into()),
        }),
        ValidationOutcome::Escalated { attempt, mismatches } => Err(CliError {
            code: EXIT_RECEPTION_NOVELTY,
            message: format!(
                "load {load_id}: closed with novelty after {attempt} attempt(s), {} article(s) differ",
                mismatches.len()
            ),
            hint: None,
        }),
    }
}

// ============================================================================
// progress
// ============================================================================

pub fn cmd_progress(ctx: &Context, load: i64, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    // Read-only: nothing is ever sent, so no webhook client is built.
    let notifier = LogNotifier::new(ctx.settings.notify.sender.clone());
    let engine = ReconciliationEngine::new(&store, &store, &store, &notifier);
    let lines = engine.progress(LoadId(load))?;

    if json {
        return print_json(&lines);
    }
    if lines.is_empty() {
        eprintln!("load {load}: nothing counted yet");
    }
    for line in &lines {
        println!("{:<16} {:<32} {:>10}", line.code, line.description, line.total);
    }
    Ok(())
}
