use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Subcommand;
use procflow_workflow::Console;
use procflow_workflow::Flow;
use procflow_workflow::FlowConfig;
use procflow_workflow::FlowStore;
use procflow_workflow::PromptSignals;
use procflow_workflow::RunReport;
use procflow_workflow::Runner;
use procflow_workflow::ScriptedSignals;
use procflow_workflow::SignalSource;
use procflow_workflow::StepOutcome;
use procflow_workflow::Terminal;
use std::path::Path;
use tracing::info;

use crate::build_cmd::build_flow;

#[derive(Debug, Subcommand)]
pub enum FlowSubcommand {
    /// Interactively build a new flow and store it.
    New,
    /// List the stored flows.
    List,
    /// Print the steps of a stored flow.
    Show(FlowNameArgs),
    /// Replay a stored flow step by step.
    Run(RunArgs),
    /// Print the recorded replay statistics of a flow.
    Analytics(AnalyticsArgs),
    /// Delete a stored flow and its statistics.
    Delete(FlowNameArgs),
}

#[derive(Debug, Args)]
pub struct FlowNameArgs {
    /// Name the flow was created with.
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Skip the step at this 1-based position without asking. Repeatable.
    #[arg(long = "skip", value_name = "STEP")]
    pub skip: Vec<usize>,

    /// Run every step that is not skipped with `--skip` without asking.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct AnalyticsArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Emit machine-readable JSON output.
    #[arg(long)]
    pub json: bool,
}

pub struct FlowContext {
    store: FlowStore,
    config: FlowConfig,
}

impl FlowContext {
    pub fn open(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => FlowConfig::load(path)?,
            None => FlowConfig::discover(root)?,
        };
        let store = FlowStore::new(config.layout(root));
        Ok(Self { store, config })
    }
}

pub fn execute(command: FlowSubcommand, context: &FlowContext) -> Result<()> {
    match command {
        FlowSubcommand::New => new(context),
        FlowSubcommand::List => list(context),
        FlowSubcommand::Show(args) => show(context, &args.name),
        FlowSubcommand::Run(args) => run(context, args),
        FlowSubcommand::Analytics(args) => analytics(context, args),
        FlowSubcommand::Delete(args) => delete(context, &args.name),
    }
}

fn new(context: &FlowContext) -> Result<()> {
    let mut console = Console::stdio();
    let Some(flow) = build_flow(&mut console)? else {
        println!("No flow created.");
        return Ok(());
    };
    if context.store.exists(flow.name()) {
        info!(flow = flow.name(), "replacing stored flow");
    }
    let path = context.store.save(&flow)?;
    println!("Flow '{}' saved to {}", flow.name(), path.display());
    Ok(())
}

fn list(context: &FlowContext) -> Result<()> {
    let names = context.store.list()?;
    if names.is_empty() {
        println!("No flows stored yet.");
        return Ok(());
    }
    println!("List with name of flows:");
    for (index, name) in names.iter().enumerate() {
        println!("{}. {name}", index + 1);
    }
    Ok(())
}

fn show(context: &FlowContext, name: &str) -> Result<()> {
    match context.store.load(name)? {
        Some(flow) => {
            print!("{}", flow.outline(context.config.wrap_width));
            Ok(())
        }
        None => {
            println!("Flow '{name}' not found.");
            Ok(())
        }
    }
}

fn run(context: &FlowContext, args: RunArgs) -> Result<()> {
    let Some(mut flow) = context.store.load(&args.name)? else {
        println!("Flow '{}' not found.", args.name);
        return Ok(());
    };
    context.store.layout().ensure_dirs()?;

    let mut signals: Box<dyn SignalSource> = if args.yes || !args.skip.is_empty() {
        Box::new(ScriptedSignals::skipping(args.skip))
    } else {
        Box::new(PromptSignals)
    };
    let mut console = Console::stdio();
    println!("Executing the flow: {}", flow.name());
    let report = replay(&context.store, &mut flow, &mut console, signals.as_mut())?;
    print_report(&report);
    Ok(())
}

/// Replays `flow` and stores the analytics it recorded, also when the replay
/// aborts part way.
fn replay(
    store: &FlowStore,
    flow: &mut Flow,
    terminal: &mut dyn Terminal,
    signals: &mut dyn SignalSource,
) -> Result<RunReport> {
    let outcome = Runner::new(store.layout()).run(flow, terminal, signals);
    store.save_analytics(flow)?;
    outcome.with_context(|| format!("replay of flow {} aborted", flow.name()))
}

fn analytics(context: &FlowContext, args: AnalyticsArgs) -> Result<()> {
    let Some(flow) = context.store.load(&args.name)? else {
        println!("Flow '{}' not found.", args.name);
        return Ok(());
    };
    let report = flow.analytics().report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Flow: {}", flow.name());
        print!("{report}");
    }
    Ok(())
}

fn delete(context: &FlowContext, name: &str) -> Result<()> {
    if context.store.delete(name)? {
        println!("Flow '{name}' has been successfully deleted.");
    } else {
        println!("Flow '{name}' not found.");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("Flow: {}", report.flow_name);
    for record in &report.records {
        let outcome = match &record.outcome {
            StepOutcome::Skipped => "skipped".to_string(),
            StepOutcome::Completed => "completed".to_string(),
            StepOutcome::Failed(message) => format!("failed: {message}"),
            StepOutcome::Ignored => "not executed".to_string(),
        };
        println!("- {:<4} {:<18} {outcome}", record.position, record.tag);
    }
    print!("{}", report.analytics);
}
