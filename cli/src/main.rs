use anyhow::Result;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod build_cmd;
mod flow_cmd;

use flow_cmd::FlowContext;
use flow_cmd::FlowSubcommand;

/// Build, store and replay step-by-step console flows.
#[derive(Debug, Parser)]
#[command(name = "procflow", version, subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Directory holding the flows and files directories.
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    root: PathBuf,

    /// Configuration file (YAML or TOML). Defaults to `<root>/procflow.toml`
    /// when that file exists.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Flow(FlowSubcommand),

    /// Generate shell completion scripts.
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
struct CompletionArgs {
    /// Shell to generate completions for.
    #[arg(value_enum, default_value_t = Shell::Bash)]
    shell: Shell,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Flow(command) => {
            let context = FlowContext::open(&cli.root, cli.config.as_deref())?;
            flow_cmd::execute(command, &context)
        }
        Command::Completion(args) => {
            let mut app = Cli::command();
            clap_complete::generate(args.shell, &mut app, "procflow", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Logs go to stderr so they never interleave with the interactive prompts.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
