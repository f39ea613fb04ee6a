use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use looker_audit::commands::{analyze, pulse, vacuum};
use looker_audit::config::AuthOptions;
use looker_audit::output::{OutputOptions, SortKey};
use looker_audit::progress::Spinner;
use looker_audit::{config, logging, output, Fetcher, LookerClient};

#[derive(Parser)]
#[command(name = "looker-audit")]
#[command(about = "Audit LookML usage on a Looker instance")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Usage statistics for projects, models or explores
    Analyze {
        #[command(subcommand)]
        target: AnalyzeTarget,
    },
    /// List unused explores, joins and fields for cleanup
    Vacuum {
        #[command(subcommand)]
        target: VacuumTarget,
    },
    /// Run instance health checks
    Pulse {
        /// Disable colored output
        #[arg(long)]
        plain: bool,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand)]
enum AnalyzeTarget {
    /// Per-project file composition, git health and settings
    Projects {
        /// Filter on a project
        #[arg(short, long)]
        project: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Per-model explore counts and query volume
    Models {
        /// Filter on a project
        #[arg(short, long, conflicts_with = "model")]
        project: Option<String>,
        /// Filter on a model
        #[arg(short, long)]
        model: Option<String>,
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Per-explore join/field composition and usage
    Explores {
        /// Filter on a model
        #[arg(short, long)]
        model: Option<String>,
        /// Filter on an explore (requires --model)
        #[arg(short, long, requires = "model")]
        explore: Option<String>,
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand)]
enum VacuumTarget {
    /// Unused explores per model
    Models {
        /// Filter on a project
        #[arg(short, long, conflicts_with = "model")]
        project: Option<String>,
        /// Filter on a model
        #[arg(short, long)]
        model: Option<String>,
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Unused joins and fields per explore
    Explores {
        /// Filter on a model
        #[arg(short, long)]
        model: Option<String>,
        /// Filter on an explore (requires --model)
        #[arg(short, long, requires = "model")]
        explore: Option<String>,
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Usage period to examine, in days (0-90)
    #[arg(long, default_value_t = 90)]
    timeframe: u32,
    /// Usage threshold; entities with fewer queries count as unused
    #[arg(long, default_value_t = 0)]
    min_queries: u64,
}

impl Default for QueryArgs {
    fn default() -> Self {
        Self {
            timeframe: 90,
            min_queries: 0,
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Sort results by a field
    #[arg(long, num_args = 2, value_names = ["FIELD", "ASC|DESC"])]
    order_by: Option<Vec<String>>,
    /// Limit results; no limit by default
    #[arg(long)]
    limit: Option<usize>,
    /// Save output to CSV, under a generated name if FILE is omitted
    #[arg(long, num_args = 0..=1, value_name = "FILE")]
    save: Option<Option<PathBuf>>,
    /// Silence table output
    #[arg(short, long)]
    quiet: bool,
    /// Disable colored output
    #[arg(long)]
    plain: bool,
}

impl OutputArgs {
    fn to_options(&self, command: &str) -> anyhow::Result<OutputOptions> {
        let sortkey = match &self.order_by {
            Some(pair) if pair.len() == 2 => Some(SortKey {
                field: pair[0].clone(),
                direction: pair[1].parse()?,
            }),
            Some(_) | None => None,
        };
        Ok(OutputOptions {
            sortkey,
            limit: self.limit,
            save: self.save.clone(),
            quiet: self.quiet,
            command: command.to_string(),
        })
    }
}

#[derive(Args)]
struct AuthArgs {
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,
    /// Credentials file (default: ./looker.toml, then the user config dir)
    #[arg(long)]
    config_file: Option<PathBuf>,
    /// Host entry name, or a literal hostname with --client-id/--client-secret
    #[arg(long)]
    host: Option<String>,
    /// API port
    #[arg(long)]
    port: Option<u16>,
    /// API3 client id (bypasses the credentials file)
    #[arg(long)]
    client_id: Option<String>,
    /// API3 client secret (bypasses the credentials file)
    #[arg(long)]
    client_secret: Option<String>,
    /// Persist the resolved credentials under this name
    #[arg(long)]
    alias: Option<String>,
}

impl AuthArgs {
    fn to_options(&self) -> AuthOptions {
        AuthOptions {
            config_file: self.config_file.clone(),
            host: self.host.clone(),
            port: self.port,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            alias: self.alias.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = logging::init_logging();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Analyze { target } => match target {
            AnalyzeTarget::Projects {
                project,
                output,
                auth,
            } => {
                let fetcher = build_fetcher(&auth, &QueryArgs::default()).await?;
                let spinner = start_spinner("Analyzing projects", &output);
                let rows = analyze::projects(&fetcher, project.as_deref()).await;
                spinner.stop();
                output::emit(rows?, &output.to_options("analyze_projects")?)?;
            }
            AnalyzeTarget::Models {
                project,
                model,
                query,
                output,
                auth,
            } => {
                let fetcher = build_fetcher(&auth, &query).await?;
                let spinner = start_spinner("Analyzing models", &output);
                let rows = analyze::models(&fetcher, project.as_deref(), model.as_deref()).await;
                spinner.stop();
                output::emit(rows?, &output.to_options("analyze_models")?)?;
            }
            AnalyzeTarget::Explores {
                model,
                explore,
                query,
                output,
                auth,
            } => {
                let fetcher = build_fetcher(&auth, &query).await?;
                let spinner = start_spinner("Analyzing explores", &output);
                let rows = analyze::explores(&fetcher, model.as_deref(), explore.as_deref()).await;
                spinner.stop();
                output::emit(rows?, &output.to_options("analyze_explores")?)?;
            }
        },
        Commands::Vacuum { target } => match target {
            VacuumTarget::Models {
                project,
                model,
                query,
                output,
                auth,
            } => {
                let fetcher = build_fetcher(&auth, &query).await?;
                let spinner = start_spinner("Vacuuming models", &output);
                let rows = vacuum::models(&fetcher, project.as_deref(), model.as_deref()).await;
                spinner.stop();
                output::emit(rows?, &output.to_options("vacuum_models")?)?;
            }
            VacuumTarget::Explores {
                model,
                explore,
                query,
                output,
                auth,
            } => {
                let fetcher = build_fetcher(&auth, &query).await?;
                let spinner = start_spinner("Vacuuming explores", &output);
                let rows = vacuum::explores(&fetcher, model.as_deref(), explore.as_deref()).await;
                spinner.stop();
                output::emit(rows?, &output.to_options("vacuum_explores")?)?;
            }
        },
        Commands::Pulse { plain, auth } => {
            if plain {
                colored::control::set_override(false);
            }
            let fetcher = build_fetcher(&auth, &QueryArgs::default()).await?;
            pulse::run(&fetcher).await?;
        }
    }
    Ok(())
}

async fn build_fetcher(auth: &AuthArgs, query: &QueryArgs) -> anyhow::Result<Fetcher<LookerClient>> {
    let entry = config::resolve(&auth.to_options())?;
    let client = LookerClient::connect(
        &entry.host,
        entry.port,
        &entry.client_id,
        &entry.client_secret,
        auth.timeout,
    )
    .await?;
    Ok(Fetcher::new(client, query.timeframe, query.min_queries))
}

fn start_spinner(message: &str, output: &OutputArgs) -> Spinner {
    if output.plain {
        colored::control::set_override(false);
    }
    Spinner::start(message, !(output.quiet || output.plain))
}
