//! `ncez` - inspect code sets and issue identifiers without running the server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ncez_rid::{classify, JsonFileRepository, RidAllocator};
use ncez_terminology::{SearchRequest, SortKey, SourceDirs, TerminologyService};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ncez")]
#[command(about = "NCEZ simulator command line tools", version)]
struct Cli {
    #[command(flatten)]
    dirs: DirArgs,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DirArgs {
    /// Directory with code-set files
    #[arg(long, global = true, env = "NCEZ_CODESETS_DIR", default_value = "Data/CodeSets")]
    codesets_dir: PathBuf,
    /// Directory with value-set files
    #[arg(long, global = true, env = "NCEZ_VALUESETS_DIR", default_value = "Data/ValueSets")]
    valuesets_dir: PathBuf,
    /// Directory with concept-map files
    #[arg(long, global = true, env = "NCEZ_CONCEPTMAPS_DIR", default_value = "Data/ConceptMaps")]
    conceptmaps_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Terminology(TerminologyCommands),
    /// Resident identifier tools
    #[command(subcommand)]
    Rid(RidCommands),
}

#[derive(Subcommand)]
enum TerminologyCommands {
    /// List loaded code systems with their default version
    Systems,
    /// List the versions of one system
    Versions { system: String },
    /// Look up a single code
    Lookup {
        system: String,
        code: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Ranked search within a system ("all" searches every system)
    Search {
        system: String,
        query: Option<String>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 0)]
        take: usize,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        regex: Option<String>,
        /// `code` or `display`
        #[arg(long)]
        sort: Option<String>,
    },
    /// Prefix-only type-ahead
    Suggest {
        system: String,
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        version: Option<String>,
    },
    /// Validate a coding and print the outcome
    ValidateCoding {
        system: String,
        code: String,
        #[arg(long)]
        display: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },
    /// Map a code to another system through the concept maps
    Map { from: String, to: String, code: String },
}

#[derive(Subcommand)]
enum RidCommands {
    /// Classify a value as RID, DRID or unknown
    Check { value: String },
    /// Allocate identifiers into a JSON allocation store
    Allocate {
        /// Allocation store directory
        #[arg(long, default_value = "Data/runtime/RidAllocation")]
        store: PathBuf,
        /// Allocate DRIDs instead of RIDs
        #[arg(long)]
        drid: bool,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

#[derive(Serialize)]
struct Classified<'a> {
    value: &'a str,
    valid: bool,
    #[serde(rename = "type")]
    kind: &'a str,
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("serialize output")?;
    println!("{out}");
    Ok(())
}

fn load_terminology(dirs: &DirArgs) -> TerminologyService {
    let service = TerminologyService::from_dirs(SourceDirs {
        code_sets: dirs.codesets_dir.clone(),
        value_sets: dirs.valuesets_dir.clone(),
        concept_maps: dirs.conceptmaps_dir.clone(),
    });
    let report = service.load_all();
    tracing::debug!(
        systems = report.systems,
        loaded = report.units_loaded,
        skipped = report.units_skipped,
        "Code sets loaded"
    );
    service
}

async fn run_rid(command: RidCommands, pretty: bool) -> Result<()> {
    match command {
        RidCommands::Check { value } => {
            let classification = classify(&value);
            print_json(
                &Classified {
                    value: &value,
                    valid: classification.is_valid(),
                    kind: classification.as_str(),
                },
                pretty,
            )
        }
        RidCommands::Allocate { store, drid, count } => {
            let repo = JsonFileRepository::open(&store)
                .await
                .with_context(|| format!("open allocation store {}", store.display()))?;
            let allocator = RidAllocator::new(Arc::new(repo));
            let allocations = match (drid, count) {
                (false, n) if n <= 1 => vec![allocator.allocate_rid().await?],
                (true, n) if n <= 1 => vec![allocator.allocate_drid().await?],
                (false, n) => allocator.allocate_rid_batch(n).await?,
                (true, n) => allocator.allocate_drid_batch(n).await?,
            };
            print_json(&allocations, pretty)
        }
    }
}

fn run_terminology(dirs: &DirArgs, command: TerminologyCommands, pretty: bool) -> Result<()> {
    let service = load_terminology(dirs);

    match command {
        TerminologyCommands::Systems => print_json(&service.systems(), pretty),
        TerminologyCommands::Versions { system } => print_json(&service.versions(&system), pretty),
        TerminologyCommands::Lookup {
            system,
            code,
            version,
        } => match service.get(&system, &code, version.as_deref()) {
            Some(entry) => print_json(&entry, pretty),
            None => bail!("code '{code}' not found in system '{system}'"),
        },
        TerminologyCommands::Search {
            system,
            query,
            skip,
            take,
            version,
            regex,
            sort,
        } => {
            let request = SearchRequest {
                system,
                query,
                skip,
                take,
                version,
                regex,
                prefix_only: false,
                sort: sort.as_deref().and_then(SortKey::parse),
            };
            print_json(&service.search(&request)?, pretty)
        }
        TerminologyCommands::Suggest {
            system,
            query,
            limit,
            version,
        } => print_json(
            &service.suggest(&system, &query, limit, version.as_deref())?,
            pretty,
        ),
        TerminologyCommands::ValidateCoding {
            system,
            code,
            display,
            version,
        } => print_json(
            &service.validate_coding(&system, &code, display.as_deref(), version.as_deref()),
            pretty,
        ),
        TerminologyCommands::Map { from, to, code } => print_json(&service.map(&from, &to, &code), pretty),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        dirs,
        pretty,
        command,
    } = Cli::parse();

    match command {
        Commands::Rid(command) => run_rid(command, pretty).await,
        Commands::Terminology(command) => {
            tokio::task::spawn_blocking(move || run_terminology(&dirs, command, pretty))
                .await
                .context("terminology task panicked")?
        }
    }
}
