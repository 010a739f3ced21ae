// Flowsmith: n8n workflow generation driven by an LLM
// License: Apache-2.0

use clap::{Args, Parser, Subcommand};
use flowsmith::config::GenerationConfig;
use flowsmith::import_check::ImportChecker;
use flowsmith::pipeline::{self, GenerateError, SpecSource};
use flowsmith::provider::factory::create_provider;
use flowsmith::workflow::validate::validate_file_contents;
use std::path::{Path, PathBuf};

const LOGO: &str = "🧩";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "flowsmith",
    about = "Flowsmith: generate importable n8n workflow JSON from a plain-text spec",
    version,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a workflow from a spec (the default command)
    Generate(GenerateArgs),
    /// Check an existing workflow JSON file against the import contract
    Validate {
        /// Workflow file to check
        #[arg(default_value = "workflow.json")]
        file: PathBuf,
        /// Also run `n8n import:workflow` on the file
        #[arg(long)]
        import_check: bool,
    },
    /// Show the resolved provider configuration
    Status,
    /// Show version information
    Version,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Spec file to read [default: workflow_spec.txt]
    #[arg(short, long)]
    spec: Option<PathBuf>,
    /// Inline spec text, used when --spec is not given
    #[arg(long, env = "WORKFLOW_SPEC", hide_env_values = true)]
    spec_text: Option<String>,
    /// Where to write the workflow JSON
    #[arg(short, long, env = "OUT_PATH", default_value = "workflow.json")]
    output: PathBuf,
    /// Also run `n8n import:workflow` on the written file
    #[arg(long)]
    import_check: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    flowsmith::logger::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Generate(args)) => generate_cmd(args).await,
        Some(Commands::Validate { file, import_check }) => {
            validate_cmd(&file, import_check).await;
        }
        Some(Commands::Status) => status_cmd(),
        Some(Commands::Version) => version_cmd(),
        None => generate_cmd(cli.generate).await,
    }
}

// ---------------------------------------------------------------------------
// Generate command
// ---------------------------------------------------------------------------

async fn generate_cmd(args: GenerateArgs) {
    let cfg = GenerationConfig::from_env().unwrap_or_else(|e| fail(&GenerateError::from(e)));

    let source = SpecSource::resolve(args.spec, args.spec_text);
    let spec = source.read().await.unwrap_or_else(|e| fail(&e));
    tracing::debug!(source = %source, "Spec loaded");

    let provider = create_provider(&cfg).unwrap_or_else(|e| fail(&GenerateError::from(e)));

    let document = pipeline::generate(provider.as_ref(), &cfg.target_platform_version, &spec)
        .await
        .unwrap_or_else(|e| fail(&e));

    if let Err(source) = document.write_to(&args.output).await {
        fail(&GenerateError::Io {
            path: args.output.clone(),
            source,
        });
    }

    if args.import_check {
        import_check(&args.output).await;
    }

    println!(
        "OK: wrote {} ({} nodes, workflow \"{}\")",
        args.output.display(),
        document.node_count(),
        document.display_name()
    );
}

// ---------------------------------------------------------------------------
// Validate command
// ---------------------------------------------------------------------------

async fn validate_cmd(file: &Path, run_import_check: bool) {
    let raw = match tokio::fs::read_to_string(file).await {
        Ok(raw) => raw,
        Err(source) => fail(&GenerateError::Io {
            path: file.to_path_buf(),
            source,
        }),
    };

    let document = validate_file_contents(&raw).unwrap_or_else(|e| fail(&GenerateError::from(e)));
    tracing::debug!(nodes = document.node_count(), "Workflow file passed shape checks");

    if run_import_check {
        import_check(file).await;
    }

    println!("OK: {} basic validation passed", file.display());
}

// ---------------------------------------------------------------------------
// Other commands
// ---------------------------------------------------------------------------

fn version_cmd() {
    println!("{} Flowsmith v{}", LOGO, flowsmith::VERSION);
    println!("  n8n workflow generator");
}

fn status_cmd() {
    println!("{} Flowsmith Status\n", LOGO);

    match GenerationConfig::from_env() {
        Ok(cfg) => {
            println!("  Provider:  ✅ {} (key {})", cfg.provider, cfg.api_key.masked());
            println!("  Model:     {}", cfg.model);
            println!("  Protocol:  {}", cfg.protocol());
            println!("  Endpoint:  {}", cfg.endpoint_base());
            println!("  n8n:       {}", cfg.target_platform_version);
            println!(
                "  Sampling:  temperature {}, max {} tokens, JSON mode {}",
                cfg.temperature,
                cfg.max_output_tokens,
                if cfg.json_mode { "on" } else { "off" }
            );
        }
        Err(e) => println!("  Provider:  ❌ {}", e),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn import_check(path: &Path) {
    match ImportChecker::n8n().check(path).await {
        Ok(report) if report.success => {
            tracing::info!(path = %path.display(), "n8n import check passed");
        }
        Ok(report) => {
            eprintln!("{} n8n import failed for {}:", LOGO, path.display());
            eprintln!("{}", report.output);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} Error: n8n import check could not run: {:#}", LOGO, e);
            std::process::exit(1);
        }
    }
}

/// Print a single-line diagnostic and exit. Configuration problems exit with
/// status 2, everything else with 1.
fn fail(err: &GenerateError) -> ! {
    eprintln!("{} Error: {}", LOGO, err);
    let code = match err {
        GenerateError::Config(_) => 2,
        _ => 1,
    };
    std::process::exit(code);
}
