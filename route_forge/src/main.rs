//! # Forge CLI - the command-line front end of `route_forge`.
//!
//! Compiles module definitions into route tables, checks existing modules
//! for drift, and serves compiled modules with stub handlers. It can be run
//! directly or through a `cargo forge` alias in a project that keeps its
//! definitions under `definitions/`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use route_forge::config::ForgeConfig;
use route_forge::extract::load_observed;
use route_forge::openapi_utils::build_openapi;
use route_forge::{batch, check, emit, Compiler, HandlerMap, ModuleDefinition, RestRouterBuilder, RouteTable};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

/// The main CLI entry point for `forge-cli` / `cargo forge`.
#[derive(Parser, Debug)]
#[command(author, version, about = "Compile, check and serve tool modules described by route_forge definitions.")]
struct Cli {
    /// Project root holding `forge.toml` or a `Cargo.toml` with
    /// `[package.metadata.route_forge]`.
    #[arg(long, global = true, env = "ROUTE_FORGE_ROOT")]
    root: Option<PathBuf>,

    /// Prefix for modules that do not declare a mount.
    #[arg(long, global = true, env = "ROUTE_FORGE_API_PREFIX")]
    api_prefix: Option<String>,

    /// trace, debug, info, warn or error.
    #[arg(long, global = true, env = "ROUTE_FORGE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Defines the available subcommands for `cargo forge`.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compiles definitions and prints their route tables.
    Compile {
        #[arg(required = true)]
        definitions: Vec<PathBuf>,
        /// Print the tables as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compiles every definition below the definitions directory and writes
    /// one `<moduleId>.routes.json` per module.
    CompileAll {
        #[arg(long, env = "ROUTE_FORGE_DEFINITIONS_DIR")]
        dir: Option<PathBuf>,
        #[arg(long, env = "ROUTE_FORGE_OUTPUT_DIR")]
        out: Option<PathBuf>,
        #[arg(long, env = "ROUTE_FORGE_WORKERS")]
        workers: Option<usize>,
    },

    /// Diffs an existing module against its definition. Exits non-zero when
    /// the module drifts.
    Check {
        definition: PathBuf,
        /// JSON array of route descriptors, or an Express router (`.ts`/`.js`).
        #[arg(long)]
        observed: PathBuf,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Binds a module to stub handlers and prints the emitted manifest.
    Emit { definition: PathBuf },

    /// Prints an OpenAPI document covering the given modules.
    Openapi {
        #[arg(required = true)]
        definitions: Vec<PathBuf>,
        #[arg(long, default_value = "route_forge modules")]
        title: String,
        #[arg(long, default_value = "0.1.0")]
        api_version: String,
    },

    /// Serves the given modules with stub handlers.
    Serve {
        #[arg(required = true)]
        definitions: Vec<PathBuf>,
        #[arg(long, env = "ROUTE_FORGE_ADDR", default_value = "127.0.0.1:3000")]
        addr: String,
    },

    /// Writes a new definition from the standard module template.
    New {
        module_id: String,
        #[arg(long, default_value = "items")]
        primary: String,
        #[arg(long, default_value = "rules")]
        secondary_a: String,
        #[arg(long, default_value = "logs")]
        secondary_b: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // When invoked as `cargo forge`, Cargo passes "forge" as the first argument.
    // We manually remove it so that `clap` can parse the subcommands correctly.
    let mut args: Vec<String> = env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("forge") {
        args.remove(1);
    }

    let cli = Cli::parse_from(args);

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let mut config = ForgeConfig::load(&root)
        .with_context(|| format!("Failed to load configuration from {}", root.display()))?
        .resolve_paths(&root);
    if let Some(prefix) = cli.api_prefix {
        config.api_prefix = prefix;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_logging(&config.log_level);

    match cli.command {
        Commands::Compile { definitions, json } => compile(&config, &definitions, json)?,
        Commands::CompileAll { dir, out, workers } => {
            if let Some(dir) = dir {
                config.definitions_dir = dir;
            }
            if let Some(out) = out {
                config.output_dir = out;
            }
            if workers.is_some() {
                config.workers = workers;
            }
            compile_all(&config).await?
        }
        Commands::Check { definition, observed, json } => check_module(&config, &definition, &observed, json)?,
        Commands::Emit { definition } => emit_module(&config, &definition)?,
        Commands::Openapi { definitions, title, api_version } => openapi(&config, &definitions, &title, &api_version)?,
        Commands::Serve { definitions, addr } => serve(&config, &definitions, &addr).await?,
        Commands::New { module_id, primary, secondary_a, secondary_b } => {
            new_definition(&config, &module_id, &primary, &secondary_a, &secondary_b)?
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handler for the `compile` command.
fn compile(config: &ForgeConfig, definitions: &[PathBuf], json: bool) -> Result<()> {
    let tables = compile_files(&config.compiler(), definitions)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else {
        for table in &tables {
            print!("{table}");
        }
    }
    Ok(())
}

/// Handler for the `compile-all` command.
async fn compile_all(config: &ForgeConfig) -> Result<()> {
    println!("▶️  Compiling definitions in {}...", config.definitions_dir.display());
    let paths = discover_definitions(&config.definitions_dir)?;
    if paths.is_empty() {
        bail!("No definitions found in {}", config.definitions_dir.display());
    }

    let mut failures = 0;
    let mut defs = Vec::with_capacity(paths.len());
    for path in &paths {
        match ModuleDefinition::from_path(path) {
            Ok(def) => defs.push(def),
            Err(e) => {
                failures += 1;
                eprintln!("❌ {}: {e}", path.display());
            }
        }
    }

    let results = batch::compile_all_with(config.compiler(), defs, Some(config.worker_count())).await;
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let mut written = 0;
    for result in results {
        match result {
            Ok(table) => {
                let target = config.output_dir.join(format!("{}.routes.json", table.module_id));
                fs::write(&target, serde_json::to_string_pretty(&table)?)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                written += 1;
            }
            Err(e) => {
                failures += 1;
                eprintln!("❌ {e}");
            }
        }
    }

    println!("✅ Wrote {written} route table(s) to {}", config.output_dir.display());
    if failures > 0 {
        bail!("{failures} definition(s) failed to compile");
    }
    Ok(())
}

/// Handler for the `check` command.
fn check_module(config: &ForgeConfig, definition: &Path, observed: &Path, json: bool) -> Result<()> {
    let def = load_definition(definition)?;
    let table = config.compiler().compile(&def)?;
    let observed_routes = load_observed(observed, &def)
        .with_context(|| format!("Failed to load observed routes from {}", observed.display()))?;
    let report = check(&table, &observed_routes);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    if !report.is_clean() {
        bail!("`{}` drifts from its canonical routes", report.module_id);
    }
    println!("✅ {} conforms.", report.module_id);
    Ok(())
}

/// Handler for the `emit` command.
fn emit_module(config: &ForgeConfig, definition: &Path) -> Result<()> {
    let def = load_definition(definition)?;
    let table = config.compiler().compile(&def)?;
    let module = emit(&table, &HandlerMap::stubs_for(&table))?;
    println!("{}", serde_json::to_string_pretty(&module.manifest())?);
    Ok(())
}

/// Handler for the `openapi` command.
fn openapi(config: &ForgeConfig, definitions: &[PathBuf], title: &str, version: &str) -> Result<()> {
    let tables = compile_files(&config.compiler(), definitions)?;
    let doc = build_openapi(&tables, title, version);
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// Handler for the `serve` command.
async fn serve(config: &ForgeConfig, definitions: &[PathBuf], addr: &str) -> Result<()> {
    let tables = compile_files(&config.compiler(), definitions)?;
    let doc = build_openapi(&tables, "route_forge modules", env!("CARGO_PKG_VERSION"));

    let mut builder = RestRouterBuilder::new().openapi(doc);
    for table in &tables {
        builder = builder.module(emit(table, &HandlerMap::stubs_for(table))?);
    }
    let router = builder.build()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, modules = tables.len(), "serving stub modules");
    println!("▶️  Serving {} module(s) on http://{addr}", tables.len());
    axum::serve(listener, router).await.context("Server error")?;
    Ok(())
}

/// Handler for the `new` command.
fn new_definition(
    config: &ForgeConfig,
    module_id: &str,
    primary: &str,
    secondary_a: &str,
    secondary_b: &str,
) -> Result<()> {
    let def = ModuleDefinition::series_template(module_id, primary, secondary_a, secondary_b);
    // Fail early on names that would not compile.
    let table = config.compiler().compile(&def)?;

    let target = config.definitions_dir.join(format!("{}.toml", table.module_id));
    if target.exists() {
        bail!("{} already exists", target.display());
    }
    fs::create_dir_all(&config.definitions_dir)
        .with_context(|| format!("Failed to create {}", config.definitions_dir.display()))?;
    fs::write(&target, def.to_toml_string()?).with_context(|| format!("Failed to write {}", target.display()))?;

    println!("✅ Created {} ({} routes)", target.display(), table.len());
    Ok(())
}

// --- Helper Functions ---

fn load_definition(path: &Path) -> Result<ModuleDefinition> {
    ModuleDefinition::from_path(path).with_context(|| format!("Failed to load definition {}", path.display()))
}

fn compile_files(compiler: &Compiler, paths: &[PathBuf]) -> Result<Vec<RouteTable>> {
    paths
        .iter()
        .map(|path| {
            let def = load_definition(path)?;
            compiler
                .compile(&def)
                .with_context(|| format!("Failed to compile {}", path.display()))
        })
        .collect()
}

/// Every `*.toml` / `*.json` file below `dir`, in file-name order.
fn discover_definitions(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        let is_definition = entry.file_type().is_file()
            && matches!(
                entry.path().extension().and_then(|ext| ext.to_str()),
                Some("toml") | Some("json")
            );
        if is_definition {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}
