//! sqltour CLI - relational data access walkthroughs
//!
//! This is the entry point for the `sqltour` command-line tool, which provides:
//! - Running the walkthrough scripts against SQLite or Postgres (`run`)
//! - Printing the declared schema as DDL without touching a store (`schema`)
//! - Shell completion scripts (`completions`)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use sqltour_core::{catalog, Dialect, StoreConfig};
use sqltour_store::scripts::{self, ScriptName};
use sqltour_store::Engine;

mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "sqltour",
    author,
    version,
    about = "Walk through relational data access: schema, engines, scopes and raw SQL",
    long_about = "Declare tables, open a pooled engine against SQLite or Postgres, run work \
                  inside transactional scopes and execute parameterized SQL, one script at a time."
)]
struct Cli {
    /// Store URL (sqlite::memory:, sqlite://file.db, postgres://...). Falls back to
    /// DATABASE_URL, then ~/.sqltour/config.toml
    #[arg(long, env = "SQLTOUR_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Log every statement and its parameters
    #[arg(long, global = true)]
    echo: bool,

    /// Debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Export traces over OTLP (telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a walkthrough script against the store
    Run(RunArgs),
    /// Print CREATE/DROP statements for the declared tables
    Schema(SchemaArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Script to run
    #[arg(value_enum)]
    script: ScriptArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptArg {
    Hello,
    Dbapi,
    MappedClasses,
    CoreInsert,
    CoreAsync,
    OrmAsync,
    All,
}

impl From<ScriptArg> for ScriptName {
    fn from(arg: ScriptArg) -> Self {
        match arg {
            ScriptArg::Hello => ScriptName::Hello,
            ScriptArg::Dbapi => ScriptName::Dbapi,
            ScriptArg::MappedClasses => ScriptName::MappedClasses,
            ScriptArg::CoreInsert => ScriptName::CoreInsert,
            ScriptArg::CoreAsync => ScriptName::CoreAsync,
            ScriptArg::OrmAsync => ScriptName::OrmAsync,
            ScriptArg::All => ScriptName::All,
        }
    }
}

#[derive(Parser, Debug)]
struct SchemaArgs {
    /// Dialect to render types for
    #[arg(long, value_enum, default_value = "sqlite")]
    dialect: DialectArg,

    /// Print DROP statements (dependents first) instead of CREATE
    #[arg(long)]
    drop: bool,

    /// Catalogs to print (comma-separated, default: all)
    #[arg(long, value_enum, value_delimiter = ',')]
    catalog: Vec<CatalogArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum DialectArg {
    Sqlite,
    Postgres,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Postgres => Dialect::Postgres,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum CatalogArg {
    UserAddress,
    ParentChild,
    SomeTable,
    T1,
}

impl CatalogArg {
    fn name(self) -> &'static str {
        match self {
            CatalogArg::UserAddress => "user-address",
            CatalogArg::ParentChild => "parent-child",
            CatalogArg::SomeTable => "some-table",
            CatalogArg::T1 => "t1",
        }
    }
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Flags every store-touching command shares
struct GlobalOpts {
    database_url: Option<String>,
    echo: bool,
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env first so clap's env fallbacks can see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let opts = GlobalOpts {
        database_url: cli.database_url,
        echo: cli.echo,
        json: cli.json,
    };

    let outcome = match cli.command {
        Commands::Run(args) => run_script(&opts, args).await,
        Commands::Schema(args) => run_schema(&opts, args),
        Commands::Completions(args) => run_completions(args),
    };

    tracing_setup::shutdown_otel();
    outcome
}

fn store_config(opts: &GlobalOpts) -> Result<StoreConfig> {
    let mut config = StoreConfig::load().context("failed to load sqltour config")?;
    if let Some(url) = &opts.database_url {
        config.database_url = url.clone();
    }
    if opts.echo {
        config.echo = true;
    }
    Ok(config)
}

async fn run_script(opts: &GlobalOpts, args: RunArgs) -> Result<()> {
    let config = store_config(opts)?;
    let script = ScriptName::from(args.script);

    let engine = Engine::connect(&config)
        .await
        .context("failed to open engine")?;
    info!(script = %script, dialect = %engine.dialect(), "starting");

    // dispose on both paths before reporting
    let outcome = scripts::run(&engine, script).await;
    engine.dispose().await;
    let reports = outcome.with_context(|| format!("script '{script}' failed"))?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("== {} ==", report.script());
            print!("{report}");
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SchemaOutput {
    catalog: &'static str,
    dialect: Dialect,
    statements: Vec<String>,
}

fn run_schema(opts: &GlobalOpts, args: SchemaArgs) -> Result<()> {
    let dialect = Dialect::from(args.dialect);
    let wanted: Vec<&str> = args.catalog.iter().map(|c| c.name()).collect();

    let mut outputs = Vec::new();
    for (name, metadata) in catalog::all() {
        if !wanted.is_empty() && !wanted.contains(&name) {
            continue;
        }
        let statements = if args.drop {
            metadata.drop_all_ddl(dialect)
        } else {
            metadata.create_all_ddl(dialect)
        }
        .with_context(|| format!("invalid catalog '{name}'"))?;
        outputs.push(SchemaOutput {
            catalog: name,
            dialect,
            statements,
        });
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        for output in &outputs {
            println!("-- {} ({})", output.catalog, output.dialect);
            for statement in &output.statements {
                println!("{statement};");
            }
            println!();
        }
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
