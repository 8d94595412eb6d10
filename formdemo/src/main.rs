use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use formdemo::{app, settings::FormSettings, store::FileStore};

const DEFAULT_STORE: &str = "formdemo-store.json";

/// A terminal form whose values sync across sessions.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Store file shared between sessions.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Form configuration (.toml or .json). Defaults to the demo form.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log file. Defaults to the store path with a `.log` extension.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<SubCommands>,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Open the form (default).
    Run,
    /// Print the stored values.
    Dump,
    /// Remove the stored values.
    Reset,
    /// Print the JSON schema of the form configuration file.
    Schema,
}

fn init_logging(path: Option<&Path>) -> anyhow::Result<()> {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);

    // the form owns the terminal, so its logs go to a file
    if let Some(path) = path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<FormSettings> {
    match path {
        Some(path) => FormSettings::load(path),
        None => Ok(FormSettings::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store_path = cli.store.unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));
    let command = cli.command.unwrap_or(SubCommands::Run);

    match command {
        SubCommands::Run => {
            let log_file = cli
                .log_file
                .unwrap_or_else(|| store_path.with_extension("log"));
            init_logging(Some(&log_file))?;

            let settings = load_settings(cli.config.as_deref())?;
            app::App::new(&settings, &store_path)?.run().await?;
        }
        SubCommands::Dump => {
            init_logging(cli.log_file.as_deref())?;
            let store = FileStore::open(&store_path)?;
            println!("{}", app::dump(&store)?);
        }
        SubCommands::Reset => {
            init_logging(cli.log_file.as_deref())?;
            let store = FileStore::open(&store_path)?;
            app::reset(&store)?;
            println!("Removed stored values from {}", store_path.display());
        }
        SubCommands::Schema => {
            println!("{}", FormSettings::schema()?);
        }
    }

    Ok(())
}
