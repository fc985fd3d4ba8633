pub mod commands;
pub mod install;
pub mod output;
pub mod shutdown;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    process_list_command, process_log_command, process_settings_command, process_week_command,
    LogCommand, SettingsCommand, WeekCommand,
};
use install::DesktopEntryPrompt;
use tracing::{info, level_filters::LevelFilter, warn};
use watch::process_watch_command;

use crate::{
    storage::FileStore,
    utils::{
        dir::{create_application_default_path, create_dir, store_path, user_data_path},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Day2Day", version, long_about = None)]
#[command(about = "Log your daily activities and get reminded to do it", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging to the console")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME/day2day or $HOME/.local/state/day2day"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Log an activity")]
    Log {
        #[command(flatten)]
        command: LogCommand,
    },
    #[command(about = "Show activities of a week")]
    Week {
        #[command(flatten)]
        command: WeekCommand,
    },
    #[command(about = "List every logged activity")]
    List {},
    #[command(about = "Show or change reminder settings")]
    Settings {
        #[command(flatten)]
        command: SettingsCommand,
    },
    #[command(about = "Open the dashboard. Reminds you to log activities while it runs")]
    Watch {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, create_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let store = FileStore::new(store_path(&app_dir))?;
    info!("Using store at {:?}", store.dir());

    match args.commands {
        Commands::Log { command } => process_log_command(store, command).await,
        Commands::Week { command } => process_week_command(store, command).await,
        Commands::List {} => process_list_command(store).await,
        Commands::Settings { command } => process_settings_command(store, command).await,
        Commands::Watch {} => {
            let install_prompt = match install_prompt() {
                Ok(v) => v,
                Err(e) => {
                    warn!("Install prompt is not available {e:?}");
                    None
                }
            };
            process_watch_command(store, install_prompt).await
        }
    }
}

fn install_prompt() -> Result<Option<DesktopEntryPrompt>> {
    let data_dir = user_data_path()?;
    let executable = std::env::current_exe()?;
    Ok(DesktopEntryPrompt::detect(&data_dir, executable))
}
