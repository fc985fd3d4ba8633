//! One-shot commands. Each of them mounts the dashboard or the store, does one thing and exits.

use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use chrono::Duration;
use clap::Parser;
use tracing::info;

use crate::{
    calendar::WeeklyCalendar,
    dashboard::Dashboard,
    form::parse_date,
    storage::{entities::Settings, local_store::LocalStore, KeyValueStore},
    utils::clock::{Clock, DefaultClock},
};

use super::output;

#[derive(Debug, Parser)]
pub struct LogCommand {
    #[arg(long, short, help = "Name of the activity")]
    name: String,
    #[arg(long, short, help = "Duration in minutes")]
    duration: String,
    #[arg(long = "description", help = "Optional notes about the activity")]
    description: Option<String>,
    #[arg(
        long,
        help = "Day of the activity. Examples are \"2024-05-01\", \"yesterday\", \"3 days ago\". Defaults to today"
    )]
    date: Option<String>,
}

#[derive(Debug, Parser)]
pub struct WeekCommand {
    #[arg(long, help = "Any day of the week to show. Defaults to today")]
    date: Option<String>,
    #[arg(
        long,
        allow_hyphen_values = true,
        default_value_t = 0,
        help = "Weeks to move from the chosen one. -1 is the previous week"
    )]
    offset: i64,
}

#[derive(Debug, Parser)]
pub struct SettingsCommand {
    #[arg(
        long,
        conflicts_with = "disable",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Remind to log activities every N minutes"
    )]
    interval: Option<u32>,
    #[arg(long, help = "Disable reminders")]
    disable: bool,
}

pub async fn process_log_command(store: impl KeyValueStore, command: LogCommand) -> Result<()> {
    log_activity(store, Arc::new(DefaultClock), command, &mut io::stdout()).await
}

pub async fn process_week_command(store: impl KeyValueStore, command: WeekCommand) -> Result<()> {
    show_week(store, Arc::new(DefaultClock), command, &mut io::stdout()).await
}

pub async fn process_list_command(store: impl KeyValueStore) -> Result<()> {
    list_activities(store, &mut io::stdout()).await
}

pub async fn process_settings_command(
    store: impl KeyValueStore,
    command: SettingsCommand,
) -> Result<()> {
    change_settings(store, command, &mut io::stdout()).await
}

async fn log_activity(
    store: impl KeyValueStore,
    clock: Arc<dyn Clock>,
    command: LogCommand,
    out: &mut impl Write,
) -> Result<()> {
    let mut dashboard = Dashboard::mount(store, clock).await?;
    if dashboard.show_settings_saved() {
        output::settings_saved(out)?;
        dashboard.hide_settings_saved();
    }

    dashboard.open_form();
    let mut form = dashboard.form();
    form.set_name(command.name);
    form.set_duration(command.duration);
    form.set_description(command.description.unwrap_or_default());
    if let Some(date) = command.date {
        form.set_date(date);
    }

    let mut draft = None;
    if let Err(errors) = form.submit(|v| draft = Some(v)) {
        output::form_errors(out, &errors)?;
        return Err(errors.into());
    }
    let draft = draft.ok_or_else(|| anyhow!("Form submitted without an activity"))?;

    let activity = dashboard.submit_activity(draft).await?;
    output::activity_saved(out, &activity)?;
    Ok(())
}

async fn show_week(
    store: impl KeyValueStore,
    clock: Arc<dyn Clock>,
    command: WeekCommand,
    out: &mut impl Write,
) -> Result<()> {
    let today = clock.today();
    let week_of = match command.date {
        Some(v) => parse_date(&v, today).map_err(|e| anyhow!("{e}: {v}"))?,
        None => today,
    };
    let week_of = week_of
        .checked_add_signed(Duration::weeks(command.offset))
        .ok_or_else(|| anyhow!("Week offset {} is out of range", command.offset))?;

    let activities = LocalStore::new(store).load_activities().await?;
    let calendar = WeeklyCalendar::new(&activities, week_of);
    write!(out, "{}", calendar.render(today, true))?;
    Ok(())
}

async fn list_activities(store: impl KeyValueStore, out: &mut impl Write) -> Result<()> {
    let activities = LocalStore::new(store).load_activities().await?;
    if activities.is_empty() {
        writeln!(out, "No activities logged yet")?;
    }
    for activity in &activities {
        output::activity_line(out, activity)?;
    }
    Ok(())
}

async fn change_settings(
    store: impl KeyValueStore,
    command: SettingsCommand,
    out: &mut impl Write,
) -> Result<()> {
    let store = LocalStore::new(store);
    let settings = match (command.interval, command.disable) {
        (Some(interval), _) => Settings::with_interval(interval),
        (None, true) => Settings::default(),
        (None, false) => {
            output::settings(out, &store.load_settings().await?)?;
            return Ok(());
        }
    };

    store.save_settings(&settings).await?;
    info!("Saved settings {:?}", settings);
    writeln!(out, "Settings saved")?;
    output::settings(out, &settings)?;
    Ok(())
}
