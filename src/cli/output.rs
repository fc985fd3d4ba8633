//! Text shown to the user. Everything goes through a [Write] so that the interactive session can be
//! tested.

use std::io::{self, Write};

use ansi_term::Colour;

use crate::{
    dashboard::install::InstallOutcome,
    form::{FormErrors, FormField},
    storage::entities::{Activity, Settings},
    utils::time::{format_minutes, iso_date},
};

pub fn settings_saved(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", Colour::Green.paint("Settings saved successfully!"))
}

/// Prints every error next to the name of its field.
pub fn form_errors(out: &mut impl Write, errors: &FormErrors) -> io::Result<()> {
    for error in &errors.0 {
        writeln!(
            out,
            "  {}: {}",
            error.field,
            Colour::Red.paint(error.message)
        )?;
    }
    Ok(())
}

pub fn form_prompt(out: &mut impl Write, field: FormField, default_date: &str) -> io::Result<()> {
    match field {
        FormField::Name => write!(out, "Activity name: ")?,
        FormField::Duration => write!(out, "Duration (minutes): ")?,
        FormField::Description => write!(out, "Description: ")?,
        FormField::Date => write!(out, "Date [{default_date}]: ")?,
    }
    out.flush()
}

pub fn activity_saved(out: &mut impl Write, activity: &Activity) -> io::Result<()> {
    writeln!(
        out,
        "Logged {} ({}) on {}",
        activity.name,
        format_minutes(activity.duration),
        iso_date(activity.date)
    )
}

pub fn activity_line(out: &mut impl Write, activity: &Activity) -> io::Result<()> {
    write!(
        out,
        "{}\t{}\t{}",
        iso_date(activity.date),
        format_minutes(activity.duration),
        activity.name
    )?;
    if !activity.description.is_empty() {
        write!(out, "\t{}", activity.description)?;
    }
    writeln!(out)
}

pub fn settings(out: &mut impl Write, settings: &Settings) -> io::Result<()> {
    match settings.reminder_interval() {
        Some(interval) => writeln!(out, "Reminder every {interval} minutes"),
        None => writeln!(out, "Reminders are disabled"),
    }
}

pub fn install_finished(out: &mut impl Write, outcome: Option<InstallOutcome>) -> io::Result<()> {
    match outcome {
        Some(InstallOutcome::Accepted) => writeln!(out, "Installed day2day desktop entry"),
        Some(InstallOutcome::Dismissed) => writeln!(out, "Install dismissed"),
        None => writeln!(out, "Install is not available"),
    }
}

pub fn failure(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", Colour::Red.paint(message))
}
