use std::{
    io::{self, BufRead, Write},
    sync::Arc,
    thread,
};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    calendar::WeeklyCalendar,
    dashboard::{
        runner::{DashboardCommand, DashboardRunner, DashboardUpdate},
        Dashboard,
    },
    form::{parse_date, ActivityForm, FormField},
    notification::TerminalNotifier,
    storage::{entities::Activity, FileStore},
    utils::clock::{Clock, DefaultClock},
};

use super::{install::DesktopEntryPrompt, output, shutdown::detect_shutdown};

const HELP: &str = "Commands:
  add [DATE]   log an activity, optionally on DATE
  week [DATE]  show the week containing DATE, this week by default
  next, prev   show the following or the previous week
  install      add day2day to your applications
  close        close the activity form
  quit         stop day2day";

/// Runs the interactive dashboard until the user quits or presses Ctrl-C.
pub async fn process_watch_command(
    store: FileStore,
    install_prompt: Option<DesktopEntryPrompt>,
) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let dashboard = Dashboard::mount(store, clock.clone()).await?;

    let (command_sender, command_receiver) = mpsc::channel(10);
    let (update_sender, update_receiver) = mpsc::channel(10);
    let shutdown = CancellationToken::new();

    if let Some(prompt) = install_prompt {
        command_sender
            .send(DashboardCommand::InstallPromptAvailable(Box::new(prompt)))
            .await?;
    }

    let runner = DashboardRunner::new(
        dashboard,
        Box::new(TerminalNotifier),
        command_receiver,
        update_sender,
        shutdown.clone(),
    );
    let session = TerminalSession::new(
        command_sender,
        update_receiver,
        shutdown.clone(),
        clock,
        std::io::stdout(),
    );
    let lines = spawn_line_reader(io::BufReader::new(io::stdin()));

    let (_, runner_result, session_result) = tokio::join!(
        detect_shutdown(shutdown.clone()),
        runner.run(),
        session.run(lines),
    );

    if let Err(e) = &runner_result {
        error!("Dashboard got an error {e:?}");
    }
    if let Err(e) = &session_result {
        error!("Terminal session got an error {e:?}");
    }
    runner_result?;
    session_result?;
    Ok(())
}

/// Reads lines on a dedicated thread. A read that is still waiting for input when the session
/// stops doesn't hold up the runtime, the thread simply goes away with the process.
fn spawn_line_reader(
    reader: impl BufRead + Send + 'static,
) -> ReceiverStream<io::Result<String>> {
    let (sender, receiver) = mpsc::channel(10);
    thread::spawn(move || {
        for line in reader.lines() {
            if sender.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("Input reader stopped");
    });
    ReceiverStream::new(receiver)
}

/// The form while it is being filled, one field per line.
struct FormSession {
    form: ActivityForm,
    field: FormField,
}

enum Wake {
    Shutdown,
    Update(DashboardUpdate),
    Line(String),
}

/// Terminal side of the dashboard. Turns typed lines into [DashboardCommand]s and shows
/// [DashboardUpdate]s.
pub struct TerminalSession<W> {
    commands: mpsc::Sender<DashboardCommand>,
    updates: mpsc::Receiver<DashboardUpdate>,
    shutdown: CancellationToken,
    clock: Arc<dyn Clock>,
    out: W,
    activities: Vec<Activity>,
    shown_week: NaiveDate,
    form: Option<FormSession>,
}

impl<W: Write> TerminalSession<W> {
    pub fn new(
        commands: mpsc::Sender<DashboardCommand>,
        updates: mpsc::Receiver<DashboardUpdate>,
        shutdown: CancellationToken,
        clock: Arc<dyn Clock>,
        out: W,
    ) -> Self {
        let shown_week = clock.today();
        Self {
            commands,
            updates,
            shutdown,
            clock,
            out,
            activities: vec![],
            shown_week,
            form: None,
        }
    }

    /// Processes lines and updates until quit, shutdown or until either side goes away. Returns
    /// the output so that it can be inspected.
    pub async fn run(
        mut self,
        mut lines: impl Stream<Item = std::io::Result<String>> + Unpin,
    ) -> Result<W> {
        writeln!(self.out, "Day2Day. Type 'help' for commands.")?;
        loop {
            let wake = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Wake::Shutdown,
                update = self.updates.recv() => match update {
                    Some(update) => Wake::Update(update),
                    None => Wake::Shutdown,
                },
                line = lines.next() => match line {
                    Some(line) => Wake::Line(line.context("Failed to read input")?),
                    None => Wake::Shutdown,
                },
            };

            let keep_going = match wake {
                Wake::Shutdown => false,
                Wake::Update(update) => {
                    self.show(update)?;
                    true
                }
                Wake::Line(line) => self.handle_line(&line).await?,
            };
            if !keep_going {
                break;
            }
        }
        self.shutdown.cancel();
        info!("Terminal session stopped");
        Ok(self.out)
    }

    fn show(&mut self, update: DashboardUpdate) -> Result<()> {
        debug!("Showing {:?}", update);
        match update {
            DashboardUpdate::Activities(activities) => self.activities = activities,
            DashboardUpdate::SettingsSavedBanner(true) => output::settings_saved(&mut self.out)?,
            DashboardUpdate::SettingsSavedBanner(false) => {}
            DashboardUpdate::FormOpened { date } => {
                // A reminder must not throw away a form that is being filled.
                if self.form.is_none() {
                    let form = ActivityForm::new(date, self.clock.today());
                    writeln!(self.out, "Log your activity. Type 'close' to cancel.")?;
                    self.form = Some(FormSession {
                        form,
                        field: FormField::Name,
                    });
                    self.prompt()?;
                }
            }
            DashboardUpdate::FormClosed => self.form = None,
            DashboardUpdate::ActivitySaved(activity) => {
                output::activity_saved(&mut self.out, &activity)?
            }
            DashboardUpdate::InstallAvailable => writeln!(
                self.out,
                "Type 'install' to add day2day to your applications."
            )?,
            DashboardUpdate::InstallFinished(outcome) => {
                output::install_finished(&mut self.out, outcome)?
            }
            DashboardUpdate::Failed(message) => output::failure(&mut self.out, &message)?,
        }
        Ok(())
    }

    /// Returns false when the session should stop.
    async fn handle_line(&mut self, raw: &str) -> Result<bool> {
        let line = raw.trim();
        if line == "quit" || line == "exit" {
            return Ok(false);
        }
        if self.form.is_some() {
            // Form fields get the line as typed.
            self.fill_form(raw).await?;
            return Ok(true);
        }

        let (command, argument) = match line.split_once(' ') {
            Some((command, argument)) => (command, Some(argument.trim())),
            None => (line, None),
        };
        match (command, argument) {
            ("", _) => {}
            ("help", _) => writeln!(self.out, "{HELP}")?,
            ("add", None) => self.send(DashboardCommand::OpenForm).await?,
            ("add", Some(date)) => match parse_date(date, self.clock.today()) {
                Ok(date) => self.send(DashboardCommand::AddActivityOn(date)).await?,
                Err(message) => output::failure(&mut self.out, message)?,
            },
            ("week", None) => self.show_week(self.clock.today())?,
            ("week", Some(date)) => match parse_date(date, self.clock.today()) {
                Ok(date) => self.show_week(date)?,
                Err(message) => output::failure(&mut self.out, message)?,
            },
            ("next", _) => self.show_week(self.shown_week + Duration::weeks(1))?,
            ("prev", _) => self.show_week(self.shown_week - Duration::weeks(1))?,
            ("install", _) => self.send(DashboardCommand::Install).await?,
            ("close", _) => writeln!(self.out, "The activity form isn't open")?,
            _ => writeln!(self.out, "Unknown command {line:?}. Type 'help' for commands.")?,
        }
        Ok(true)
    }

    async fn fill_form(&mut self, line: &str) -> Result<()> {
        if line.trim() == "close" {
            self.form = None;
            return self.send(DashboardCommand::CloseForm).await;
        }
        let Some(session) = self.form.as_mut() else {
            return Ok(());
        };
        match session.field {
            FormField::Name => session.form.set_name(line),
            FormField::Duration => session.form.set_duration(line),
            FormField::Description => session.form.set_description(line),
            // An empty line keeps the date that is already there.
            FormField::Date if line.trim().is_empty() => {}
            FormField::Date => session.form.set_date(line),
        }

        let next = match session.field {
            FormField::Name => Some(FormField::Duration),
            FormField::Duration => Some(FormField::Description),
            FormField::Description => Some(FormField::Date),
            FormField::Date => None,
        };
        match next {
            Some(field) => {
                session.field = field;
                self.prompt()
            }
            None => self.submit_form().await,
        }
    }

    async fn submit_form(&mut self) -> Result<()> {
        let Some(session) = self.form.as_mut() else {
            return Ok(());
        };
        let mut submitted = None;
        match session.form.submit(|draft| submitted = Some(draft)) {
            Ok(()) => {
                self.form = None;
                if let Some(draft) = submitted {
                    self.send(DashboardCommand::SubmitActivity(draft)).await?;
                }
                Ok(())
            }
            Err(errors) => {
                output::form_errors(&mut self.out, &errors)?;
                // Start over from the first field that needs fixing.
                if let Some(first) = errors.0.first() {
                    session.field = first.field;
                }
                self.prompt()?;
                Ok(())
            }
        }
    }

    fn prompt(&mut self) -> Result<()> {
        if let Some(session) = &self.form {
            output::form_prompt(&mut self.out, session.field, session.form.date())?;
        }
        Ok(())
    }

    fn show_week(&mut self, week_of: NaiveDate) -> Result<()> {
        let calendar = WeeklyCalendar::new(&self.activities, week_of);
        self.shown_week = calendar.start();
        write!(self.out, "{}", calendar.render(self.clock.today(), true))?;
        Ok(())
    }

    async fn send(&mut self, command: DashboardCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .context("Dashboard is not running")
    }
}
