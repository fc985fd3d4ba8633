use std::{cmp::max, fmt::Debug, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    notification::{next_notification, Notification, Notifier},
    storage::{
        entities::{Activity, ActivityDraft, Settings},
        KeyValueStore,
    },
    utils::clock::{sleep_until_opt, Clock},
};

use super::{
    install::{InstallOutcome, InstallPromptHandle},
    Dashboard,
};

/// How often reminders are recomputed. Keeps the schedule in line with settings changes and clock
/// drift.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How long the settings saved banner stays visible.
pub const SETTINGS_SAVED_BANNER: Duration = Duration::from_secs(3);

/// Requests coming from the user interface.
pub enum DashboardCommand {
    /// Open the form for a date picked in the calendar.
    AddActivityOn(NaiveDate),
    OpenForm,
    CloseForm,
    SubmitActivity(ActivityDraft),
    /// The platform offers to install the application.
    InstallPromptAvailable(Box<dyn InstallPromptHandle>),
    Install,
}

impl Debug for DashboardCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DashboardCommand::AddActivityOn(date) => write!(f, "AddActivityOn({date})"),
            DashboardCommand::OpenForm => write!(f, "OpenForm"),
            DashboardCommand::CloseForm => write!(f, "CloseForm"),
            DashboardCommand::SubmitActivity(draft) => write!(f, "SubmitActivity({draft:?})"),
            DashboardCommand::InstallPromptAvailable(_) => write!(f, "InstallPromptAvailable"),
            DashboardCommand::Install => write!(f, "Install"),
        }
    }
}

/// Changes the user interface has to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardUpdate {
    Activities(Vec<Activity>),
    SettingsSavedBanner(bool),
    FormOpened { date: Option<NaiveDate> },
    FormClosed,
    ActivitySaved(Activity),
    InstallAvailable,
    InstallFinished(Option<InstallOutcome>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingReminder {
    at: DateTime<Utc>,
    instant: Instant,
}

/// Holds at most one pending reminder. Recomputing replaces the pending reminder instead of adding
/// another one, so a reminder fires once per due time no matter how often it is recomputed.
#[derive(Debug, Default)]
pub struct ReminderTimer {
    pending: Option<PendingReminder>,
    /// Due time of the last reminder that fired. Nothing at or before it is armed again, even when
    /// the wall clock moved back behind it.
    last_fired: Option<DateTime<Utc>>,
}

impl ReminderTimer {
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.pending.map(|v| v.at)
    }

    fn instant(&self) -> Option<Instant> {
        self.pending.map(|v| v.instant)
    }

    /// Recomputes the due time from `settings` and the timer deadline from the current wall clock.
    /// Disarms the timer when reminders are disabled.
    pub fn refresh(&mut self, settings: &Settings, clock: &dyn Clock) {
        let now = clock.time();
        let after = self.last_fired.map_or(now, |fired| max(fired, now));
        let next = next_notification(settings, after.with_timezone(&Local))
            .map(|v| v.with_timezone(&Utc));
        match next {
            Some(next) => {
                if self.due_at() != Some(next) {
                    debug!("Next reminder at {next}");
                }
                self.pending = Some(PendingReminder {
                    at: next,
                    instant: clock.instant_at(next),
                });
            }
            None => {
                if self.pending.take().is_some() {
                    info!("Reminders disabled");
                }
            }
        }
    }

    /// Marks the pending reminder as fired and disarms the timer until the next refresh.
    pub fn fire(&mut self) -> Option<DateTime<Utc>> {
        let fired = self.pending.take()?.at;
        self.last_fired = Some(fired);
        Some(fired)
    }

    fn clear(&mut self) {
        self.pending = None;
    }
}

enum Wake {
    Shutdown,
    Command(DashboardCommand),
    Check,
    Reminder,
    BannerTimeout,
}

/// Event loop of the dashboard. Owns the dashboard together with its timers, so every timer is gone
/// once [DashboardRunner::run] returns.
pub struct DashboardRunner<S> {
    dashboard: Dashboard<S>,
    notifier: Box<dyn Notifier>,
    commands: mpsc::Receiver<DashboardCommand>,
    updates: mpsc::Sender<DashboardUpdate>,
    shutdown: CancellationToken,
    reminder: ReminderTimer,
}

impl<S: KeyValueStore> DashboardRunner<S> {
    pub fn new(
        dashboard: Dashboard<S>,
        notifier: Box<dyn Notifier>,
        commands: mpsc::Receiver<DashboardCommand>,
        updates: mpsc::Sender<DashboardUpdate>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dashboard,
            notifier,
            commands,
            updates,
            shutdown,
            reminder: ReminderTimer::default(),
        }
    }

    /// Runs until shutdown is requested, the command channel closes or the interface stops
    /// listening. Returns the dashboard in its final state.
    pub async fn run(mut self) -> Result<Dashboard<S>> {
        let clock = self.dashboard.clock().clone();

        self.publish(DashboardUpdate::Activities(
            self.dashboard.activities().to_vec(),
        ))
        .await?;

        let mut banner_deadline = None;
        if self.dashboard.show_settings_saved() {
            self.publish(DashboardUpdate::SettingsSavedBanner(true)).await?;
            banner_deadline = Some(clock.instant() + SETTINGS_SAVED_BANNER);
        }

        self.refresh_reminder().await;
        let mut next_check = clock.instant() + CHECK_INTERVAL;

        loop {
            let wake = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Wake::Shutdown,
                command = self.commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    None => Wake::Shutdown,
                },
                _ = sleep_until_opt(clock.as_ref(), banner_deadline) => Wake::BannerTimeout,
                _ = sleep_until_opt(clock.as_ref(), self.reminder.instant()) => Wake::Reminder,
                _ = clock.sleep_until(next_check) => Wake::Check,
            };

            let result = match wake {
                Wake::Shutdown => break,
                Wake::Command(command) => self.handle_command(command).await,
                Wake::Check => {
                    next_check += CHECK_INTERVAL;
                    self.refresh_reminder().await;
                    Ok(())
                }
                Wake::Reminder => self.remind().await,
                Wake::BannerTimeout => {
                    banner_deadline = None;
                    self.dashboard.hide_settings_saved();
                    self.publish(DashboardUpdate::SettingsSavedBanner(false))
                        .await
                }
            };

            if let Err(e) = result {
                if self.updates.is_closed() {
                    debug!("Interface stopped listening, stopping dashboard");
                    break;
                }
                error!("Dashboard failed to handle an event {e:?}");
            }
        }

        self.reminder.clear();
        info!("Dashboard stopped");
        Ok(self.dashboard)
    }

    #[instrument(skip(self))]
    async fn handle_command(&mut self, command: DashboardCommand) -> Result<()> {
        match command {
            DashboardCommand::AddActivityOn(date) => {
                self.dashboard.add_activity_on(date);
                self.publish(DashboardUpdate::FormOpened { date: Some(date) })
                    .await
            }
            DashboardCommand::OpenForm => self.open_form().await,
            DashboardCommand::CloseForm => {
                self.dashboard.close_form();
                self.publish(DashboardUpdate::FormClosed).await
            }
            DashboardCommand::SubmitActivity(draft) => {
                match self.dashboard.submit_activity(draft).await {
                    Ok(activity) => {
                        self.publish(DashboardUpdate::ActivitySaved(activity)).await?;
                        self.publish(DashboardUpdate::Activities(
                            self.dashboard.activities().to_vec(),
                        ))
                        .await?;
                        self.publish(DashboardUpdate::FormClosed).await
                    }
                    Err(e) => {
                        self.publish(DashboardUpdate::Failed(format!(
                            "Failed to save activity: {e}"
                        )))
                        .await?;
                        Err(e)
                    }
                }
            }
            DashboardCommand::InstallPromptAvailable(handle) => {
                self.dashboard.set_install_prompt(handle);
                self.publish(DashboardUpdate::InstallAvailable).await
            }
            DashboardCommand::Install => match self.dashboard.install().await {
                Ok(outcome) => {
                    self.publish(DashboardUpdate::InstallFinished(outcome))
                        .await
                }
                Err(e) => {
                    // Prompt failures are only logged. The prompt is gone either way.
                    warn!("Install prompt failed {e:?}");
                    self.publish(DashboardUpdate::InstallFinished(None)).await
                }
            },
        }
    }

    async fn open_form(&mut self) -> Result<()> {
        self.dashboard.open_form();
        self.publish(DashboardUpdate::FormOpened {
            date: self.dashboard.selected_date(),
        })
        .await
    }

    async fn remind(&mut self) -> Result<()> {
        if let Some(at) = self.reminder.fire() {
            info!("Reminder due at {at} fired");
        }
        if let Err(e) = self.notifier.notify(&Notification::reminder()).await {
            error!("Failed to show notification {e:?}");
        }
        self.refresh_reminder().await;
        self.open_form().await
    }

    async fn refresh_reminder(&mut self) {
        match self.dashboard.settings().await {
            Ok(settings) => self
                .reminder
                .refresh(&settings, self.dashboard.clock().as_ref()),
            Err(e) => error!("Failed to read settings, keeping previous reminder {e:?}"),
        }
    }

    async fn publish(&self, update: DashboardUpdate) -> Result<()> {
        self.updates.send(update).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
    use tokio_util::sync::CancellationToken;

    use crate::{
        dashboard::{
            install::{InstallOutcome, MockInstallPromptHandle},
            Dashboard,
        },
        notification::{next_notification, MockNotifier, Notifier},
        storage::{
            entities::{ActivityDraft, Settings},
            local_store::{LocalStore, SETTINGS_KEY, SETTINGS_SAVED_KEY},
            MemoryStore,
        },
        utils::{
            clock::{Clock, OffsetClock},
            logging::TEST_LOGGING,
        },
    };

    use super::{
        DashboardCommand, DashboardRunner, DashboardUpdate, ReminderTimer, CHECK_INTERVAL,
    };

    const START_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

    struct TestRunner {
        commands: mpsc::Sender<DashboardCommand>,
        updates: mpsc::Receiver<DashboardUpdate>,
        shutdown: CancellationToken,
        handle: JoinHandle<Result<Dashboard<Arc<MemoryStore>>>>,
    }

    async fn start(
        store: Arc<MemoryStore>,
        clock: Arc<dyn Clock>,
        notifier: impl Notifier + 'static,
    ) -> Result<TestRunner> {
        *TEST_LOGGING;
        let dashboard = Dashboard::mount(store, clock).await?;
        let (commands, command_receiver) = mpsc::channel(16);
        let (update_sender, updates) = mpsc::channel(64);
        let shutdown = CancellationToken::new();
        let runner = DashboardRunner::new(
            dashboard,
            Box::new(notifier),
            command_receiver,
            update_sender,
            shutdown.clone(),
        );
        let handle = tokio::spawn(runner.run());
        Ok(TestRunner {
            commands,
            updates,
            shutdown,
            handle,
        })
    }

    fn clock_at(hour: u32, minute: u32, second: u32) -> Arc<dyn Clock> {
        Arc::new(OffsetClock::starting_at(
            Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, second).unwrap(),
        ))
    }

    fn silent_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(0);
        notifier
    }

    fn drain(updates: &mut mpsc::Receiver<DashboardUpdate>) -> Vec<DashboardUpdate> {
        let mut result = vec![];
        while let Ok(v) = updates.try_recv() {
            result.push(v);
        }
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_interval_never_arms() {
        let clock = clock_at(10, 0, 0);
        let mut timer = ReminderTimer::default();

        timer.refresh(&Settings::default(), clock.as_ref());

        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_is_idempotent() {
        let clock = clock_at(10, 7, 0);
        let mut timer = ReminderTimer::default();
        let settings = Settings::with_interval(30);

        timer.refresh(&settings, clock.as_ref());
        let first = timer.due_at();
        timer.refresh(&settings, clock.as_ref());

        assert_eq!(timer.due_at(), first);
        assert_eq!(
            first,
            next_notification(&settings, clock.local_time()).map(|v| v.with_timezone(&Utc))
        );

        timer.refresh(&Settings::default(), clock.as_ref());
        assert!(!timer.is_armed());
    }

    /// Wall clock that can be moved back or forth while tokio time keeps running.
    struct SteppedClock {
        inner: OffsetClock,
        shift: Mutex<chrono::Duration>,
    }

    impl SteppedClock {
        fn step(&self, shift: chrono::Duration) {
            let mut current = self.shift.lock().unwrap();
            *current = *current + shift;
        }
    }

    #[async_trait]
    impl Clock for SteppedClock {
        fn time(&self) -> DateTime<Utc> {
            self.inner.time() + *self.shift.lock().unwrap()
        }

        fn instant(&self) -> Instant {
            self.inner.instant()
        }

        async fn sleep_until(&self, instant: Instant) {
            self.inner.sleep_until(instant).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_reminder_is_not_armed_again() {
        let clock = clock_at(10, 7, 0);
        let mut timer = ReminderTimer::default();
        let settings = Settings::with_interval(30);

        timer.refresh(&settings, clock.as_ref());
        let fired = timer.fire().unwrap();
        assert!(!timer.is_armed());

        // The wall clock is still before the fired due time.
        timer.refresh(&settings, clock.as_ref());
        assert_eq!(timer.due_at(), Some(fired + chrono::Duration::minutes(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_step_back_fires_once() -> Result<()> {
        let store = Arc::new(MemoryStore::with_values([(SETTINGS_KEY, r#"{"interval":30}"#)]));
        let stepped = Arc::new(SteppedClock {
            inner: OffsetClock::starting_at(Utc.with_ymd_and_hms(2024, 5, 1, 10, 7, 0).unwrap()),
            shift: Mutex::new(chrono::Duration::zero()),
        });
        let clock: Arc<dyn Clock> = stepped.clone();
        let settings = Settings::with_interval(30);
        let first_due = next_notification(&settings, clock.local_time()).unwrap();
        let until_due = (first_due.with_timezone(&Utc) - clock.time()).to_std()?;

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| Ok(()));
        let mut runner = start(store, clock.clone(), notifier).await?;

        tokio::time::sleep(Duration::from_secs(30)).await;
        stepped.step(chrono::Duration::seconds(-10));

        // Past the original deadline. The checks moved the deadline along with the wall clock.
        tokio::time::sleep(until_due).await;
        assert!(clock.time() > first_due.with_timezone(&Utc));

        runner.shutdown.cancel();
        let dashboard = runner.handle.await??;
        assert!(dashboard.show_activity_form());
        drain(&mut runner.updates);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reminders_without_interval() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut runner = start(store, clock_at(10, 0, 0), silent_notifier()).await?;

        tokio::time::sleep(Duration::from_secs(3 * 60 * 60)).await;

        runner.shutdown.cancel();
        let dashboard = runner.handle.await??;
        assert!(!dashboard.show_activity_form());
        assert_eq!(drain(&mut runner.updates), vec![DashboardUpdate::Activities(vec![])]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_fires_once_per_due_time() -> Result<()> {
        let store = Arc::new(MemoryStore::with_values([(SETTINGS_KEY, r#"{"interval":30}"#)]));
        let clock = clock_at(10, 7, 0);
        let settings = Settings::with_interval(30);
        let first_due = next_notification(&settings, clock.local_time()).unwrap();
        let until_due = (first_due.with_timezone(&Utc) - clock.time()).to_std()?;

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| Ok(()));
        let mut runner = start(store, clock.clone(), notifier).await?;

        // Several 60 second checks happen before the reminder, none of them may add a reminder.
        tokio::time::sleep(until_due + Duration::from_secs(1)).await;

        runner.shutdown.cancel();
        let dashboard = runner.handle.await??;
        assert!(dashboard.show_activity_form());
        assert!(drain(&mut runner.updates).contains(&DashboardUpdate::FormOpened { date: None }));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_is_picked_up() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let clock = clock_at(10, 0, 30);
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| Ok(()));
        let mut runner = start(store.clone(), clock.clone(), notifier).await?;

        tokio::time::sleep(Duration::from_secs(10)).await;
        LocalStore::new(store.clone())
            .save_settings(&Settings::with_interval(5))
            .await?;

        // Next check happens within a minute and schedules the reminder for 10:05.
        tokio::time::sleep(CHECK_INTERVAL + Duration::from_secs(4 * 60)).await;

        runner.shutdown.cancel();
        let dashboard = runner.handle.await??;
        assert!(dashboard.show_activity_form());
        drain(&mut runner.updates);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_saved_banner_clears() -> Result<()> {
        let store = Arc::new(MemoryStore::with_values([(SETTINGS_SAVED_KEY, "true")]));
        let mut runner = start(store.clone(), clock_at(10, 0, 0), silent_notifier()).await?;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            drain(&mut runner.updates),
            vec![
                DashboardUpdate::Activities(vec![]),
                DashboardUpdate::SettingsSavedBanner(true)
            ]
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            drain(&mut runner.updates),
            vec![DashboardUpdate::SettingsSavedBanner(false)]
        );

        runner.shutdown.cancel();
        let dashboard = runner.handle.await??;
        assert!(!dashboard.show_settings_saved());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_through_commands() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut runner = start(store.clone(), clock_at(10, 0, 0), silent_notifier()).await?;

        runner
            .commands
            .send(DashboardCommand::AddActivityOn(START_DATE))
            .await?;
        runner
            .commands
            .send(DashboardCommand::SubmitActivity(ActivityDraft {
                name: "Run".into(),
                duration: 30,
                description: String::new(),
                date: START_DATE,
            }))
            .await?;
        drop(runner.commands);

        let dashboard = runner.handle.await??;
        let persisted = LocalStore::new(store).load_activities().await?;
        assert_eq!(persisted, dashboard.activities());
        assert_eq!(persisted.len(), 1);

        let updates = drain(&mut runner.updates);
        assert_eq!(
            updates[1],
            DashboardUpdate::FormOpened {
                date: Some(START_DATE)
            }
        );
        assert_eq!(updates[2], DashboardUpdate::ActivitySaved(persisted[0].clone()));
        assert_eq!(updates[3], DashboardUpdate::Activities(persisted.clone()));
        assert_eq!(updates[4], DashboardUpdate::FormClosed);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_through_commands() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut runner = start(store, clock_at(10, 0, 0), silent_notifier()).await?;

        let mut handle = MockInstallPromptHandle::new();
        handle
            .expect_prompt()
            .times(1)
            .returning(|| Ok(InstallOutcome::Dismissed));
        runner
            .commands
            .send(DashboardCommand::InstallPromptAvailable(Box::new(handle)))
            .await?;
        runner.commands.send(DashboardCommand::Install).await?;
        runner.commands.send(DashboardCommand::Install).await?;
        drop(runner.commands);

        runner.handle.await??;
        assert_eq!(
            drain(&mut runner.updates)[1..],
            [
                DashboardUpdate::InstallAvailable,
                DashboardUpdate::InstallFinished(Some(InstallOutcome::Dismissed)),
                DashboardUpdate::InstallFinished(None),
            ]
        );
        Ok(())
    }
}
