//! The dashboard ties the activity list, the form, the calendar and reminders together.
//! [Dashboard] holds the state, [runner::DashboardRunner] drives it with timers and commands.

pub mod install;
pub mod runner;

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use install::{InstallOutcome, InstallPrompt, InstallPromptHandle};
use tracing::{debug, info, instrument};

use crate::{
    calendar::WeeklyCalendar,
    form::ActivityForm,
    storage::{
        entities::{Activity, ActivityDraft, Settings},
        local_store::LocalStore,
        KeyValueStore,
    },
    utils::clock::Clock,
};

pub struct Dashboard<S> {
    store: LocalStore<S>,
    clock: Arc<dyn Clock>,
    activities: Vec<Activity>,
    show_settings_saved: bool,
    show_activity_form: bool,
    selected_date: Option<NaiveDate>,
    install_prompt: InstallPrompt,
}

impl<S: KeyValueStore> Dashboard<S> {
    /// Loads persisted activities and consumes the settings saved flag. The banner stays visible
    /// until [Dashboard::hide_settings_saved] is called, which the runner does after a timeout.
    #[instrument(skip_all)]
    pub async fn mount(store: S, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = LocalStore::new(store);
        let activities = store.load_activities().await?;
        let show_settings_saved = store.take_settings_saved().await?;
        info!(
            "Mounted dashboard with {} activities, settings saved banner {}",
            activities.len(),
            show_settings_saved
        );

        Ok(Self {
            store,
            clock,
            activities,
            show_settings_saved,
            show_activity_form: false,
            selected_date: None,
            install_prompt: InstallPrompt::Unavailable,
        })
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn show_settings_saved(&self) -> bool {
        self.show_settings_saved
    }

    pub fn show_activity_form(&self) -> bool {
        self.show_activity_form
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn install_prompt(&self) -> &InstallPrompt {
        &self.install_prompt
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Settings are read on every call so that changes made by another process are picked up.
    pub async fn settings(&self) -> Result<Settings> {
        self.store.load_settings().await
    }

    pub fn hide_settings_saved(&mut self) {
        self.show_settings_saved = false;
    }

    /// Opens the form with a date picked in the calendar.
    pub fn add_activity_on(&mut self, date: NaiveDate) {
        self.selected_date = Some(date);
        self.show_activity_form = true;
    }

    pub fn open_form(&mut self) {
        self.show_activity_form = true;
    }

    pub fn close_form(&mut self) {
        self.show_activity_form = false;
    }

    /// A fresh form for the current state. The date defaults to the selected date or today.
    pub fn form(&self) -> ActivityForm {
        ActivityForm::new(self.selected_date, self.clock.today())
    }

    pub fn calendar(&self, week_of: NaiveDate) -> WeeklyCalendar<'_> {
        WeeklyCalendar::new(&self.activities, week_of)
    }

    /// Appends a new activity and writes the whole list back. The in-memory list only changes
    /// after the write succeeded, so both always hold the same activities.
    #[instrument(skip(self))]
    pub async fn submit_activity(&mut self, draft: ActivityDraft) -> Result<Activity> {
        let activity = Activity::from_draft(self.next_id(), draft);

        let mut updated = self.activities.clone();
        updated.push(activity.clone());
        self.store.save_activities(&updated).await?;

        self.activities = updated;
        self.show_activity_form = false;
        info!("Saved activity {}", activity.id);
        Ok(activity)
    }

    /// Ids come from the creation time in milliseconds. Two activities created in the same
    /// millisecond still get distinct ids.
    fn next_id(&self) -> i64 {
        let now = self.clock.time().timestamp_millis();
        match self.activities.iter().map(|v| v.id).max() {
            Some(last) if last >= now => last + 1,
            _ => now,
        }
    }

    /// Keeps the latest install prompt. Older prompts are dropped.
    pub fn set_install_prompt(&mut self, handle: Box<dyn InstallPromptHandle>) {
        if self.install_prompt.is_available() {
            debug!("Replacing previous install prompt");
        }
        self.install_prompt = InstallPrompt::Available(handle);
    }

    /// Shows the install prompt if one is available. The prompt is used up either way.
    pub async fn install(&mut self) -> Result<Option<InstallOutcome>> {
        let Some(mut handle) = self.install_prompt.take() else {
            debug!("No install prompt available");
            return Ok(None);
        };
        let outcome = handle.prompt().await?;
        match outcome {
            InstallOutcome::Accepted => info!("User accepted the install prompt"),
            InstallOutcome::Dismissed => info!("User dismissed the install prompt"),
        }
        Ok(Some(outcome))
    }
}
