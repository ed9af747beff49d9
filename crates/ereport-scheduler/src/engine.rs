use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use ereport_core::config::SchedulerConfig;
use ereport_core::{PanelQuery, ResultSet, Schedule, TimeWindow};
use ereport_delivery::{Mailer, QueryRunner};
use ereport_render::ReportRenderer;
use ereport_sql::expand_detailed;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{
    error::Result,
    guard::TickGuard,
    naming::{export_file_name, report_file_name},
    recurrence::next_report_time,
    store::ReportStore,
};

/// Appended to a report file stem that collides with the template file.
pub const TEMPLATE_CLASH_SUFFIX: &str = "_report";

/// Outcome of one [`ReportEngine::tick_at`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// A previous run was still in progress; nothing was done.
    pub skipped: bool,
    pub overdue: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Drives overdue schedules through query, render, email and cleanup.
pub struct ReportEngine {
    store: Arc<dyn ReportStore>,
    queries: Arc<dyn QueryRunner>,
    mailer: Arc<dyn Mailer>,
    renderer: ReportRenderer,
    config: SchedulerConfig,
    datasource_id: i64,
    guard: TickGuard,
}

impl ReportEngine {
    pub fn new(
        store: Arc<dyn ReportStore>,
        queries: Arc<dyn QueryRunner>,
        mailer: Arc<dyn Mailer>,
        config: SchedulerConfig,
        datasource_id: i64,
    ) -> Self {
        Self {
            renderer: ReportRenderer::new(config.template_path()),
            store,
            queries,
            mailer,
            config,
            datasource_id,
            guard: TickGuard::new(),
        }
    }

    pub fn guard(&self) -> &TickGuard {
        &self.guard
    }

    /// Main loop. Runs a tick immediately, then every `tick_secs`, until
    /// `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = Duration::from_secs(self.config.tick_secs.max(1));
        info!(tick_secs = period.as_secs(), "report engine started");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("report engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub async fn tick(&self) -> TickSummary {
        self.tick_at(Local::now()).await
    }

    /// Process every schedule overdue at `now`, one after another.
    ///
    /// A failed schedule keeps its next report time, so the next tick retries
    /// it; the others still run.
    pub async fn tick_at<Tz>(&self, now: DateTime<Tz>) -> TickSummary
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        let mut summary = TickSummary::default();
        let Some(_permit) = self.guard.try_begin(now.with_timezone(&Utc)) else {
            warn!("previous report run still in progress, skipping tick");
            summary.skipped = true;
            return summary;
        };

        let schedules = match self.store.overdue_schedules(now.timestamp()) {
            Ok(schedules) => schedules,
            Err(e) => {
                error!(code = e.code(), "could not load overdue schedules: {e}");
                return summary;
            }
        };
        summary.overdue = schedules.len();
        if schedules.is_empty() {
            debug!("no schedules are overdue");
            return summary;
        }
        info!(count = schedules.len(), "found overdue schedules");

        for schedule in &schedules {
            info!(schedule_id = %schedule.id, name = %schedule.name, "creating report");
            match self.run_schedule(schedule, &now).await {
                Ok(()) => summary.completed += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        schedule_id = %schedule.id,
                        code = e.code(),
                        "report run failed: {e}"
                    );
                }
            }
        }
        summary
    }

    async fn run_schedule<Tz>(&self, schedule: &Schedule, now: &DateTime<Tz>) -> Result<()>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        self.deliver(schedule, None, now).await?;
        self.advance(schedule, now)
    }

    /// Render and email a schedule's report right away, leaving its next
    /// report time alone. `to` replaces the report group as the only
    /// recipient. Returns how many recipients were sent to.
    pub async fn send_now<Tz>(&self, schedule_id: &str, to: Option<&str>, now: DateTime<Tz>) -> Result<usize>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        let schedule = self.store.schedule(schedule_id)?;
        info!(schedule_id = %schedule.id, name = %schedule.name, "sending report now");
        self.deliver(&schedule, to.map(|to| vec![to.to_string()]), &now).await
    }

    /// Render one panel to `<data_dir>/<title>.xlsx` without emailing it.
    /// Placeholders are expanded with the dashboard's stored variable
    /// definitions over the `lookback` seconds before `now`.
    pub async fn export_panel<Tz>(&self, panel: &PanelQuery, lookback: i64, now: DateTime<Tz>) -> Result<PathBuf>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        let window = TimeWindow::ending_at(now.timestamp(), lookback);
        let set = self.query_panel(panel, window).await?;
        let (_, output) = self.output_path(&export_file_name(&panel.title, panel.panel_id));
        self.renderer.render_at(&[set], &output, now.naive_local())?;
        info!(panel_id = panel.panel_id, output = %output.display(), "panel exported");
        Ok(output)
    }

    async fn deliver<Tz>(
        &self,
        schedule: &Schedule,
        recipients: Option<Vec<String>>,
        now: &DateTime<Tz>,
    ) -> Result<usize>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        let panels = self.store.panel_queries(&schedule.id)?;
        if panels.is_empty() {
            info!(schedule_id = %schedule.id, "schedule has no panels, nothing to send");
            return Ok(0);
        }

        let window = TimeWindow::ending_at(now.timestamp(), schedule.lookback);
        let mut result_sets = Vec::with_capacity(panels.len());
        for panel in &panels {
            result_sets.push(self.query_panel(panel, window).await?);
        }

        let (file_stem, output) = self.output_path(&report_file_name(
            &schedule.name,
            &schedule.date_format,
            &schedule.date_position,
            now,
        ));
        self.renderer
            .render_at(&result_sets, &output, now.naive_local())?;

        let recipients = match recipients {
            Some(recipients) => recipients,
            None => self.store.recipients(&schedule.report_group_id)?,
        };
        if recipients.is_empty() {
            warn!(
                schedule_id = %schedule.id,
                report_group_id = %schedule.report_group_id,
                "report group has no members"
            );
        }
        self.mailer
            .send_bulk(&output, &recipients, &file_stem, &schedule.description)
            .await;

        if self.config.cleanup_after_send {
            remove_report(&output);
        }
        Ok(recipients.len())
    }

    async fn query_panel(&self, panel: &PanelQuery, window: TimeWindow) -> Result<ResultSet> {
        let definitions = self.store.variable_definitions(&panel.dashboard_id)?;
        let expansion = expand_detailed(&panel.raw_sql, &definitions, &panel.variables, window);
        if !expansion.unresolved.is_empty() {
            warn!(
                panel_id = panel.panel_id,
                unresolved = ?expansion.unresolved,
                "placeholders left unexpanded"
            );
        }
        debug!(panel_id = panel.panel_id, sql = %expansion.sql, "running panel query");

        let mut set = self
            .queries
            .run_query(&expansion.sql, window, self.datasource_id)
            .await?;
        set.title = panel.title.clone();
        Ok(set)
    }

    /// Where a report with `file_stem` is written. A stem that would land on
    /// the template gets [`TEMPLATE_CLASH_SUFFIX`] so the template is never
    /// overwritten or cleaned up.
    fn output_path(&self, file_stem: &str) -> (String, PathBuf) {
        let output = self.config.report_path(file_stem);
        if !same_file(&output, self.renderer.template_path()) {
            return (file_stem.to_string(), output);
        }
        let renamed = format!("{file_stem}{TEMPLATE_CLASH_SUFFIX}");
        warn!(file_stem, renamed = %renamed, "report name matches the template, renaming");
        let output = self.config.report_path(&renamed);
        (renamed, output)
    }

    fn advance<Tz: TimeZone>(&self, schedule: &Schedule, now: &DateTime<Tz>) -> Result<()> {
        let next = next_report_time(schedule, now);
        self.store.update_next_report_time(&schedule.id, next)?;
        info!(schedule_id = %schedule.id, next_report_time = next, "schedule advanced");
        Ok(())
    }
}

/// Case-insensitive, since reports often land on case-insensitive file
/// systems.
fn same_file(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// A leftover file is overwritten by the next run, so failure is only logged.
fn remove_report(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "report deleted"),
        Err(e) => error!(path = %path.display(), "could not delete report: {e}"),
    }
}
