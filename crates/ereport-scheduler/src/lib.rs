//! `ereport-scheduler`: recurring report runs with SQLite persistence.
//!
//! # Overview
//!
//! Schedules live in a SQLite `schedule` table. The [`engine::ReportEngine`]
//! polls it every `tick_secs` and, for each schedule whose next report time
//! has passed, expands the panel SQL, fetches the results, renders the
//! workbook, emails it to the report group and computes the next run.
//!
//! # Cadences
//!
//! | Interval      | Day selector        | Next run                                    |
//! |---------------|---------------------|---------------------------------------------|
//! | `Daily`       | unused              | today at `time`, or tomorrow once passed    |
//! | `Weekly`      | weekday, 0 = Sunday | next such weekday; today counts as 7 days   |
//! | `Fortnightly` | day of month        | days until the day comes round modulo 14    |
//! | `Monthly`     | day of month        | that day next month                         |
//! | `Quarterly`   | day of month        | that day three months on                    |
//! | `Yearly`      | day of month        | that day a year on                          |

pub mod db;
pub mod engine;
pub mod error;
pub mod guard;
pub mod naming;
pub mod recurrence;
pub mod store;

pub use engine::{ReportEngine, TickSummary};
pub use error::{Result, SchedulerError};
pub use guard::{RunState, TickGuard, TickPermit};
pub use recurrence::{compute_next, next_report_time};
pub use store::{ReportStore, SqliteStore};
