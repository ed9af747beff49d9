//! `ereport-delivery`: the outside world of the report pipeline.
//!
//! [`QueryRunner`] fetches panel data and [`Mailer`] sends the rendered
//! workbook. [`GrafanaClient`] and [`SmtpMailer`] are the production
//! implementations.

pub mod error;
pub mod grafana;
pub mod mailer;
pub mod query;
pub mod smtp;

pub use error::{DeliveryError, Result};
pub use grafana::GrafanaClient;
pub use mailer::Mailer;
pub use query::QueryRunner;
pub use smtp::SmtpMailer;
