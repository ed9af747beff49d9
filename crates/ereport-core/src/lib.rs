//! Shared data model, configuration and errors for the report pipeline.

pub mod config;
pub mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{
    parse_selections, IntervalKind, PanelQuery, ResultSet, Scalar, Schedule, TimeWindow,
    VariableDefinition,
};
