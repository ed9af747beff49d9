use std::collections::{HashMap, HashSet};

use ereport_core::{parse_selections, TimeWindow, VariableDefinition};
use tracing::{debug, warn};

use crate::lexer::{tokenize, Macro, Token, VariableFormat};

/// A placeholder that could not be expanded and was left in the SQL as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// Neither a selection nor a definition exists for the variable.
    Variable(String),
    /// `$__timeFilter(...)` without a column identifier.
    TimeFilterColumn(String),
}

/// Result of [`expand_detailed`]: the SQL plus everything left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub sql: String,
    pub unresolved: Vec<Unresolved>,
    /// `false` when the selection JSON could not be parsed and was ignored.
    pub selections_valid: bool,
}

/// Expand variables and time macros in `raw_sql`.
///
/// Unresolvable placeholders are left in place; see [`expand_detailed`] to
/// find out which ones.
pub fn expand(
    raw_sql: &str,
    definitions: &[VariableDefinition],
    selections_json: &str,
    window: TimeWindow,
) -> String {
    expand_detailed(raw_sql, definitions, selections_json, window).sql
}

pub fn expand_detailed(
    raw_sql: &str,
    definitions: &[VariableDefinition],
    selections_json: &str,
    window: TimeWindow,
) -> Expansion {
    let (selections, selections_valid) = match parse_selections(selections_json) {
        Some(map) => (map, true),
        None => {
            warn!(json = %selections_json, "variable selections are not valid JSON, ignoring");
            (HashMap::new(), false)
        }
    };

    let tokens = tokenize(raw_sql);

    // A variable used anywhere as `${v:sqlstring}` is quoted in both of its forms.
    let quoted: HashSet<&str> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Variable {
                name,
                format: VariableFormat::SqlString,
                ..
            } => Some(*name),
            _ => None,
        })
        .collect();

    let mut sql = String::with_capacity(raw_sql.len());
    let mut unresolved = Vec::new();

    for token in &tokens {
        match token {
            Token::Text(text) => sql.push_str(text),
            Token::Variable { name, raw, .. } => {
                match resolve_values(name, &selections, definitions) {
                    Some(values) => {
                        let format = if quoted.contains(name) {
                            VariableFormat::SqlString
                        } else {
                            VariableFormat::Plain
                        };
                        sql.push_str(&join_values(&values, format));
                    }
                    None => {
                        debug!(variable = %name, "no value for variable, leaving placeholder");
                        sql.push_str(raw);
                        unresolved.push(Unresolved::Variable(name.to_string()));
                    }
                }
            }
            Token::Macro { kind, raw } => match kind {
                // The historical mapping is swapped: timeFrom renders the window end.
                Macro::TimeFrom => sql.push_str(&to_timestamp(window.to)),
                Macro::TimeTo => sql.push_str(&to_timestamp(window.from)),
                Macro::TimeFilter { column: Some(column) } => {
                    sql.push_str(&format!(
                        "{column} BETWEEN {} AND {}",
                        to_timestamp(window.from),
                        to_timestamp(window.to)
                    ));
                }
                Macro::TimeFilter { column: None } => {
                    debug!(placeholder = %raw, "time filter has no column, leaving placeholder");
                    sql.push_str(raw);
                    unresolved.push(Unresolved::TimeFilterColumn(raw.to_string()));
                }
            },
        }
    }

    Expansion {
        sql,
        unresolved,
        selections_valid,
    }
}

/// Selected options win over the dashboard's definition.
fn resolve_values(
    name: &str,
    selections: &HashMap<String, Vec<String>>,
    definitions: &[VariableDefinition],
) -> Option<Vec<String>> {
    if let Some(values) = selections.get(name) {
        return Some(values.clone());
    }
    definitions
        .iter()
        .find(|d| d.name == name)
        .map(|d| vec![d.definition.clone()])
}

pub fn join_values(values: &[String], format: VariableFormat) -> String {
    match format {
        VariableFormat::Plain => values.join(", "),
        VariableFormat::SqlString => values
            .iter()
            .map(|v| format!("'{v}'"))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn to_timestamp(secs: i64) -> String {
    format!("to_timestamp({secs})")
}
