use std::collections::HashMap;

use async_trait::async_trait;
use ereport_core::config::GrafanaConfig;
use ereport_core::{ResultSet, Scalar, TimeWindow};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DeliveryError, Result};
use crate::query::QueryRunner;

const REF_ID: &str = "A";

/// Runs panel SQL through Grafana's `/api/tsdb/query` endpoint.
pub struct GrafanaClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl GrafanaClient {
    pub fn new(config: &GrafanaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

#[async_trait]
impl QueryRunner for GrafanaClient {
    async fn run_query(
        &self,
        sql: &str,
        window: TimeWindow,
        datasource_id: i64,
    ) -> Result<ResultSet> {
        let url = format!("{}/api/tsdb/query", self.base_url);
        let body = build_request_body(sql, window, datasource_id);

        debug!(datasource_id, from = window.from, to = window.to, "sending query to Grafana");

        let mut request = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body);
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }
        let resp = request.send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Grafana query error");
            return Err(DeliveryError::Api {
                status,
                message: text,
            });
        }

        let payload: QueryResponse = resp
            .json()
            .await
            .map_err(|e| DeliveryError::Parse(e.to_string()))?;
        parse_response(payload)
    }
}

/// Table-format query for a single SQL statement. `from`/`to` are epoch
/// milliseconds sent as strings.
fn build_request_body(sql: &str, window: TimeWindow, datasource_id: i64) -> Value {
    serde_json::json!({
        "from": (window.from * 1000).to_string(),
        "to": (window.to * 1000).to_string(),
        "queries": [{
            "refId": REF_ID,
            "intervalMs": 0,
            "maxDataPoints": 0,
            "datasourceId": datasource_id,
            "rawSql": sql,
            "format": "table",
        }],
    })
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: HashMap<String, RefResult>,
}

#[derive(Debug, Default, Deserialize)]
struct RefResult {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    frames: Vec<Frame>,
}

#[derive(Debug, Default, Deserialize)]
struct Table {
    #[serde(default)]
    columns: Vec<TableColumn>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct TableColumn {
    #[serde(default)]
    text: String,
}

/// Columnar data frame, as returned by newer Grafana versions.
#[derive(Debug, Default, Deserialize)]
struct Frame {
    #[serde(default)]
    schema: FrameSchema,
    #[serde(default)]
    data: FrameData,
}

#[derive(Debug, Default, Deserialize)]
struct FrameSchema {
    #[serde(default)]
    fields: Vec<FrameField>,
}

#[derive(Debug, Default, Deserialize)]
struct FrameField {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct FrameData {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn parse_response(mut payload: QueryResponse) -> Result<ResultSet> {
    let Some(result) = payload.results.remove(REF_ID) else {
        return Ok(ResultSet::default());
    };
    if let Some(message) = result.error.filter(|m| !m.is_empty()) {
        return Err(DeliveryError::Query(message));
    }

    if let Some(table) = result.tables.into_iter().next() {
        let columns = table.columns.into_iter().map(|c| c.text).collect();
        let rows = table
            .rows
            .iter()
            .map(|row| row.iter().map(Scalar::from_json).collect())
            .collect();
        return Ok(ResultSet::new("", columns, rows));
    }

    if let Some(frame) = result.frames.into_iter().next() {
        let columns = frame.schema.fields.into_iter().map(|f| f.name).collect();
        let values = frame.data.values;
        let row_count = values.first().map_or(0, Vec::len);
        let rows = (0..row_count)
            .map(|i| {
                values
                    .iter()
                    .map(|column| column.get(i).map_or(Scalar::Null, Scalar::from_json))
                    .collect()
            })
            .collect();
        return Ok(ResultSet::new("", columns, rows));
    }

    Ok(ResultSet::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ResultSet> {
        parse_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn request_body_shape() {
        let body = build_request_body("SELECT 1", TimeWindow::new(100, 200), 7);
        assert_eq!(body["from"], "100000");
        assert_eq!(body["to"], "200000");
        let query = &body["queries"][0];
        assert_eq!(query["refId"], "A");
        assert_eq!(query["datasourceId"], 7);
        assert_eq!(query["rawSql"], "SELECT 1");
        assert_eq!(query["format"], "table");
    }

    #[test]
    fn table_results() {
        let set = parse(
            r#"{"results":{"A":{"refId":"A","tables":[{
                "columns":[{"text":"item"},{"text":"qty"}],
                "rows":[["tea",3],["milk",null]]
            }]}}}"#,
        )
        .unwrap();
        assert_eq!(set.columns, vec!["item".to_string(), "qty".to_string()]);
        assert_eq!(
            set.rows,
            vec![
                vec![Scalar::Text("tea".into()), Scalar::Number(3.0)],
                vec![Scalar::Text("milk".into()), Scalar::Null],
            ]
        );
        assert!(set.title.is_empty());
    }

    #[test]
    fn frame_results_are_transposed() {
        let set = parse(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"item","type":"string"},{"name":"ok","type":"bool"}]},
                "data":{"values":[["tea","milk"],[true]]}
            }]}}}"#,
        )
        .unwrap();
        assert_eq!(set.columns, vec!["item".to_string(), "ok".to_string()]);
        assert_eq!(
            set.rows,
            vec![
                vec![Scalar::Text("tea".into()), Scalar::Bool(true)],
                vec![Scalar::Text("milk".into()), Scalar::Null],
            ]
        );
    }

    #[test]
    fn missing_result_is_empty() {
        assert_eq!(parse(r#"{"results":{}}"#).unwrap(), ResultSet::default());
        assert_eq!(parse(r#"{"results":{"A":{}}}"#).unwrap(), ResultSet::default());
    }

    #[test]
    fn query_error_is_reported() {
        let err = parse(r#"{"results":{"A":{"error":"syntax error at or near"}}}"#).unwrap_err();
        assert!(matches!(err, DeliveryError::Query(ref m) if m.contains("syntax")));
        assert_eq!(err.code(), "QUERY_ERROR");
    }
}
