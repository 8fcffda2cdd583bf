use crate::aggregation::DailySummary;
use crate::data_sources::http::{HttpJson, HttpResponse};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("Unexpected response body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("BigQuery returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid table id '{0}', expected project.dataset.table")]
    TableId(String),
    #[error("Query did not complete: {0}")]
    Incomplete(String),
}

/// Fully qualified `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl FromStr for TableId {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(Self {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                    table: table.to_string(),
                })
            }
            _ => Err(WarehouseError::TableId(s.to_string())),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// A row the warehouse refused, with the reasons it gave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertError {
    pub index: usize,
    pub reasons: Vec<String>,
}

/// Delete-by-date plus bulk insert. Neither call is transactional with the other.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn delete_date(&self, table: &TableId, date: NaiveDate) -> Result<(), WarehouseError>;

    async fn insert_rows(
        &self,
        table: &TableId,
        rows: &[DailySummary],
    ) -> Result<Vec<InsertError>, WarehouseError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Inserted { rows: usize, table: TableId },
    NothingToInsert,
    InsertFailed,
    DeleteFailed,
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkOutcome::Inserted { rows, table } => {
                write!(f, "Inserted {} rows into {}", rows, table)
            }
            SinkOutcome::NothingToInsert => write!(f, "No data to insert"),
            SinkOutcome::InsertFailed => write!(f, "BigQuery insert failed"),
            SinkOutcome::DeleteFailed => write!(f, "BigQuery delete failed"),
        }
    }
}

/// Clears `date` from the table ahead of a reload.
pub async fn clear_date(
    warehouse: &dyn Warehouse,
    table: &TableId,
    date: NaiveDate,
) -> Result<(), WarehouseError> {
    info!("Deleting existing rows for {} from {}", date, table);
    warehouse.delete_date(table, date).await
}

/// Bulk-inserts the batch for a date that [`clear_date`] already emptied.
/// Any per-row error fails the whole batch; the earlier delete is not undone.
pub async fn load_batch(
    warehouse: &dyn Warehouse,
    table: &TableId,
    rows: &[DailySummary],
) -> SinkOutcome {
    if rows.is_empty() {
        info!("No data to insert");
        return SinkOutcome::NothingToInsert;
    }

    match warehouse.insert_rows(table, rows).await {
        Ok(errors) if errors.is_empty() => {
            info!("Inserted {} rows into {}", rows.len(), table);
            SinkOutcome::Inserted {
                rows: rows.len(),
                table: table.clone(),
            }
        }
        Ok(errors) => {
            error!("BigQuery insert errors: {:?}", errors);
            SinkOutcome::InsertFailed
        }
        Err(e) => {
            error!("BigQuery insert failed: {}", e);
            SinkOutcome::InsertFailed
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    num_dml_affected_rows: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowErrors>,
}

#[derive(Debug, Deserialize)]
struct RowErrors {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Server-side wait per `jobs.query` / `getQueryResults` call.
const QUERY_TIMEOUT_MS: u64 = 60_000;
/// `getQueryResults` calls made for a DELETE before giving up on it.
const MAX_POLLS: usize = 30;

/// BigQuery over its REST API, authenticated with an OAuth bearer token.
pub struct BigQueryWarehouse<'a> {
    http: &'a dyn HttpJson,
    base_url: String,
    access_token: String,
}

impl<'a> BigQueryWarehouse<'a> {
    pub fn new(http: &'a dyn HttpJson, base_url: &str, access_token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, WarehouseError> {
        if !response.is_success() {
            return Err(WarehouseError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, WarehouseError> {
        let response = self
            .http
            .post_json(url, &self.access_token, body)
            .await
            .map_err(|e| WarehouseError::Transport(format!("{:#}", e)))?;
        Self::decode(response)
    }

    /// Waits on `getQueryResults` until the job reports completion.
    async fn wait_for_job(
        &self,
        project: &str,
        job: &JobReference,
    ) -> Result<QueryResponse, WarehouseError> {
        let url = format!("{}/projects/{}/queries/{}", self.base_url, project, job.job_id);
        let mut params = vec![
            ("timeoutMs", QUERY_TIMEOUT_MS.to_string()),
            ("maxResults", "0".to_string()),
        ];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }

        for attempt in 1..=MAX_POLLS {
            info!("  Waiting for job {} ({}/{})", job.job_id, attempt, MAX_POLLS);
            let response = self
                .http
                .get_authed(&url, &self.access_token, &params)
                .await
                .map_err(|e| WarehouseError::Transport(format!("{:#}", e)))?;
            let results: QueryResponse = Self::decode(response)?;
            if results.job_complete {
                return Ok(results);
            }
        }

        Err(WarehouseError::Incomplete(format!(
            "job {} still running after {} polls",
            job.job_id, MAX_POLLS
        )))
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse<'_> {
    async fn delete_date(&self, table: &TableId, date: NaiveDate) -> Result<(), WarehouseError> {
        let url = format!("{}/projects/{}/queries", self.base_url, table.project);
        let body = serde_json::json!({
            "query": format!("DELETE FROM `{}` WHERE date = @date", table),
            "useLegacySql": false,
            "timeoutMs": QUERY_TIMEOUT_MS,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "date",
                "parameterType": { "type": "DATE" },
                "parameterValue": { "value": date.format("%Y-%m-%d").to_string() },
            }],
        });

        let mut response: QueryResponse = self.post(&url, &body).await?;
        if !response.job_complete {
            let job = response.job_reference.take().ok_or_else(|| {
                WarehouseError::Incomplete(format!(
                    "DELETE for {} on {} has no job id",
                    table, date
                ))
            })?;
            response = self.wait_for_job(&table.project, &job).await?;
        }

        info!(
            "  Deleted {} rows",
            response.num_dml_affected_rows.as_deref().unwrap_or("0")
        );
        Ok(())
    }

    async fn insert_rows(
        &self,
        table: &TableId,
        rows: &[DailySummary],
    ) -> Result<Vec<InsertError>, WarehouseError> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url, table.project, table.dataset, table.table
        );
        let body = serde_json::json!({
            "rows": rows.iter().map(|row| serde_json::json!({ "json": row })).collect::<Vec<_>>(),
        });

        let response: InsertAllResponse = self.post(&url, &body).await?;
        if !response.insert_errors.is_empty() {
            warn!("  {} rows rejected", response.insert_errors.len());
        }
        Ok(response
            .insert_errors
            .into_iter()
            .map(|row| InsertError {
                index: row.index,
                reasons: row
                    .errors
                    .into_iter()
                    .map(|e| format!("{}: {}", e.reason, e.message))
                    .collect(),
            })
            .collect())
    }
}
