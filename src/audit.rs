//! Request history: one record per top-level operation.
//!
//! Records are handed to an [`AuditSink`] on a detached task. The caller
//! never waits on the write and a failed write never changes its result.

use crate::errors::{AppError, ResultExt};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Operation tag stored with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ResolveVanityUrl,
    GetOwnedGames,
    GetPlayerSummaries,
    GetPlayerAchievements,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::ResolveVanityUrl => "/steam_id:ResolveVanityURL",
            Endpoint::GetOwnedGames => "/games:GetOwnedGames",
            Endpoint::GetPlayerSummaries => "/summary:GetPlayerSummaries",
            Endpoint::GetPlayerAchievements => "/achievements:GetPlayerAchievements",
        }
    }
}

/// Parameters of one operation, serialized as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuditParams {
    Vanity {
        #[serde(rename = "vanityName")]
        vanity_name: String,
    },
    Profile {
        #[serde(rename = "steamID")]
        steam_id: String,
    },
    Achievements {
        #[serde(rename = "steamID")]
        steam_id: String,
        #[serde(rename = "appID")]
        app_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub endpoint: Endpoint,
    pub params: AuditParams,
    pub success: bool,
    /// Empty on success.
    pub error_message: String,
    pub duration: Duration,
}

impl AuditRecord {
    /// Builds the record for an operation that started at `started`.
    pub fn from_result<T>(
        endpoint: Endpoint,
        params: AuditParams,
        started: Instant,
        result: &Result<T, AppError>,
    ) -> Self {
        let (success, error_message) = match result {
            Ok(_) => (true, String::new()),
            Err(e) => (false, e.to_string()),
        };

        Self {
            endpoint,
            params,
            success,
            error_message,
            duration: started.elapsed(),
        }
    }
}

/// Append-only destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn save(&self, record: &AuditRecord) -> Result<(), AppError>;
}

/// Writes records to the `request_history` table.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn save(&self, record: &AuditRecord) -> Result<(), AppError> {
        let params = serde_json::to_value(&record.params)?;
        let response_time_ms = i64::try_from(record.duration.as_millis()).unwrap_or(i64::MAX);

        sqlx::query(
            r#"
            INSERT INTO request_history (endpoint, params, success, error_message, response_time_ms)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.endpoint.as_str())
        .bind(params)
        .bind(record.success)
        .bind(&record.error_message)
        .bind(response_time_ms)
        .execute(&self.pool)
        .await
        .context("saving request history")?;

        Ok(())
    }
}

/// Emits records as structured log lines; used when no database is configured.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn save(&self, record: &AuditRecord) -> Result<(), AppError> {
        let params = serde_json::to_string(&record.params)?;
        tracing::info!(
            target: "audit",
            endpoint = record.endpoint.as_str(),
            params = %params,
            success = record.success,
            error = %record.error_message,
            duration_ms = record.duration.as_millis() as u64,
            "request history"
        );
        Ok(())
    }
}

/// Fire-and-forget front end for an [`AuditSink`].
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Starts timing one operation. The returned scope records exactly once:
    /// on [`AuditScope::finish`], or as a cancellation if it is dropped first.
    pub fn scope(&self, endpoint: Endpoint, params: AuditParams) -> AuditScope {
        AuditScope {
            logger: self.clone(),
            endpoint,
            params: Some(params),
            started: Instant::now(),
        }
    }

    /// Hands the record to the sink on a detached task.
    pub fn record(&self, record: AuditRecord) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                "No runtime available, dropping request history for {}",
                record.endpoint.as_str()
            );
            return;
        };

        let sink = Arc::clone(&self.sink);
        handle.spawn(async move {
            if let Err(e) = sink.save(&record).await {
                tracing::warn!(
                    "Failed to save request history for {}: {}",
                    record.endpoint.as_str(),
                    e
                );
            }
        });
    }
}

/// Timing guard for one top-level operation.
pub struct AuditScope {
    logger: AuditLogger,
    endpoint: Endpoint,
    params: Option<AuditParams>,
    started: Instant,
}

impl AuditScope {
    /// Records the outcome of the operation.
    pub fn finish<T>(mut self, result: &Result<T, AppError>) {
        if let Some(params) = self.params.take() {
            self.logger.record(AuditRecord::from_result(
                self.endpoint,
                params,
                self.started,
                result,
            ));
        }
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        // Only reached without `finish` when the operation future was dropped.
        if let Some(params) = self.params.take() {
            self.logger.record(AuditRecord {
                endpoint: self.endpoint,
                params,
                success: false,
                error_message: "request cancelled".to_string(),
                duration: self.started.elapsed(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{wait_for_records, FailingAuditSink, RecordingAuditSink};

    #[test]
    fn test_params_serialize_as_flat_objects() {
        let vanity = AuditParams::Vanity {
            vanity_name: "gaben".into(),
        };
        let ach = AuditParams::Achievements {
            steam_id: "7656119".into(),
            app_id: "440".into(),
        };

        assert_eq!(
            serde_json::to_value(&vanity).unwrap(),
            serde_json::json!({"vanityName": "gaben"})
        );
        assert_eq!(
            serde_json::to_value(&ach).unwrap(),
            serde_json::json!({"steamID": "7656119", "appID": "440"})
        );
    }

    #[test]
    fn test_record_from_error_result() {
        let result: Result<(), AppError> = Err(AppError::NotFound("no match".into()));
        let record = AuditRecord::from_result(
            Endpoint::ResolveVanityUrl,
            AuditParams::Vanity {
                vanity_name: "nobody".into(),
            },
            Instant::now(),
            &result,
        );

        assert!(!record.success);
        assert_eq!(record.error_message, "Not found: no match");
        assert_eq!(record.endpoint.as_str(), "/steam_id:ResolveVanityURL");
    }

    #[tokio::test]
    async fn test_logger_delivers_record() {
        let sink = Arc::new(RecordingAuditSink::default());
        let logger = AuditLogger::new(sink.clone());

        logger.record(AuditRecord::from_result::<()>(
            Endpoint::GetOwnedGames,
            AuditParams::Profile {
                steam_id: "1".into(),
            },
            Instant::now(),
            &Ok(()),
        ));

        let records = wait_for_records(&sink, 1).await;
        assert!(records[0].success);
        assert!(records[0].error_message.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_scope_records_cancellation() {
        let sink = Arc::new(RecordingAuditSink::default());
        let logger = AuditLogger::new(sink.clone());

        let scope = logger.scope(
            Endpoint::GetPlayerAchievements,
            AuditParams::Achievements {
                steam_id: "1".into(),
                app_id: "440".into(),
            },
        );
        drop(scope);

        let records = wait_for_records(&sink, 1).await;
        assert!(!records[0].success);
        assert_eq!(records[0].error_message, "request cancelled");
    }

    #[tokio::test]
    async fn test_finished_scope_records_once() {
        let sink = Arc::new(RecordingAuditSink::default());
        let logger = AuditLogger::new(sink.clone());

        let scope = logger.scope(
            Endpoint::ResolveVanityUrl,
            AuditParams::Vanity {
                vanity_name: "gaben".into(),
            },
        );
        scope.finish::<()>(&Ok(()));

        let records = wait_for_records(&sink, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.records().len(), 1);
        assert!(records[0].success);
    }

    #[tokio::test]
    async fn test_scope_measures_elapsed_time() {
        let sink = Arc::new(RecordingAuditSink::default());
        let logger = AuditLogger::new(sink.clone());

        let scope = logger.scope(
            Endpoint::GetOwnedGames,
            AuditParams::Profile {
                steam_id: "1".into(),
            },
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        scope.finish::<()>(&Ok(()));

        let records = wait_for_records(&sink, 1).await;
        assert!(records[0].duration >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_panic() {
        let logger = AuditLogger::new(Arc::new(FailingAuditSink));
        logger.record(AuditRecord::from_result::<()>(
            Endpoint::GetPlayerSummaries,
            AuditParams::Profile {
                steam_id: "1".into(),
            },
            Instant::now(),
            &Ok(()),
        ));
        tokio::task::yield_now().await;
    }
}
