//! Audit sinks. The recorder's interface supports at least two sinks —
//! structured-JSON file and the persistent DB — which receive identical
//! payloads (spec §4.7). Grounded on the teacher's `AuditRepository`
//! trait shape (store/store_batch/query), narrowed to this crate's
//! append-only, single-record-per-request usage.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::{Result, RiskLevel, RoutingDecision};

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn store(&self, decision: &RoutingDecision) -> Result<()>;
}

/// Filters for `GET /internal/audit/logs` (spec §6).
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub risk_level: Option<RiskLevel>,
    pub department: Option<String>,
    pub audit_required: Option<bool>,
    pub page: usize,
    pub page_size: usize,
}

impl AuditLogFilter {
    fn matches(&self, decision: &RoutingDecision) -> bool {
        if let Some(level) = self.risk_level {
            if decision.risk_assessment.level != level {
                return false;
            }
        }
        if let Some(dept) = &self.department {
            if decision.classification.department.as_deref() != Some(dept.as_str()) {
                return false;
            }
        }
        if let Some(required) = self.audit_required {
            if decision.risk_assessment.audit_required != required {
                return false;
            }
        }
        true
    }
}

/// Implemented by sinks that also support the read path behind
/// `GET /internal/audit/logs`. The NDJSON file sink is write-only (spec
/// §4.7 describes it purely as an append-only transport), so it does not
/// implement this trait.
#[async_trait]
pub trait AuditQuery: Send + Sync {
    async fn query(&self, filter: &AuditLogFilter) -> Result<Vec<RoutingDecision>>;
}

/// Newline-delimited JSON file sink (spec §6 "Audit record format").
pub struct JsonFileSink {
    file: Mutex<tokio::fs::File>,
}

impl JsonFileSink {
    pub async fn open(path: &std::path::Path) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl AuditSink for JsonFileSink {
    async fn store(&self, decision: &RoutingDecision) -> Result<()> {
        let mut line = serde_json::to_vec(decision)?;
        line.push(b'\n');
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Postgres-backed sink for `GET /internal/audit/logs` queries.
pub struct PostgresAuditSink {
    pool: sqlx::PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn store(&self, decision: &RoutingDecision) -> Result<()> {
        let payload = serde_json::to_value(decision)?;
        sqlx::query(
            r#"
            INSERT INTO routing_audit_log (request_id, risk_level, department, audit_required, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, now())
            "#,
        )
        .bind(decision.request_id)
        .bind(format!("{:?}", decision.risk_assessment.level))
        .bind(
            decision
                .classification
                .department
                .clone()
                .unwrap_or_default(),
        )
        .bind(decision.risk_assessment.audit_required)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditQuery for PostgresAuditSink {
    async fn query(&self, filter: &AuditLogFilter) -> Result<Vec<RoutingDecision>> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT payload FROM routing_audit_log
            WHERE ($1::text IS NULL OR risk_level = $1)
              AND ($2::text IS NULL OR department = $2)
              AND ($3::bool IS NULL OR audit_required = $3)
            ORDER BY created_at DESC
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(filter.risk_level.map(|l| format!("{l:?}")))
        .bind(filter.department.clone())
        .bind(filter.audit_required)
        .bind((filter.page * filter.page_size.max(1)) as i64)
        .bind(filter.page_size.max(1) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(payload,)| serde_json::from_value(payload).map_err(Into::into))
            .collect()
    }
}

/// In-process sink used by tests and local development when no DB/file
/// sink is configured.
#[derive(Default)]
pub struct InMemorySink {
    records: tokio::sync::Mutex<Vec<RoutingDecision>>,
}

#[async_trait]
impl AuditSink for InMemorySink {
    async fn store(&self, decision: &RoutingDecision) -> Result<()> {
        self.records.lock().await.push(decision.clone());
        Ok(())
    }
}

impl InMemorySink {
    pub async fn records(&self) -> Vec<RoutingDecision> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditQuery for InMemorySink {
    async fn query(&self, filter: &AuditLogFilter) -> Result<Vec<RoutingDecision>> {
        let records = self.records.lock().await;
        let page_size = filter.page_size.max(1);
        Ok(records
            .iter()
            .rev()
            .filter(|d| filter.matches(d))
            .skip(filter.page * page_size)
            .take(page_size)
            .cloned()
            .collect())
    }
}
