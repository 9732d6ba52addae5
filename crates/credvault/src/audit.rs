//! Audit facts for mutating operations.
//!
//! Each successful mutation produces a batch of [`AuditEvent`]s, collected in
//! an [`AuditRecorder`] while the operation runs and handed to the
//! [`AuditSink`] only after the store has accepted the change. Failed
//! operations publish nothing.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Kind of mutation being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    CredentialUpdate,
    CredentialDelete,
    AclUpdate,
    AclDelete,
}

impl AuditOperation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::CredentialUpdate => "credential_update",
            AuditOperation::CredentialDelete => "credential_delete",
            AuditOperation::AclUpdate => "acl_update",
            AuditOperation::AclDelete => "acl_delete",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub operation: AuditOperation,
    pub actor: String,
    pub resource_name: String,
    pub resource_uuid: Option<Uuid>,
    pub version_uuid: Option<Uuid>,
    /// Unix ms.
    pub timestamp: i64,
}

/// Error publishing audit events.
#[derive(Debug, Error)]
#[error("audit sink {sink} failed: {message}")]
pub struct AuditError {
    pub sink: String,
    pub message: String,
}

/// Receives the events of each successful mutation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Unique name for this sink, used in logs.
    fn name(&self) -> &str;

    /// Publish the events of one operation.
    async fn publish(&self, events: &[AuditEvent]) -> Result<(), AuditError>;
}

/// Emits each event as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn publish(&self, events: &[AuditEvent]) -> Result<(), AuditError> {
        for event in events {
            let resource_uuid = event.resource_uuid.map(|u| u.to_string());
            let version_uuid = event.version_uuid.map(|u| u.to_string());
            tracing::info!(
                target: "credvault_audit",
                operation = event.operation.as_str(),
                actor = %event.actor,
                resource_name = %event.resource_name,
                resource_uuid,
                version_uuid,
                timestamp = event.timestamp,
                "audit event"
            );
        }
        Ok(())
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, events: &[AuditEvent]) -> Result<(), AuditError> {
        let mut stored = self.events.lock().map_err(|e| AuditError {
            sink: self.name().to_string(),
            message: format!("lock poisoned: {}", e),
        })?;
        stored.extend_from_slice(events);
        Ok(())
    }
}

/// Accumulates the events of one in-flight operation.
#[derive(Debug)]
pub struct AuditRecorder {
    actor: String,
    timestamp: i64,
    events: Vec<AuditEvent>,
}

impl AuditRecorder {
    pub fn new(actor: impl Into<String>, timestamp: i64) -> Self {
        Self {
            actor: actor.into(),
            timestamp,
            events: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        operation: AuditOperation,
        resource_name: impl Into<String>,
        resource_uuid: Option<Uuid>,
        version_uuid: Option<Uuid>,
    ) {
        self.events.push(AuditEvent {
            operation,
            actor: self.actor.clone(),
            resource_name: resource_name.into(),
            resource_uuid,
            version_uuid,
            timestamp: self.timestamp,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<AuditEvent> {
        self.events
    }
}
