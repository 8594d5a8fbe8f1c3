//! RemoteListGateway: the three remote list operations behind one async seam.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{FuelParams, ItemId, TodoRecord},
    error::ErrorCode,
    protocol::{InteractionReceipt, ReceiptStatus, RoutineCall},
};
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    error::{Operation, RemoteError, SyncError},
    transport::{HttpLogicTransport, LogicTransport},
};

/// Opaque marker that the backend applied a submitted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub ix_hash: String,
    pub fuel_used: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for AckPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            timeout: Duration::from_secs(60),
        }
    }
}

#[async_trait]
pub trait RemoteListGateway: Send + Sync {
    async fn fetch_list(&self) -> Result<Vec<TodoRecord>, SyncError>;
    async fn submit_add(&self, name: &str) -> Result<Ack, SyncError>;
    async fn submit_complete(&self, id: ItemId) -> Result<Ack, SyncError>;
}

/// Gateway used when no backend connection was configured.
pub struct MissingListGateway;

#[async_trait]
impl RemoteListGateway for MissingListGateway {
    async fn fetch_list(&self) -> Result<Vec<TodoRecord>, SyncError> {
        Err(SyncError::remote(
            Operation::Load,
            RemoteError::Unavailable("no logic backend configured".into()),
        ))
    }

    async fn submit_add(&self, _name: &str) -> Result<Ack, SyncError> {
        Err(SyncError::remote(
            Operation::Add,
            RemoteError::Unavailable("no logic backend configured".into()),
        ))
    }

    async fn submit_complete(&self, _id: ItemId) -> Result<Ack, SyncError> {
        Err(SyncError::remote(
            Operation::Complete,
            RemoteError::Unavailable("no logic backend configured".into()),
        ))
    }
}

/// A submitted write whose acknowledgment has not been observed yet.
///
/// Dropping it stops waiting but does not withdraw the write.
pub struct PendingWrite {
    ix_hash: String,
    transport: Arc<dyn LogicTransport>,
    policy: AckPolicy,
}

impl std::fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWrite")
            .field("ix_hash", &self.ix_hash)
            .field("policy", &self.policy)
            .finish()
    }
}

impl PendingWrite {
    pub fn ix_hash(&self) -> &str {
        &self.ix_hash
    }

    pub async fn wait(self) -> Result<Ack, RemoteError> {
        let outcome = tokio::time::timeout(self.policy.timeout, self.poll_until_settled()).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    ix_hash = %self.ix_hash,
                    timeout = ?self.policy.timeout,
                    "gave up waiting for acknowledgment"
                );
                Err(RemoteError::AckTimeout {
                    ix_hash: self.ix_hash,
                    waited: self.policy.timeout,
                })
            }
        }
    }

    async fn poll_until_settled(&self) -> Result<Ack, RemoteError> {
        loop {
            let receipt = self.transport.fetch_receipt(&self.ix_hash).await?;
            match receipt.status {
                ReceiptStatus::Pending => tokio::time::sleep(self.policy.poll_interval).await,
                ReceiptStatus::Confirmed => {
                    return Ok(Ack {
                        ix_hash: receipt.ix_hash,
                        fuel_used: receipt.fuel_used,
                    })
                }
                ReceiptStatus::Failed => return Err(receipt_failure(receipt)),
            }
        }
    }
}

fn receipt_failure(receipt: InteractionReceipt) -> RemoteError {
    match receipt.error {
        Some(error) => RemoteError::InteractionFailed {
            ix_hash: receipt.ix_hash,
            code: Some(error.code),
            reason: error.message,
        },
        None => RemoteError::InteractionFailed {
            ix_hash: receipt.ix_hash,
            code: None,
            reason: "backend reported failure without a reason".into(),
        },
    }
}

/// Gateway backed by a [`LogicTransport`], carrying the static fuel budget.
pub struct LogicGateway {
    transport: Arc<dyn LogicTransport>,
    fuel: FuelParams,
    ack: AckPolicy,
}

impl LogicGateway {
    pub fn new(transport: Arc<dyn LogicTransport>, fuel: FuelParams, ack: AckPolicy) -> Self {
        Self {
            transport,
            fuel,
            ack,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        settings.validate()?;
        let transport = HttpLogicTransport::new(settings.base_url()?, settings.logic_id.clone());
        Ok(Self::new(
            Arc::new(transport),
            settings.fuel(),
            settings.ack_policy(),
        ))
    }

    pub fn fuel(&self) -> FuelParams {
        self.fuel
    }

    pub async fn submit(&self, call: RoutineCall) -> Result<PendingWrite, RemoteError> {
        let routine = call.name();
        let submitted = self.transport.submit_routine(call, self.fuel).await?;
        debug!(routine, ix_hash = %submitted.ix_hash, "routine accepted, awaiting acknowledgment");
        Ok(PendingWrite {
            ix_hash: submitted.ix_hash,
            transport: Arc::clone(&self.transport),
            policy: self.ack,
        })
    }
}

pub(crate) fn validate_name(name: &str) -> Result<&str, SyncError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SyncError::Validation("todo name must not be empty".into()));
    }
    Ok(name)
}

#[async_trait]
impl RemoteListGateway for LogicGateway {
    async fn fetch_list(&self) -> Result<Vec<TodoRecord>, SyncError> {
        self.transport
            .read_todos()
            .await
            .map_err(|err| SyncError::remote(Operation::Load, err))
    }

    async fn submit_add(&self, name: &str) -> Result<Ack, SyncError> {
        let name = validate_name(name)?;
        let ack = self
            .submit(RoutineCall::Add {
                name: name.to_string(),
            })
            .await
            .map_err(|err| SyncError::remote(Operation::Add, err))?
            .wait()
            .await
            .map_err(|err| SyncError::remote(Operation::Add, err))?;
        info!(ix_hash = %ack.ix_hash, fuel_used = ack.fuel_used, "add acknowledged");
        Ok(ack)
    }

    async fn submit_complete(&self, id: ItemId) -> Result<Ack, SyncError> {
        let not_found = |err: RemoteError| {
            if err.code() == Some(ErrorCode::NotFound) {
                SyncError::NotFound { id, len: None }
            } else {
                SyncError::remote(Operation::Complete, err)
            }
        };
        let ack = self
            .submit(RoutineCall::MarkTodoCompleted { index: id.0 })
            .await
            .map_err(not_found)?
            .wait()
            .await
            .map_err(not_found)?;
        info!(ix_hash = %ack.ix_hash, fuel_used = ack.fuel_used, id = id.0, "complete acknowledged");
        Ok(ack)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
