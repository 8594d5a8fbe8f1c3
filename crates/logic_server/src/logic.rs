//! In-memory todo logic with delayed, ordered confirmation of submitted routines.

use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use chrono::Utc;
use shared::{
    domain::{FuelParams, TodoRecord},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{InteractionReceipt, ReceiptStatus, RoutineCall},
};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineCosts {
    pub add: u64,
    pub complete: u64,
}

impl Default for RoutineCosts {
    fn default() -> Self {
        Self {
            add: 100,
            complete: 50,
        }
    }
}

impl RoutineCosts {
    fn of(&self, call: &RoutineCall) -> u64 {
        match call {
            RoutineCall::Add { .. } => self.add,
            RoutineCall::MarkTodoCompleted { .. } => self.complete,
        }
    }
}

/// Settled receipts kept for lookup; older ones are forgotten.
pub const DEFAULT_RECEIPT_RETENTION: usize = 1024;

struct Interaction {
    ix_hash: String,
    call: RoutineCall,
    fuel: FuelParams,
    due_at: Instant,
}

pub struct TodoLogic {
    todos: Vec<TodoRecord>,
    pending: VecDeque<Interaction>,
    receipts: HashMap<String, InteractionReceipt>,
    settled_order: VecDeque<String>,
    receipt_retention: usize,
    confirm_delay: Duration,
    costs: RoutineCosts,
}

impl TodoLogic {
    pub fn new(confirm_delay: Duration, costs: RoutineCosts) -> Self {
        Self {
            todos: Vec::new(),
            pending: VecDeque::new(),
            receipts: HashMap::new(),
            settled_order: VecDeque::new(),
            receipt_retention: DEFAULT_RECEIPT_RETENTION,
            confirm_delay,
            costs,
        }
    }

    pub fn with_todos(mut self, todos: Vec<TodoRecord>) -> Self {
        self.todos = todos;
        self
    }

    pub fn with_receipt_retention(mut self, retention: usize) -> Self {
        self.receipt_retention = retention.max(1);
        self
    }

    /// Records a routine for later execution. Only malformed submissions are
    /// rejected here; execution failures show up in the receipt.
    pub fn submit(
        &mut self,
        call: RoutineCall,
        fuel: FuelParams,
        now: Instant,
    ) -> Result<String, ApiException> {
        if fuel.fuel_price == 0 {
            return Err(ApiException::validation("fuel price must be positive"));
        }
        if let RoutineCall::Add { name } = &call {
            if name.trim().is_empty() {
                return Err(ApiException::validation("todo name must not be empty"));
            }
        }

        let ix_hash = format!("0x{}", Uuid::new_v4().simple());
        debug!(%ix_hash, routine = call.name(), "interaction queued");
        self.pending.push_back(Interaction {
            ix_hash: ix_hash.clone(),
            call,
            fuel,
            due_at: now + self.confirm_delay,
        });
        Ok(ix_hash)
    }

    pub fn todos(&mut self, now: Instant) -> Vec<TodoRecord> {
        self.settle_due(now);
        self.todos.clone()
    }

    pub fn receipt(
        &mut self,
        ix_hash: &str,
        now: Instant,
    ) -> Result<InteractionReceipt, ApiException> {
        self.settle_due(now);
        if let Some(receipt) = self.receipts.get(ix_hash) {
            return Ok(receipt.clone());
        }
        if self.pending.iter().any(|ix| ix.ix_hash == ix_hash) {
            return Ok(InteractionReceipt::pending(ix_hash));
        }
        Err(ApiException::not_found(format!("unknown interaction {ix_hash}")))
    }

    fn settle_due(&mut self, now: Instant) {
        while self.pending.front().is_some_and(|ix| ix.due_at <= now) {
            let Some(Interaction {
                ix_hash, call, fuel, ..
            }) = self.pending.pop_front()
            else {
                break;
            };

            let receipt = match self.execute(&call, fuel) {
                Ok(fuel_used) => {
                    info!(%ix_hash, routine = call.name(), fuel_used, "interaction confirmed");
                    InteractionReceipt {
                        ix_hash: ix_hash.clone(),
                        status: ReceiptStatus::Confirmed,
                        fuel_used,
                        error: None,
                        confirmed_at: Some(Utc::now()),
                    }
                }
                Err(error) => {
                    info!(%ix_hash, routine = call.name(), code = ?error.code, "interaction failed");
                    InteractionReceipt {
                        ix_hash: ix_hash.clone(),
                        status: ReceiptStatus::Failed,
                        fuel_used: 0,
                        error: Some(error),
                        confirmed_at: Some(Utc::now()),
                    }
                }
            };
            self.store_receipt(ix_hash, receipt);
        }
    }

    fn store_receipt(&mut self, ix_hash: String, receipt: InteractionReceipt) {
        self.receipts.insert(ix_hash.clone(), receipt);
        self.settled_order.push_back(ix_hash);
        while self.settled_order.len() > self.receipt_retention {
            if let Some(expired) = self.settled_order.pop_front() {
                self.receipts.remove(&expired);
            }
        }
    }

    fn execute(&mut self, call: &RoutineCall, fuel: FuelParams) -> Result<u64, ApiError> {
        let cost = self.costs.of(call);
        if fuel.fuel_limit < cost {
            return Err(ApiError::new(
                ErrorCode::FuelExhausted,
                format!(
                    "{} needs {cost} fuel, limit is {}",
                    call.name(),
                    fuel.fuel_limit
                ),
            ));
        }

        match call {
            RoutineCall::Add { name } => self.todos.push(TodoRecord::new(name.trim())),
            RoutineCall::MarkTodoCompleted { index } => {
                let len = self.todos.len();
                let todo = self.todos.get_mut(*index).ok_or_else(|| {
                    ApiError::new(
                        ErrorCode::NotFound,
                        format!("no todo at index {index} (list has {len})"),
                    )
                })?;
                todo.completed = true;
            }
        }
        Ok(cost)
    }
}

#[cfg(test)]
#[path = "tests/logic_tests.rs"]
mod tests;
