use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{domain::FuelParams, error::ApiError};

/// Write routines exposed by the todo logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "routine", content = "args")]
pub enum RoutineCall {
    Add { name: String },
    MarkTodoCompleted { index: usize },
}

impl RoutineCall {
    pub fn name(&self) -> &'static str {
        match self {
            RoutineCall::Add { .. } => "Add",
            RoutineCall::MarkTodoCompleted { .. } => "MarkTodoCompleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRoutineRequest {
    pub call: RoutineCall,
    pub fuel: FuelParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRoutineResponse {
    pub ix_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionReceipt {
    pub ix_hash: String,
    pub status: ReceiptStatus,
    #[serde(default)]
    pub fuel_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl InteractionReceipt {
    pub fn pending(ix_hash: impl Into<String>) -> Self {
        Self {
            ix_hash: ix_hash.into(),
            status: ReceiptStatus::Pending,
            fuel_used: 0,
            error: None,
            confirmed_at: None,
        }
    }
}

pub fn todos_route(logic_id: &str) -> String {
    format!("/logics/{logic_id}/state/todos")
}

pub fn routines_route(logic_id: &str) -> String {
    format!("/logics/{logic_id}/routines")
}

pub fn receipt_route(ix_hash: &str) -> String {
    format!("/interactions/{ix_hash}/receipt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routine_call_is_tagged_by_routine_name() {
        let call = RoutineCall::MarkTodoCompleted { index: 2 };
        let value = serde_json::to_value(&call).expect("serialize");
        assert_eq!(value["routine"], "MarkTodoCompleted");
        assert_eq!(value["args"]["index"], 2);
        assert_eq!(call.name(), "MarkTodoCompleted");
    }

    #[test]
    fn pending_receipt_omits_error_and_confirmation() {
        let value = serde_json::to_value(InteractionReceipt::pending("0xabc")).expect("serialize");
        assert_eq!(value["status"], "pending");
        assert!(value.get("error").is_none());
        assert!(value.get("confirmed_at").is_none());
    }

    #[test]
    fn todo_record_defaults_completed_to_false() {
        let record: crate::domain::TodoRecord =
            serde_json::from_str(r#"{"name":"Buy milk"}"#).expect("deserialize");
        assert!(!record.completed);
    }
}
