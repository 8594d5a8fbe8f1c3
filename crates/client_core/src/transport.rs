//! Wire access to the remote todo logic.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{FuelParams, TodoRecord},
    error::{ApiError, ErrorCode},
    protocol::{
        receipt_route, routines_route, todos_route, InteractionReceipt, RoutineCall,
        SubmitRoutineRequest, SubmitRoutineResponse,
    },
};
use tracing::debug;
use url::Url;

use crate::error::RemoteError;

#[async_trait]
pub trait LogicTransport: Send + Sync {
    async fn read_todos(&self) -> Result<Vec<TodoRecord>, RemoteError>;
    async fn submit_routine(
        &self,
        call: RoutineCall,
        fuel: FuelParams,
    ) -> Result<SubmitRoutineResponse, RemoteError>;
    async fn fetch_receipt(&self, ix_hash: &str) -> Result<InteractionReceipt, RemoteError>;
}

pub struct HttpLogicTransport {
    http: Client,
    base_url: Url,
    logic_id: String,
}

impl HttpLogicTransport {
    pub fn new(base_url: Url, logic_id: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, logic_id)
    }

    pub fn with_client(http: Client, mut base_url: Url, logic_id: impl Into<String>) -> Self {
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            base_url,
            logic_id: logic_id.into(),
        }
    }

    pub fn logic_id(&self) -> &str {
        &self.logic_id
    }

    fn endpoint(&self, route: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|err| RemoteError::Transport(format!("invalid endpoint '{route}': {err}")))
    }
}

async fn decode_response<T: DeserializeOwned>(res: Response) -> Result<T, RemoteError> {
    let status = res.status();
    if status.is_success() {
        return res.json::<T>().await.map_err(RemoteError::from);
    }

    let body = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(api_error.into()),
        Err(_) => Err(RemoteError::Rejected {
            code: if status.is_client_error() {
                ErrorCode::Validation
            } else {
                ErrorCode::Internal
            },
            message: format!("HTTP {status}: {body}"),
        }),
    }
}

#[async_trait]
impl LogicTransport for HttpLogicTransport {
    async fn read_todos(&self) -> Result<Vec<TodoRecord>, RemoteError> {
        let url = self.endpoint(&todos_route(&self.logic_id))?;
        let res = self.http.get(url).send().await?;
        decode_response(res).await
    }

    async fn submit_routine(
        &self,
        call: RoutineCall,
        fuel: FuelParams,
    ) -> Result<SubmitRoutineResponse, RemoteError> {
        let url = self.endpoint(&routines_route(&self.logic_id))?;
        debug!(
            routine = call.name(),
            fuel_price = fuel.fuel_price,
            fuel_limit = fuel.fuel_limit,
            "submitting routine"
        );
        let res = self
            .http
            .post(url)
            .json(&SubmitRoutineRequest { call, fuel })
            .send()
            .await?;
        decode_response(res).await
    }

    async fn fetch_receipt(&self, ix_hash: &str) -> Result<InteractionReceipt, RemoteError> {
        let url = self.endpoint(&receipt_route(ix_hash))?;
        let res = self.http.get(url).send().await?;
        decode_response(res).await
    }
}
