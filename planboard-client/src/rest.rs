/// HTTP implementation of `BoardStore` against the remote board service.
///
/// Every call is one request; non-2xx responses become `StoreError::Status`
/// and are logged under `planboard.rest`.
use std::future::Future;
use std::time::Duration;

use planboard_core::storage::{BoardStore, StoreError};
use planboard_core::wire::{
    ColumnUpdate, LabelCreate, LabelsBody, RemoteColumn, RemoteLabel, RemoteTask, TaskUpdate,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
}

fn method_name(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        _ => "OTHER",
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

impl RestStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, StoreError> {
        let name = method_name(&method);
        let url = format!("{}{}", self.base_url, path);
        log::debug!("[planboard.rest] {} {}", name, url);

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| {
            log::warn!("[planboard.rest] {} {} failed: {}", name, path, e);
            transport_error(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("[planboard.rest] {} {} returned {}", name, path, status);
            return Err(StoreError::Status {
                method: name,
                path,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: Option<serde_json::Value>,
    ) -> Result<T, StoreError> {
        let response = self.send(method, path.clone(), body).await?;
        response.json::<T>().await.map_err(|e| StoreError::Decode {
            path,
            message: e.to_string(),
        })
    }

    async fn call_unit(
        &self,
        method: Method,
        path: String,
        body: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        self.send(method, path, body).await.map(|_| ())
    }
}

fn to_body<B: Serialize>(body: &B) -> Option<serde_json::Value> {
    // Plain structs of strings and numbers always serialize.
    serde_json::to_value(body).ok()
}

impl BoardStore for RestStore {
    fn list_columns(&self) -> impl Future<Output = Result<Vec<RemoteColumn>, StoreError>> + Send {
        self.call_json(Method::GET, "/columns".to_string(), None)
    }

    fn create_column(
        &self,
        body: ColumnUpdate,
    ) -> impl Future<Output = Result<RemoteColumn, StoreError>> + Send {
        self.call_json(Method::POST, "/columns".to_string(), to_body(&body))
    }

    fn update_column(
        &self,
        column_id: u64,
        body: ColumnUpdate,
    ) -> impl Future<Output = Result<RemoteColumn, StoreError>> + Send {
        self.call_json(Method::PUT, format!("/columns/{}", column_id), to_body(&body))
    }

    fn delete_column(&self, column_id: u64) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.call_unit(Method::DELETE, format!("/columns/{}", column_id), None)
    }

    fn list_tasks(
        &self,
        column_id: u64,
    ) -> impl Future<Output = Result<Vec<RemoteTask>, StoreError>> + Send {
        self.call_json(Method::GET, format!("/tasks?column_id={}", column_id), None)
    }

    fn create_task(
        &self,
        body: TaskUpdate,
    ) -> impl Future<Output = Result<RemoteTask, StoreError>> + Send {
        self.call_json(Method::POST, "/tasks".to_string(), to_body(&body))
    }

    fn update_task(
        &self,
        task_id: u64,
        body: TaskUpdate,
    ) -> impl Future<Output = Result<RemoteTask, StoreError>> + Send {
        self.call_json(Method::PUT, format!("/tasks/{}", task_id), to_body(&body))
    }

    fn delete_task(&self, task_id: u64) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.call_unit(Method::DELETE, format!("/tasks/{}", task_id), None)
    }

    fn task_labels(
        &self,
        task_id: u64,
    ) -> impl Future<Output = Result<Vec<RemoteLabel>, StoreError>> + Send {
        self.call_json(Method::GET, format!("/tasks/{}/labels", task_id), None)
    }

    fn replace_task_labels(
        &self,
        task_id: u64,
        labels: Vec<LabelCreate>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.call_unit(
            Method::POST,
            format!("/tasks/{}/labels", task_id),
            to_body(&LabelsBody { labels }),
        )
    }
}
