// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the task service.

use crate::cache::TaskCache;
use crate::types::{
    CommentListing, CompletionRequest, CompletionResponse, LogListing, QueueResponse,
    RefreshResponse, TaskEnvelope, TaskListing,
};
use crate::ClientError;
use agx_core::Task;
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Connection settings for the task service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_id: String,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
}

impl ClientConfig {
    pub fn from_env(config: &agx_core::Config) -> Self {
        Self {
            base_url: config.cloud_url.clone(),
            user_id: config.user_id.clone(),
            token: std::env::var("AGX_TOKEN").ok().filter(|s| !s.is_empty()),
            refresh_token: std::env::var("AGX_REFRESH_TOKEN").ok().filter(|s| !s.is_empty()),
        }
    }
}

struct AuthState {
    token: Option<String>,
    refresh_token: Option<String>,
}

/// Task service REST client.
///
/// A `401` triggers a single token refresh and a one-shot retry; any
/// non-2xx afterward surfaces as [`ClientError::Service`] with the response
/// payload's `error` field.
#[derive(Clone)]
pub struct TaskServiceClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    auth: Arc<Mutex<AuthState>>,
    cache: Option<TaskCache>,
}

impl TaskServiceClient {
    pub fn new(config: ClientConfig, cache: Option<TaskCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id,
            auth: Arc::new(Mutex::new(AuthState {
                token: config.token,
                refresh_token: config.refresh_token,
            })),
            cache,
        }
    }

    pub fn cache(&self) -> Option<&TaskCache> {
        self.cache.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header("Content-Type", "application/json")
            .header("x-user-id", &self.user_id);
        if let Some(token) = self.auth.lock().token.clone() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Attempt one token refresh. Returns false when no refresh is possible.
    async fn try_refresh(&self) -> Result<bool, ClientError> {
        let refresh_token = match self.auth.lock().refresh_token.clone() {
            Some(t) => t,
            None => return Ok(false),
        };
        let response = self
            .http
            .post(self.url("/api/auth/refresh"))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let refreshed: RefreshResponse = response.json().await?;
        let mut auth = self.auth.lock();
        auth.token = Some(refreshed.access_token);
        if let Some(next) = refreshed.refresh_token {
            auth.refresh_token = Some(next);
        }
        Ok(true)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        let mut response = self.send_once(method.clone(), path, body).await?;
        if response.status() == StatusCode::UNAUTHORIZED && self.try_refresh().await? {
            response = self.send_once(method, path, body).await?;
        }
        let status = response.status();
        if !status.is_success() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            tracing::debug!(path, status = status.as_u16(), message = %message, "request failed");
            return Err(ClientError::Service { status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }

    /// Claim the next queued task, if any.
    pub async fn poll_queue(&self) -> Result<Option<Task>, ClientError> {
        let response: QueueResponse = self.request(Method::GET, "/api/queue", None).await?;
        Ok(response.task)
    }

    /// List all tasks, refreshing the local cache used by numeric lookup.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let listing: TaskListing = self.request(Method::GET, "/api/tasks", None).await?;
        if let Some(cache) = &self.cache {
            cache.store(&listing.tasks)?;
        }
        Ok(listing.tasks)
    }

    pub async fn get_task_by_slug(&self, slug: &str) -> Result<Option<Task>, ClientError> {
        let envelope: TaskEnvelope = self
            .request(Method::GET, &format!("/api/tasks?slug={slug}"), None)
            .await?;
        Ok(envelope.task)
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, ClientError> {
        let envelope: TaskEnvelope =
            self.request(Method::GET, &format!("/api/tasks/{id}"), None).await?;
        envelope.task.ok_or_else(|| ClientError::TaskNotFound(id.to_string()))
    }

    pub async fn get_comments(&self, id: &str) -> Result<Vec<crate::Comment>, ClientError> {
        let listing: CommentListing = self
            .request(Method::GET, &format!("/api/tasks/{id}/comments"), None)
            .await?;
        Ok(listing.comments)
    }

    pub async fn get_logs(
        &self,
        id: &str,
        tail: Option<u32>,
    ) -> Result<Vec<crate::LogEntry>, ClientError> {
        let path = match tail {
            Some(n) => format!("/api/tasks/{id}/logs?tail={n}"),
            None => format!("/api/tasks/{id}/logs"),
        };
        let listing: LogListing = self.request(Method::GET, &path, None).await?;
        Ok(listing.logs)
    }

    pub async fn post_log(&self, id: &str, content: &str, log_type: &str) -> Result<(), ClientError> {
        let body = serde_json::json!({ "content": content, "log_type": log_type });
        let _: Value = self
            .request(Method::POST, &format!("/api/tasks/{id}/logs"), Some(&body))
            .await?;
        Ok(())
    }

    pub async fn post_comment(&self, id: &str, content: &str) -> Result<(), ClientError> {
        let body = serde_json::json!({ "content": content });
        let _: Value = self
            .request(Method::POST, &format!("/api/tasks/{id}/comments"), Some(&body))
            .await?;
        Ok(())
    }

    /// Patch partial task state (status, stage, timestamps, ...).
    pub async fn patch_task(&self, id: &str, partial: &Value) -> Result<Task, ClientError> {
        let envelope: TaskEnvelope = self
            .request(Method::PATCH, &format!("/api/tasks/{id}"), Some(partial))
            .await?;
        envelope.task.ok_or_else(|| ClientError::TaskNotFound(id.to_string()))
    }

    /// Post a completion payload; the service advances the stage machine.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::Cache(e.to_string()))?;
        self.request(Method::POST, "/api/queue/complete", Some(&body)).await
    }

    /// Open the server-sent event stream for live task updates.
    ///
    /// Yields the `data:` payload of each event as a raw string.
    pub async fn open_event_stream(
        &self,
    ) -> Result<impl Stream<Item = String>, ClientError> {
        let response = self.send_once(Method::GET, "/api/events", None).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Service {
                status: status.as_u16(),
                message: "event stream rejected".to_string(),
            });
        }
        let stream = response.bytes_stream();
        let mut buffer = String::new();
        Ok(stream.filter_map(move |chunk| {
            let mut out = Vec::new();
            if let Ok(bytes) = chunk {
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim_end_matches('\r').to_string();
                    buffer.drain(..=pos);
                    if let Some(data) = line.strip_prefix("data:") {
                        out.push(data.trim().to_string());
                    }
                }
            }
            futures_util::future::ready(if out.is_empty() {
                None
            } else {
                Some(futures_util::stream::iter(out))
            })
        })
        .flatten())
    }
}
