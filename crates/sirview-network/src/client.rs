use std::sync::Arc;

use sirview_protocol::{
    decode_run_result, truncate_body, ProtocolError, RunResult, SimulationParams, HEALTH_PATH,
    RUN_PATH, STREAM_PATH,
};

use crate::stream::{read_stream, StreamRequest};
use crate::{ClientError, StreamEvent, Subscription, TransportConfig};

/// Client for the simulation service. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TransportClient {
    http: reqwest::Client,
    config: Arc<TransportConfig>,
}

impl TransportClient {
    pub fn new(config: TransportConfig) -> Result<Self, ClientError> {
        let http = config.build_http_client()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Fetch a complete run. The result is validated before it is returned,
    /// so callers never observe a partially valid run.
    pub async fn run_batch(&self, params: &SimulationParams) -> Result<RunResult, ClientError> {
        params.validate()?;
        let url = self.config.endpoint(RUN_PATH);
        tracing::debug!(
            url = %url,
            population = params.population_size,
            duration = params.duration,
            "Requesting batch run"
        );

        let response = self
            .http
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(params)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(ProtocolError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let run = decode_run_result(&body, params)?;
        tracing::info!(frames = run.len(), "Batch run received");
        Ok(run)
    }

    /// Ask the service whether it is up. Returns the plain-text reply.
    pub async fn health(&self) -> Result<String, ClientError> {
        let url = self.config.endpoint(HEALTH_PATH);
        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(ProtocolError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            }
            .into());
        }
        Ok(body)
    }

    /// Subscribe to the live stream. Must be called from within a tokio
    /// runtime; the connection is made by a background task that reports
    /// through `emit` until `emit` returns `false`, a terminal event is
    /// emitted, or the returned [`Subscription`] is closed.
    pub fn open_stream<F>(&self, params: &SimulationParams, mut emit: F) -> Subscription
    where
        F: FnMut(StreamEvent) -> bool + Send + 'static,
    {
        let params = params.clone();
        let http = self.http.clone();
        let url = self.config.endpoint(STREAM_PATH);

        let task = tokio::spawn(async move {
            if let Err(e) = params.validate() {
                emit(StreamEvent::Failed(e.into()));
                return;
            }
            let request = StreamRequest {
                url,
                query: params.stream_query(),
                population_size: params.population_size,
            };
            read_stream(http, request, emit).await;
        });

        Subscription::new(task.abort_handle())
    }
}
