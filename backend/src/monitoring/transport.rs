use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::event::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid monitoring endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Endpoint rejected envelope with status {0}")]
    Rejected(StatusCode),
}

/// Delivers envelopes to the tracking backend.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;
}

pub struct HttpTransport {
    endpoint: Url,
    client: Client,
}

impl HttpTransport {
    pub fn new(dsn: &str) -> Result<Self, TransportError> {
        let endpoint =
            Url::parse(dsn).map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", dsn, e)))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme {}",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("pubflow-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(envelope)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected(response.status()));
        }

        Ok(())
    }
}

enum Command {
    Send(Box<Envelope>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background task that drains the envelope queue.
#[derive(Clone)]
pub struct Worker {
    tx: mpsc::UnboundedSender<Command>,
}

impl Worker {
    /// Must be called from within a tokio runtime.
    pub fn spawn(transport: Arc<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx, transport));
        Self { tx }
    }

    pub fn enqueue(&self, envelope: Envelope) -> bool {
        self.tx.send(Command::Send(Box::new(envelope))).is_ok()
    }

    /// Waits until everything queued before this call was handed to the
    /// transport. Returns false on timeout.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_err() {
            return false;
        }

        matches!(tokio::time::timeout(timeout, done_rx).await, Ok(Ok(())))
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>, transport: Arc<dyn Transport>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Send(envelope) => {
                if let Err(e) = transport.send(&envelope).await {
                    tracing::warn!("Failed to deliver monitoring envelope: {}", e);
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Monitoring worker stopped");
}
