//! Request transport for the chat endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::debug;

use atlas_core::ChatRequest;

use crate::error::ClientError;

pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Status line plus the (possibly absent) streaming body.
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<ByteStream>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one chat request. Resolves once response headers arrive.
    async fn send(&self, request: &ChatRequest) -> Result<TransportResponse, ClientError>;
}

/// `POST {base}/api/chat` over reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(client: Client, server_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/chat", server_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<TransportResponse, ClientError> {
        debug!(
            endpoint = %self.endpoint,
            history_len = request.history.len(),
            "Sending chat request"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ClientError::StreamInterrupted(e.to_string())))
            .boxed();

        Ok(TransportResponse {
            status,
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ChatSession, FALLBACK_APOLOGY, INTERRUPTION_NOTICE};
    use crate::state::{FailureReason, StreamState};
    use atlas_core::{catalog, ChatRole};
    use atlas_gateway::{build_router, GatewayState};
    use atlas_providers::MockProvider;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn spawn_gateway(provider: Arc<MockProvider>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(GatewayState::new(provider, "gpt-4o-mini"));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_endpoint_joins_path() {
        assert_eq!(
            HttpTransport::new("http://localhost:8080/").endpoint(),
            "http://localhost:8080/api/chat"
        );
    }

    #[tokio::test]
    async fn test_end_to_end_stream() {
        let provider = Arc::new(MockProvider::new("mock").with_fragments(["Hel", "lo"]));
        let url = spawn_gateway(provider.clone()).await;

        let mut session = ChatSession::new(HttpTransport::new(&url));
        session.set_focus(Some(catalog()[0].focus()));
        session.submit("How are the schools?").await.unwrap();

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[2].content, "Hello");
        assert_eq!(session.state(), &StreamState::Completed);

        let request = provider.last_request().unwrap();
        assert!(request.messages[1]
            .content
            .contains("Active focus: Pacific Heights Victorian"));
        assert_eq!(
            request.messages.last().unwrap().content,
            "How are the schools?"
        );
    }

    #[tokio::test]
    async fn test_end_to_end_missing_credential() {
        let provider = Arc::new(MockProvider::new("mock").without_credential());
        let url = spawn_gateway(provider.clone()).await;

        let mut session = ChatSession::new(HttpTransport::new(&url));
        let result = session.submit("hi").await;

        assert!(matches!(result, Err(ClientError::Status(500))));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].content, FALLBACK_APOLOGY);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_mid_stream_failure() {
        let provider = Arc::new(
            MockProvider::new("mock")
                .with_fragments(["partial ", "answer"])
                .failing_mid_stream("connection reset"),
        );
        let url = spawn_gateway(provider).await;

        let mut session = ChatSession::new(HttpTransport::new(&url));
        let result = session.submit("hi").await;

        assert!(matches!(result, Err(ClientError::StreamInterrupted(_))));
        assert!(matches!(
            session.state(),
            StreamState::Failed(FailureReason::StreamInterrupted(_))
        ));
        assert_eq!(
            session.messages().last().unwrap().content,
            INTERRUPTION_NOTICE
        );
    }

    #[tokio::test]
    async fn test_unreachable_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut session = ChatSession::new(HttpTransport::new(&format!("http://{addr}")));
        let result = session.submit("hi").await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(session.messages()[1].content, FALLBACK_APOLOGY);
        assert!(session.state().accepts_input());
    }
}
