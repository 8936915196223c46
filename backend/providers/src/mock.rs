use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use atlas_core::{AtlasError, CompletionRequest, FragmentStream, LlmProvider};

/// How a scripted stream ends after its fragments.
#[derive(Debug, Clone)]
enum Ending {
    Complete,
    Error(String),
    /// Never ends; used to exercise cancellation.
    Hang,
}

/// A mock LLM provider that streams canned fragments.
///
/// Records every invocation so tests can assert on call counts and the
/// composed prompt.
pub struct MockProvider {
    name: String,
    configured: bool,
    fragments: Vec<String>,
    fail_before_stream: Option<String>,
    ending: Ending,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
    stream_dropped: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configured: true,
            fragments: vec!["Mock response".to_string()],
            fail_before_stream: None,
            ending: Ending::Complete,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Behave as if the provider credential were absent.
    pub fn without_credential(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Fail the call before any fragment is produced.
    pub fn failing_before_stream(mut self, message: impl Into<String>) -> Self {
        self.fail_before_stream = Some(message.into());
        self
    }

    /// Yield an error after all fragments have been sent.
    pub fn failing_mid_stream(mut self, message: impl Into<String>) -> Self {
        self.ending = Ending::Error(message.into());
        self
    }

    /// Keep the stream open forever after the last fragment.
    pub fn hanging(mut self) -> Self {
        self.ending = Ending::Hang;
        self
    }

    /// Number of `stream_chat` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }

    /// True once the most recently opened stream has been dropped.
    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }
}

/// Flags the owning provider when the scripted stream is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct ScriptState {
    fragments: std::vec::IntoIter<String>,
    ending: Option<Ending>,
    _flag: DropFlag,
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn stream_chat(&self, request: &CompletionRequest) -> Result<FragmentStream, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if let Some(message) = &self.fail_before_stream {
            return Err(AtlasError::provider(&self.name, message.clone()));
        }

        self.stream_dropped.store(false, Ordering::SeqCst);
        let state = ScriptState {
            fragments: self.fragments.clone().into_iter(),
            ending: Some(self.ending.clone()),
            _flag: DropFlag(Arc::clone(&self.stream_dropped)),
        };

        let stream = stream::unfold(state, |mut state| async move {
            if let Some(fragment) = state.fragments.next() {
                return Some((Ok(fragment), state));
            }
            match state.ending.take()? {
                Ending::Complete => None,
                Ending::Error(message) => {
                    Some((Err(AtlasError::StreamInterrupted(message)), state))
                }
                Ending::Hang => {
                    futures::future::pending::<()>().await;
                    None
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::PromptMessage;
    use futures::TryStreamExt;
    use std::time::Duration;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "mock".into(),
            messages: vec![PromptMessage::user("hi")],
            temperature: 0.6,
            top_p: 0.9,
        }
    }

    #[tokio::test]
    async fn test_scripted_fragments() {
        let provider = MockProvider::new("mock").with_fragments(["Hel", "lo"]);
        let fragments: Vec<String> = provider
            .stream_chat(&request())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(fragments, vec!["Hel", "lo"]);
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_request(), Some(request()));
        assert!(provider.stream_dropped());
    }

    #[tokio::test]
    async fn test_failing_mid_stream() {
        let provider = MockProvider::new("mock")
            .with_fragments(["partial"])
            .failing_mid_stream("connection reset");
        let mut stream = provider.stream_chat(&request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        assert!(matches!(
            stream.next().await,
            Some(Err(AtlasError::StreamInterrupted(_)))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_failing_before_stream() {
        let provider = MockProvider::new("mock").failing_before_stream("503");
        assert!(matches!(
            provider.stream_chat(&request()).await,
            Err(AtlasError::ProviderFailure { .. })
        ));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_hanging_stream_reports_drop() {
        let provider = MockProvider::new("mock").with_fragments(["a"]).hanging();
        let mut stream = provider.stream_chat(&request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        let next = tokio::time::timeout(Duration::from_millis(20), stream.next()).await;
        assert!(next.is_err());
        assert!(!provider.stream_dropped());
        drop(stream);
        assert!(provider.stream_dropped());
    }
}
