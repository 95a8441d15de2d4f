//! Stream session: one streaming exchange with the backend.
//!
//! ```text
//! Idle -> Opening -> Streaming -> Completed | Failed | Cancelled
//! ```
//!
//! Terminal states are absorbing. [`StreamSession::next_event`] yields events
//! in wire order, then at most one terminal event ([`SessionEvent::Completed`]
//! or [`SessionEvent::Failed`]), then `None` forever. Cancellation yields no
//! terminal event at all.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ChatError, ChatResult};
use crate::sse::{decode_lines, EventParser, StreamEvent};
use crate::traits::{ByteStream, Headers, HttpClient, HttpError};

const OPEN_OPERATION: &str = "open chat stream";
const READ_OPERATION: &str = "read chat stream";

type LineStream = Pin<Box<dyn Stream<Item = Result<String, HttpError>> + Send>>;

/// Fail the body with [`HttpError::Timeout`] when no chunk arrives within
/// `timeout`. Nothing is read after that.
fn bounded_chunks(body: ByteStream, timeout: Duration) -> ByteStream {
    Box::pin(stream::unfold(
        (body, false),
        move |(mut body, timed_out)| async move {
            if timed_out {
                return None;
            }
            match tokio::time::timeout(timeout, body.next()).await {
                Ok(Some(chunk)) => Some((chunk, (body, false))),
                Ok(None) => None,
                Err(_elapsed) => Some((
                    Err(HttpError::Timeout(format!("no data for {timeout:?}"))),
                    (body, true),
                )),
            }
        },
    ))
}

/// A fully prepared streaming request.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub url: String,
    pub body: String,
    pub headers: Headers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// What a session delivers to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Event(StreamEvent),
    /// The transport ended normally.
    Completed,
    /// Transport failure, timeout or backend `error` event.
    Failed(ChatError),
}

pub struct StreamSession {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
    cancel: CancellationToken,
    state: SessionState,
    lines: Option<LineStream>,
    parser: EventParser,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .field("events", &self.parser.events())
            .finish()
    }
}

impl StreamSession {
    /// `timeout` bounds opening the stream and each wait for the next chunk.
    pub fn new(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            http,
            timeout,
            cancel: CancellationToken::new(),
            state: SessionState::Idle,
            lines: None,
            parser: EventParser::new(),
        }
    }

    /// Observe an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Lines dropped as malformed so far.
    pub fn malformed_lines(&self) -> u64 {
        self.parser.malformed()
    }

    /// Cancel the session and release the transport. No terminal event is
    /// delivered afterwards.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.mark_cancelled();
    }

    fn mark_cancelled(&mut self) {
        if !self.state.is_terminal() {
            debug!("Stream session cancelled");
            self.state = SessionState::Cancelled;
        }
        self.lines = None;
    }

    fn fail(&mut self, err: ChatError) -> SessionEvent {
        warn!(error = %err, code = err.error_code(), "Stream session failed");
        self.state = SessionState::Failed;
        self.lines = None;
        SessionEvent::Failed(err)
    }

    /// Issue the request. On failure the session is `Failed` (or `Cancelled`)
    /// and delivers nothing further.
    pub async fn start(&mut self, request: &StreamRequest) -> ChatResult<()> {
        if self.state != SessionState::Idle {
            return Err(ChatError::InvalidArgument(
                "stream session already started".to_string(),
            ));
        }
        self.state = SessionState::Opening;
        debug!(url = %request.url, "Opening chat stream");

        let cancel = self.cancel.clone();
        let open = tokio::time::timeout(
            self.timeout,
            self.http
                .post_stream(&request.url, &request.body, &request.headers),
        );
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = open => Some(result),
        };

        match opened {
            None => {
                self.mark_cancelled();
                Err(ChatError::Cancelled)
            }
            Some(Err(_elapsed)) => {
                self.state = SessionState::Failed;
                Err(ChatError::timeout(OPEN_OPERATION, self.timeout))
            }
            Some(Ok(Err(e))) => {
                self.state = SessionState::Failed;
                Err(ChatError::from_transport(e, OPEN_OPERATION, self.timeout))
            }
            Some(Ok(Ok(body))) => {
                self.lines = Some(Box::pin(decode_lines(bounded_chunks(body, self.timeout))));
                self.state = SessionState::Streaming;
                Ok(())
            }
        }
    }

    /// Next event, or `None` once the session is over.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if self.state != SessionState::Streaming {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.mark_cancelled();
                return None;
            }
            if self.lines.is_none() {
                return Some(self.fail(ChatError::protocol("stream body missing")));
            }

            let cancel = self.cancel.clone();
            let Some(lines) = self.lines.as_mut() else {
                return None;
            };
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                line = lines.next() => Some(line),
            };

            match read {
                None => {
                    self.mark_cancelled();
                    return None;
                }
                Some(Some(Ok(line))) => match self.parser.feed_line(&line) {
                    Ok(Some(event)) => return Some(SessionEvent::Event(event)),
                    Ok(None) => {}
                    Err(e) => return Some(self.fail(e)),
                },
                Some(Some(Err(e))) => {
                    let err = ChatError::from_transport(e, READ_OPERATION, self.timeout);
                    return Some(self.fail(err));
                }
                Some(None) => {
                    self.lines = None;
                    self.state = SessionState::Completed;
                    info!(
                        events = self.parser.events(),
                        malformed = self.parser.malformed(),
                        "Chat stream completed"
                    );
                    return Some(SessionEvent::Completed);
                }
            }
        }
    }

    /// Consume the session as a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = SessionEvent> + Send {
        stream::unfold(self, |mut session| async move {
            session.next_event().await.map(|event| (event, session))
        })
    }
}
