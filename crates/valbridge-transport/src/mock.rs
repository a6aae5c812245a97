//! Scripted in-memory transports for tests.
//!
//! Enabled by the `test-util` feature. Downstream crates turn it on in
//! their `[dev-dependencies]`:
//!
//! ```toml
//! valbridge-transport = { workspace = true, features = ["test-util"] }
//! ```
//!
//! Both fakes are cheap `Clone` handles over shared state, so a test keeps
//! one handle to inspect while the code under test owns another.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    ConnectionId, EventStream, HttpRequest, HttpResponse, HttpTransport, StreamConnector,
    StreamTarget, TransportError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

type Scripted = Result<HttpResponse, TransportError>;

struct Route {
    fragment: String,
    queue: VecDeque<Scripted>,
    repeat: Option<Scripted>,
}

#[derive(Default)]
struct Script {
    routes: Vec<Route>,
    log: Vec<HttpRequest>,
}

impl Script {
    fn route(&mut self, fragment: &str) -> &mut Route {
        let index = match self.routes.iter().position(|r| r.fragment == fragment) {
            Some(index) => index,
            None => {
                self.routes.push(Route {
                    fragment: fragment.to_string(),
                    queue: VecDeque::new(),
                    repeat: None,
                });
                self.routes.len() - 1
            }
        };
        &mut self.routes[index]
    }
}

/// An [`HttpTransport`] that replays canned responses.
///
/// Responses are routed by URL fragment: a request is answered by the
/// first route whose fragment occurs in its URL and which still has
/// something to say. One-shot responses ([`push`](Self::push)) are
/// consumed in order; once they run out the route's
/// [`always`](Self::always) response, if any, answers every further
/// request. A request nothing answers fails with
/// [`TransportError::Connect`].
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot response for URLs containing `fragment`.
    pub fn push(&self, fragment: &str, response: HttpResponse) -> &Self {
        lock(&self.script).route(fragment).queue.push_back(Ok(response));
        self
    }

    /// Queues a one-shot transport failure for URLs containing `fragment`.
    pub fn push_error(&self, fragment: &str, error: TransportError) -> &Self {
        lock(&self.script).route(fragment).queue.push_back(Err(error));
        self
    }

    /// Answers every request to `fragment` once its one-shot queue is empty.
    pub fn always(&self, fragment: &str, response: HttpResponse) -> &Self {
        lock(&self.script).route(fragment).repeat = Some(Ok(response));
        self
    }

    /// Fails every request to `fragment` once its one-shot queue is empty.
    pub fn always_error(&self, fragment: &str, error: TransportError) -> &Self {
        lock(&self.script).route(fragment).repeat = Some(Err(error));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.script).log.clone()
    }

    /// Number of requests whose URL contains `fragment`.
    pub fn count(&self, fragment: &str) -> usize {
        lock(&self.script)
            .log
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        // Give concurrently polled callers a chance to interleave, the way
        // a real round trip would.
        tokio::task::yield_now().await;

        let mut script = lock(&self.script);
        script.log.push(request.clone());
        let answer = script
            .routes
            .iter_mut()
            .filter(|r| request.url.contains(&r.fragment))
            .find_map(|r| r.queue.pop_front().or_else(|| r.repeat.clone()));
        answer.unwrap_or_else(|| {
            Err(TransportError::Connect(format!(
                "no scripted response for {}",
                request.url
            )))
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedConnector
// ---------------------------------------------------------------------------

static NEXT_SCRIPTED_ID: AtomicU64 = AtomicU64::new(1);

enum SessionScript {
    Refuse(TransportError),
    Frames {
        frames: VecDeque<Result<String, TransportError>>,
        hold_open: bool,
    },
}

#[derive(Default)]
struct ConnectorState {
    sessions: VecDeque<SessionScript>,
    targets: Vec<StreamTarget>,
    sent: Vec<String>,
    closed: usize,
}

/// A [`StreamConnector`] that replays scripted sessions.
///
/// Each call to `connect` consumes the next scripted session. When no
/// sessions are left, `connect` is refused.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that delivers `frames` and then closes cleanly.
    pub fn session<I, S>(&self, frames: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_frames(frames, false)
    }

    /// A session that delivers `frames` and then stays open forever.
    pub fn session_held_open<I, S>(&self, frames: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_frames(frames, true)
    }

    /// A session that delivers `frames` and then fails with `error`.
    pub fn session_then_error<I, S>(&self, frames: I, error: TransportError) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frames: VecDeque<_> = frames.into_iter().map(|f| Ok(f.into())).collect();
        frames.push_back(Err(error));
        lock(&self.state).sessions.push_back(SessionScript::Frames {
            frames,
            hold_open: false,
        });
        self
    }

    /// A connection attempt that is refused.
    pub fn refuse(&self) -> &Self {
        lock(&self.state)
            .sessions
            .push_back(SessionScript::Refuse(TransportError::Connect(
                "connection refused".into(),
            )));
        self
    }

    fn push_frames<I, S>(&self, frames: I, hold_open: bool) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let frames = frames.into_iter().map(|f| Ok(f.into())).collect();
        lock(&self.state)
            .sessions
            .push_back(SessionScript::Frames { frames, hold_open });
        self
    }

    /// Number of connection attempts made so far.
    pub fn attempts(&self) -> usize {
        lock(&self.state).targets.len()
    }

    /// Targets of every connection attempt, in order.
    pub fn targets(&self) -> Vec<StreamTarget> {
        lock(&self.state).targets.clone()
    }

    /// Every text frame sent by the code under test, across sessions.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.state).sent.clone()
    }

    /// Number of streams closed by the code under test.
    pub fn closed(&self) -> usize {
        lock(&self.state).closed
    }
}

impl StreamConnector for ScriptedConnector {
    type Stream = ScriptedStream;

    async fn connect(&self, target: &StreamTarget) -> Result<Self::Stream, TransportError> {
        let mut state = lock(&self.state);
        state.targets.push(target.clone());
        match state.sessions.pop_front() {
            Some(SessionScript::Frames { frames, hold_open }) => Ok(ScriptedStream {
                id: ConnectionId::new(NEXT_SCRIPTED_ID.fetch_add(1, Ordering::Relaxed)),
                frames,
                hold_open,
                state: Arc::clone(&self.state),
            }),
            Some(SessionScript::Refuse(error)) => Err(error),
            None => Err(TransportError::Connect("no scripted session".into())),
        }
    }
}

/// A stream produced by [`ScriptedConnector`].
pub struct ScriptedStream {
    id: ConnectionId,
    frames: VecDeque<Result<String, TransportError>>,
    hold_open: bool,
    state: Arc<Mutex<ConnectorState>>,
}

impl EventStream for ScriptedStream {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        lock(&self.state).sent.push(text.to_string());
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        tokio::task::yield_now().await;
        match self.frames.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => Err(error),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        lock(&self.state).closed += 1;
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
