//! The runtime object bound to a single in-flight request.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, BackendSpec};
use crate::eventloop::TimeoutToken;
use crate::request::Request;
use crate::response::Response;

/// Identifies one outstanding query within a [`Context`](crate::context::Context).
pub type QueryId = u64;

/// The per-query state machine driven by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    New,
    Running,
    WaitingIo,
    Done,
}

pub(crate) struct Query {
    pub id: QueryId,
    pub request: Request,
    pub response: Response,
    pub state: State,
    pub chain: Arc<Vec<BackendSpec>>,
    pub current_index: usize,
    pub active: Option<Box<dyn Backend>>,
    pub paths_before_activation: usize,
    pub total_timer: TimeoutToken,
    pub partial_timeout: Duration,
    pub partial_timer: Option<TimeoutToken>,
    /// A backend-local callback captured for the lifetime of one activation.
    /// There is exactly one event loop and it never crosses a thread (the
    /// engine is single-threaded and cooperative), so this does not need to
    /// be `Send`.
    pub callback: Option<Box<dyn FnOnce(Response)>>,
}

impl Query {
    pub fn new(
        id: QueryId,
        request: Request,
        chain: Arc<Vec<BackendSpec>>,
        total_timer: TimeoutToken,
        partial_timeout: Duration,
        callback: Option<Box<dyn FnOnce(Response)>>,
    ) -> Self {
        Query {
            id,
            request,
            response: Response::new(),
            state: State::New,
            chain,
            current_index: 0,
            active: None,
            paths_before_activation: 0,
            total_timer,
            partial_timeout,
            partial_timer: None,
            callback,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }
}
