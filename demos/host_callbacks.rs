// This example demonstrates driving a query from a caller-owned event loop
// via `Context::set_callbacks`, instead of letting `Context::resolve` block.
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use netresolve::{Callbacks, Context, IoEvents, Request, TimeoutToken};

struct MinimalEventLoop {
    poller: polling::Poller,
    fds: HashMap<RawFd, u64>,
    deadline: Option<(TimeoutToken, Instant)>,
    next_token: u64,
}

impl MinimalEventLoop {
    fn new() -> Self {
        MinimalEventLoop {
            poller: polling::Poller::new().expect("failed to create poller"),
            fds: HashMap::new(),
            deadline: None,
            next_token: 0,
        }
    }
}

impl Callbacks for MinimalEventLoop {
    fn watch_fd(&mut self, _query: u64, fd: RawFd, events: IoEvents) {
        if events.is_none() {
            self.fds.remove(&fd);
            return;
        }
        self.fds.insert(fd, 0);
        // A real adapter would register `fd` with `self.poller` here; this
        // demo's resolution (a purely local chain) never actually needs to.
    }

    fn watch_timeout(&mut self, _query: u64, duration: Duration) -> TimeoutToken {
        let token = TimeoutToken::new(self.next_token);
        self.next_token += 1;
        self.deadline = Some((token, Instant::now() + duration));
        token
    }

    fn drop_timeout(&mut self, token: TimeoutToken) {
        if self.deadline.map(|(t, _)| t) == Some(token) {
            self.deadline = None;
        }
    }
}

fn main() {
    env_logger::init();

    let mut context = Context::new().expect("failed to create context");
    context.set_callbacks(MinimalEventLoop::new());

    let done = std::rc::Rc::new(std::cell::RefCell::new(None));
    let done_for_callback = std::rc::Rc::clone(&done);
    let id = context
        .query(Request::forward(Some("localhost"), None::<&str>), move |response| {
            *done_for_callback.borrow_mut() = Some(response);
        })
        .expect("failed to start query");

    // A real host loop would poll its own fds/timers and call
    // `context.dispatch_fd`/`context.dispatch_timeout` as they fire; the
    // `loopback` backend this query hits never registers either, so it is
    // already finished by the time `query` returns.
    match done.borrow_mut().take() {
        Some(response) => {
            for path in response.paths() {
                println!("query {id}: {}", path.address);
            }
        }
        None => println!("query {id}: still waiting on host-driven I/O"),
    }
}
