use super::{HttpError, HttpRequest, HttpResponse, HttpResult, HttpTransport};
use crate::context::Context;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::poll_fn;
use std::sync::Arc;
use tessera_common::Node;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, instrument, warn};

/// Raw callback events of one request, dispatched later
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Callbacks {
    pub on_success: Option<Node>,
    pub on_error: Option<Node>,
    pub on_finally: Option<Node>,
}

impl Callbacks {
    pub fn from_payload(payload: &Node) -> Self {
        let event = |key: &str| payload.get(key).filter(|node| !node.is_null()).cloned();
        Self {
            on_success: event("onSuccess"),
            on_error: event("onError"),
            on_finally: event("onFinally"),
        }
    }
}

/// Everything needed to finish a request once its response is back
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub context: Context,
    pub callbacks: Callbacks,
    pub var: Option<String>,
}

struct Completion {
    id: u64,
    outcome: HttpResult<HttpResponse>,
}

/// Sends requests on the tokio runtime and queues their completions until
/// the mutation thread collects them
pub struct HttpDispatcher {
    transport: Arc<dyn HttpTransport>,
    sender: UnboundedSender<Completion>,
    receiver: RefCell<UnboundedReceiver<Completion>>,
    pending: RefCell<HashMap<u64, PendingRequest>>,
    next_id: Cell<u64>,
}

impl HttpDispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            transport,
            sender,
            receiver: RefCell::new(receiver),
            pending: RefCell::default(),
            next_id: Cell::new(0),
        }
    }

    /// Requests sent whose completion has not been collected yet
    pub fn in_flight(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Start a request. Without a tokio runtime the request completes
    /// immediately with [`HttpError::NoRuntime`].
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub(crate) fn dispatch(&self, request: HttpRequest, pending: PendingRequest) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.pending.borrow_mut().insert(id, pending);

        match Handle::try_current() {
            Ok(handle) => {
                debug!(id, "Dispatching HTTP request");
                let transport = Arc::clone(&self.transport);
                let sender = self.sender.clone();
                let send = handle.spawn(async move { transport.send(request).await });
                handle.spawn(async move {
                    // A panicking transport still has to complete the request
                    let outcome = match send.await {
                        Ok(outcome) => outcome,
                        Err(err) => Err(HttpError::Transport(format!(
                            "request task failed: {}",
                            err
                        ))),
                    };
                    // The receiver lives as long as the dispatcher
                    let _ = sender.send(Completion { id, outcome });
                });
            }
            Err(_) => {
                warn!(id, "No tokio runtime, failing HTTP request");
                let _ = self.sender.send(Completion {
                    id,
                    outcome: Err(HttpError::NoRuntime),
                });
            }
        }
        id
    }

    /// Next completion that is already available, without waiting
    pub(crate) fn try_next(&self) -> Option<(PendingRequest, HttpResult<HttpResponse>)> {
        loop {
            let completion = self.receiver.borrow_mut().try_recv().ok()?;
            if let Some(finished) = self.claim(completion) {
                return Some(finished);
            }
        }
    }

    /// Wait for the next completion. `None` once nothing is in flight.
    pub(crate) async fn next(&self) -> Option<(PendingRequest, HttpResult<HttpResponse>)> {
        while self.in_flight() > 0 {
            let completion = poll_fn(|cx| self.receiver.borrow_mut().poll_recv(cx)).await?;
            if let Some(finished) = self.claim(completion) {
                return Some(finished);
            }
        }
        None
    }

    fn claim(&self, completion: Completion) -> Option<(PendingRequest, HttpResult<HttpResponse>)> {
        let pending = self.pending.borrow_mut().remove(&completion.id);
        if pending.is_none() {
            warn!(id = completion.id, "Completion for unknown HTTP request");
        }
        pending.map(|pending| (pending, completion.outcome))
    }
}

impl std::fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
