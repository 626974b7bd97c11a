use std::{
    future::Future,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::error::ApiException;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    Loading,
    Success(T),
    Error(RequestFailure),
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> RequestState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RequestFailure> {
        match self {
            Self::Error(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Application,
    Network,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    kind: FailureKind,
    message: String,
    detail: String,
}

impl RequestFailure {
    pub fn classify(err: &anyhow::Error) -> Self {
        let detail = format!("{err:#}");

        let exception = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ApiException>());
        if let Some(exception) = exception {
            return Self {
                kind: FailureKind::Application,
                message: exception.message.clone(),
                detail,
            };
        }

        let transport_failure = err.chain().any(|cause| {
            cause
                .downcast_ref::<reqwest::Error>()
                .is_some_and(|http_err| !http_err.is_decode() && !http_err.is_builder())
                || cause.is::<tokio::time::error::Elapsed>()
                || cause
                    .downcast_ref::<io::Error>()
                    .is_some_and(|io_err| is_connectivity_error(io_err.kind()))
        });
        if transport_failure {
            return Self {
                kind: FailureKind::Network,
                message: NETWORK_ERROR_MESSAGE.to_string(),
                detail,
            };
        }

        Self {
            kind: FailureKind::Unknown,
            message: UNKNOWN_ERROR_MESSAGE.to_string(),
            detail,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

fn is_connectivity_error(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::TimedOut
            | io::ErrorKind::BrokenPipe
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchRejected {
    #[error("a request is already in flight")]
    InFlight,
    #[error("request controller has been torn down")]
    TornDown,
}

struct Slot<T> {
    state: RequestState<T>,
    generation: u64,
    torn_down: bool,
}

/// Proof that a dispatch was admitted. Dropping an unsettled ticket returns
/// the controller to `Idle`.
pub struct RequestTicket<T> {
    generation: u64,
    slot: Arc<Mutex<Slot<T>>>,
    armed: bool,
}

impl<T> Drop for RequestTicket<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = lock(&self.slot);
        if slot.generation == self.generation && slot.state.is_loading() {
            debug!(generation = self.generation, "request abandoned before settling");
            slot.state = RequestState::Idle;
        }
    }
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct RequestController<T> {
    operation: &'static str,
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for RequestController<T> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> RequestController<T> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            slot: Arc::new(Mutex::new(Slot {
                state: RequestState::Idle,
                generation: 0,
                torn_down: false,
            })),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn state(&self) -> RequestState<T> {
        lock(&self.slot).state.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.slot).state.is_loading()
    }

    pub fn is_torn_down(&self) -> bool {
        lock(&self.slot).torn_down
    }

    pub fn begin(&self) -> Result<RequestTicket<T>, DispatchRejected> {
        let mut slot = lock(&self.slot);
        if slot.torn_down {
            return Err(DispatchRejected::TornDown);
        }
        if slot.state.is_loading() {
            debug!(operation = self.operation, "dispatch ignored, request in flight");
            return Err(DispatchRejected::InFlight);
        }
        slot.generation += 1;
        slot.state = RequestState::Loading;
        debug!(operation = self.operation, generation = slot.generation, "request loading");
        Ok(RequestTicket {
            generation: slot.generation,
            slot: Arc::clone(&self.slot),
            armed: true,
        })
    }

    /// Records the outcome of the dispatch `ticket` was issued for.
    ///
    /// `on_success` runs after the state has moved to `Success` and after the
    /// internal lock is released. Returns `false` when the outcome was dropped
    /// because the controller was torn down in the meantime.
    pub fn settle<F>(
        &self,
        mut ticket: RequestTicket<T>,
        outcome: anyhow::Result<T>,
        on_success: F,
    ) -> bool
    where
        F: FnOnce(&T),
    {
        ticket.armed = false;
        let succeeded = {
            let mut slot = lock(&self.slot);
            if slot.torn_down || slot.generation != ticket.generation {
                debug!(
                    operation = self.operation,
                    generation = ticket.generation,
                    "late completion ignored"
                );
                return false;
            }
            match outcome {
                Ok(data) => {
                    slot.state = RequestState::Success(data.clone());
                    Some(data)
                }
                Err(err) => {
                    let failure = RequestFailure::classify(&err);
                    self.log_failure(&failure);
                    slot.state = RequestState::Error(failure);
                    None
                }
            }
        };

        if let Some(data) = succeeded {
            info!(operation = self.operation, "request succeeded");
            on_success(&data);
        }
        true
    }

    pub async fn run<Fut, F>(
        &self,
        operation: Fut,
        on_success: F,
    ) -> Result<RequestState<T>, DispatchRejected>
    where
        Fut: Future<Output = anyhow::Result<T>>,
        F: FnOnce(&T),
    {
        let ticket = self.begin()?;
        let outcome = operation.await;
        self.settle(ticket, outcome, on_success);
        Ok(self.state())
    }

    pub fn teardown(&self) {
        let mut slot = lock(&self.slot);
        slot.torn_down = true;
        debug!(operation = self.operation, "request controller torn down");
    }

    fn log_failure(&self, failure: &RequestFailure) {
        match failure.kind() {
            FailureKind::Application => warn!(
                operation = self.operation,
                message = failure.message(),
                "loan service rejected request"
            ),
            FailureKind::Network => warn!(
                operation = self.operation,
                detail = failure.detail(),
                "request failed in transport"
            ),
            FailureKind::Unknown => error!(
                operation = self.operation,
                detail = failure.detail(),
                "request failed unexpectedly"
            ),
        }
    }
}

#[cfg(test)]
#[path = "tests/request_tests.rs"]
mod tests;
