use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::protocol::Loan;
use tracing::{debug, info};

use crate::{
    request::{RequestController, RequestState},
    service::LoanService,
    view::{counts_by_status, filter_by_status, StatusCounts},
};

pub type LoanSnapshot = Arc<[Loan]>;

#[derive(Default)]
struct CacheSlot {
    loans: Option<LoanSnapshot>,
    stale: bool,
    /// Bumped on every invalidation so a fetch that started earlier cannot
    /// mark the cache fresh.
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanView {
    pub loans: Vec<Loan>,
    pub counts: StatusCounts,
}

pub struct LoanCollection {
    service: Arc<dyn LoanService>,
    request: RequestController<LoanSnapshot>,
    cache: Arc<Mutex<CacheSlot>>,
}

impl LoanCollection {
    pub fn new(service: Arc<dyn LoanService>) -> Arc<Self> {
        Arc::new(Self {
            service,
            request: RequestController::new("loansWithPayments"),
            cache: Arc::new(Mutex::new(CacheSlot::default())),
        })
    }

    fn cache(&self) -> MutexGuard<'_, CacheSlot> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn invalidate(&self) {
        let mut cache = self.cache();
        cache.stale = true;
        cache.epoch += 1;
        info!(epoch = cache.epoch, "loan collection invalidated");
    }

    pub fn is_stale(&self) -> bool {
        let cache = self.cache();
        cache.stale || cache.loans.is_none()
    }

    pub fn cached(&self) -> Option<LoanSnapshot> {
        self.cache().loans.clone()
    }

    pub fn state(&self) -> RequestState<LoanSnapshot> {
        self.request.state()
    }

    /// Returns the cached collection when fresh, otherwise refetches it.
    ///
    /// While a fetch is already in flight the `Loading` state is returned
    /// instead of issuing a second request.
    pub async fn read(&self) -> RequestState<LoanSnapshot> {
        {
            let cache = self.cache();
            if let (false, Some(loans)) = (cache.stale, &cache.loans) {
                return RequestState::Success(Arc::clone(loans));
            }
        }
        self.refetch().await
    }

    pub async fn refetch(&self) -> RequestState<LoanSnapshot> {
        let epoch = self.cache().epoch;
        let cache = Arc::clone(&self.cache);
        let service = Arc::clone(&self.service);
        let fetch = async move {
            let loans = service.fetch_loans().await?;
            Ok(LoanSnapshot::from(loans))
        };

        let outcome = self
            .request
            .run(fetch, |loans| {
                let mut slot = cache.lock().unwrap_or_else(PoisonError::into_inner);
                slot.loans = Some(Arc::clone(loans));
                slot.stale = slot.epoch != epoch;
                debug!(count = loans.len(), stale = slot.stale, "loan collection stored");
            })
            .await;

        match outcome {
            Ok(state) => state,
            Err(rejected) => {
                debug!(%rejected, "loan collection fetch not dispatched");
                self.request.state()
            }
        }
    }

    pub fn view(&self, filter: &str) -> LoanView {
        let loans = self.cached().unwrap_or_else(|| LoanSnapshot::from(Vec::new()));
        LoanView {
            loans: filter_by_status(&loans, filter).into_iter().cloned().collect(),
            counts: counts_by_status(&loans),
        }
    }

    pub fn teardown(&self) {
        self.request.teardown();
    }
}

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod tests;
