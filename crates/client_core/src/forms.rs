use std::{
    fmt,
    marker::PhantomData,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::protocol::{Loan, NewLoan, NewPayment, Payment};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    collection::LoanCollection,
    request::{DispatchRejected, RequestController, RequestState, RequestTicket},
    service::LoanService,
    validation::{
        prepare_loan, prepare_payment, validate_payment, validate_submission, Clock, LoanDraft,
        LoanField, PaymentDraft, PaymentField, ValidationErrorSet,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormRejection {
    #[error("form has validation errors")]
    Invalid,
    #[error("a submission is already in flight")]
    Busy,
    #[error("form has been torn down")]
    TornDown,
}

impl From<DispatchRejected> for FormRejection {
    fn from(value: DispatchRejected) -> Self {
        match value {
            DispatchRejected::InFlight => FormRejection::Busy,
            DispatchRejected::TornDown => FormRejection::TornDown,
        }
    }
}

#[async_trait]
pub trait FormKind: Send + Sync + 'static {
    type Field: Ord + Copy + fmt::Display + Send + Sync + 'static;
    type Draft: Default + Clone + Send + Sync + 'static;
    type Input: Send + 'static;
    type Output: Clone + Send + Sync + 'static;

    const OPERATION: &'static str;

    fn set(draft: &mut Self::Draft, field: Self::Field, value: String);

    /// Current message for one field, cross-field rules included.
    fn recheck(draft: &Self::Draft, field: Self::Field, today: NaiveDate) -> Option<String>;

    fn prepare(
        draft: &Self::Draft,
        today: NaiveDate,
    ) -> Result<Self::Input, ValidationErrorSet<Self::Field>>;

    async fn execute(service: &dyn LoanService, input: Self::Input) -> anyhow::Result<Self::Output>;
}

pub struct LoanEntry;

#[async_trait]
impl FormKind for LoanEntry {
    type Field = LoanField;
    type Draft = LoanDraft;
    type Input = NewLoan;
    type Output = Loan;

    const OPERATION: &'static str = "addLoan";

    fn set(draft: &mut LoanDraft, field: LoanField, value: String) {
        draft.set(field, value);
    }

    fn recheck(draft: &LoanDraft, field: LoanField, today: NaiveDate) -> Option<String> {
        validate_submission(draft, today)
            .get(field)
            .map(str::to_string)
    }

    fn prepare(
        draft: &LoanDraft,
        today: NaiveDate,
    ) -> Result<NewLoan, ValidationErrorSet<LoanField>> {
        prepare_loan(draft, today)
    }

    async fn execute(service: &dyn LoanService, input: NewLoan) -> anyhow::Result<Loan> {
        service.add_loan(input).await
    }
}

pub struct PaymentEntry;

#[async_trait]
impl FormKind for PaymentEntry {
    type Field = PaymentField;
    type Draft = PaymentDraft;
    type Input = NewPayment;
    type Output = Payment;

    const OPERATION: &'static str = "addPayment";

    fn set(draft: &mut PaymentDraft, field: PaymentField, value: String) {
        draft.set(field, value);
    }

    fn recheck(draft: &PaymentDraft, field: PaymentField, today: NaiveDate) -> Option<String> {
        validate_payment(draft, today)
            .get(field)
            .map(str::to_string)
    }

    fn prepare(
        draft: &PaymentDraft,
        today: NaiveDate,
    ) -> Result<NewPayment, ValidationErrorSet<PaymentField>> {
        prepare_payment(draft, today)
    }

    async fn execute(service: &dyn LoanService, input: NewPayment) -> anyhow::Result<Payment> {
        service.add_payment(input).await
    }
}

struct FormSlot<K: FormKind> {
    draft: K::Draft,
    errors: ValidationErrorSet<K::Field>,
}

/// A create form bound to one remote mutation.
pub struct MutationForm<K: FormKind> {
    service: Arc<dyn LoanService>,
    collection: Arc<LoanCollection>,
    clock: Arc<dyn Clock>,
    request: RequestController<K::Output>,
    slot: Arc<Mutex<FormSlot<K>>>,
    _kind: PhantomData<K>,
}

pub type LoanForm = MutationForm<LoanEntry>;
pub type PaymentForm = MutationForm<PaymentEntry>;

fn lock<K: FormKind>(slot: &Mutex<FormSlot<K>>) -> MutexGuard<'_, FormSlot<K>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: FormKind> MutationForm<K> {
    pub fn new(
        service: Arc<dyn LoanService>,
        collection: Arc<LoanCollection>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            collection,
            clock,
            request: RequestController::new(K::OPERATION),
            slot: Arc::new(Mutex::new(FormSlot {
                draft: K::Draft::default(),
                errors: ValidationErrorSet::new(),
            })),
            _kind: PhantomData,
        })
    }

    pub fn draft(&self) -> K::Draft {
        lock(&self.slot).draft.clone()
    }

    pub fn errors(&self) -> ValidationErrorSet<K::Field> {
        lock(&self.slot).errors.clone()
    }

    pub fn state(&self) -> RequestState<K::Output> {
        self.request.state()
    }

    pub fn is_interactive(&self) -> bool {
        !self.request.is_loading() && !self.request.is_torn_down()
    }

    fn ensure_interactive(&self) -> Result<(), FormRejection> {
        if self.request.is_torn_down() {
            return Err(FormRejection::TornDown);
        }
        if self.request.is_loading() {
            return Err(FormRejection::Busy);
        }
        Ok(())
    }

    pub fn set_field(
        &self,
        field: K::Field,
        value: impl Into<String>,
    ) -> Result<(), FormRejection> {
        self.ensure_interactive()?;
        let today = self.clock.today();
        let mut slot = lock(&self.slot);
        K::set(&mut slot.draft, field, value.into());
        let message = K::recheck(&slot.draft, field, today);
        slot.errors.apply(field, message.as_deref());
        Ok(())
    }

    fn admit(&self) -> Result<(K::Input, RequestTicket<K::Output>), FormRejection> {
        self.ensure_interactive()?;
        let today = self.clock.today();
        let mut slot = lock(&self.slot);
        let input = match K::prepare(&slot.draft, today) {
            Ok(input) => {
                slot.errors.clear();
                input
            }
            Err(errors) => {
                debug!(
                    operation = K::OPERATION,
                    fields = errors.len(),
                    "submission blocked by validation"
                );
                slot.errors = errors;
                return Err(FormRejection::Invalid);
            }
        };
        let ticket = self.request.begin()?;
        info!(operation = K::OPERATION, "submission dispatched");
        Ok((input, ticket))
    }

    fn complete(&self, ticket: RequestTicket<K::Output>, outcome: anyhow::Result<K::Output>) {
        let written = outcome.is_ok();
        let slot = Arc::clone(&self.slot);
        let applied = self.request.settle(ticket, outcome, move |_| {
            let mut slot = lock(&slot);
            slot.draft = K::Draft::default();
            slot.errors.clear();
        });
        // The remote record exists even if this form is gone.
        if written {
            if !applied {
                debug!(operation = K::OPERATION, "write landed after teardown");
            }
            self.collection.invalidate();
        }
    }

    /// Validates and submits, awaiting the remote result.
    pub async fn submit(&self) -> Result<RequestState<K::Output>, FormRejection> {
        let (input, ticket) = self.admit()?;
        let outcome = K::execute(self.service.as_ref(), input).await;
        self.complete(ticket, outcome);
        Ok(self.request.state())
    }

    /// Validates and submits without waiting: the form is `Loading` when this
    /// returns and settles on a spawned task.
    pub fn dispatch(self: &Arc<Self>) -> Result<JoinHandle<()>, FormRejection> {
        let (input, ticket) = self.admit()?;
        let form = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let outcome = K::execute(form.service.as_ref(), input).await;
            form.complete(ticket, outcome);
        }))
    }

    pub fn teardown(&self) {
        self.request.teardown();
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
