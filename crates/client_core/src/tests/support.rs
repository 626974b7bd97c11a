//! In-memory loan service used by the orchestration tests.

use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    domain::{LoanId, LoanStatus, PaymentId},
    error::ApiException,
    protocol::{Loan, NewLoan, NewPayment, Payment},
};
use tokio::sync::{Mutex, Semaphore};

use crate::service::LoanService;

#[derive(Debug, Clone)]
pub enum Failure {
    Application(String),
    Network,
    Unknown,
}

impl Failure {
    fn to_error(&self, operation: &str) -> anyhow::Error {
        match self {
            Failure::Application(message) => {
                anyhow::Error::new(ApiException::new(operation, message.clone()))
            }
            Failure::Network => anyhow::Error::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
            .context(format!("{operation} request failed")),
            Failure::Unknown => anyhow!("{operation} returned an unexpected payload"),
        }
    }
}

pub struct ScriptedLoanService {
    pub loans: Mutex<Vec<Loan>>,
    pub added_loans: Mutex<Vec<NewLoan>>,
    pub added_payments: Mutex<Vec<NewPayment>>,
    fetches: AtomicUsize,
    fail_with: Option<Failure>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedLoanService {
    pub fn ok() -> Self {
        Self {
            loans: Mutex::new(Vec::new()),
            added_loans: Mutex::new(Vec::new()),
            added_payments: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fail_with: None,
            gate: None,
        }
    }

    pub fn failing(failure: Failure) -> Self {
        let mut service = Self::ok();
        service.fail_with = Some(failure);
        service
    }

    /// Every call consumes one permit from `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_loans(self, loans: Vec<Loan>) -> Self {
        Self {
            loans: Mutex::new(loans),
            ..self
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }
}

#[async_trait]
impl LoanService for ScriptedLoanService {
    async fn fetch_loans(&self) -> Result<Vec<Loan>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if let Some(failure) = &self.fail_with {
            return Err(failure.to_error("loansWithPayments"));
        }
        Ok(self.loans.lock().await.clone())
    }

    async fn add_loan(&self, loan: NewLoan) -> Result<Loan> {
        self.wait_for_gate().await;
        if let Some(failure) = &self.fail_with {
            return Err(failure.to_error("addLoan"));
        }
        self.added_loans.lock().await.push(loan.clone());
        let mut loans = self.loans.lock().await;
        let created = Loan {
            id: LoanId(loans.len() as i64 + 1),
            name: loan.name,
            interest_rate: loan.interest_rate,
            principal: loan.principal,
            due_date: loan.due_date,
            payment_date: loan.payment_date,
            status: LoanStatus::Unpaid,
            color: "grey".into(),
        };
        loans.push(created.clone());
        Ok(created)
    }

    async fn add_payment(&self, payment: NewPayment) -> Result<Payment> {
        self.wait_for_gate().await;
        if let Some(failure) = &self.fail_with {
            return Err(failure.to_error("addPayment"));
        }
        let mut payments = self.added_payments.lock().await;
        payments.push(payment.clone());
        Ok(Payment {
            id: PaymentId(payments.len() as i64),
            loan_id: payment.loan_id,
            payment_date: payment.payment_date,
        })
    }
}

pub fn day(year: i32, month: u32, date: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, date).expect("valid date")
}

pub fn loan(id: i64, status: LoanStatus) -> Loan {
    Loan {
        id: LoanId(id),
        name: format!("Loan {id}"),
        interest_rate: 4.5,
        principal: 30_000,
        due_date: day(2025, 3, 1),
        payment_date: None,
        status,
        color: String::new(),
    }
}
