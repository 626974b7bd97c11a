use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    error::ApiException,
    protocol::{
        AddLoanData, AddPaymentData, GraphQlRequest, GraphQlResponse, Loan, LoansWithPaymentsData,
        NewLoan, NewPayment, Payment, ADD_LOAN_MUTATION, ADD_PAYMENT_MUTATION,
        LOANS_WITH_PAYMENTS_QUERY,
    },
};
use tracing::debug;

use crate::config::ClientSettings;

#[async_trait]
pub trait LoanService: Send + Sync {
    async fn fetch_loans(&self) -> Result<Vec<Loan>>;
    async fn add_loan(&self, loan: NewLoan) -> Result<Loan>;
    async fn add_payment(&self, payment: NewPayment) -> Result<Payment>;
}

/// Stand-in used when no endpoint has been configured.
pub struct MissingLoanService;

#[async_trait]
impl LoanService for MissingLoanService {
    async fn fetch_loans(&self) -> Result<Vec<Loan>> {
        Err(anyhow!("loan service is unavailable"))
    }

    async fn add_loan(&self, _loan: NewLoan) -> Result<Loan> {
        Err(anyhow!("loan service is unavailable"))
    }

    async fn add_payment(&self, _payment: NewPayment) -> Result<Payment> {
        Err(anyhow!("loan service is unavailable"))
    }
}

pub struct GraphQlLoanService {
    http: Client,
    endpoint: String,
}

impl GraphQlLoanService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<V, D>(&self, operation: &'static str, query: &str, variables: V) -> Result<D>
    where
        V: Serialize + Send,
        D: DeserializeOwned + Send,
    {
        debug!(operation, endpoint = %self.endpoint, "sending graphql request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;
        let status_error = response.error_for_status_ref().err();
        let body = response.bytes().await?;

        // GraphQL servers may report errors with a non-2xx status; prefer the
        // structured errors when the body carries them.
        let decoded = serde_json::from_slice::<GraphQlResponse<D>>(&body);
        if let Ok(decoded) = &decoded {
            if let Some(exception) = ApiException::from_errors(operation, &decoded.errors) {
                return Err(exception.into());
            }
        }
        if let Some(status_error) = status_error {
            return Err(status_error.into());
        }

        decoded
            .with_context(|| format!("failed to decode {operation} response"))?
            .data
            .ok_or_else(|| anyhow!("{operation} response carried no data"))
    }
}

#[async_trait]
impl LoanService for GraphQlLoanService {
    async fn fetch_loans(&self) -> Result<Vec<Loan>> {
        let data: LoansWithPaymentsData = self
            .execute(
                "loansWithPayments",
                LOANS_WITH_PAYMENTS_QUERY,
                serde_json::Map::new(),
            )
            .await?;
        Ok(data.loans_with_payments)
    }

    async fn add_loan(&self, loan: NewLoan) -> Result<Loan> {
        let data: AddLoanData = self.execute("addLoan", ADD_LOAN_MUTATION, loan).await?;
        data.add_loan
            .ok_or_else(|| anyhow!("addLoan returned no loan"))
    }

    async fn add_payment(&self, payment: NewPayment) -> Result<Payment> {
        let data: AddPaymentData = self
            .execute("addPayment", ADD_PAYMENT_MUTATION, payment)
            .await?;
        data.add_payment
            .ok_or_else(|| anyhow!("addPayment returned no payment"))
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
