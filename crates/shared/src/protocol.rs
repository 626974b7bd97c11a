use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{LoanId, LoanStatus, PaymentId},
    error::ApiError,
};

pub const LOANS_WITH_PAYMENTS_QUERY: &str = "query GetLoansWithPayments {
  loansWithPayments {
    id
    name
    interestRate
    principal
    dueDate
    paymentDate
    status
    color
  }
}";

pub const ADD_LOAN_MUTATION: &str = "mutation AddLoan(
  $name: String!
  $interestRate: Float!
  $principal: Int!
  $dueDate: String!
  $paymentDate: String
) {
  addLoan(
    name: $name
    interest_rate: $interestRate
    principal: $principal
    due_date: $dueDate
    payment_date: $paymentDate
  ) {
    id
    name
    interestRate
    principal
    dueDate
    paymentDate
    status
    color
  }
}";

pub const ADD_PAYMENT_MUTATION: &str = "mutation AddPayment($loanId: Int!, $paymentDate: String) {
  addPayment(loan_id: $loanId, payment_date: $paymentDate) {
    id
    loanId
    paymentDate
  }
}";

/// Snapshot of a loan as reported by the loan service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    pub name: String,
    pub interest_rate: f64,
    pub principal: i64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub status: LoanStatus,
    /// Presentation hint paired with `status`.
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
}

/// Variables of the `AddLoan` mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoan {
    pub name: String,
    pub interest_rate: f64,
    pub principal: i64,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
}

/// Variables of the `AddPayment` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub loan_id: LoanId,
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<D> {
    pub data: Option<D>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoansWithPaymentsData {
    pub loans_with_payments: Vec<Loan>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLoanData {
    pub add_loan: Option<Loan>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentData {
    pub add_payment: Option<Payment>,
}
