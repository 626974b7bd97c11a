use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use shared::{
    domain::LoanId,
    protocol::{NewLoan, NewPayment},
};
use thiserror::Error;

pub const LOAN_NAME_REQUIRED: &str = "Loan name is required";
pub const INTEREST_RATE_OUT_OF_RANGE: &str = "Interest rate must be between 0 and 100";
pub const PRINCIPAL_NOT_POSITIVE: &str = "Principal must be a positive number";
pub const DUE_DATE_REQUIRED: &str = "Due date is required";
pub const DUE_DATE_INVALID: &str = "Due date must be a valid date";
pub const PAYMENT_DATE_INVALID: &str = "Payment date must be a valid date";
pub const PAYMENT_DATE_IN_FUTURE: &str = "Payment date cannot be in the future";
pub const PAYMENT_DATE_AFTER_DUE_DATE: &str = "Payment date cannot be after due date";
pub const LOAN_ID_REQUIRED: &str = "Loan ID is required";
pub const LOAN_ID_NOT_POSITIVE: &str = "Loan ID must be a positive number";

const MIN_INTEREST_RATE: f64 = 0.0;
const MAX_INTEREST_RATE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown form field {0:?}")]
pub struct UnknownField(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoanField {
    Name,
    InterestRate,
    Principal,
    DueDate,
    PaymentDate,
}

impl LoanField {
    pub const ALL: [LoanField; 5] = [
        LoanField::Name,
        LoanField::InterestRate,
        LoanField::Principal,
        LoanField::DueDate,
        LoanField::PaymentDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoanField::Name => "name",
            LoanField::InterestRate => "interestRate",
            LoanField::Principal => "principal",
            LoanField::DueDate => "dueDate",
            LoanField::PaymentDate => "paymentDate",
        }
    }
}

impl fmt::Display for LoanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(LoanField::Name),
            "interestRate" | "interest_rate" => Ok(LoanField::InterestRate),
            "principal" => Ok(LoanField::Principal),
            "dueDate" | "due_date" => Ok(LoanField::DueDate),
            "paymentDate" | "payment_date" => Ok(LoanField::PaymentDate),
            other => Err(UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaymentField {
    LoanId,
    PaymentDate,
}

impl PaymentField {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentField::LoanId => "loanId",
            PaymentField::PaymentDate => "paymentDate",
        }
    }
}

impl fmt::Display for PaymentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorSet<F: Ord> {
    errors: BTreeMap<F, String>,
}

impl<F: Ord> Default for ValidationErrorSet<F> {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }
}

impl<F: Ord + Copy> ValidationErrorSet<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: F) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: F) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn insert(&mut self, field: F, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    /// Sets or clears the entry for `field` from a single rule outcome.
    pub fn apply(&mut self, field: F, outcome: Option<&str>) {
        match outcome {
            Some(message) => self.insert(field, message),
            None => {
                self.errors.remove(&field);
            }
        }
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &str)> + '_ {
        self.errors
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanDraft {
    pub name: String,
    pub interest_rate: String,
    pub principal: String,
    pub due_date: String,
    pub payment_date: String,
}

impl LoanDraft {
    pub fn field(&self, field: LoanField) -> &str {
        match field {
            LoanField::Name => &self.name,
            LoanField::InterestRate => &self.interest_rate,
            LoanField::Principal => &self.principal,
            LoanField::DueDate => &self.due_date,
            LoanField::PaymentDate => &self.payment_date,
        }
    }

    pub fn set(&mut self, field: LoanField, value: impl Into<String>) {
        let slot = match field {
            LoanField::Name => &mut self.name,
            LoanField::InterestRate => &mut self.interest_rate,
            LoanField::Principal => &mut self.principal,
            LoanField::DueDate => &mut self.due_date,
            LoanField::PaymentDate => &mut self.payment_date,
        };
        *slot = value.into();
    }

    pub fn is_empty(&self) -> bool {
        LoanField::ALL
            .into_iter()
            .all(|field| self.field(field).is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDraft {
    pub loan_id: String,
    pub payment_date: String,
}

impl PaymentDraft {
    pub fn field(&self, field: PaymentField) -> &str {
        match field {
            PaymentField::LoanId => &self.loan_id,
            PaymentField::PaymentDate => &self.payment_date,
        }
    }

    pub fn set(&mut self, field: PaymentField, value: impl Into<String>) {
        let slot = match field {
            PaymentField::LoanId => &mut self.loan_id,
            PaymentField::PaymentDate => &mut self.payment_date,
        };
        *slot = value.into();
    }

    pub fn is_empty(&self) -> bool {
        self.loan_id.is_empty() && self.payment_date.is_empty()
    }
}

/// Parses a date and drops any time-of-day component.
pub fn parse_calendar_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|stamp| stamp.date())
}

fn parse_interest_rate(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| (MIN_INTEREST_RATE..=MAX_INTEREST_RATE).contains(rate))
}

fn parse_positive_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|value| *value > 0)
}

fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

type FieldCheck = fn(&str) -> Option<&'static str>;

fn check_name(raw: &str) -> Option<&'static str> {
    is_blank(raw).then_some(LOAN_NAME_REQUIRED)
}

fn check_interest_rate(raw: &str) -> Option<&'static str> {
    parse_interest_rate(raw)
        .is_none()
        .then_some(INTEREST_RATE_OUT_OF_RANGE)
}

fn check_principal(raw: &str) -> Option<&'static str> {
    parse_positive_integer(raw)
        .is_none()
        .then_some(PRINCIPAL_NOT_POSITIVE)
}

fn check_due_date(raw: &str) -> Option<&'static str> {
    if is_blank(raw) {
        Some(DUE_DATE_REQUIRED)
    } else if parse_calendar_day(raw).is_none() {
        Some(DUE_DATE_INVALID)
    } else {
        None
    }
}

const LOAN_FIELD_RULES: [(LoanField, FieldCheck); 4] = [
    (LoanField::Name, check_name),
    (LoanField::InterestRate, check_interest_rate),
    (LoanField::Principal, check_principal),
    (LoanField::DueDate, check_due_date),
];

pub fn validate_field(field: LoanField, raw: &str) -> Option<&'static str> {
    LOAN_FIELD_RULES
        .iter()
        .find(|(ruled, _)| *ruled == field)
        .and_then(|(_, check)| check(raw))
}

/// Dates a cross-field rule can look at, already reduced to calendar days.
struct DatedInput {
    today: NaiveDate,
    payment_day: Option<NaiveDate>,
    due_day: Option<NaiveDate>,
}

struct CrossFieldRule<F> {
    field: F,
    violated: fn(&DatedInput) -> bool,
    message: &'static str,
}

fn payment_unparsable(input: &DatedInput) -> bool {
    input.payment_day.is_none()
}

fn payment_in_future(input: &DatedInput) -> bool {
    input.payment_day.is_some_and(|day| day > input.today)
}

fn payment_after_due(input: &DatedInput) -> bool {
    match (input.payment_day, input.due_day) {
        (Some(payment), Some(due)) => payment > due,
        _ => false,
    }
}

const LOAN_CROSS_FIELD_RULES: [CrossFieldRule<LoanField>; 3] = [
    CrossFieldRule {
        field: LoanField::PaymentDate,
        violated: payment_unparsable,
        message: PAYMENT_DATE_INVALID,
    },
    CrossFieldRule {
        field: LoanField::PaymentDate,
        violated: payment_in_future,
        message: PAYMENT_DATE_IN_FUTURE,
    },
    CrossFieldRule {
        field: LoanField::PaymentDate,
        violated: payment_after_due,
        message: PAYMENT_DATE_AFTER_DUE_DATE,
    },
];

const PAYMENT_CROSS_FIELD_RULES: [CrossFieldRule<PaymentField>; 2] = [
    CrossFieldRule {
        field: PaymentField::PaymentDate,
        violated: payment_unparsable,
        message: PAYMENT_DATE_INVALID,
    },
    CrossFieldRule {
        field: PaymentField::PaymentDate,
        violated: payment_in_future,
        message: PAYMENT_DATE_IN_FUTURE,
    },
];

fn apply_cross_field_rules<F: Ord + Copy>(
    rules: &[CrossFieldRule<F>],
    input: &DatedInput,
    errors: &mut ValidationErrorSet<F>,
) {
    for rule in rules {
        if (rule.violated)(input) {
            errors.insert(rule.field, rule.message);
        }
    }
}

/// Runs every per-field rule, then the cross-field date rules when a payment
/// date was supplied.
pub fn validate_submission(draft: &LoanDraft, today: NaiveDate) -> ValidationErrorSet<LoanField> {
    let mut errors = ValidationErrorSet::new();
    for (field, check) in LOAN_FIELD_RULES {
        if let Some(message) = check(draft.field(field)) {
            errors.insert(field, message);
        }
    }

    if !is_blank(&draft.payment_date) {
        let input = DatedInput {
            today,
            payment_day: parse_calendar_day(&draft.payment_date),
            due_day: parse_calendar_day(&draft.due_date),
        };
        apply_cross_field_rules(&LOAN_CROSS_FIELD_RULES, &input, &mut errors);
    }

    errors
}

pub fn prepare_loan(
    draft: &LoanDraft,
    today: NaiveDate,
) -> Result<NewLoan, ValidationErrorSet<LoanField>> {
    let errors = validate_submission(draft, today);
    if !errors.is_empty() {
        return Err(errors);
    }

    match (
        parse_interest_rate(&draft.interest_rate),
        parse_positive_integer(&draft.principal),
        parse_calendar_day(&draft.due_date),
    ) {
        (Some(interest_rate), Some(principal), Some(due_date)) => Ok(NewLoan {
            name: draft.name.trim().to_string(),
            interest_rate,
            principal,
            due_date,
            payment_date: parse_calendar_day(&draft.payment_date),
        }),
        _ => Err(errors),
    }
}

fn check_loan_id(raw: &str) -> Option<&'static str> {
    if is_blank(raw) {
        Some(LOAN_ID_REQUIRED)
    } else if parse_positive_integer(raw).is_none() {
        Some(LOAN_ID_NOT_POSITIVE)
    } else {
        None
    }
}

pub fn validate_payment(
    draft: &PaymentDraft,
    today: NaiveDate,
) -> ValidationErrorSet<PaymentField> {
    let mut errors = ValidationErrorSet::new();
    if let Some(message) = check_loan_id(&draft.loan_id) {
        errors.insert(PaymentField::LoanId, message);
    }

    if !is_blank(&draft.payment_date) {
        let input = DatedInput {
            today,
            payment_day: parse_calendar_day(&draft.payment_date),
            due_day: None,
        };
        apply_cross_field_rules(&PAYMENT_CROSS_FIELD_RULES, &input, &mut errors);
    }

    errors
}

/// Validates a payment draft and coerces it into mutation variables. An
/// omitted payment date defaults to `today`.
pub fn prepare_payment(
    draft: &PaymentDraft,
    today: NaiveDate,
) -> Result<NewPayment, ValidationErrorSet<PaymentField>> {
    let errors = validate_payment(draft, today);
    if !errors.is_empty() {
        return Err(errors);
    }

    match parse_positive_integer(&draft.loan_id) {
        Some(loan_id) => Ok(NewPayment {
            loan_id: LoanId(loan_id),
            payment_date: Some(parse_calendar_day(&draft.payment_date).unwrap_or(today)),
        }),
        None => Err(errors),
    }
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
