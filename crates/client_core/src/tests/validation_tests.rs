use super::*;

use crate::test_support::day;

fn today() -> NaiveDate {
    day(2025, 5, 15)
}

fn valid_draft() -> LoanDraft {
    LoanDraft {
        name: "Test Loan".into(),
        interest_rate: "5.0".into(),
        principal: "10000".into(),
        due_date: "2025-06-01".into(),
        payment_date: String::new(),
    }
}

#[test]
fn interest_rate_outside_closed_interval_is_rejected() {
    for raw in ["-0.01", "100.5", "101", "abc", "", "  ", "NaN", "inf", "5%"] {
        assert_eq!(
            validate_field(LoanField::InterestRate, raw),
            Some(INTEREST_RATE_OUT_OF_RANGE),
            "expected rejection for {raw:?}"
        );
    }
}

#[test]
fn interest_rate_inside_closed_interval_is_accepted() {
    for raw in ["0", "0.0", "3.5", "5.0", "99.999", "100", " 42 "] {
        assert_eq!(validate_field(LoanField::InterestRate, raw), None, "{raw:?}");
    }
}

#[test]
fn principal_must_be_positive_integer() {
    for raw in ["0", "-5", "abc", "", "10.5", "1e3"] {
        assert_eq!(
            validate_field(LoanField::Principal, raw),
            Some(PRINCIPAL_NOT_POSITIVE),
            "expected rejection for {raw:?}"
        );
    }
    for raw in ["1", "10000", " 500000 "] {
        assert_eq!(validate_field(LoanField::Principal, raw), None, "{raw:?}");
    }
}

#[test]
fn name_and_due_date_are_required() {
    assert_eq!(validate_field(LoanField::Name, "   "), Some(LOAN_NAME_REQUIRED));
    assert_eq!(validate_field(LoanField::Name, "Tom's Loan"), None);
    assert_eq!(validate_field(LoanField::DueDate, ""), Some(DUE_DATE_REQUIRED));
    assert_eq!(validate_field(LoanField::DueDate, "someday"), Some(DUE_DATE_INVALID));
    assert_eq!(validate_field(LoanField::DueDate, "2025-03-01"), None);
}

#[test]
fn payment_date_has_no_per_field_rule() {
    assert_eq!(validate_field(LoanField::PaymentDate, ""), None);
    assert_eq!(validate_field(LoanField::PaymentDate, "garbage"), None);
}

#[test]
fn field_names_parse_from_form_keys() {
    assert_eq!("interestRate".parse::<LoanField>(), Ok(LoanField::InterestRate));
    assert_eq!("due_date".parse::<LoanField>(), Ok(LoanField::DueDate));
    assert!("color".parse::<LoanField>().is_err());
}

#[test]
fn empty_submission_produces_four_errors() {
    let draft = LoanDraft {
        name: String::new(),
        interest_rate: "abc".into(),
        principal: "-5".into(),
        due_date: String::new(),
        payment_date: String::new(),
    };

    let errors = validate_submission(&draft, today());

    assert_eq!(errors.len(), 4);
    assert_eq!(errors.get(LoanField::Name), Some(LOAN_NAME_REQUIRED));
    assert_eq!(errors.get(LoanField::InterestRate), Some(INTEREST_RATE_OUT_OF_RANGE));
    assert_eq!(errors.get(LoanField::Principal), Some(PRINCIPAL_NOT_POSITIVE));
    assert_eq!(errors.get(LoanField::DueDate), Some(DUE_DATE_REQUIRED));
}

#[test]
fn omitted_payment_date_does_not_block_submission() {
    assert!(validate_submission(&valid_draft(), today()).is_empty());
}

#[test]
fn payment_on_due_date_is_allowed() {
    let mut draft = valid_draft();
    draft.due_date = "2025-05-01".into();
    draft.payment_date = "2025-05-01".into();

    assert!(validate_submission(&draft, today()).is_empty());
}

#[test]
fn payment_one_day_after_due_date_is_rejected() {
    let mut draft = valid_draft();
    draft.due_date = "2025-05-01".into();
    draft.payment_date = "2025-05-02".into();

    let errors = validate_submission(&draft, today());
    assert_eq!(
        errors.get(LoanField::PaymentDate),
        Some(PAYMENT_DATE_AFTER_DUE_DATE)
    );
}

#[test]
fn time_of_day_is_ignored_when_comparing_days() {
    let mut draft = valid_draft();
    draft.due_date = "2025-05-15".into();
    draft.payment_date = "2025-05-15T23:59:00".into();

    assert!(validate_submission(&draft, today()).is_empty());
}

#[test]
fn future_payment_date_is_rejected() {
    let mut draft = valid_draft();
    draft.payment_date = "2025-05-16".into();

    let errors = validate_submission(&draft, today());
    assert_eq!(errors.get(LoanField::PaymentDate), Some(PAYMENT_DATE_IN_FUTURE));
}

#[test]
fn after_due_date_message_replaces_future_message() {
    let mut draft = valid_draft();
    draft.due_date = "2025-05-20".into();
    draft.payment_date = "2025-05-25".into();

    let errors = validate_submission(&draft, today());
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.get(LoanField::PaymentDate),
        Some(PAYMENT_DATE_AFTER_DUE_DATE)
    );
}

#[test]
fn unparsable_payment_date_blocks_submission() {
    let mut draft = valid_draft();
    draft.payment_date = "next tuesday".into();

    let errors = validate_submission(&draft, today());
    assert_eq!(errors.get(LoanField::PaymentDate), Some(PAYMENT_DATE_INVALID));
}

#[test]
fn prepare_loan_coerces_typed_values() {
    let mut draft = valid_draft();
    draft.name = "  Test Loan ".into();
    draft.payment_date = "2025-05-10".into();

    let loan = prepare_loan(&draft, today()).expect("valid draft");
    assert_eq!(loan.name, "Test Loan");
    assert_eq!(loan.interest_rate, 5.0);
    assert_eq!(loan.principal, 10000);
    assert_eq!(loan.due_date, day(2025, 6, 1));
    assert_eq!(loan.payment_date, Some(day(2025, 5, 10)));
}

#[test]
fn loan_id_rules() {
    let mut draft = PaymentDraft::default();
    let errors = validate_payment(&draft, today());
    assert_eq!(errors.get(PaymentField::LoanId), Some(LOAN_ID_REQUIRED));

    for raw in ["0", "-3", "abc"] {
        draft.loan_id = raw.into();
        let errors = validate_payment(&draft, today());
        assert_eq!(errors.get(PaymentField::LoanId), Some(LOAN_ID_NOT_POSITIVE), "{raw:?}");
    }

    draft.loan_id = "4".into();
    assert!(validate_payment(&draft, today()).is_empty());
}

#[test]
fn payment_date_defaults_to_today() {
    let draft = PaymentDraft {
        loan_id: "2".into(),
        payment_date: String::new(),
    };

    let payment = prepare_payment(&draft, today()).expect("valid draft");
    assert_eq!(payment.loan_id, LoanId(2));
    assert_eq!(payment.payment_date, Some(today()));
}

#[test]
fn future_payment_is_rejected_for_payments() {
    let draft = PaymentDraft {
        loan_id: "2".into(),
        payment_date: "2025-05-16".into(),
    };

    let errors = prepare_payment(&draft, today()).expect_err("future date");
    assert_eq!(errors.get(PaymentField::PaymentDate), Some(PAYMENT_DATE_IN_FUTURE));
    assert!(!errors.contains(PaymentField::LoanId));
}

#[test]
fn error_set_apply_clears_resolved_fields() {
    let mut errors = ValidationErrorSet::new();
    errors.apply(LoanField::Name, Some(LOAN_NAME_REQUIRED));
    assert!(errors.contains(LoanField::Name));
    errors.apply(LoanField::Name, None);
    assert!(errors.is_empty());
}
