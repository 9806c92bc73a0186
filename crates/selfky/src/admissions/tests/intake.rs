use super::common::*;
use crate::admissions::domain::{ApplicationStatus, ApplicationSubmission, PaymentProgress};
use crate::admissions::fees;
use crate::admissions::intake::{IntakeError, IntakeGuard};
use crate::admissions::domain::UserId;
use chrono::{NaiveDate, Utc};

fn guard() -> IntakeGuard {
    IntakeGuard
}

fn user() -> UserId {
    UserId("user-intake".to_string())
}

#[test]
fn builds_submitted_application_with_schedule_fee() {
    let application = guard()
        .application_from_submission(user(), submission(), Utc::now())
        .expect("valid submission accepted");

    assert_eq!(application.status, ApplicationStatus::Submitted);
    assert_eq!(application.payment.status, PaymentProgress::Pending);
    assert_eq!(
        application.payment.amount,
        fees::fee(application.course_type, application.personal_details.category)
    );
    assert!(application.admit_card.is_none());
}

#[test]
fn missing_photo_is_rejected() {
    let mut bad = submission();
    bad.documents.photo_key = "  ".to_string();

    match guard().application_from_submission(user(), bad, Utc::now()) {
        Err(IntakeError::MissingDocument { slot: "photo" }) => {}
        other => panic!("expected missing photo rejection, got {other:?}"),
    }
}

#[test]
fn missing_signature_is_rejected() {
    let mut bad = submission();
    bad.documents.signature_key = String::new();

    match guard().application_from_submission(user(), bad, Utc::now()) {
        Err(IntakeError::MissingDocument { slot: "signature" }) => {}
        other => panic!("expected missing signature rejection, got {other:?}"),
    }
}

#[test]
fn future_date_of_birth_is_rejected() {
    let mut bad = submission();
    bad.personal_details.date_of_birth = NaiveDate::from_ymd_opt(2099, 1, 1).expect("valid");

    match guard().application_from_submission(user(), bad, Utc::now()) {
        Err(IntakeError::ImplausibleDateOfBirth { .. }) => {}
        other => panic!("expected date of birth rejection, got {other:?}"),
    }
}

#[test]
fn blank_name_is_rejected() {
    let mut bad = submission();
    bad.personal_details.full_name = " ".to_string();

    match guard().application_from_submission(user(), bad, Utc::now()) {
        Err(IntakeError::BlankName) => {}
        other => panic!("expected blank name rejection, got {other:?}"),
    }
}

#[test]
fn unknown_category_fails_deserialization() {
    // The legacy "PH" label is not part of the canonical set and must be
    // rejected at the boundary rather than priced with a fallback.
    let raw = serde_json::json!({
        "course_type": "bpharm",
        "personal_details": {
            "full_name": "Asha Verma",
            "fathers_name": "Ramesh Verma",
            "category": "PH",
            "date_of_birth": "2003-04-18",
        },
        "documents": {
            "photo_key": "uploads/u/photo.jpg",
            "signature_key": "uploads/u/sign.jpg",
        },
    });

    let parsed = serde_json::from_value::<ApplicationSubmission>(raw);
    assert!(parsed.is_err(), "unknown category must not deserialize");
}
