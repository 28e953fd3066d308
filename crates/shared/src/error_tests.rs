use super::*;
use rstest::rstest;

#[rstest]
#[case(AppError::NotFound("income".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("amount".into()), 400, "VALIDATION_ERROR")]
#[case(AppError::Database("timeout".into()), 500, "DATABASE_ERROR")]
fn test_app_error_mapping(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
    assert_eq!(err.status_code(), status);
    assert_eq!(err.error_code(), code);
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        AppError::NotFound("msg".into()).to_string(),
        "Not found: msg"
    );
    assert_eq!(
        AppError::Validation("msg".into()).to_string(),
        "Validation error: msg"
    );
    assert_eq!(
        AppError::Database("msg".into()).to_string(),
        "Database error: msg"
    );
}

#[test]
fn test_client_errors() {
    assert!(AppError::NotFound(String::new()).is_client_error());
    assert!(AppError::Validation(String::new()).is_client_error());
    assert!(!AppError::Database(String::new()).is_client_error());
}
