//! Tests for core_kernel error types

use std::error::Error;

use core_kernel::error::CoreError;
use core_kernel::{FileIncomingId, UpdateId};

#[test]
fn test_invalid_update_id_names_kind_and_input() {
    let error = "UPD-not-a-uuid".parse::<UpdateId>().unwrap_err();

    match &error {
        CoreError::InvalidIdentifier { kind, value, .. } => {
            assert_eq!(*kind, UpdateId::prefix());
            assert_eq!(value, "UPD-not-a-uuid");
        }
    }
    assert!(error.to_string().contains("'UPD-not-a-uuid'"));
}

#[test]
fn test_invalid_identifier_keeps_uuid_source() {
    let error = "42".parse::<FileIncomingId>().unwrap_err();

    assert!(error.source().is_some());
    assert!(error
        .to_string()
        .starts_with(&format!("Invalid {} identifier", FileIncomingId::prefix())));
}
