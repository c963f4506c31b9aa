//! Unit tests for HubSpot endpoint plumbing

use super::*;

fn status_of(err: IntegrationError) -> StatusCode {
    AppError::from(err).into_response().status()
}

#[test]
fn test_client_errors_map_to_400() {
    assert_eq!(
        status_of(IntegrationError::ProviderError("access_denied".to_string())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(status_of(IntegrationError::StateMismatch), StatusCode::BAD_REQUEST);
    assert_eq!(
        status_of(IntegrationError::CredentialsNotFound),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(IntegrationError::MissingAccessToken),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(IntegrationError::MissingIdentifier("user_id")),
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn test_upstream_status_is_mirrored() {
    assert_eq!(
        status_of(IntegrationError::TokenExchangeFailed {
            status: 401,
            body: "unauthorized".to_string(),
        }),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_of(IntegrationError::UpstreamFetchFailed {
            status: 429,
            body: "slow down".to_string(),
        }),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[test]
fn test_non_error_upstream_status_becomes_500() {
    assert_eq!(upstream_status(302), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(upstream_status(999), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(upstream_status(503), StatusCode::SERVICE_UNAVAILABLE);
}

#[test]
fn test_store_failure_is_500() {
    let err = IntegrationError::Store(crate::store::StoreError::Connection("refused".to_string()));
    assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_oauth_callback_deserialization() {
    // Success case
    let query = "code=auth_code_123&state=%7B%22state%22%3A%22abc%22%7D";
    let callback: CallbackParams = serde_urlencoded::from_str(query).unwrap();
    assert_eq!(callback.code.as_deref(), Some("auth_code_123"));
    assert_eq!(callback.state.as_deref(), Some(r#"{"state":"abc"}"#));
    assert_eq!(callback.error, None);

    // Error case
    let query = "error=access_denied&error_description=User+cancelled";
    let callback: CallbackParams = serde_urlencoded::from_str(query).unwrap();
    assert_eq!(callback.error.as_deref(), Some("access_denied"));
    assert_eq!(callback.error_description.as_deref(), Some("User cancelled"));
    assert_eq!(callback.code, None);
}

#[test]
fn test_identity_form_defaults_missing_fields() {
    let form: IdentityForm = serde_urlencoded::from_str("user_id=u1").unwrap();
    assert_eq!(form.user_id, "u1");
    assert_eq!(form.org_id, "");
}

#[test]
fn test_close_window_html() {
    assert!(CLOSE_WINDOW_HTML.contains("window.close()"));
}
