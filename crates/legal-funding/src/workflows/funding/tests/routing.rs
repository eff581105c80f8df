use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::funding::seed::DEMO_PASSWORD;

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn raw_request(uri: &str, token: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn sign_in_returns_token_and_role() {
    let fixture = fixture();
    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/session",
            None,
            json!({ "email": LENDER_ADMIN, "password": DEMO_PASSWORD }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["role"], "LENDER_ADMIN");
    assert!(payload["token"].as_str().unwrap().starts_with("lf_"));
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let fixture = fixture();
    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/session",
            None,
            json!({ "email": LENDER_ADMIN, "password": "guess" }),
        ))
        .await
        .expect("route executes");

    assert_error_status(&response, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_without_a_session_are_rejected_first() {
    let fixture = fixture();
    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/applications",
            None,
            json!({ "amount": 5, "purpose": "" }),
        ))
        .await
        .expect("route executes");

    assert_error_status(&response, StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "Unauthorized");
}

#[tokio::test]
async fn create_route_returns_created_application() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_ADMIN);

    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/applications",
            Some(&token),
            json!({
                "amount": 50000,
                "purpose": "Expert witness fees and deposition costs",
                "case_number": "CV-2025-00077",
                "requested_term": "18 months"
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "PENDING_REVIEW");
    assert_eq!(payload["amount"], 50000);
    assert_eq!(payload["case_number"], "CV-2025-00077");
    assert_eq!(payload["bank_account_id"], json!(fixture.seed.trust_account.id));
}

#[tokio::test]
async fn create_route_reports_field_details() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_USER);

    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/applications",
            Some(&token),
            json!({ "amount": 999, "purpose": "short" }),
        ))
        .await
        .expect("route executes");

    assert_error_status(&response, StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "Validation failed");
    assert_eq!(payload["details"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn create_route_names_a_missing_field() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_USER);

    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/applications",
            Some(&token),
            json!({ "amount": 50000 }),
        ))
        .await
        .expect("route executes");

    assert_error_status(&response, StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "Validation failed");
    assert_eq!(payload["details"][0]["field"], "purpose");
    assert_eq!(payload["details"][0]["message"], "Purpose is required");
}

#[tokio::test]
async fn unreadable_amounts_and_bodies_are_validation_failures() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_USER);

    for body in [
        r#"{"amount": 1500.5, "purpose": "Expert witness fees and deposition costs"}"#,
        r#"{"amount": -5, "purpose": "Expert witness fees and deposition costs"}"#,
        r#"{"amount": 50000, "purpose": "#,
    ] {
        let response = fixture
            .router()
            .oneshot(raw_request("/api/v1/applications", &token, body))
            .await
            .expect("route executes");

        assert_error_status(&response, StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], "Validation failed", "{body}");
        assert!(payload["details"][0]["field"].is_string(), "{body}");
    }
}

#[tokio::test]
async fn malformed_sign_in_is_a_validation_failure() {
    let fixture = fixture();
    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            "/api/v1/session",
            None,
            json!({ "email": LENDER_ADMIN }),
        ))
        .await
        .expect("route executes");

    assert_error_status(&response, StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["details"][0]["field"], "password");
}

#[tokio::test]
async fn capability_is_checked_before_the_body_is_read() {
    let fixture = fixture();
    let borrower = fixture.token(BORROWER_ADMIN);
    let lender = fixture.token(LENDER_ADMIN);
    let pending = fixture.seeded("APP-2024-002");
    let approved = fixture.seeded("APP-2024-003");

    for (uri, token) in [
        (format!("/api/v1/applications/{}/review", pending.id), &borrower),
        (format!("/api/v1/applications/{}/fund", approved.id), &borrower),
        ("/api/v1/applications".to_string(), &lender),
    ] {
        let response = fixture
            .router()
            .oneshot(raw_request(&uri, token, r#"{"action": 5"#))
            .await
            .expect("route executes");
        assert_error_status(&response, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn borrower_review_attempt_is_forbidden() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_ADMIN);
    let pending = fixture.seeded("APP-2024-002");

    for id in [pending.id.to_string(), "not-a-uuid".to_string()] {
        let response = fixture
            .router()
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/applications/{id}/review"),
                Some(&token),
                json!({ "action": "approve" }),
            ))
            .await
            .expect("route executes");
        assert_error_status(&response, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn repeated_review_is_a_conflict() {
    let fixture = fixture();
    let token = fixture.token(REVIEWER);
    let pending = fixture.seeded("APP-2024-002");
    let uri = format!("/api/v1/applications/{}/review", pending.id);

    let first = fixture
        .router()
        .oneshot(json_request(
            "POST",
            &uri,
            Some(&token),
            json!({ "action": "approve", "notes": "Solid case" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::OK);
    let approved = read_json_body(first).await;
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["review_notes"], "Solid case");

    let second = fixture
        .router()
        .oneshot(json_request(
            "POST",
            &uri,
            Some(&token),
            json!({ "action": "reject" }),
        ))
        .await
        .expect("route executes");
    assert_error_status(&second, StatusCode::CONFLICT);
    let payload = read_json_body(second).await;
    assert_eq!(payload["error"], "Application has already been reviewed");
}

#[tokio::test]
async fn fund_route_returns_transaction_number() {
    let fixture = fixture();
    let token = fixture.token(LENDER_ADMIN);
    let approved = fixture.seeded("APP-2024-003");

    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/applications/{}/fund", approved.id),
            Some(&token),
            json!({ "transfer_method": "ach", "confirm": true }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["application"]["status"], "FUNDED");
    assert!(payload["transaction_number"]
        .as_str()
        .unwrap()
        .starts_with("TXN-"));
}

#[tokio::test]
async fn fund_route_requires_confirmation() {
    let fixture = fixture();
    let token = fixture.token(LENDER_ADMIN);
    let approved = fixture.seeded("APP-2024-003");

    let response = fixture
        .router()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/applications/{}/fund", approved.id),
            Some(&token),
            json!({ "transfer_method": "wire" }),
        ))
        .await
        .expect("route executes");

    assert_error_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_route_applies_status_filter() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_USER);

    let response = fixture
        .router()
        .oneshot(get_request(
            "/api/v1/applications?status=pending_review",
            Some(&token),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let numbers: Vec<&str> = payload
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["application_number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["APP-2024-002"]);

    let invalid = fixture
        .router()
        .oneshot(get_request("/api/v1/applications?status=PAID", Some(&token)))
        .await
        .expect("route executes");
    assert_error_status(&invalid, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn detail_route_hides_other_firms_and_missing_records() {
    let fixture = fixture();
    let outsider = accountless_borrower(&fixture.store);
    let token = fixture
        .sessions
        .sign_in("paralegal@doelitigation.test", DEMO_PASSWORD)
        .expect("outsider signs in")
        .token;
    assert_eq!(outsider.role, crate::workflows::funding::domain::Role::BorrowerUser);
    let application = fixture.seeded("APP-2024-001");

    let forbidden = fixture
        .router()
        .oneshot(get_request(
            &format!("/api/v1/applications/{}", application.id),
            Some(&token),
        ))
        .await
        .expect("route executes");
    assert_error_status(&forbidden, StatusCode::FORBIDDEN);

    let lender = fixture.token(REVIEWER);
    let missing = fixture
        .router()
        .oneshot(get_request(
            &format!("/api/v1/applications/{}", uuid::Uuid::new_v4()),
            Some(&lender),
        ))
        .await
        .expect("route executes");
    assert_error_status(&missing, StatusCode::NOT_FOUND);
    let payload = read_json_body(missing).await;
    assert_eq!(payload["error"], "Application not found");
}

#[tokio::test]
async fn document_route_streams_pdf_attachment() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_ADMIN);
    let approved = fixture.seeded("APP-2024-003");

    let response = fixture
        .router()
        .oneshot(get_request(
            &format!("/api/v1/applications/{}/document", approved.id),
            Some(&token),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"loan-agreement-APP-2024-003.pdf\""
    );
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    assert!(body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn document_route_refuses_unapproved_applications() {
    let fixture = fixture();
    let token = fixture.token(LENDER_ADMIN);
    let pending = fixture.seeded("APP-2024-002");

    let response = fixture
        .router()
        .oneshot(get_request(
            &format!("/api/v1/applications/{}/document", pending.id),
            Some(&token),
        ))
        .await
        .expect("route executes");

    assert_error_status(&response, StatusCode::CONFLICT);
}

#[tokio::test]
async fn sign_out_invalidates_the_token() {
    let fixture = fixture();
    let token = fixture.token(BORROWER_USER);

    let response = fixture
        .router()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/session")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let after = fixture
        .router()
        .oneshot(get_request("/api/v1/applications", Some(&token)))
        .await
        .expect("route executes");
    assert_error_status(&after, StatusCode::UNAUTHORIZED);
}
