//! # Dispatcher Tests
//!
//! End-to-end handling of lifecycle events with a scripted provider and a
//! recording reporter. Every event, successful or not, must produce exactly
//! one terminal report.

mod common;

use common::{
    create_event, delete, delete_event, event, token_for, update_event, verify, FakeProvider,
    RecordingReporter,
};
use serde_json::json;
use ses_domain_verifier::dispatcher::{
    dispatch, handle_event, handle_event_value, EventError, Outcome,
};
use ses_domain_verifier::event::{LifecycleEvent, RequestType};
use ses_domain_verifier::provider::ProviderError;
use ses_domain_verifier::reconciler::Reconciler;
use ses_domain_verifier::reporter::{ReportError, ReportStatus};

#[tokio::test]
async fn test_create_reports_token() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();
    let reconciler = Reconciler::new(&provider);

    let report = handle_event(&create_event("example.com"), &reconciler, &reporter)
        .await
        .unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.physical_resource_id, "example.com");
    assert_eq!(report.verification_token(), Some(token_for("example.com").as_str()));
    assert_eq!(reporter.only_report(), report);
    assert_eq!(provider.calls(), vec![verify("example.com")]);
}

#[tokio::test]
async fn test_create_from_raw_event_json() {
    let raw = r#"{
        "RequestType": "Create",
        "ResponseURL": "https://cloudformation-custom-resource-response.invalid/report",
        "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/mail/1",
        "RequestId": "req-42",
        "ResourceType": "Custom::SesDomainVerifier",
        "LogicalResourceId": "DomainVerifier",
        "ResourceProperties": {
            "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:verifier",
            "Domain": "example.com"
        }
    }"#;
    let event = LifecycleEvent::from_json(raw).unwrap();
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();

    let report = handle_event(&event, &Reconciler::new(&provider), &reporter)
        .await
        .unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.request_id, "req-42");
    assert_eq!(report.logical_resource_id, "DomainVerifier");
    assert_eq!(
        report.stack_id,
        "arn:aws:cloudformation:us-east-1:123456789012:stack/mail/1"
    );
    assert!(!report.no_echo);
}

#[tokio::test]
async fn test_delete_of_missing_identity_reports_success() {
    let provider = FakeProvider::new().fail_delete(
        "example.com",
        ProviderError::NotFound("Identity does not exist".to_string()),
    );
    let reporter = RecordingReporter::new();

    let report = handle_event(
        &delete_event("example.com"),
        &Reconciler::new(&provider),
        &reporter,
    )
    .await
    .unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.physical_resource_id, "example.com");
    assert!(report.data.is_empty());
}

#[tokio::test]
async fn test_update_with_failed_delete_reports_failure() {
    let provider = FakeProvider::new().fail_delete(
        "old.com",
        ProviderError::Rejected("permission denied".to_string()),
    );
    let reporter = RecordingReporter::new();

    let report = handle_event(
        &update_event("old.com", "new.com"),
        &Reconciler::new(&provider),
        &reporter,
    )
    .await
    .unwrap();

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.error(), Some("permission denied"));
    assert_eq!(report.physical_resource_id, "old.com");
    assert!(report.reason.contains("old.com"));
    assert!(report.reason.contains("new.com"));
    assert_eq!(provider.calls(), vec![delete("old.com")]);
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn test_update_success_reports_new_domain() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();

    let report = handle_event(
        &update_event("old.com", "new.com"),
        &Reconciler::new(&provider),
        &reporter,
    )
    .await
    .unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.physical_resource_id, "new.com");
    assert_eq!(report.verification_token(), Some(token_for("new.com").as_str()));
}

#[tokio::test]
async fn test_unknown_request_type_reports_empty_success() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();
    let mut unknown = event(RequestType::Unknown, Some("example.com"));
    unknown.physical_resource_id = Some("example.com".to_string());

    let report = handle_event(&unknown, &Reconciler::new(&provider), &reporter)
        .await
        .unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert!(report.data.is_empty());
    assert_eq!(report.physical_resource_id, "example.com");
    assert!(provider.calls().is_empty());
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn test_unknown_request_type_parsed_from_json() {
    let raw = r#"{"RequestType": "Refresh", "ResponseURL": "https://example.invalid/r"}"#;
    let event = LifecycleEvent::from_json(raw).unwrap();
    let provider = FakeProvider::new();

    let outcome = dispatch(&event, &Reconciler::new(&provider)).await;

    assert!(outcome.is_success());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_failed_create_uses_placeholder_id() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();

    let report = handle_event(
        &event(RequestType::Create, None),
        &Reconciler::new(&provider),
        &reporter,
    )
    .await
    .unwrap();

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(
        report.physical_resource_id,
        "ses-domain-verifier-failed-DomainVerifier"
    );
    assert_eq!(report.error(), Some("Domain is required"));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_delete_after_failed_create_makes_no_calls() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();
    let mut cleanup = event(RequestType::Delete, Some("example.com"));
    cleanup.physical_resource_id = Some("ses-domain-verifier-failed-DomainVerifier".to_string());

    let report = handle_event(&cleanup, &Reconciler::new(&provider), &reporter)
        .await
        .unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(
        report.physical_resource_id,
        "ses-domain-verifier-failed-DomainVerifier"
    );
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_every_event_is_reported_exactly_once() {
    let provider = FakeProvider::new()
        .fail_verify("broken.com", ProviderError::Transient("Rate exceeded".to_string()))
        .fail_delete("broken.com", ProviderError::Rejected("denied".to_string()));
    let reconciler = Reconciler::new(&provider);

    let events = vec![
        create_event("example.com"),
        create_event("broken.com"),
        create_event("not valid"),
        delete_event("example.com"),
        delete_event("broken.com"),
        update_event("old.com", "new.com"),
        update_event("broken.com", "new.com"),
        update_event("old.com", "broken.com"),
        event(RequestType::Unknown, None),
        event(RequestType::Update, Some("new.com")),
    ];

    for event in &events {
        let reporter = RecordingReporter::new();
        let report = handle_event(event, &reconciler, &reporter).await.unwrap();
        assert_eq!(reporter.only_report(), report, "event {event:?}");
    }
}

#[tokio::test]
async fn test_delivery_failure_is_returned_after_one_attempt() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::rejecting(403);

    let err = handle_event(
        &create_event("example.com"),
        &Reconciler::new(&provider),
        &reporter,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReportError::Status { status: 403, .. }));
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn test_dispatch_failure_outcome_carries_kind_and_detail() {
    let provider = FakeProvider::new().fail_verify(
        "example.com",
        ProviderError::Rejected("Access denied".to_string()),
    );

    let outcome = dispatch(&create_event("example.com"), &Reconciler::new(&provider)).await;

    match outcome {
        Outcome::Failure(failure) => {
            assert_eq!(failure.kind, "provider");
            assert_eq!(failure.detail, "Access denied");
            assert!(failure.message.contains("example.com"));
        }
        Outcome::Success(success) => panic!("expected failure, got {success:?}"),
    }
}

#[tokio::test]
async fn test_malformed_bodies_are_reported_once_as_failures() {
    let provider = FakeProvider::new();
    let reconciler = Reconciler::new(&provider);
    let url = "https://cloudformation-custom-resource-response.invalid/report";

    let bodies = vec![
        json!({
            "RequestType": "Create",
            "ResponseURL": url,
            "ResourceProperties": { "Domain": 123 }
        }),
        json!({
            "RequestType": "Create",
            "ResponseURL": url,
            "ResourceProperties": { "Domain": ["a.com"] }
        }),
        json!({
            "RequestType": 42,
            "ResponseURL": url,
            "ResourceProperties": { "Domain": "a.com" }
        }),
        json!({
            "RequestType": "Update",
            "ResponseURL": url,
            "ResourceProperties": { "Domain": "new.com" },
            "OldResourceProperties": "old.com"
        }),
    ];

    for body in &bodies {
        let reporter = RecordingReporter::new();
        let report = handle_event_value(body, &reconciler, &reporter).await.unwrap();
        assert_eq!(report.status, ReportStatus::Failed, "body {body}");
        assert!(report.error().is_some());
        assert_eq!(reporter.only_report(), report);
    }
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_update_keeps_physical_resource_id() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();
    let body = json!({
        "RequestType": "Update",
        "ResponseURL": "https://cloudformation-custom-resource-response.invalid/report",
        "RequestId": "req-5",
        "LogicalResourceId": "DomainVerifier",
        "PhysicalResourceId": "old.com",
        "ResourceProperties": { "Domain": 123 }
    });

    let report = handle_event_value(&body, &Reconciler::new(&provider), &reporter)
        .await
        .unwrap();

    assert_eq!(report.physical_resource_id, "old.com");
    assert_eq!(report.request_id, "req-5");
    assert!(report.reason.starts_with("invalid lifecycle event"));
}

#[tokio::test]
async fn test_valid_body_is_dispatched() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();
    let body = serde_json::to_value(create_event("example.com")).unwrap();

    let report = handle_event_value(&body, &Reconciler::new(&provider), &reporter)
        .await
        .unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(provider.calls(), vec![verify("example.com")]);
}

#[tokio::test]
async fn test_body_without_response_url_is_not_reported() {
    let provider = FakeProvider::new();
    let reporter = RecordingReporter::new();
    let body = json!({ "RequestType": "Create", "ResourceProperties": { "Domain": 123 } });

    let err = handle_event_value(&body, &Reconciler::new(&provider), &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, EventError::MissingResponseUrl(_)));
    assert!(reporter.reports().is_empty());
}
