mod common;

use archalley::{
    domain::{CartStatus, PaymentStatus},
    service::NotificationOutcome,
    payments::PayHereNotification,
};
use axum::http::StatusCode;
use common::*;

#[tokio::test]
async fn test_successful_notification_creates_registrations() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (user, payment) = app.pending_order("ORDER123", 2).await?;

    let response = app.post_notification(&notification(&payment, "2")).await?;
    assert_status(&response, StatusCode::OK);
    assert_eq!(json_body(response).await?["success"], true);

    let payment = app.payment("ORDER123").await?;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.completed_at.is_some());
    assert_eq!(payment.gateway_payment_id.as_deref(), Some("320025071278"));
    assert_eq!(payment.gateway_method.as_deref(), Some("VISA"));
    assert_eq!(payment.card_no.as_deref(), Some("************1292"));
    assert!(payment.failure_reason.is_none());

    let registrations = app.context.registration_repo.find_by_payment(payment.id).await?;
    assert_eq!(registrations.len(), 2);
    for registration in &registrations {
        assert!(registration.registration_number.starts_with("ARC-"));
        assert_eq!(registration.user_id, user.id);
        assert_eq!(registration.amount_paid_cents, 250000);
    }
    assert_ne!(
        registrations[0].registration_number,
        registrations[1].registration_number
    );

    // The cart that was paid for is closed
    let metadata = payment.cart_metadata().expect("metadata");
    let cart = app.context.cart_repo.find_by_id(metadata.cart_id).await?.expect("cart");
    assert_eq!(cart.status, CartStatus::Completed);

    // Two entries share one consolidated email
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, user.email);
    assert!(sent[0].subject.contains("2 competition registrations"));
    for registration in &registrations {
        assert!(sent[0].html_body.contains(&registration.registration_number));
    }

    Ok(())
}

#[tokio::test]
async fn test_single_registration_sends_three_emails() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (user, payment) = app.pending_order("ORDER200", 1).await?;

    let response = app.post_notification(&notification(&payment, "2")).await?;
    assert_status(&response, StatusCode::OK);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.to == user.email));
    assert!(sent[0].subject.starts_with("Registration confirmed"));
    assert!(sent[1].subject.contains("ORDER200"));
    assert!(sent[2].subject.contains("guidelines"));

    Ok(())
}

#[tokio::test]
async fn test_invalid_signature_marks_payment_failed() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER300", 1).await?;

    let mut fields = notification(&payment, "2");
    for (name, value) in fields.iter_mut() {
        if *name == "md5sig" {
            *value = "0".repeat(32);
        }
    }

    let response = app.post_notification(&fields).await?;
    assert_status(&response, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await?["error"], "Invalid signature");

    let payment = app.payment("ORDER300").await?;
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(payment.failure_reason.as_deref(), Some("Invalid payment signature"));
    assert_eq!(app.registration_count(&payment).await?, 0);
    assert!(app.mailer.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_tampered_amount_fails_verification() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER301", 1).await?;

    let mut fields = notification(&payment, "2");
    for (name, value) in fields.iter_mut() {
        if *name == "payhere_amount" {
            *value = "1.00".to_string();
        }
    }

    let response = app.post_notification(&fields).await?;
    assert_status(&response, StatusCode::BAD_REQUEST);
    assert_eq!(app.registration_count(&payment).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_invalid_signature_does_not_downgrade_completed_payment() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER302", 1).await?;

    app.post_notification(&notification(&payment, "2")).await?;

    let mut forged = notification(&payment, "-2");
    for (name, value) in forged.iter_mut() {
        if *name == "md5sig" {
            *value = "F".repeat(32);
        }
    }
    let response = app.post_notification(&forged).await?;
    assert_status(&response, StatusCode::BAD_REQUEST);

    let payment = app.payment("ORDER302").await?;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.failure_reason.is_none());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_notifications_are_idempotent() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER400", 2).await?;
    let fields = notification(&payment, "2");

    let first = app.post_notification(&fields).await?;
    assert_status(&first, StatusCode::OK);
    let second = app.post_notification(&fields).await?;
    assert_status(&second, StatusCode::OK);

    assert_eq!(app.registration_count(&payment).await?, 2);
    assert_eq!(app.mailer.sent().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_notifications_materialize_once() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER401", 2).await?;

    let fields = notification(&payment, "2");
    let body = serde_urlencoded::to_string(&fields)?;
    let first: PayHereNotification = serde_urlencoded::from_str(&body)?;
    let second = first.clone();

    let service = &app.context.payment_service;
    let (a, b) = tokio::join!(
        service.handle_notification(first),
        service.handle_notification(second)
    );

    let mut outcomes = vec![a?, b?];
    outcomes.sort_by_key(|o| matches!(o, NotificationOutcome::AlreadyCompleted));
    assert_eq!(outcomes[0], NotificationOutcome::Completed { registrations: 2 });
    assert_eq!(outcomes[1], NotificationOutcome::AlreadyCompleted);

    assert_eq!(app.registration_count(&payment).await?, 2);
    assert_eq!(app.mailer.sent().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_cancelled_notification() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER999", 1).await?;

    let mut fields = notification(&payment, "-1");
    for (name, value) in fields.iter_mut() {
        if *name == "status_message" {
            *value = "Customer cancelled the payment".to_string();
        }
    }

    let response = app.post_notification(&fields).await?;
    assert_status(&response, StatusCode::OK);

    let payment = app.payment("ORDER999").await?;
    assert_eq!(payment.status, PaymentStatus::Cancelled);
    assert_eq!(payment.failure_reason.as_deref(), Some("Customer cancelled the payment"));
    assert_eq!(app.registration_count(&payment).await?, 0);
    assert!(app.mailer.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_notification_does_not_downgrade_completed() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER500", 1).await?;

    app.post_notification(&notification(&payment, "2")).await?;
    let response = app.post_notification(&notification(&payment, "-2")).await?;
    assert_status(&response, StatusCode::OK);

    let payment = app.payment("ORDER500").await?;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(app.registration_count(&payment).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_chargeback_marks_payment_refunded() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER600", 1).await?;

    app.post_notification(&notification(&payment, "2")).await?;
    let response = app.post_notification(&notification(&payment, "-3")).await?;
    assert_status(&response, StatusCode::OK);

    let payment = app.payment("ORDER600").await?;
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert!(payment.refunded_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_pending_and_unknown_codes_leave_payment_untouched() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER700", 1).await?;

    for code in ["0", "7"] {
        let response = app.post_notification(&notification(&payment, code)).await?;
        assert_status(&response, StatusCode::OK);
    }

    let payment = app.payment("ORDER700").await?;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(app.registration_count(&payment).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_unknown_order_returns_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER800", 1).await?;

    let mut fields = notification(&payment, "2");
    for (name, value) in fields.iter_mut() {
        if *name == "order_id" {
            *value = "NO-SUCH-ORDER".to_string();
        }
    }

    let response = app.post_notification(&fields).await?;
    assert_status(&response, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_missing_cart_reference_is_a_server_error() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.create_user("nometa@example.com", "Dilini Jayawardena").await?;
    let payment = app.bare_payment(&user, "ORDER900", None).await?;

    let response = app.post_notification(&notification(&payment, "2")).await?;
    assert_status(&response, StatusCode::INTERNAL_SERVER_ERROR);

    let payment = app.payment("ORDER900").await?;
    assert_eq!(payment.status, PaymentStatus::Pending);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_notifications_racing_return_fallback_materialize_once() -> anyhow::Result<()> {
    let (pool, path) = file_pool(4).await?;
    let app = spawn_app_on(pool.clone(), test_settings()).await?;
    let (_, payment) = app.pending_order("ORDER402", 2).await?;

    let fields = notification(&payment, "2");
    let return_uri = "/api/payments/payhere/return?order_id=ORDER402";

    let mut tasks = Vec::new();
    for i in 0..8 {
        let router = app.router.clone();
        let is_notify = i % 2 == 0;
        let request = if is_notify {
            notify_request(&fields)?
        } else {
            get_request(return_uri)?
        };
        tasks.push(tokio::spawn(async move {
            (is_notify, tower::ServiceExt::oneshot(router, request).await)
        }));
    }

    for task in tasks {
        let (is_notify, response) = task.await?;
        let response = response?;
        if is_notify {
            assert_status(&response, StatusCode::OK);
        } else {
            assert_eq!(
                location(&response).as_deref(),
                Some("/competitions/payment/success/ORDER402")
            );
        }
    }

    let payment = app.payment("ORDER402").await?;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(app.registration_count(&payment).await?, 2);
    assert_eq!(app.mailer.sent().len(), 1);

    drop(app);
    remove_database(pool, &path).await;

    Ok(())
}

#[tokio::test]
async fn test_non_form_notification_is_rejected_as_json() -> anyhow::Result<()> {
    let app = spawn_app().await?;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/payments/payhere/notify")
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"order_id":"ORDER123"}"#))?;
    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await?;

    assert_status(&response, StatusCode::BAD_REQUEST);
    assert!(json_body(response).await?["error"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_no_registrations_build_no_messages() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, payment) = app.pending_order("ORDER403", 1).await?;

    let messages = app.context.notifier.build_messages(&payment, &[]).await?;
    assert!(messages.is_empty());

    Ok(())
}
