use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::bookings::booking_for_party;
use super::present;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::lifecycle::{self, BookingParty};
use crate::services::payments::webhook::{self, WebhookEvent};
use crate::services::payments::{is_valid_intent_id, to_minor_units, NewPaymentIntent};
use crate::services::session;
use crate::state::AppState;

// POST /api/payments/create-intent
#[derive(Deserialize)]
pub struct CreateIntentRequest {
    #[serde(alias = "bookingId")]
    pub booking_id: Option<String>,
}

pub async fn create_intent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateIntentRequest>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;
    let booking_id =
        present(&body.booking_id).ok_or_else(|| AppError::bad_request("Booking ID is required"))?;

    let detail = {
        let conn = state.db()?;
        let (detail, party) = booking_for_party(&conn, booking_id, &user.id)?;
        if party != BookingParty::Customer {
            return Err(AppError::forbidden());
        }
        detail
    };
    if detail.booking.status != BookingStatus::Completed {
        return Err(AppError::bad_request(
            "Booking must be completed before payment",
        ));
    }

    let metadata = BTreeMap::from([
        ("bookingId".to_string(), detail.booking.id.clone()),
        ("serviceTitle".to_string(), detail.service.title.clone()),
        ("customerId".to_string(), detail.booking.user_id.clone()),
        ("providerId".to_string(), detail.booking.provider_id.clone()),
    ]);
    let intent = state
        .payments
        .create_payment_intent(&NewPaymentIntent {
            amount: to_minor_units(detail.booking.total_price),
            currency: state.config.currency.clone(),
            metadata,
        })
        .await?;

    tracing::info!(
        booking_id = %booking_id,
        payment_intent = %intent.id,
        amount = intent.amount,
        "payment intent created"
    );

    Ok(Json(json!({
        "success": true,
        "clientSecret": intent.client_secret,
        "amount": intent.amount,
    })))
}

// POST /api/payments/confirm
#[derive(Deserialize)]
pub struct ConfirmPaymentRequest {
    #[serde(alias = "paymentIntentId")]
    pub payment_intent_id: Option<String>,
}

pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ConfirmPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;
    let intent_id = present(&body.payment_intent_id)
        .ok_or_else(|| AppError::bad_request("Payment intent ID is required"))?;
    if !is_valid_intent_id(intent_id) {
        return Err(AppError::bad_request("Invalid payment intent ID"));
    }

    let intent = state.payments.retrieve_payment_intent(intent_id).await?;
    if !intent.succeeded() {
        return Err(AppError::bad_request("Payment has not succeeded"));
    }
    let booking_id = intent
        .booking_id()
        .ok_or_else(|| AppError::bad_request("Payment is not linked to a booking"))?;

    let conn = state.db()?;
    let (detail, party) = booking_for_party(&conn, booking_id, &user.id)?;
    if party != BookingParty::Customer {
        return Err(AppError::forbidden());
    }

    let booking = detail.booking;
    if booking.status == BookingStatus::Paid
        && booking.payment_intent_id.as_deref() == Some(intent.id.as_str())
    {
        return Ok(Json(json!({ "success": true, "alreadyPaid": true })));
    }

    lifecycle::authorize_transition(booking.status, BookingStatus::Paid, party)?;
    if !queries::mark_booking_paid(&conn, booking_id, &intent.id)? {
        return Err(AppError::bad_request("Booking status changed, please retry"));
    }

    tracing::info!(booking_id = %booking_id, payment_intent = %intent.id, "payment confirmed");

    Ok(Json(json!({ "success": true })))
}

// POST /api/payments/webhook
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Missing stripe-signature header"))?;

    let now = chrono::Utc::now().timestamp();
    let secret = &state.config.stripe_webhook_secret;
    if let Err(e) = webhook::verify_webhook_signature(&body, signature, secret, now) {
        tracing::warn!(error = %e, "webhook signature verification failed");
        return Err(AppError::bad_request(format!("Webhook Error: {e}")));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Webhook Error: {e}")))?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" => settle_booking(&state, &event)?,
        "payment_intent.payment_failed" => {
            tracing::warn!(
                payment_intent = event.object_id().unwrap_or("unknown"),
                booking_id = event.booking_id().unwrap_or("unknown"),
                "payment failed"
            );
        }
        other => tracing::debug!(event_type = %other, "unhandled webhook event"),
    }

    Ok(Json(json!({ "received": true })))
}

fn settle_booking(state: &AppState, event: &WebhookEvent) -> Result<(), AppError> {
    let intent_id = event.object_id().unwrap_or_default();
    let Some(booking_id) = event.booking_id() else {
        tracing::warn!(payment_intent = %intent_id, "succeeded intent has no booking id");
        return Ok(());
    };

    let conn = state.db()?;
    let Some(booking) = queries::get_booking(&conn, booking_id)? else {
        tracing::warn!(booking_id = %booking_id, "webhook for unknown booking");
        return Ok(());
    };

    if booking.status == BookingStatus::Paid {
        tracing::info!(booking_id = %booking_id, "booking already paid, ignoring replay");
        return Ok(());
    }
    if let Err(e) = lifecycle::authorize_transition(
        booking.status,
        BookingStatus::Paid,
        BookingParty::PaymentGateway,
    ) {
        tracing::warn!(
            booking_id = %booking_id,
            error = %e,
            "payment received for unsettleable booking"
        );
        return Ok(());
    }

    if queries::mark_booking_paid(&conn, booking_id, intent_id)? {
        tracing::info!(booking_id = %booking_id, payment_intent = %intent_id, "booking paid");
    }
    Ok(())
}
