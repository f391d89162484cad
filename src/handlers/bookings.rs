use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{optional_text, present};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::booking::hhmm;
use crate::models::{BookingDetail, BookingStatus};
use crate::services::lifecycle::{self, BookingParty};
use crate::services::scheduling::{self, BookingRequest};
use crate::services::session;
use crate::state::AppState;

/// Loads a booking and the caller's role on it. Outsiders get 403, never the row.
pub(crate) fn booking_for_party(
    conn: &Connection,
    booking_id: &str,
    user_id: &str,
) -> Result<(BookingDetail, BookingParty), AppError> {
    let detail = queries::get_booking_detail(conn, booking_id)?
        .ok_or_else(|| AppError::not_found("Booking"))?;
    let party = BookingParty::of(&detail.booking, user_id).ok_or_else(|| {
        tracing::warn!(booking_id = %booking_id, user_id = %user_id, "booking access denied");
        AppError::forbidden()
    })?;
    Ok((detail, party))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    #[serde(alias = "serviceId")]
    pub service_id: Option<String>,
    #[serde(alias = "requestedDate")]
    pub requested_date: Option<String>,
    #[serde(alias = "requestedTime")]
    pub requested_time: Option<String>,
    #[serde(alias = "specialInstructions")]
    pub special_instructions: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let (Some(service_id), Some(date), Some(time)) = (
        present(&body.service_id),
        present(&body.requested_date),
        present(&body.requested_time),
    ) else {
        return Err(AppError::bad_request(
            "Service, date and time are required",
        ));
    };

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("Invalid date format"))?;
    let time = hhmm::parse(time).ok_or_else(|| AppError::bad_request("Invalid time format"))?;

    let request = BookingRequest {
        service_id: service_id.to_string(),
        customer_id: user.id.clone(),
        date,
        time,
        special_instructions: optional_text(body.special_instructions),
    };

    // Validation and insert share one lock so no other request can claim the slot in between
    let conn = state.db()?;
    let booking = scheduling::create_booking(&conn, request, queries::now())?;
    let detail = queries::get_booking_detail(&conn, &booking.id)?
        .ok_or_else(|| AppError::not_found("Booking"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "booking": detail })),
    ))
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let conn = state.db()?;
    let incoming = queries::list_bookings_for_provider(&conn, &user.id)?;
    let my_requests = queries::list_bookings_for_customer(&conn, &user.id)?;

    Ok(Json(json!({
        "success": true,
        "incoming": incoming,
        "myRequests": my_requests,
    })))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let conn = state.db()?;
    let (detail, _) = booking_for_party(&conn, &id, &user.id)?;

    Ok(Json(json!({ "success": true, "booking": detail })))
}

// PATCH /api/bookings/:id
#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    pub status: Option<String>,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let target = present(&body.status)
        .and_then(BookingStatus::parse)
        .ok_or_else(|| AppError::bad_request("Invalid status"))?;

    let conn = state.db()?;
    let (detail, party) = booking_for_party(&conn, &id, &user.id)?;
    let current = detail.booking.status;

    lifecycle::authorize_transition(current, target, party)?;

    if !queries::update_booking_status(&conn, &id, current, target)? {
        return Err(AppError::bad_request("Booking status changed, please retry"));
    }

    tracing::info!(
        booking_id = %id,
        from = %current,
        to = %target,
        party = party.as_str(),
        "booking status changed"
    );

    let detail = queries::get_booking_detail(&conn, &id)?
        .ok_or_else(|| AppError::not_found("Booking"))?;

    Ok(Json(json!({ "success": true, "booking": detail })))
}
