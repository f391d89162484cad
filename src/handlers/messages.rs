use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::bookings::booking_for_party;
use super::present;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::Message;
use crate::services::session;
use crate::state::AppState;

// GET /api/messages?booking_id=
#[derive(Deserialize)]
pub struct ThreadQuery {
    #[serde(alias = "bookingId")]
    pub booking_id: Option<String>,
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;
    let booking_id =
        present(&query.booking_id).ok_or_else(|| AppError::bad_request("Booking ID is required"))?;

    let conn = state.db()?;
    booking_for_party(&conn, booking_id, &user.id)?;
    let messages = queries::list_messages(&conn, booking_id)?;

    Ok(Json(json!({ "success": true, "messages": messages })))
}

// POST /api/messages
#[derive(Deserialize)]
pub struct SendMessageRequest {
    #[serde(alias = "bookingId")]
    pub booking_id: Option<String>,
    #[serde(alias = "receiverId")]
    pub receiver_id: Option<String>,
    pub content: Option<String>,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let (Some(booking_id), Some(receiver_id), Some(content)) = (
        present(&body.booking_id),
        present(&body.receiver_id),
        present(&body.content),
    ) else {
        return Err(AppError::bad_request(
            "Booking ID, receiver ID and content are required",
        ));
    };

    let conn = state.db()?;
    let (detail, _) = booking_for_party(&conn, booking_id, &user.id)?;

    let other = if detail.booking.user_id == user.id {
        &detail.booking.provider_id
    } else {
        &detail.booking.user_id
    };
    if receiver_id != other.as_str() {
        return Err(AppError::bad_request("Invalid receiver"));
    }

    let message = Message {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: booking_id.to_string(),
        sender_id: user.id.clone(),
        receiver_id: receiver_id.to_string(),
        content: content.to_string(),
        read_at: None,
        created_at: queries::now(),
        sender_name: String::new(),
    };
    queries::insert_message(&conn, &message)?;

    tracing::debug!(booking_id = %booking_id, message_id = %message.id, "message sent");

    // Re-read so the response carries the joined sender name
    let message = queries::list_messages(&conn, booking_id)?
        .into_iter()
        .find(|m| m.id == message.id)
        .unwrap_or(message);

    Ok(Json(json!({ "success": true, "message": message })))
}

// POST /api/messages/mark-read
#[derive(Deserialize)]
pub struct MarkReadRequest {
    #[serde(alias = "bookingId")]
    pub booking_id: Option<String>,
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<MarkReadRequest>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;
    let booking_id =
        present(&body.booking_id).ok_or_else(|| AppError::bad_request("Booking ID is required"))?;

    let conn = state.db()?;
    booking_for_party(&conn, booking_id, &user.id)?;
    let updated = queries::mark_messages_read(&conn, booking_id, &user.id)?;

    Ok(Json(json!({ "success": true, "updated": updated })))
}

// GET /api/messages/conversations
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let conn = state.db()?;
    let conversations = queries::list_conversations(&conn, &user.id)?;

    Ok(Json(json!({ "success": true, "conversations": conversations })))
}
