use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::booking::hhmm;
use super::{BookingStatus, ServiceCategory};

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub booking_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub sender_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub booking_id: String,
    pub other_person: Participant,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub booking: ConversationBooking,
}

#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: String,
    pub sender_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationBooking {
    pub id: String,
    pub service_title: String,
    pub service_category: ServiceCategory,
    pub status: BookingStatus,
    pub requested_date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    pub requested_time: NaiveTime,
}
