use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Booking, BookingStatus, Service, ServiceStatus};

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Cannot book services in the past")]
    InPast,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Service is not available for booking")]
    ServiceUnavailable,

    #[error("Cannot book your own service")]
    OwnService,

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("failed to check availability: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub service_id: String,
    pub customer_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub special_instructions: Option<String>,
}

/// Checks a request against the service and the slots already held, returning the service.
pub fn validate_booking_request(
    conn: &Connection,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<Service, SchedulingError> {
    if request.date.and_time(request.time) < now {
        return Err(SchedulingError::InPast);
    }

    let service =
        queries::get_service(conn, &request.service_id)?.ok_or(SchedulingError::ServiceNotFound)?;

    if service.status != ServiceStatus::Active {
        return Err(SchedulingError::ServiceUnavailable);
    }
    if service.user_id == request.customer_id {
        return Err(SchedulingError::OwnService);
    }
    if queries::slot_is_held(conn, &service.id, &request.date, &request.time)? {
        return Err(SchedulingError::SlotTaken);
    }

    Ok(service)
}

/// Validates and inserts a pending booking priced from the service's current listing.
///
/// Callers hold the connection lock across both steps; the open-slot unique
/// index catches anything that slips past the read.
pub fn create_booking(
    conn: &Connection,
    request: BookingRequest,
    now: NaiveDateTime,
) -> Result<Booking, SchedulingError> {
    let service = validate_booking_request(conn, &request, now)?;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        service_id: service.id.clone(),
        user_id: request.customer_id,
        provider_id: service.user_id.clone(),
        status: BookingStatus::Pending,
        requested_date: request.date,
        requested_time: request.time,
        duration: service.duration,
        total_price: service.quote(),
        special_instructions: request.special_instructions,
        payment_intent_id: None,
        payment_completed_at: None,
        created_at: now,
        updated_at: now,
    };

    if !queries::insert_booking(conn, &booking)? {
        return Err(SchedulingError::SlotTaken);
    }

    tracing::info!(
        booking_id = %booking.id,
        service_id = %booking.service_id,
        total_price = booking.total_price,
        "booking requested"
    );

    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::queries::fixtures;
    use crate::models::PricingModel;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_profile(&conn, &fixtures::profile("provider", "Pat", "Mow")).unwrap();
        queries::insert_profile(&conn, &fixtures::profile("customer", "Casey", "Home")).unwrap();
        queries::insert_profile(&conn, &fixtures::profile("other", "Olive", "Else")).unwrap();
        queries::insert_service(
            &conn,
            &fixtures::service("hourly", "provider", 20.0, PricingModel::PerHour, 90),
        )
        .unwrap();
        queries::insert_service(
            &conn,
            &fixtures::service("flat", "provider", 45.0, PricingModel::PerService, 90),
        )
        .unwrap();
        conn
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn request(service_id: &str, customer: &str, date: &str, time: &str) -> BookingRequest {
        BookingRequest {
            service_id: service_id.to_string(),
            customer_id: customer.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            special_instructions: None,
        }
    }

    #[test]
    fn test_hourly_booking_priced_and_pending() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            request("hourly", "customer", "2025-06-16", "10:00"),
            dt("2025-06-01 09:00"),
        )
        .unwrap();

        assert_eq!(booking.total_price, 30.0);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.duration, 90);
        assert_eq!(booking.provider_id, "provider");
    }

    #[test]
    fn test_flat_booking_uses_price_as_is() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            request("flat", "customer", "2025-06-16", "10:00"),
            dt("2025-06-01 09:00"),
        )
        .unwrap();
        assert_eq!(booking.total_price, 45.0);
    }

    #[test]
    fn test_second_request_for_held_slot_rejected() {
        let conn = setup_db();
        let now = dt("2025-06-01 09:00");
        create_booking(&conn, request("hourly", "customer", "2025-06-16", "10:00"), now).unwrap();

        let err = create_booking(&conn, request("hourly", "other", "2025-06-16", "10:00"), now)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotTaken));
        assert_eq!(err.to_string(), "This time slot is already booked");

        let count = queries::count_bookings_for_service(&conn, "hourly").unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_same_slot_on_other_service_is_free() {
        let conn = setup_db();
        let now = dt("2025-06-01 09:00");
        create_booking(&conn, request("hourly", "customer", "2025-06-16", "10:00"), now).unwrap();
        assert!(
            create_booking(&conn, request("flat", "customer", "2025-06-16", "10:00"), now).is_ok()
        );
    }

    #[test]
    fn test_past_slot_rejected() {
        let conn = setup_db();
        let err = create_booking(
            &conn,
            request("hourly", "customer", "2025-06-16", "10:00"),
            dt("2025-06-16 10:01"),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::InPast));
    }

    #[test]
    fn test_own_service_rejected() {
        let conn = setup_db();
        let err = create_booking(
            &conn,
            request("hourly", "provider", "2025-06-16", "10:00"),
            dt("2025-06-01 09:00"),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::OwnService));
    }

    #[test]
    fn test_paused_and_missing_services() {
        let conn = setup_db();
        let mut paused = fixtures::service("paused", "provider", 10.0, PricingModel::PerJob, 60);
        paused.status = ServiceStatus::Paused;
        queries::insert_service(&conn, &paused).unwrap();

        let now = dt("2025-06-01 09:00");
        let err = create_booking(&conn, request("paused", "customer", "2025-06-16", "10:00"), now)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ServiceUnavailable));

        let err = create_booking(&conn, request("nope", "customer", "2025-06-16", "10:00"), now)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ServiceNotFound));
    }
}
