use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::booking::hhmm;
use crate::models::{
    display_name, AccountStatus, Booking, BookingDetail, BookingStatus, Conversation,
    ConversationBooking, LastMessage, Message, Participant, PricingModel, Profile, Role, Service,
    ServiceCategory, ServiceStatus, ServiceSummary,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current UTC time truncated to the stored second precision.
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

fn fmt_ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).with_context(|| format!("bad timestamp: {s}"))
}

fn parse_opt_ts(s: Option<String>) -> anyhow::Result<Option<NaiveDateTime>> {
    s.as_deref().map(parse_ts).transpose()
}

fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

fn fmt_time(t: &NaiveTime) -> String {
    t.format(hhmm::FORMAT).to_string()
}

fn collect<T>(
    rows: impl Iterator<Item = rusqlite::Result<anyhow::Result<T>>>,
) -> anyhow::Result<Vec<T>> {
    let mut out = vec![];
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

// ── Profiles ──

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, role, status, age, \
     parent_email, parent_phone, phone, bio, city, state, avatar_url, is_verified, \
     created_at, updated_at";

pub fn insert_profile(conn: &Connection, profile: &Profile) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO profiles (id, email, first_name, last_name, role, status, age,
                               parent_email, parent_phone, phone, bio, city, state,
                               avatar_url, is_verified, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            profile.id,
            profile.email,
            profile.first_name,
            profile.last_name,
            profile.role.as_str(),
            profile.status.as_str(),
            profile.age,
            profile.parent_email,
            profile.parent_phone,
            profile.phone,
            profile.bio,
            profile.city,
            profile.state,
            profile.avatar_url,
            profile.is_verified as i32,
            fmt_ts(&profile.created_at),
            fmt_ts(&profile.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, id: &str) -> anyhow::Result<Option<Profile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_profile_row(row)))
        .optional()?;
    row.transpose()
}

pub fn get_profile_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Profile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = ?1 COLLATE NOCASE");
    let row = conn
        .query_row(&sql, params![email], |row| Ok(parse_profile_row(row)))
        .optional()?;
    row.transpose()
}

/// Writes the self-editable profile fields and refreshes `updated_at`.
pub fn update_profile(conn: &Connection, profile: &Profile) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE profiles SET first_name = ?1, last_name = ?2, phone = ?3, bio = ?4, city = ?5,
                             state = ?6, avatar_url = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            profile.first_name,
            profile.last_name,
            profile.phone,
            profile.bio,
            profile.city,
            profile.state,
            profile.avatar_url,
            fmt_ts(&profile.updated_at),
            profile.id,
        ],
    )?;
    Ok(count > 0)
}

fn parse_profile_row(row: &rusqlite::Row) -> anyhow::Result<Profile> {
    let role: String = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;

    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: Role::parse(&role).with_context(|| format!("unknown role: {role}"))?,
        status: AccountStatus::parse(&status)
            .with_context(|| format!("unknown account status: {status}"))?,
        age: row.get(6)?,
        parent_email: row.get(7)?,
        parent_phone: row.get(8)?,
        phone: row.get(9)?,
        bio: row.get(10)?,
        city: row.get(11)?,
        state: row.get(12)?,
        avatar_url: row.get(13)?,
        is_verified: row.get::<_, i32>(14)? != 0,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Services ──

const SERVICE_SELECT: &str = "SELECT s.id, s.user_id, s.title, s.description, s.price, \
            s.location, s.category, s.status, s.duration, s.education, s.qualifications, \
            s.address, s.pricing_model, s.banner_url, \
            s.rating, s.total_bookings, s.created_at, s.updated_at, p.first_name, p.last_name \
     FROM services s LEFT JOIN profiles p ON p.id = s.user_id";

pub struct ServiceFilter<'a> {
    pub category: Option<&'a str>,
    pub search: Option<&'a str>,
    pub limit: Option<i64>,
}

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, user_id, title, description, price, location, category,
                               status, duration, education, qualifications, address,
                               pricing_model, banner_url, rating, total_bookings,
                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            service.id,
            service.user_id,
            service.title,
            service.description,
            service.price,
            service.location,
            service.category.as_str(),
            service.status.as_str(),
            service.duration,
            service.education,
            service.qualifications,
            service.address,
            service.pricing_model.as_str(),
            service.banner_url,
            service.rating,
            service.total_bookings,
            fmt_ts(&service.created_at),
            fmt_ts(&service.updated_at),
        ],
    )?;
    Ok(())
}

/// Updates the listing fields of a service owned by `service.user_id`.
pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET title = ?1, description = ?2, price = ?3, location = ?4, category = ?5,
                             status = ?6, duration = ?7, education = ?8, qualifications = ?9,
                             address = ?10, pricing_model = ?11, banner_url = ?12, updated_at = ?13
         WHERE id = ?14 AND user_id = ?15",
        params![
            service.title,
            service.description,
            service.price,
            service.location,
            service.category.as_str(),
            service.status.as_str(),
            service.duration,
            service.education,
            service.qualifications,
            service.address,
            service.pricing_model.as_str(),
            service.banner_url,
            fmt_ts(&service.updated_at),
            service.id,
            service.user_id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_service(conn: &Connection, id: &str, owner_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM services WHERE id = ?1 AND user_id = ?2",
        params![id, owner_id],
    )?;
    Ok(count > 0)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let sql = format!("{SERVICE_SELECT} WHERE s.id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_service_row(row)))
        .optional()?;
    row.transpose()
}

pub fn list_services_by_owner(conn: &Connection, owner_id: &str) -> anyhow::Result<Vec<Service>> {
    let sql = format!(
        "{SERVICE_SELECT} WHERE s.user_id = ?1 ORDER BY s.created_at DESC, s.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], |row| Ok(parse_service_row(row)))?;
    collect(rows)
}

pub fn list_active_services(
    conn: &Connection,
    filter: &ServiceFilter<'_>,
) -> anyhow::Result<Vec<Service>> {
    let pattern = filter.search.map(|s| format!("%{}%", escape_like(s)));
    let sql = format!(
        "{SERVICE_SELECT}
         WHERE s.status = 'active'
           AND (?1 IS NULL OR s.category = ?1)
           AND (?2 IS NULL OR s.title LIKE ?2 ESCAPE '\\' OR s.description LIKE ?2 ESCAPE '\\'
                OR s.location LIKE ?2 ESCAPE '\\')
         ORDER BY s.created_at DESC, s.rowid DESC
         LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![filter.category, pattern, filter.limit.unwrap_or(-1)],
        |row| Ok(parse_service_row(row)),
    )?;
    collect(rows)
}

pub fn count_bookings_for_service(conn: &Connection, service_id: &str) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE service_id = ?1",
        params![service_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let category: String = row.get(6)?;
    let status: String = row.get(7)?;
    let pricing_model: String = row.get(12)?;
    let created_at: String = row.get(16)?;
    let updated_at: String = row.get(17)?;
    let first_name: Option<String> = row.get(18)?;
    let last_name: Option<String> = row.get(19)?;

    let provider_name = Some(display_name(first_name.as_deref(), last_name.as_deref(), ""))
        .filter(|n| !n.is_empty());

    Ok(Service {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        location: row.get(5)?,
        category: ServiceCategory::parse(&category)
            .with_context(|| format!("unknown category: {category}"))?,
        status: ServiceStatus::parse(&status)
            .with_context(|| format!("unknown service status: {status}"))?,
        duration: row.get(8)?,
        education: row.get(9)?,
        qualifications: row.get(10)?,
        address: row.get(11)?,
        pricing_model: PricingModel::parse(&pricing_model)
            .with_context(|| format!("unknown pricing model: {pricing_model}"))?,
        banner_url: row.get(13)?,
        rating: row.get(14)?,
        total_bookings: row.get(15)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        provider_name,
    })
}

// ── Bookings ──

const BOOKING_SELECT: &str = "SELECT b.id, b.service_id, b.user_id, s.user_id, b.status, \
            b.requested_date, b.requested_time, \
            b.duration, b.total_price, b.special_instructions, b.payment_intent_id, \
            b.payment_completed_at, b.created_at, b.updated_at, \
            s.title, s.pricing_model, s.location, s.category, c.first_name, c.last_name \
     FROM bookings b \
     JOIN services s ON s.id = b.service_id \
     LEFT JOIN profiles c ON c.id = b.user_id";

/// True when a booking whose status holds its slot already occupies this one.
pub fn slot_is_held(
    conn: &Connection,
    service_id: &str,
    date: &NaiveDate,
    time: &NaiveTime,
) -> anyhow::Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT status FROM bookings
         WHERE service_id = ?1 AND requested_date = ?2 AND requested_time = ?3",
    )?;
    let statuses = stmt.query_map(params![service_id, fmt_date(date), fmt_time(time)], |row| {
        row.get::<_, String>(0)
    })?;
    for status in statuses {
        if BookingStatus::parse(&status?).is_some_and(|s| s.holds_slot()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Inserts a booking and bumps the service's booking counter.
/// Returns `false` when the open-slot unique index rejects the row.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let result = conn.execute(
        "INSERT INTO bookings (id, service_id, user_id, status, requested_date, requested_time,
                               duration, total_price, special_instructions, payment_intent_id,
                               payment_completed_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            booking.id,
            booking.service_id,
            booking.user_id,
            booking.status.as_str(),
            fmt_date(&booking.requested_date),
            fmt_time(&booking.requested_time),
            booking.duration,
            booking.total_price,
            booking.special_instructions,
            booking.payment_intent_id,
            booking.payment_completed_at.as_ref().map(fmt_ts),
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }

    conn.execute(
        "UPDATE services SET total_bookings = total_bookings + 1 WHERE id = ?1",
        params![booking.service_id],
    )?;
    Ok(true)
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    Ok(get_booking_detail(conn, id)?.map(|d| d.booking))
}

pub fn get_booking_detail(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingDetail>> {
    let sql = format!("{BOOKING_SELECT} WHERE b.id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    row.transpose()
}

/// Bookings the user requested as a customer, newest first.
pub fn list_bookings_for_customer(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<BookingDetail>> {
    let sql = format!(
        "{BOOKING_SELECT} WHERE b.user_id = ?1 ORDER BY b.created_at DESC, b.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;
    collect(rows)
}

/// Bookings on services the user provides, newest first.
pub fn list_bookings_for_provider(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<BookingDetail>> {
    let sql = format!(
        "{BOOKING_SELECT} WHERE s.user_id = ?1 ORDER BY b.created_at DESC, b.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;
    collect(rows)
}

/// Moves a booking from `from` to `to`. Returns `false` if the row is gone or
/// its status changed underneath the caller.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), fmt_ts(&now()), id, from.as_str()],
    )?;
    Ok(count > 0)
}

/// `completed → paid` with the payment reference recorded alongside.
pub fn mark_booking_paid(
    conn: &Connection,
    id: &str,
    payment_intent_id: &str,
) -> anyhow::Result<bool> {
    let ts = fmt_ts(&now());
    let count = conn.execute(
        "UPDATE bookings
         SET status = 'paid', payment_intent_id = ?1, payment_completed_at = ?2, updated_at = ?2
         WHERE id = ?3 AND status = 'completed'",
        params![payment_intent_id, ts, id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<BookingDetail> {
    let status: String = row.get(4)?;
    let requested_date: String = row.get(5)?;
    let requested_time: String = row.get(6)?;
    let payment_completed_at: Option<String> = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;
    let pricing_model: String = row.get(15)?;
    let category: String = row.get(17)?;
    let first_name: Option<String> = row.get(18)?;
    let last_name: Option<String> = row.get(19)?;

    let booking = Booking {
        id: row.get(0)?,
        service_id: row.get(1)?,
        user_id: row.get(2)?,
        provider_id: row.get(3)?,
        status: BookingStatus::parse(&status)
            .with_context(|| format!("unknown booking status: {status}"))?,
        requested_date: NaiveDate::parse_from_str(&requested_date, DATE_FORMAT)
            .with_context(|| format!("bad booking date: {requested_date}"))?,
        requested_time: hhmm::parse(&requested_time)
            .with_context(|| format!("bad booking time: {requested_time}"))?,
        duration: row.get(7)?,
        total_price: row.get(8)?,
        special_instructions: row.get(9)?,
        payment_intent_id: row.get(10)?,
        payment_completed_at: parse_opt_ts(payment_completed_at)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    };

    let service = ServiceSummary {
        id: booking.service_id.clone(),
        title: row.get(14)?,
        provider_id: booking.provider_id.clone(),
        pricing_model: PricingModel::parse(&pricing_model)
            .with_context(|| format!("unknown pricing model: {pricing_model}"))?,
        location: row.get(16)?,
        category: ServiceCategory::parse(&category)
            .with_context(|| format!("unknown category: {category}"))?,
    };

    Ok(BookingDetail {
        booking,
        service,
        customer_name: display_name(first_name.as_deref(), last_name.as_deref(), "Customer"),
    })
}

// ── Messages ──

pub fn insert_message(conn: &Connection, message: &Message) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO messages (id, booking_id, sender_id, receiver_id, content, read_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            message.id,
            message.booking_id,
            message.sender_id,
            message.receiver_id,
            message.content,
            message.read_at.as_ref().map(fmt_ts),
            fmt_ts(&message.created_at),
        ],
    )?;
    Ok(())
}

/// Thread for a booking, oldest first.
pub fn list_messages(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.booking_id, m.sender_id, m.receiver_id, m.content, m.read_at, m.created_at,
                p.first_name, p.last_name
         FROM messages m LEFT JOIN profiles p ON p.id = m.sender_id
         WHERE m.booking_id = ?1
         ORDER BY m.created_at ASC, m.rowid ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_message_row(row)))?;
    collect(rows)
}

/// Stamps `read_at` on the receiver's unread messages in a booking thread.
pub fn mark_messages_read(
    conn: &Connection,
    booking_id: &str,
    receiver_id: &str,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE messages SET read_at = ?1
         WHERE booking_id = ?2 AND receiver_id = ?3 AND read_at IS NULL",
        params![fmt_ts(&now()), booking_id, receiver_id],
    )?;
    Ok(count)
}

pub fn list_conversations(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Conversation>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.user_id, s.user_id, b.status, b.requested_date, b.requested_time,
                s.title, s.category
         FROM bookings b JOIN services s ON s.id = b.service_id
         WHERE b.user_id = ?1 OR s.user_id = ?1",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut conversations = vec![];
    for row in rows {
        let (booking_id, customer_id, provider_id, status, date, time, title, category) = row?;
        let other_id = if customer_id == user_id {
            provider_id
        } else {
            customer_id
        };

        let Some(other) = get_profile(conn, &other_id)? else {
            tracing::warn!(
                booking_id = %booking_id,
                "conversation partner has no profile, skipping"
            );
            continue;
        };

        let last_message = conn
            .query_row(
                "SELECT m.id, m.booking_id, m.sender_id, m.receiver_id, m.content, m.read_at,
                        m.created_at, p.first_name, p.last_name
                 FROM messages m LEFT JOIN profiles p ON p.id = m.sender_id
                 WHERE m.booking_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1",
                params![booking_id],
                |row| Ok(parse_message_row(row)),
            )
            .optional()?
            .transpose()?
            .map(|m| LastMessage {
                content: m.content,
                sender_id: m.sender_id,
                sender_name: m.sender_name,
                created_at: m.created_at,
            });

        let unread_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages
             WHERE booking_id = ?1 AND receiver_id = ?2 AND read_at IS NULL",
            params![booking_id, user_id],
            |row| row.get(0),
        )?;

        conversations.push(Conversation {
            booking_id: booking_id.clone(),
            other_person: Participant {
                id: other.id,
                first_name: other.first_name,
                last_name: other.last_name,
                avatar_url: other.avatar_url,
            },
            last_message,
            unread_count,
            booking: ConversationBooking {
                id: booking_id,
                service_title: title,
                service_category: ServiceCategory::parse(&category)
                    .with_context(|| format!("unknown category: {category}"))?,
                status: BookingStatus::parse(&status)
                    .with_context(|| format!("unknown booking status: {status}"))?,
                requested_date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
                    .with_context(|| format!("bad booking date: {date}"))?,
                requested_time: hhmm::parse(&time)
                    .with_context(|| format!("bad booking time: {time}"))?,
            },
        });
    }

    // Most recent activity first; silent threads sink to the bottom
    conversations.sort_by(|a, b| {
        let a_at = a.last_message.as_ref().map(|m| m.created_at);
        let b_at = b.last_message.as_ref().map(|m| m.created_at);
        b_at.cmp(&a_at)
    });

    Ok(conversations)
}

fn parse_message_row(row: &rusqlite::Row) -> anyhow::Result<Message> {
    let read_at: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let first_name: Option<String> = row.get(7)?;
    let last_name: Option<String> = row.get(8)?;

    Ok(Message {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        content: row.get(4)?,
        read_at: parse_opt_ts(read_at)?,
        created_at: parse_ts(&created_at)?,
        sender_name: display_name(first_name.as_deref(), last_name.as_deref(), "User"),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn profile(id: &str, first: &str, last: &str) -> Profile {
        let ts = now();
        Profile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role: Role::Teen,
            status: AccountStatus::Active,
            age: Some(16),
            parent_email: None,
            parent_phone: None,
            phone: None,
            bio: None,
            city: None,
            state: None,
            avatar_url: None,
            is_verified: false,
            created_at: ts,
            updated_at: ts,
        }
    }

    pub fn service(
        id: &str,
        owner: &str,
        price: f64,
        model: PricingModel,
        duration: i32,
    ) -> Service {
        let ts = now();
        Service {
            id: id.to_string(),
            user_id: owner.to_string(),
            title: format!("Service {id}"),
            description: "Friendly and reliable".to_string(),
            price,
            location: "Springfield".to_string(),
            category: ServiceCategory::LawnCare,
            status: ServiceStatus::Active,
            duration,
            education: None,
            qualifications: None,
            address: None,
            pricing_model: model,
            banner_url: None,
            rating: None,
            total_bookings: 0,
            created_at: ts,
            updated_at: ts,
            provider_name: None,
        }
    }

    pub fn booking(id: &str, service: &Service, customer: &str, date: &str, time: &str) -> Booking {
        let ts = now();
        Booking {
            id: id.to_string(),
            service_id: service.id.clone(),
            user_id: customer.to_string(),
            provider_id: service.user_id.clone(),
            status: BookingStatus::Pending,
            requested_date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            requested_time: hhmm::parse(time).unwrap(),
            duration: service.duration,
            total_price: service.quote(),
            special_instructions: None,
            payment_intent_id: None,
            payment_completed_at: None,
            created_at: ts,
            updated_at: ts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        insert_profile(&conn, &profile("provider", "Pat", "Mow")).unwrap();
        insert_profile(&conn, &profile("customer", "Casey", "Home")).unwrap();
        insert_service(
            &conn,
            &service("svc-1", "provider", 20.0, PricingModel::PerHour, 90),
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_booking_round_trip_joins_provider() {
        let conn = setup_db();
        let svc = get_service(&conn, "svc-1").unwrap().unwrap();
        assert_eq!(svc.provider_name.as_deref(), Some("Pat Mow"));

        let b = booking("b-1", &svc, "customer", "2031-05-04", "14:00");
        assert!(insert_booking(&conn, &b).unwrap());

        let detail = get_booking_detail(&conn, "b-1").unwrap().unwrap();
        assert_eq!(detail.booking.provider_id, "provider");
        assert_eq!(detail.booking.total_price, 30.0);
        assert_eq!(detail.customer_name, "Casey Home");
        assert_eq!(detail.service.title, "Service svc-1");

        let svc = get_service(&conn, "svc-1").unwrap().unwrap();
        assert_eq!(svc.total_bookings, 1);
    }

    #[test]
    fn test_open_slot_index_rejects_duplicate() {
        let conn = setup_db();
        let svc = get_service(&conn, "svc-1").unwrap().unwrap();

        let first = booking("b-1", &svc, "customer", "2031-05-04", "14:00");
        assert!(insert_booking(&conn, &first).unwrap());
        assert!(
            slot_is_held(&conn, "svc-1", &first.requested_date, &first.requested_time).unwrap()
        );

        let second = booking("b-2", &svc, "customer", "2031-05-04", "14:00");
        assert!(!insert_booking(&conn, &second).unwrap());
        assert!(get_booking(&conn, "b-2").unwrap().is_none());
    }

    #[test]
    fn test_released_slot_can_be_rebooked() {
        let conn = setup_db();
        let svc = get_service(&conn, "svc-1").unwrap().unwrap();

        let first = booking("b-1", &svc, "customer", "2031-05-04", "14:00");
        insert_booking(&conn, &first).unwrap();
        assert!(update_booking_status(
            &conn,
            "b-1",
            BookingStatus::Pending,
            BookingStatus::Cancelled
        )
        .unwrap());
        assert!(
            !slot_is_held(&conn, "svc-1", &first.requested_date, &first.requested_time).unwrap()
        );

        let second = booking("b-2", &svc, "customer", "2031-05-04", "14:00");
        assert!(insert_booking(&conn, &second).unwrap());
    }

    #[test]
    fn test_status_update_is_compare_and_set() {
        let conn = setup_db();
        let svc = get_service(&conn, "svc-1").unwrap().unwrap();
        insert_booking(&conn, &booking("b-1", &svc, "customer", "2031-05-04", "14:00")).unwrap();

        assert!(!update_booking_status(
            &conn,
            "b-1",
            BookingStatus::Confirmed,
            BookingStatus::Completed
        )
        .unwrap());
        let b = get_booking(&conn, "b-1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Pending);
    }

    #[test]
    fn test_status_update_refreshes_updated_at() {
        let conn = setup_db();
        let svc = get_service(&conn, "svc-1").unwrap().unwrap();
        let mut stale = booking("b-1", &svc, "customer", "2031-05-04", "14:00");
        stale.updated_at -= chrono::Duration::days(30);
        let before = stale.updated_at;
        insert_booking(&conn, &stale).unwrap();

        // A lost compare-and-set leaves the row untouched
        assert!(!update_booking_status(
            &conn,
            "b-1",
            BookingStatus::Confirmed,
            BookingStatus::InProgress
        )
        .unwrap());
        assert_eq!(get_booking(&conn, "b-1").unwrap().unwrap().updated_at, before);

        assert!(update_booking_status(
            &conn,
            "b-1",
            BookingStatus::Pending,
            BookingStatus::Confirmed
        )
        .unwrap());
        let b = get_booking(&conn, "b-1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.updated_at > before);
    }

    #[test]
    fn test_mark_paid_requires_completed() {
        let conn = setup_db();
        let svc = get_service(&conn, "svc-1").unwrap().unwrap();
        insert_booking(&conn, &booking("b-1", &svc, "customer", "2031-05-04", "14:00")).unwrap();

        assert!(!mark_booking_paid(&conn, "b-1", "pi_1").unwrap());

        update_booking_status(&conn, "b-1", BookingStatus::Pending, BookingStatus::Confirmed)
            .unwrap();
        update_booking_status(&conn, "b-1", BookingStatus::Confirmed, BookingStatus::Completed)
            .unwrap();
        assert!(mark_booking_paid(&conn, "b-1", "pi_1").unwrap());

        let b = get_booking(&conn, "b-1").unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Paid);
        assert_eq!(b.payment_intent_id.as_deref(), Some("pi_1"));
        assert!(b.payment_completed_at.is_some());
    }

    #[test]
    fn test_public_search_filters() {
        let conn = setup_db();
        let mut tutoring = service("svc-2", "provider", 15.0, PricingModel::PerHour, 60);
        tutoring.title = "Algebra Tutoring".to_string();
        tutoring.category = ServiceCategory::Tutoring;
        insert_service(&conn, &tutoring).unwrap();

        let mut paused = service("svc-3", "provider", 15.0, PricingModel::PerJob, 60);
        paused.status = ServiceStatus::Paused;
        insert_service(&conn, &paused).unwrap();

        let all = list_active_services(
            &conn,
            &ServiceFilter {
                category: None,
                search: None,
                limit: None,
            },
        )
        .unwrap();
        assert_eq!(all.len(), 2);

        let found = list_active_services(
            &conn,
            &ServiceFilter { category: None, search: Some("algebra"), limit: None },
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "svc-2");

        let by_cat = list_active_services(
            &conn,
            &ServiceFilter { category: Some("lawn_care"), search: None, limit: Some(10) },
        )
        .unwrap();
        assert_eq!(by_cat.len(), 1);
        assert_eq!(by_cat[0].id, "svc-1");

        let literal = list_active_services(
            &conn,
            &ServiceFilter { category: None, search: Some("100%"), limit: None },
        )
        .unwrap();
        assert!(literal.is_empty());
    }

    #[test]
    fn test_messages_and_conversations() {
        let conn = setup_db();
        let svc = get_service(&conn, "svc-1").unwrap().unwrap();
        insert_booking(&conn, &booking("b-1", &svc, "customer", "2031-05-04", "14:00")).unwrap();

        let msg = Message {
            id: "m-1".to_string(),
            booking_id: "b-1".to_string(),
            sender_id: "customer".to_string(),
            receiver_id: "provider".to_string(),
            content: "Is the front yard included?".to_string(),
            read_at: None,
            created_at: now(),
            sender_name: String::new(),
        };
        insert_message(&conn, &msg).unwrap();

        let thread = list_messages(&conn, "b-1").unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].sender_name, "Casey Home");

        let convs = list_conversations(&conn, "provider").unwrap();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].other_person.id, "customer");
        assert_eq!(convs[0].unread_count, 1);

        assert_eq!(mark_messages_read(&conn, "b-1", "provider").unwrap(), 1);
        let convs = list_conversations(&conn, "provider").unwrap();
        assert_eq!(convs[0].unread_count, 0);

        // Sender's own messages never count as unread for them
        let convs = list_conversations(&conn, "customer").unwrap();
        assert_eq!(convs[0].unread_count, 0);
        assert_eq!(convs[0].other_person.id, "provider");
    }
}
