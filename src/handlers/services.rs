use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{number, optional_text, present};
use crate::db::queries::{self, ServiceFilter};
use crate::errors::AppError;
use crate::models::{PricingModel, Service, ServiceCategory, ServiceStatus};
use crate::services::session;
use crate::state::AppState;

const MIN_DURATION: i32 = 15;
const DEFAULT_DURATION: i32 = 60;
const MAX_PUBLIC_LIMIT: i64 = 100;

#[derive(Deserialize, Default)]
pub struct ServiceInput {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Value>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub duration: Option<Value>,
    pub education: Option<String>,
    pub qualifications: Option<String>,
    pub address: Option<String>,
    #[serde(alias = "pricingModel")]
    pub pricing_model: Option<String>,
    #[serde(alias = "bannerUrl")]
    pub banner_url: Option<String>,
}

/// Validates a create/update body and lays it over `base`.
fn apply_input(input: ServiceInput, base: &mut Service) -> Result<(), AppError> {
    let (
        Some(title),
        Some(description),
        Some(price),
        Some(location),
        Some(category),
        Some(status),
    ) = (
        present(&input.title),
        present(&input.description),
        input.price.as_ref().filter(|v| !v.is_null()),
        present(&input.location),
        present(&input.category),
        present(&input.status),
    ) else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    let price = number(Some(price))
        .filter(|p| p.is_finite())
        .ok_or_else(|| AppError::bad_request("Price must be a number"))?;
    if price < 0.0 {
        return Err(AppError::bad_request("Price cannot be negative"));
    }

    let status =
        ServiceStatus::parse(status).ok_or_else(|| AppError::bad_request("Invalid status"))?;
    let category =
        ServiceCategory::parse(category).ok_or_else(|| AppError::bad_request("Invalid category"))?;

    let duration = match input.duration.as_ref().filter(|v| !v.is_null()) {
        Some(raw) => {
            let minutes = number(Some(raw))
                .filter(|m| m.fract() == 0.0 && *m >= MIN_DURATION as f64 && *m <= i32::MAX as f64)
                .ok_or_else(|| AppError::bad_request("Duration must be at least 15 minutes"))?;
            minutes as i32
        }
        None => DEFAULT_DURATION,
    };

    let pricing_model = match present(&input.pricing_model) {
        Some(raw) => PricingModel::parse(raw)
            .ok_or_else(|| AppError::bad_request("Invalid pricing model"))?,
        None => PricingModel::PerHour,
    };

    base.title = title.to_string();
    base.description = description.to_string();
    base.location = location.to_string();
    base.price = price;
    base.status = status;
    base.category = category;
    base.duration = duration;
    base.pricing_model = pricing_model;
    base.education = optional_text(input.education);
    base.qualifications = optional_text(input.qualifications);
    base.address = optional_text(input.address);
    if input.banner_url.is_some() {
        base.banner_url = optional_text(input.banner_url);
    }
    Ok(())
}

fn blank_service(owner_id: &str) -> Service {
    let ts = queries::now();
    Service {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: owner_id.to_string(),
        title: String::new(),
        description: String::new(),
        price: 0.0,
        location: String::new(),
        category: ServiceCategory::Other,
        status: ServiceStatus::Active,
        duration: DEFAULT_DURATION,
        education: None,
        qualifications: None,
        address: None,
        pricing_model: PricingModel::PerHour,
        banner_url: None,
        rating: None,
        total_bookings: 0,
        created_at: ts,
        updated_at: ts,
        provider_name: None,
    }
}

// GET /api/services
#[derive(Deserialize)]
pub struct ListQuery {
    pub all: Option<bool>,
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let conn = state.db()?;
    let services = if query.all.unwrap_or(false) {
        queries::list_active_services(
            &conn,
            &ServiceFilter {
                category: None,
                search: None,
                limit: None,
            },
        )?
    } else {
        queries::list_services_by_owner(&conn, &user.id)?
    };

    Ok(Json(json!({ "success": true, "services": services })))
}

// GET /api/services/public
#[derive(Deserialize)]
pub struct PublicQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
}

pub async fn list_public_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PublicQuery>,
) -> Result<Json<Value>, AppError> {
    let category = present(&query.category).filter(|c| *c != "all");
    let search = present(&query.search);
    let limit = query
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<i64>().ok())
        .filter(|l| (1..=MAX_PUBLIC_LIMIT).contains(l));

    let conn = state.db()?;
    let services = queries::list_active_services(
        &conn,
        &ServiceFilter {
            category,
            search,
            limit,
        },
    )?;

    Ok(Json(json!({ "success": true, "services": services })))
}

// GET /api/services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let conn = state.db()?;
    let service =
        queries::get_service(&conn, &id)?.ok_or_else(|| AppError::not_found("Service"))?;

    Ok(Json(json!({ "success": true, "service": service })))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ServiceInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let mut service = blank_service(&user.id);
    apply_input(body, &mut service)?;

    let conn = state.db()?;
    queries::insert_service(&conn, &service)?;
    let service = queries::get_service(&conn, &service.id)?
        .ok_or_else(|| AppError::not_found("Service"))?;

    tracing::info!(service_id = %service.id, owner = %user.id, "service created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "service": service })),
    ))
}

// PUT /api/services
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ServiceInput>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;
    let id = present(&body.id)
        .ok_or_else(|| AppError::bad_request("Service ID is required"))?
        .to_string();

    let conn = state.db()?;
    let mut service = queries::get_service(&conn, &id)?
        .filter(|s| s.user_id == user.id)
        .ok_or_else(|| AppError::not_found("Service"))?;

    apply_input(body, &mut service)?;
    service.updated_at = queries::now();

    if !queries::update_service(&conn, &service)? {
        return Err(AppError::not_found("Service"));
    }
    let service =
        queries::get_service(&conn, &id)?.ok_or_else(|| AppError::not_found("Service"))?;

    tracing::info!(service_id = %id, "service updated");

    Ok(Json(json!({ "success": true, "service": service })))
}

// DELETE /api/services
#[derive(Deserialize)]
pub struct DeleteRequest {
    pub id: Option<String>,
}

pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;
    let id = present(&body.id).ok_or_else(|| AppError::bad_request("Service ID is required"))?;

    let conn = state.db()?;
    let owned = queries::get_service(&conn, id)?.is_some_and(|s| s.user_id == user.id);
    if !owned {
        return Err(AppError::not_found("Service"));
    }
    if queries::count_bookings_for_service(&conn, id)? > 0 {
        return Err(AppError::bad_request(
            "Cannot delete a service that has bookings. Pause it instead.",
        ));
    }
    if !queries::delete_service(&conn, id, &user.id)? {
        return Err(AppError::not_found("Service"));
    }

    tracing::info!(service_id = %id, "service deleted");

    Ok(Json(json!({ "success": true })))
}

// POST /api/services/:id/image
#[derive(Deserialize)]
pub struct ImageUploadRequest {
    #[serde(alias = "fileExt")]
    pub file_ext: Option<String>,
    #[serde(alias = "contentType")]
    pub content_type: Option<String>,
    #[serde(alias = "isPrimary")]
    pub is_primary: Option<bool>,
}

pub async fn create_image_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ImageUploadRequest>,
) -> Result<Json<Value>, AppError> {
    let user = session::authenticate(&state, &headers).await?;

    let (Some(ext), Some(content_type)) = (present(&body.file_ext), present(&body.content_type))
    else {
        return Err(AppError::bad_request("File extension and content type are required"));
    };
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::bad_request("Invalid file extension"));
    }
    if !content_type.starts_with("image/") {
        return Err(AppError::bad_request("Only image uploads are allowed"));
    }

    {
        let conn = state.db()?;
        let service =
            queries::get_service(&conn, &id)?.ok_or_else(|| AppError::not_found("Service"))?;
        if service.user_id != user.id {
            return Err(AppError::forbidden());
        }
    }

    let path = format!("{id}/{}.{ext}", uuid::Uuid::new_v4());
    let upload = state.storage.create_signed_upload_url(&path).await?;

    tracing::info!(service_id = %id, path = %path, "image upload signed");

    Ok(Json(json!({
        "path": upload.path,
        "upload_url": upload.upload_url,
        "public_url": state.storage.public_url(&path),
        "is_primary": body.is_primary.unwrap_or(false),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ServiceInput {
        ServiceInput {
            title: Some(" Dog walking ".to_string()),
            description: Some("Two laps of the park".to_string()),
            price: Some(json!("15")),
            location: Some("Springfield".to_string()),
            category: Some("pet_care".to_string()),
            status: Some("active".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let mut service = blank_service("owner");
        apply_input(input(), &mut service).unwrap();
        assert_eq!(service.title, "Dog walking");
        assert_eq!(service.price, 15.0);
        assert_eq!(service.duration, 60);
        assert_eq!(service.pricing_model, PricingModel::PerHour);
    }

    fn rejection(mutate: impl FnOnce(&mut ServiceInput)) -> String {
        let mut body = input();
        mutate(&mut body);
        apply_input(body, &mut blank_service("owner"))
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_rejects_bad_fields() {
        assert_eq!(rejection(|i| i.title = None), "Missing required fields");
        assert_eq!(rejection(|i| i.price = Some(json!(-1))), "Price cannot be negative");
        assert_eq!(rejection(|i| i.status = Some("archived".into())), "Invalid status");
        assert_eq!(
            rejection(|i| i.category = Some("babysitting".into())),
            "Invalid category"
        );
        assert_eq!(
            rejection(|i| i.duration = Some(json!(10))),
            "Duration must be at least 15 minutes"
        );
        assert_eq!(
            rejection(|i| i.pricing_model = Some("per_day".into())),
            "Invalid pricing model"
        );
    }
}
