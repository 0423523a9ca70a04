//! Database operations for users.

use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::entity::user::{self, ActiveModel, Entity as User};
use crate::error::{AppError, AppResult};
use crate::models::PaginationParams;
use crate::models::content::{non_blank, validate_image_url};
use crate::models::user::UpdateProfileRequest;

/// Maximum display name length.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Profile fields taken from verified identity claims.
#[derive(Debug, Clone, Default)]
pub struct SignInProfile<'a> {
    pub display_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub photo_url: Option<&'a str>,
}

/// Find a user by provider UID.
pub async fn find_by_uid(db: &DatabaseConnection, uid: &str) -> AppResult<Option<user::Model>> {
    let result = User::find_by_id(uid.to_string()).one(db).await?;
    Ok(result)
}

/// List users, admins first, then by name. Returns the page and the total count.
pub async fn list(
    db: &DatabaseConnection,
    params: &PaginationParams,
) -> AppResult<(Vec<user::Model>, u64)> {
    let select = User::find();
    let total = select.clone().count(db).await?;

    let users = select
        .order_by_desc(user::Column::IsAdmin)
        .order_by_asc(user::Column::DisplayName)
        .order_by_asc(user::Column::Uid)
        .offset(params.offset())
        .limit(params.clamped_limit() as u64)
        .all(db)
        .await?;

    Ok((users, total))
}

/// Create the user record on first sign-in; later sign-ins refresh the
/// email and last-seen time, and only fill profile fields that are still empty.
/// The admin flag is never touched here.
pub async fn upsert_on_sign_in(
    db: &DatabaseConnection,
    uid: &str,
    profile: SignInProfile<'_>,
) -> AppResult<user::Model> {
    let now = Utc::now();

    if let Some(existing) = find_by_uid(db, uid).await? {
        let keep_name = existing.display_name.is_some();
        let keep_photo = existing.photo_url.is_some();
        let mut active: ActiveModel = existing.into();
        if !keep_name {
            active.display_name = Set(profile.display_name.map(str::to_string));
        }
        if !keep_photo {
            active.photo_url = Set(profile.photo_url.map(str::to_string));
        }
        if let Some(email) = profile.email {
            active.email = Set(Some(email.to_string()));
        }
        active.last_seen_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(db).await?;
        return Ok(updated);
    }

    let model = ActiveModel {
        uid: Set(uid.to_string()),
        display_name: Set(profile.display_name.map(str::to_string)),
        email: Set(profile.email.map(str::to_string)),
        photo_url: Set(profile.photo_url.map(str::to_string)),
        is_admin: Set(false),
        last_seen_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = model.insert(db).await?;
    info!("Created user record for uid={}", uid);
    Ok(inserted)
}

/// Apply a profile edit made by the user.
pub async fn update_profile(
    db: &DatabaseConnection,
    uid: &str,
    req: &UpdateProfileRequest,
) -> AppResult<user::Model> {
    if let Some(name) = req.display_name.as_deref()
        && name.trim().chars().count() > MAX_DISPLAY_NAME_LEN
    {
        return Err(AppError::InvalidInput(format!(
            "Display name must be at most {} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }
    if let Some(url) = req.photo_url.as_deref().map(str::trim)
        && !url.is_empty()
    {
        validate_image_url(url)?;
    }

    let existing = find_by_uid(db, uid)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let mut active: ActiveModel = existing.into();
    if req.display_name.is_some() {
        active.display_name = Set(non_blank(req.display_name.as_deref()));
    }
    if req.photo_url.is_some() {
        active.photo_url = Set(non_blank(req.photo_url.as_deref()));
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?)
}

/// Set the admin flag. Idempotent: when the flag already has the requested
/// value the stored record is returned and nothing is written.
pub async fn set_admin(
    db: &DatabaseConnection,
    uid: &str,
    is_admin: bool,
) -> AppResult<user::Model> {
    let existing = find_by_uid(db, uid)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    if existing.is_admin == is_admin {
        return Ok(existing);
    }

    let mut active: ActiveModel = existing.into();
    active.is_admin = Set(is_admin);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!("Admin flag for uid={} set to {}", uid, is_admin);
    Ok(updated)
}
