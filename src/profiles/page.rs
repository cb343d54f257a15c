use axum::{debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    AppError, AppResult, AppState,
    auth::{normalize_gender, normalize_genders, parse_birth_date},
    db::{self, User},
    images::store::{MediaStore, ObjectStore},
    reply::{Payload, Reply},
    session::CurrentUser,
};

const MAX_BIO_CHARS: usize = 500;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileView {
    id: String,
    name: String,
    phone_or_email: String,
    date_of_birth: String,
    gender: String,
    preferred_genders: Vec<String>,
    bio: Option<String>,
    photo_url: Option<String>,
    role: String,
    verified: bool,
}

impl ProfileView {
    fn new(user: User, media: &dyn ObjectStore) -> Self {
        ProfileView {
            preferred_genders: user.preferred_genders(),
            photo_url: user.photo_url(media),
            id: user.id,
            name: user.name,
            phone_or_email: user.phone_or_email,
            date_of_birth: user.date_of_birth,
            gender: user.gender,
            bio: user.bio,
            role: user.role,
            verified: user.verified,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ProfileReply {
    profile: ProfileView,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileUpdate {
    name: Option<String>,
    date_of_birth: Option<String>,
    gender: Option<String>,
    preferred_genders: Option<Vec<String>>,
    bio: Option<String>,
}

impl ProfileUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
            && self.preferred_genders.is_none()
            && self.bio.is_none()
    }

    /// Validates every supplied field and writes it onto `user`.
    fn apply(self, user: &mut User) -> AppResult<()> {
        if let Some(name) = self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::validation("Name cannot be empty."));
            }
            user.name = name.to_owned();
        }
        if let Some(date_of_birth) = self.date_of_birth {
            let today = OffsetDateTime::now_utc().date();
            user.date_of_birth = parse_birth_date(&date_of_birth, today)?.to_string();
        }
        if let Some(gender) = self.gender {
            let gender = normalize_gender(&gender);
            if gender.is_empty() {
                return Err(AppError::validation("Gender cannot be empty."));
            }
            user.gender = gender;
        }
        if let Some(preferred_genders) = self.preferred_genders {
            let Some(preferred_genders) = normalize_genders(preferred_genders) else {
                return Err(AppError::validation("Preferred genders cannot be empty."));
            };
            user.preferred_genders = serde_json::to_string(&preferred_genders)?;
        }
        if let Some(bio) = self.bio {
            let bio = bio.trim();
            if bio.chars().count() > MAX_BIO_CHARS {
                return Err(AppError::Validation(format!(
                    "Bio cannot be longer than {MAX_BIO_CHARS} characters."
                )));
            }
            user.bio = (!bio.is_empty()).then(|| bio.to_owned());
        }
        Ok(())
    }
}

async fn current_profile(db_pool: &SqlitePool, user_id: uuid::Uuid) -> AppResult<User> {
    db::find_user(db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_profile(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
) -> AppResult<Reply<ProfileReply>> {
    let user = current_profile(&db_pool, user_id).await?;

    Ok(Reply::with(
        StatusCode::OK,
        "Profile fetched successfully.",
        ProfileReply {
            profile: ProfileView::new(user, media.as_ref()),
        },
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_profile(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    Payload(update): Payload<ProfileUpdate>,
) -> AppResult<Reply<ProfileReply>> {
    if update.is_empty() {
        return Err(AppError::validation("Nothing to update."));
    }

    let mut user = current_profile(&db_pool, user_id).await?;
    update.apply(&mut user)?;

    sqlx::query("UPDATE users SET name=?, date_of_birth=?, gender=?, preferred_genders=?, bio=? WHERE id=?")
        .bind(&user.name)
        .bind(&user.date_of_birth)
        .bind(&user.gender)
        .bind(&user.preferred_genders)
        .bind(&user.bio)
        .bind(&user.id)
        .execute(&db_pool)
        .await?;

    info!(%user_id, "profile updated");
    Ok(Reply::with(
        StatusCode::OK,
        "Profile updated successfully.",
        ProfileReply {
            profile: ProfileView::new(user, media.as_ref()),
        },
    ))
}
