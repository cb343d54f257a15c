use axum::{debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState, db, parse_id,
    reply::{Payload, Reply},
    session::CurrentUser,
};

use super::community_exists;

const MAX_NAME_CHARS: usize = 60;
const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommunityView {
    id: String,
    name: String,
    description: String,
    member_count: i64,
    joined: bool,
}

#[derive(Serialize)]
pub(crate) struct CommunitiesReply {
    communities: Vec<CommunityView>,
}

#[derive(Serialize)]
pub(crate) struct CommunityReply {
    community: CommunityView,
}

#[derive(Deserialize)]
pub(crate) struct CreateBody {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinBody {
    community_id: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_communities(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Reply<CommunitiesReply>> {
    let rows: Vec<(String, String, String, i64, bool)> = sqlx::query_as(
        "SELECT c.id, c.name, c.description,
                (SELECT COUNT(*) FROM community_members cm WHERE cm.community_id = c.id),
                EXISTS (SELECT 1 FROM community_members cm WHERE cm.community_id = c.id AND cm.user_id = ?)
         FROM communities c
         ORDER BY c.name",
    )
    .bind(user_id.to_string())
    .fetch_all(&db_pool)
    .await?;

    let communities = rows
        .into_iter()
        .map(|(id, name, description, member_count, joined)| CommunityView {
            id,
            name,
            description,
            member_count,
            joined,
        })
        .collect();

    Ok(Reply::with(
        StatusCode::OK,
        "Communities fetched successfully.",
        CommunitiesReply { communities },
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_community(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    Payload(CreateBody { name, description }): Payload<CreateBody>,
) -> AppResult<Reply<CommunityReply>> {
    let name = name.as_deref().map(str::trim).unwrap_or_default().to_owned();
    let description = description.as_deref().map(str::trim).unwrap_or_default().to_owned();

    if name.is_empty() {
        return Err(AppError::validation("Please provide a community name."));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "Community name cannot be longer than {MAX_NAME_CHARS} characters."
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "Description cannot be longer than {MAX_DESCRIPTION_CHARS} characters."
        )));
    }

    let community_id = Uuid::now_v7();
    let now = db::now();

    let mut txn = db_pool.begin().await?;
    let inserted = sqlx::query("INSERT INTO communities (id,name,description,created_by,created_at) VALUES (?,?,?,?,?)")
        .bind(community_id.to_string())
        .bind(&name)
        .bind(&description)
        .bind(user_id.to_string())
        .bind(now)
        .execute(&mut *txn)
        .await;
    match inserted {
        Ok(_) => {}
        Err(err) if db::is_unique_violation(&err) => {
            return Err(AppError::conflict("Community already exists."));
        }
        Err(err) => return Err(err.into()),
    }
    sqlx::query("INSERT INTO community_members (community_id,user_id,joined_at) VALUES (?,?,?)")
        .bind(community_id.to_string())
        .bind(user_id.to_string())
        .bind(now)
        .execute(&mut *txn)
        .await?;
    txn.commit().await?;

    info!(%user_id, %community_id, "community created");
    Ok(Reply::with(
        StatusCode::CREATED,
        "Community created successfully.",
        CommunityReply {
            community: CommunityView {
                id: community_id.to_string(),
                name,
                description,
                member_count: 1,
                joined: true,
            },
        },
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn join_community(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    Payload(JoinBody { community_id }): Payload<JoinBody>,
) -> AppResult<Reply> {
    let Some(community_id) = community_id else {
        return Err(AppError::validation("Please provide a communityId."));
    };
    let community_id = parse_id(&community_id, "communityId")?;
    community_exists(&db_pool, community_id).await?;

    let joined = sqlx::query("INSERT INTO community_members (community_id,user_id,joined_at) VALUES (?,?,?)")
        .bind(community_id.to_string())
        .bind(user_id.to_string())
        .bind(db::now())
        .execute(&db_pool)
        .await;
    match joined {
        Ok(_) => {}
        Err(err) if db::is_unique_violation(&err) => {
            return Err(AppError::conflict("Already a member of this community."));
        }
        Err(err) => return Err(err.into()),
    }

    info!(%user_id, %community_id, "joined community");
    Ok(Reply::ok("Joined community successfully."))
}
