//! Community and channel endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flowtalk_shared::constants::DEFAULT_CHANNEL_NAME;
use flowtalk_shared::{ChannelId, CommunityId};
use flowtalk_store::{ChannelRecord, CommunityRecord};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ServerError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityView {
    pub id: CommunityId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CommunityView {
    fn from_record(record: &CommunityRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    pub id: ChannelId,
    pub community_id: CommunityId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChannelView {
    fn from_record(record: &ChannelRecord) -> Self {
        Self {
            id: record.id,
            community_id: record.community_id,
            name: record.name.clone(),
            description: record.description.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MembershipsResponse {
    pub communities: Vec<CommunityView>,
    pub channels: Vec<ChannelView>,
}

pub async fn my_communities(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MembershipsResponse>, ServerError> {
    let db = state.db.lock().await;

    let communities = db
        .list_communities_for_user(auth.user_id)?
        .iter()
        .map(CommunityView::from_record)
        .collect();
    let channels = db
        .list_channels_for_user(auth.user_id)?
        .iter()
        .map(ChannelView::from_record)
        .collect();

    Ok(Json(MembershipsResponse {
        communities,
        channels,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommunityRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateCommunityResponse {
    pub community: CommunityView,
    pub channel: ChannelView,
}

pub async fn create_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateCommunityRequest>,
) -> Result<Json<CreateCommunityResponse>, ServerError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ServerError::InvalidContent(
            "community name is required".to_string(),
        ));
    }

    let community = CommunityRecord {
        id: CommunityId::new(),
        name: name.to_string(),
        description: req.description,
        created_at: Utc::now(),
    };

    // Every community starts with a general channel and its creator as the
    // first member.
    let channel = ChannelRecord {
        id: ChannelId::new(),
        community_id: community.id,
        name: DEFAULT_CHANNEL_NAME.to_string(),
        description: None,
        created_at: community.created_at,
    };

    {
        let db = state.db.lock().await;
        db.create_community(&community)?;
        db.create_channel(&channel)?;
        db.add_member(community.id, auth.user_id)?;
    }

    tracing::info!(id = %community.id, name = %community.name, "community created");

    Ok(Json(CreateCommunityResponse {
        community: CommunityView::from_record(&community),
        channel: ChannelView::from_record(&channel),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverEntry {
    #[serde(flatten)]
    pub community: CommunityView,
    pub is_member: bool,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub communities: Vec<DiscoverEntry>,
}

pub async fn discover(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DiscoverResponse>, ServerError> {
    let db = state.db.lock().await;

    let mut entries = Vec::new();
    for record in db.list_all_communities()? {
        entries.push(DiscoverEntry {
            is_member: db.is_member(record.id, auth.user_id)?,
            community: CommunityView::from_record(&record),
        });
    }

    Ok(Json(DiscoverResponse {
        communities: entries,
    }))
}

pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let community = parse_community_id(&id)?;

    let db = state.db.lock().await;
    let _ = db.get_community(community)?;
    db.add_member(community, auth.user_id)?;

    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub community_id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateChannelResponse {
    pub channel: ChannelView,
}

pub async fn create_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateChannelRequest>,
) -> Result<Json<CreateChannelResponse>, ServerError> {
    let community = parse_community_id(&req.community_id)?;

    let name = slugify(&req.name);
    if name.is_empty() {
        return Err(ServerError::InvalidContent(
            "channel name is required".to_string(),
        ));
    }

    let channel = ChannelRecord {
        id: ChannelId::new(),
        community_id: community,
        name,
        description: req.description,
        created_at: Utc::now(),
    };

    {
        let db = state.db.lock().await;
        if !db.is_member(community, auth.user_id)? {
            return Err(ServerError::Forbidden(
                "not a member of this community".to_string(),
            ));
        }
        db.create_channel(&channel)?;
    }

    Ok(Json(CreateChannelResponse {
        channel: ChannelView::from_record(&channel),
    }))
}

/// Channel names are slugs: lowercase, spaces to dashes, anything else
/// outside `[a-z0-9-]` dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            slug.push(c);
        } else if c.is_whitespace() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn parse_community_id(value: &str) -> Result<CommunityId, ServerError> {
    value
        .parse::<Uuid>()
        .map(CommunityId)
        .map_err(|_| ServerError::InvalidContent(format!("invalid community id '{value}'")))
}
