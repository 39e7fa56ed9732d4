//! Call Query Handlers
//!
//! Live-call indicators for the REST chat list.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::services::ActiveGroupCall;
use crate::domain::ChatId;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Upper bound on chat ids per query
pub const MAX_CHAT_IDS: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCallsQuery {
    /// Comma-separated chat ids
    #[serde(default)]
    pub chat_ids: String,
}

impl ActiveCallsQuery {
    fn parse(&self) -> Result<Vec<ChatId>, AppError> {
        let ids = self
            .chat_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Uuid>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid chat id: {}", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ids.len() > MAX_CHAT_IDS {
            return Err(AppError::BadRequest(format!(
                "At most {} chat ids per request",
                MAX_CHAT_IDS
            )));
        }
        Ok(ids)
    }
}

/// `GET /api/v1/calls/active?chatIds=a,b`
pub async fn active_calls(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ActiveCallsQuery>,
) -> Result<Json<Vec<ActiveGroupCall>>, AppError> {
    let chat_ids = query.parse()?;
    let calls = state.hub.active_group_calls(&chat_ids);

    tracing::debug!(
        user_id = %auth.user_id,
        requested = chat_ids.len(),
        active = calls.len(),
        "Active calls query"
    );

    Ok(Json(calls))
}
