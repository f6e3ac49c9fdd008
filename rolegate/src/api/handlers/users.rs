use axum::{Json, extract::State};

use crate::{AppState, api::models::users::UserResponse, auth::principal::Principal, errors::Error};

/// The user bound to the request by a guard
#[tracing::instrument(skip_all, fields(user_id = principal.id))]
pub async fn get_current_user(State(state): State<AppState>, principal: Principal) -> Result<Json<UserResponse>, Error> {
    let user = state.auth.store().get_user(principal.id).await?.ok_or(Error::UserNotFound)?;
    Ok(Json(user.into()))
}
