//! Authentication handlers

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::auth::{LoginOutcome, SessionToken};
use crate::services::security::SecurityLogEntry;
use crate::services::{AuthService, SecurityService};
use crate::AppState;
use shared::{translate, Language, User};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

#[derive(Deserialize)]
pub struct SecurityLogQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    50
}

/// Plain confirmation in both languages
#[derive(Serialize)]
pub struct MessageResponse {
    pub message_en: String,
    pub message_el: String,
}

impl MessageResponse {
    pub fn translated(key: &str) -> Self {
        Self {
            message_en: translate(Language::English, key).to_string(),
            message_el: translate(Language::Greek, key).to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub requires_password_reset: bool,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginOutcome>> {
    body.validate()?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let outcome = auth_service
        .login(&body.username, &body.password, &addr.ip().to_string())
        .await?;

    Ok(Json(outcome))
}

/// Logout endpoint handler
pub async fn logout(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    current_user: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    let user = current_user.0;
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service
        .logout(user.user_id, &user.username, &addr.ip().to_string())
        .await?;

    Ok(Json(MessageResponse::translated("logged_out")))
}

/// Current user profile
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MeResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let (user, requires_password_reset) = auth_service.current_user(current_user.0.user_id).await?;

    Ok(Json(MeResponse {
        user,
        requires_password_reset,
    }))
}

/// Change the signed-in user's password
pub async fn change_password(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    current_user: CurrentUser,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    body.validate()?;

    if body.new_password != body.confirm_password {
        return Err(AppError::invalid_field(
            "confirm_password",
            "Passwords do not match",
            "Οι κωδικοί δεν ταιριάζουν",
        ));
    }

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service
        .change_password(
            current_user.0.user_id,
            &body.current_password,
            &body.new_password,
            &addr.ip().to_string(),
        )
        .await?;

    Ok(Json(MessageResponse::translated("password_changed_successfully")))
}

/// Store the preferred language and hand back a token carrying it
pub async fn set_language(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<LanguageRequest>,
) -> AppResult<Json<SessionToken>> {
    let language: Language = body.language.parse().map_err(|_| {
        AppError::invalid_field(
            "language",
            "Unsupported language",
            "Μη υποστηριζόμενη γλώσσα",
        )
    })?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let token = auth_service
        .set_language(current_user.0.user_id, language)
        .await?;

    Ok(Json(token))
}

/// Recent security events (admin only)
pub async fn security_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SecurityLogQuery>,
) -> AppResult<Json<Vec<SecurityLogEntry>>> {
    if !current_user.0.is_admin() {
        return Err(AppError::InsufficientPermissions);
    }

    let security_service = SecurityService::new(state.db.clone(), &state.config.security);
    let events = security_service
        .recent_events(query.limit.clamp(1, 500))
        .await?;

    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_login_fields_are_rejected() {
        let body = LoginRequest {
            username: String::new(),
            password: "secret".to_string(),
        };
        assert!(body.validate().is_err());

        let body = LoginRequest {
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn confirmations_are_bilingual() {
        let message = MessageResponse::translated("logged_out");
        assert_ne!(message.message_en, message.message_el);
    }
}
