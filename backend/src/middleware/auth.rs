//! Authentication middleware
//!
//! JWT session validation and role checks

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, ErrorDetail, ErrorResponse};
use crate::services::auth::{decode_token, Claims};
use crate::AppState;
use shared::{Language, UserRole};

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
    pub lang: Language,
}

impl AuthUser {
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        Some(Self {
            user_id: claims.sub.parse().ok()?,
            username: claims.username.clone(),
            role: UserRole::from_db(&claims.role),
            lang: Language::from_code(&claims.lang),
        })
    }

    /// Key of this user's sync cursor
    pub fn sync_owner(&self) -> String {
        self.user_id.to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Fail with 403 unless the user may delete inventory rows
    pub fn require_delete_permission(&self) -> Result<(), AppError> {
        if self.role.can_delete_products() {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return AppError::Unauthorized {
            message: "Missing or invalid Authorization header".to_string(),
            message_el: shared::translate(Language::Greek, "login_required").to_string(),
        }
        .into_response();
    };

    let claims = match decode_token(bearer.token(), &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let Some(auth_user) = AuthUser::from_claims(&claims) else {
        return AppError::InvalidToken.into_response();
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new(
                        "UNAUTHORIZED",
                        shared::translate(Language::English, "login_required"),
                        shared::translate(Language::Greek, "login_required"),
                    ),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
