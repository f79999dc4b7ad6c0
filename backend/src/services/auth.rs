//! Authentication service for login, session tokens and passwords

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::SecurityService;
use shared::{validate_new_password, Language, SecurityEvent, User, UserRole};

/// Username of the account created on first start
pub const BOOTSTRAP_USERNAME: &str = "admin";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    security: SecurityService,
    jwt_secret: String,
    session_lifetime: i64,
    bootstrap_password: String,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub role: String,
    pub lang: String,
    pub exp: i64,
    pub iat: i64,
}

/// Session token handed to the browser
#[derive(Debug, Serialize)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Result of a successful login
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    #[serde(flatten)]
    pub token: SessionToken,
    pub user: User,
    pub requires_password_reset: bool,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub preferred_language: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRow {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: UserRole::from_db(&self.role),
            preferred_language: Language::from_code(&self.preferred_language),
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// Sign a session token for `user`
pub fn encode_token(user: &User, secret: &str, lifetime_secs: i64, now: DateTime<Utc>) -> AppResult<String> {
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.as_str().to_string(),
        lang: user.preferred_language.code().to_string(),
        exp: (now + Duration::seconds(lifetime_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate a session token and return its claims
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            security: SecurityService::new(db.clone(), &config.security),
            db,
            jwt_secret: config.jwt.secret.clone(),
            session_lifetime: config.jwt.session_lifetime,
            bootstrap_password: config.security.bootstrap_admin_password.clone(),
        }
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, name, email, role, preferred_language,
                   created_at, last_login
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, user_id: i64) -> AppResult<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, name, email, role, preferred_language,
                   created_at, last_login
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
        verify(password, password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }

    fn issue_token(&self, user: &User) -> AppResult<SessionToken> {
        Ok(SessionToken {
            access_token: encode_token(user, &self.jwt_secret, self.session_lifetime, Utc::now())?,
            token_type: "Bearer".to_string(),
            expires_in: self.session_lifetime,
        })
    }

    /// Authenticate with username and password
    pub async fn login(&self, username: &str, password: &str, ip: &str) -> AppResult<LoginOutcome> {
        let username = username.trim();

        if self.security.is_locked_out(username, ip).await? {
            self.security
                .log_event(None, Some(username), SecurityEvent::LoginLocked, Some(ip), None)
                .await?;
            return Err(AppError::AccountLocked);
        }

        let user = match self.find_by_username(username).await? {
            Some(user) if Self::verify_password(password, &user.password_hash)? => user,
            found => {
                self.security.record_failed_attempt(username, ip).await?;
                self.security
                    .log_event(
                        found.as_ref().map(|u| u.id),
                        Some(username),
                        SecurityEvent::LoginFailed,
                        Some(ip),
                        None,
                    )
                    .await?;
                return Err(AppError::InvalidCredentials);
            }
        };

        self.security.clear_failed_attempts(username).await?;

        let last_login = sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING last_login",
        )
        .bind(user.id)
        .fetch_one(&self.db)
        .await?;

        self.security
            .log_event(Some(user.id), Some(username), SecurityEvent::LoginSuccess, Some(ip), None)
            .await?;

        let requires_password_reset = self.requires_password_reset(&user)?;
        let mut profile = user.to_user();
        profile.last_login = Some(last_login);

        Ok(LoginOutcome {
            token: self.issue_token(&profile)?,
            user: profile,
            requires_password_reset,
        })
    }

    /// End a session: audit it and drop the user's sync cursor
    pub async fn logout(&self, user_id: i64, username: &str, ip: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sync_sessions WHERE owner = $1")
            .bind(user_id.to_string())
            .execute(&self.db)
            .await?;

        self.security
            .log_event(Some(user_id), Some(username), SecurityEvent::Logout, Some(ip), None)
            .await
    }

    pub async fn current_user(&self, user_id: i64) -> AppResult<(User, bool)> {
        let row = self.find_by_id(user_id).await?;
        let requires_reset = self.requires_password_reset(&row)?;
        Ok((row.to_user(), requires_reset))
    }

    /// The bootstrap admin still signs in with the bootstrap password
    pub fn requires_password_reset(&self, user: &UserRow) -> AppResult<bool> {
        if user.username != BOOTSTRAP_USERNAME {
            return Ok(false);
        }
        Self::verify_password(&self.bootstrap_password, &user.password_hash)
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        ip: &str,
    ) -> AppResult<()> {
        let user = self.find_by_id(user_id).await?;

        if !Self::verify_password(current_password, &user.password_hash)? {
            self.security
                .log_event(
                    Some(user.id),
                    Some(&user.username),
                    SecurityEvent::PasswordChangeFailed,
                    Some(ip),
                    None,
                )
                .await?;
            return Err(AppError::invalid_field(
                "current_password",
                shared::translate(Language::English, "invalid_current_password"),
                shared::translate(Language::Greek, "invalid_current_password"),
            ));
        }

        if let Err(message) = validate_new_password(current_password, new_password) {
            let key = if new_password.chars().count() < shared::MIN_PASSWORD_LENGTH {
                "password_too_short"
            } else {
                "password_must_differ"
            };
            tracing::debug!(user_id, message, "Rejected new password");
            return Err(AppError::invalid_field(
                "new_password",
                shared::translate(Language::English, key),
                shared::translate(Language::Greek, key),
            ));
        }

        let password_hash = hash(new_password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&password_hash)
            .bind(user.id)
            .execute(&self.db)
            .await?;

        self.security
            .log_event(
                Some(user.id),
                Some(&user.username),
                SecurityEvent::PasswordChanged,
                Some(ip),
                None,
            )
            .await
    }

    /// Store the preferred language and reissue the token carrying it
    pub async fn set_language(&self, user_id: i64, language: Language) -> AppResult<SessionToken> {
        sqlx::query("UPDATE users SET preferred_language = $1 WHERE id = $2")
            .bind(language.code())
            .bind(user_id)
            .execute(&self.db)
            .await?;

        let user = self.find_by_id(user_id).await?.to_user();
        self.issue_token(&user)
    }

    /// Create the `admin` account when no user exists yet
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<bool> {
        let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        if users > 0 {
            return Ok(false);
        }

        let password_hash = hash(&self.bootstrap_password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, name, role)
            VALUES ($1, $2, 'Administrator', 'admin')
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(BOOTSTRAP_USERNAME)
        .bind(&password_hash)
        .execute(&self.db)
        .await?;

        tracing::warn!("Created bootstrap admin account; change its password after first login");
        Ok(true)
    }
}
