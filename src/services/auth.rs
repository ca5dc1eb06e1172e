use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::UserRole,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    RequestPartsExt, TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// 校验身份提供方签发的 JWT
#[derive(Clone)]
pub struct AuthService {
    config: Config,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // 用户ID
    pub exp: i64,                 // 过期时间
    pub iat: Option<i64>,         // 签发时间
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

/// 当前请求的调用者
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<Claims> for User {
    fn from(claims: Claims) -> Self {
        let email = claims
            .email
            .unwrap_or_else(|| format!("{}@users.wordflow.local", claims.sub));
        Self {
            role: claims.role.as_deref().map(UserRole::parse).unwrap_or_default(),
            id: claims.sub,
            email,
            name: claims.name,
        }
    }
}

impl AuthService {
    pub async fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }

    /// 签发令牌，供本地工具和测试使用；正式令牌由身份提供方签发
    pub fn sign_token(&self, user: &User, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
            email: Some(user.email.clone()),
            name: user.name.clone(),
            role: Some(match user.role {
                UserRole::Admin => "ADMIN".to_string(),
                UserRole::User => "USER".to_string(),
            }),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::unauthorized("Missing bearer token"))?;

        let claims = state.auth_service.verify_jwt(bearer.token()).map_err(|e| {
            debug!("JWT verification failed: {}", e);
            AppError::unauthorized("Invalid token")
        })?;
        let user = User::from(claims);

        // 确保本地存在用户资料
        if let Err(e) = state.user_service.ensure_profile(&user).await {
            warn!("Failed to ensure user profile exists for user {}: {}", user.id, e);
            return Err(e);
        }

        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// 可选认证，令牌缺失或无效时为 None
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        match User::from_request_parts(parts, state).await {
            Ok(user) => Ok(OptionalUser(Some(user))),
            Err(_) => Ok(OptionalUser(None)),
        }
    }
}
