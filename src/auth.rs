use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::config::AppConfig;
use crate::error::AppError;

/// Authenticated operator identity for the moderation surface. Token
/// issuance lives with the rest of the site; this service only validates
/// the signature and the role claim.
#[derive(Clone, Debug)]
pub struct AdminUser {
    pub user_id: i32,
}

impl FromRequest for AdminUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let config = match req.app_data::<web::Data<AppConfig>>() {
            Some(cfg) => cfg.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let token = extract_token(req, &config);

        Box::pin(async move {
            let token = token.ok_or_else(AppError::need_login)?;
            let claims = decode_jwt(&config, &token)?;
            let user_id = extract_user_id(&claims).ok_or_else(AppError::need_login)?;
            if extract_role(&claims).as_deref() != Some("ADMIN") {
                return Err(AppError::forbidden().into());
            }
            Ok(AdminUser { user_id })
        })
    }
}

fn extract_token(req: &HttpRequest, config: &AppConfig) -> Option<String> {
    let header = config.token_header.as_str();
    req.headers()
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn decode_jwt(config: &AppConfig, token: &str) -> Result<serde_json::Value, AppError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<serde_json::Value>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::need_login())
}

fn extract_user_id(claims: &serde_json::Value) -> Option<i32> {
    for key in ["loginId", "userId", "id", "sub"] {
        if let Some(value) = claims.get(key) {
            if let Some(id) = value.as_i64() {
                return Some(id as i32);
            }
            if let Some(s) = value.as_str() {
                if let Ok(id) = s.parse::<i32>() {
                    return Some(id);
                }
            }
        }
    }
    None
}

fn extract_role(claims: &serde_json::Value) -> Option<String> {
    claims
        .get("role")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
