use crate::auth::models::{AuthUser, Claims, TOKEN_ISSUER};
use chrono::{Duration, Utc};
use database::user::model::User;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use utils::{AppConfig, AppError, AppResult};

/// JWT令牌管理器
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in_hours: u64,
}

impl JwtManager {
    pub fn new(secret: &str, expires_in_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            expires_in_hours,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expires_in_hours)
    }

    /// 生成JWT令牌
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.expires_in_hours as i64);

        let claims = Claims {
            sub: user.id.to_hex(),
            wallet: user.wallet_address.clone(),
            role: user.role,
            exp: expires_at.timestamp() as u64,
            iat: now.timestamp() as u64,
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerErrorWithContext(format!("Failed to generate JWT token: {}", e)))
    }

    /// 验证JWT令牌(签名、过期时间、签发者)
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    pub fn authenticate(&self, token: &str) -> AppResult<AuthUser> {
        let claims = self.verify_token(token)?;
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token subject.".to_string()))?;

        Ok(AuthUser {
            user_id,
            wallet_address: claims.wallet,
            role: claims.role,
        })
    }
}
