use crate::{dtos::user_dto::UserProfileDto, services::auth_service::{AuthSession, Registration}};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 注册请求
#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct RegisterDto {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
    /// BEP-20 钱包地址
    #[validate(length(equal = 42, message = "must be a 0x-prefixed 20-byte address"))]
    pub wallet_address: String,
    /// 推荐人的邀请码(可选)
    pub referral_code: Option<String>,
}

impl From<RegisterDto> for Registration {
    fn from(dto: RegisterDto) -> Self {
        Self {
            email: dto.email,
            password: dto.password,
            wallet_address: dto.wallet_address,
            referral_code: dto.referral_code,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct LoginDto {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct AuthResponse {
    /// Bearer token
    pub token: String,
    pub user: UserProfileDto,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: session.user.into(),
        }
    }
}
