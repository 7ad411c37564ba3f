use crate::auth::JwtManager;
use database::user::{
    model::{User, UserRole},
    repository::DynUserRepository,
};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use utils::{hash_password, normalize_wallet, verify_password, AppError, AppResult};

pub const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERRAL_CODE_ATTEMPTS: usize = 5;

/// 登录成功后返回的令牌与用户
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub wallet_address: String,
    pub referral_code: Option<String>,
}

pub struct AuthService {
    users: DynUserRepository,
    jwt: Arc<JwtManager>,
}

impl AuthService {
    pub fn new(users: DynUserRepository, jwt: Arc<JwtManager>) -> Self {
        Self { users, jwt }
    }

    pub async fn register(&self, registration: Registration) -> AppResult<AuthSession> {
        let wallet = normalize_wallet(&registration.wallet_address)?;
        let email = registration.email.trim().to_lowercase();

        let referred_by = match registration.referral_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let referrer = self
                    .users
                    .get_user_by_referral_code(code)
                    .await?
                    .ok_or_else(|| AppError::BadRequest(format!("Referral code {} is invalid.", code)))?;
                Some(referrer.id)
            }
            _ => None,
        };

        if self.users.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered.".to_string()));
        }
        if self.users.get_user_by_wallet(&wallet).await?.is_some() {
            return Err(AppError::Conflict("Wallet is already registered.".to_string()));
        }

        let password_hash = hash_password(&registration.password)?;
        let referral_code = self.unused_referral_code().await?;

        let user = self
            .users
            .create_user(User::new(&email, password_hash, &wallet, referral_code, referred_by))
            .await?;

        info!("👤 user {} registered (wallet {}, referrer {:?})", user.id, wallet, referred_by);

        let token = self.jwt.generate_token(&user)?;
        Ok(AuthSession { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let invalid = || AppError::Unauthorized("Invalid email or password.".to_string());

        let user = self.users.get_user_by_email(email.trim()).await?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash)? {
            warn!("🔐 failed login for {}", user.email);
            return Err(invalid());
        }
        if user.is_blocked {
            return Err(AppError::Forbidden("Account is blocked.".to_string()));
        }

        let token = self.jwt.generate_token(&user)?;
        Ok(AuthSession { token, user })
    }

    /// 启动时创建管理员账号(已存在则跳过)
    pub async fn ensure_admin(&self, email: &str, password: &str, wallet: &str) -> AppResult<()> {
        if self.users.get_user_by_email(email).await?.is_some() {
            return Ok(());
        }

        let wallet = normalize_wallet(wallet)?;
        let password_hash = hash_password(password)?;
        let referral_code = self.unused_referral_code().await?;
        let mut admin = User::new(email, password_hash, &wallet, referral_code, None);
        admin.role = UserRole::Admin;

        self.users.create_user(admin).await?;
        info!("🛡️ admin account {} created", email);

        Ok(())
    }

    async fn unused_referral_code(&self) -> AppResult<String> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = generate_referral_code();
            if self.users.get_user_by_referral_code(&code).await?.is_none() {
                return Ok(code);
            }
        }

        Err(AppError::InternalServerErrorWithContext(
            "Could not allocate a unique referral code.".to_string(),
        ))
    }
}

pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();

    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_CODE_ALPHABET[rng.gen_range(0..REFERRAL_CODE_ALPHABET.len())] as char)
        .collect()
}
