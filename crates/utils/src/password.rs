use crate::{AppError, AppResult};
use rand::RngCore;

/// argon2 编码后的哈希(包含 salt 与参数)
pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())
        .map_err(|e| AppError::InternalServerErrorWithContext(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, encoded: &str) -> AppResult<bool> {
    argon2::verify_encoded(encoded, password.as_bytes())
        .map_err(|e| AppError::InternalServerErrorWithContext(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_salt_differs() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }
}
