use crate::{AppError, AppResult};

fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// 校验 EVM 地址格式并统一为小写
pub fn normalize_wallet(address: &str) -> AppResult<String> {
    let address = address.trim();
    match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(body) if is_hex_of_len(body, 40) => Ok(format!("0x{}", body.to_lowercase())),
        _ => Err(AppError::BadRequest(format!("Invalid wallet address: {}", address))),
    }
}

/// 校验交易哈希格式并统一为小写
pub fn normalize_tx_hash(hash: &str) -> AppResult<String> {
    let hash = hash.trim();
    match hash.strip_prefix("0x").or_else(|| hash.strip_prefix("0X")) {
        Some(body) if is_hex_of_len(body, 64) => Ok(format!("0x{}", body.to_lowercase())),
        _ => Err(AppError::BadRequest(format!("Invalid transaction hash: {}", hash))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_wallet() {
        let wallet = normalize_wallet(" 0xAbCdEf0123456789aBcDeF0123456789AbCdEf01 ").unwrap();
        assert_eq!(wallet, "0xabcdef0123456789abcdef0123456789abcdef01");

        assert!(normalize_wallet("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(normalize_wallet("0x1234").is_err());
        assert!(normalize_wallet("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn test_normalize_tx_hash() {
        let hash = format!("0x{}", "AB".repeat(32));
        assert_eq!(normalize_tx_hash(&hash).unwrap(), format!("0x{}", "ab".repeat(32)));
        assert!(normalize_tx_hash("0xabc").is_err());
    }
}
