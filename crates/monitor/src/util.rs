use chrono::{DateTime, Local};
use ethers::{
    types::{Address, H256, U256},
    utils::keccak256,
};
use std::time::SystemTime;
use utils::Amount;

/// ERC-20 Transfer 事件签名
pub const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

/// BSC-USD 为 18 位小数，内部金额为 6 位
const WEI_PER_MICRO_EXP: usize = 12;

// 工具函数: 获取当前的日期和时间
pub fn current_date_and_time() -> String {
    let now: DateTime<Local> = SystemTime::now().into();
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

// 工具函数：计算事件签名的 Keccak256 哈希(topic0)
pub fn magic_number(event_signature: &str) -> H256 {
    H256::from(keccak256(event_signature.as_bytes()))
}

/// indexed address 参数占 topic 的低 20 字节
pub fn topic_to_address(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..])
}

pub fn address_to_topic(address: &Address) -> H256 {
    H256::from(*address)
}

/// 小写 0x 十六进制，与数据库中的钱包/哈希格式一致
pub fn to_hex<T: std::fmt::LowerHex>(value: &T) -> String {
    format!("{:#x}", value)
}

/// 18 位精度的链上数值转为 micro-USDT，超出部分截断
pub fn wei_to_amount(value: U256) -> eyre::Result<Amount> {
    let micros = value / U256::exp10(WEI_PER_MICRO_EXP);
    if micros > U256::from(i64::MAX as u64) {
        eyre::bail!("transfer value {} overflows", value);
    }

    Ok(Amount::from_micros(micros.as_u64() as i64))
}

/// Transfer 的 data 字段是一个 uint256
pub fn decode_transfer_value(data: &[u8]) -> eyre::Result<U256> {
    if data.len() != 32 {
        eyre::bail!("unexpected Transfer data length {}", data.len());
    }

    Ok(U256::from_big_endian(data))
}

/// 区块的确认数，所在区块本身算 1 个
pub fn confirmations(block: u64, latest: u64) -> u64 {
    if block > latest {
        0
    } else {
        latest - block + 1
    }
}

/// 确认数不少于 `required` 的最高区块，`required` 为 0 时按 1 处理
pub fn safe_head(latest: u64, required: u64) -> Option<u64> {
    latest.saturating_add(1).checked_sub(required.max(1))
}

pub fn is_confirmed(block: u64, latest: u64, required: u64) -> bool {
    safe_head(latest, required).map_or(false, |head| block <= head)
}

/// 计算本轮扫描区间 [from, to]
///
/// 没有检查点时从 `safe_head - lookback` 开始；只扫描已达到确认数的区块；
/// 单轮跨度不超过 `max_range`。没有新区块时返回 None。
pub fn scan_range(
    checkpoint: Option<u64>,
    latest: u64,
    confirmations: u64,
    lookback: u64,
    max_range: u64,
) -> Option<(u64, u64)> {
    let head = safe_head(latest, confirmations)?;
    let from = match checkpoint {
        Some(last) => last + 1,
        None => head.saturating_sub(lookback),
    };

    if from > head {
        return None;
    }

    let to = head.min(from + max_range.max(1) - 1);
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_topic() {
        assert_eq!(
            to_hex(&magic_number(TRANSFER_EVENT)),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_topic_address_roundtrip() {
        let address: Address = "0x55d398326f99059ff775485246999027b3197955".parse().unwrap();
        let topic = address_to_topic(&address);
        assert_eq!(&topic.as_bytes()[..12], &[0u8; 12]);
        assert_eq!(topic_to_address(&topic), address);
        assert_eq!(to_hex(&address), "0x55d398326f99059ff775485246999027b3197955");
    }

    #[test]
    fn test_wei_to_amount() {
        let hundred = U256::from(100u64) * U256::exp10(18);
        assert_eq!(wei_to_amount(hundred).unwrap(), Amount::from_usdt(100));

        // 低于 1 micro 的部分被截断
        let dust = U256::from(1_500_000_000_000u64);
        assert_eq!(wei_to_amount(dust).unwrap(), Amount::from_micros(1));

        assert!(wei_to_amount(U256::MAX).is_err());
    }

    #[test]
    fn test_decode_transfer_value() {
        let mut data = [0u8; 32];
        data[31] = 42;
        assert_eq!(decode_transfer_value(&data).unwrap(), U256::from(42));
        assert!(decode_transfer_value(&data[1..]).is_err());
    }

    #[test]
    fn test_scan_range() {
        // 首次运行
        assert_eq!(scan_range(None, 10_000, 3, 5_000, 2_000), Some((4_998, 6_997)));
        // 有检查点，未超过跨度
        assert_eq!(scan_range(Some(9_990), 10_000, 3, 5_000, 2_000), Some((9_991, 9_998)));
        // 已追上
        assert_eq!(scan_range(Some(9_998), 10_000, 3, 5_000, 2_000), None);
        // 链刚启动
        assert_eq!(scan_range(None, 1, 3, 5_000, 2_000), None);
        assert_eq!(scan_range(None, 2, 3, 5_000, 2_000), Some((0, 0)));
    }

    #[test]
    fn test_safe_head_matches_confirmations() {
        assert_eq!(confirmations(9_998, 10_000), 3);
        assert_eq!(confirmations(10_000, 10_000), 1);
        assert_eq!(confirmations(10_001, 10_000), 0);
        assert_eq!(safe_head(10_000, 0), Some(10_000));
        assert_eq!(safe_head(10_000, 1), Some(10_000));

        // 扫描区间的终点正好是确认数达标的最高区块
        for required in 1..=12 {
            let head = safe_head(10_000, required).unwrap();
            assert!(confirmations(head, 10_000) >= required);
            assert!(confirmations(head + 1, 10_000) < required);
            assert!(is_confirmed(head, 10_000, required));
            assert!(!is_confirmed(head + 1, 10_000, required));
        }
    }
}
