//! 通用工具函数 — 时间戳、ID 与订单号生成

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms, collision-free at this scale)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Generate a human-legible, globally-unique order number.
///
/// Format: `ORD-YYYYMMDD-XXXXXX` (UTC date stamp + uppercase random
/// suffix). Uniqueness is ultimately enforced by the order store's
/// unique index; a collision there surfaces as a conflict, never an
/// overwrite.
pub fn generate_order_number() -> String {
    let date = chrono::Utc::now().format("%Y%m%d");
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("ORD-{}-{}", date, suffix)
}

/// 计算折扣百分比（四舍五入到整数）
///
/// `original == 0` 时返回 0，避免除零。
pub fn discount_percent(original: Decimal, flash: Decimal) -> u8 {
    if original.is_zero() {
        return 0;
    }
    let pct = (original - flash) / original * Decimal::from(100);
    pct.round().to_i64().unwrap_or(0).clamp(0, 100) as u8
}
