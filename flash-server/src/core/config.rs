//! 服务器配置
//!
//! # 环境变量
//!
//! 所有配置项都可以通过环境变量覆盖：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | LISTING_SWEEP_SECS | 300 | 商品过期扫描间隔（秒） |
//! | ORDER_SWEEP_SECS | 600 | 滞留订单扫描间隔（秒） |
//! | NOTIFICATION_SWEEP_SECS | 86400 | 通知清理间隔（秒） |
//! | PICKUP_GRACE_HOURS | 2 | 取餐宽限期（小时） |
//! | NOTIFICATION_RETENTION_DAYS | 30 | 通知保留天数 |
//! | LOCK_TTL_SECS | 10 | 分布式锁默认 TTL（秒） |
//! | RESERVE_WAIT_MS | 200 | 库存行锁最长等待（毫秒） |
//! | ENVIRONMENT | development | 运行环境 |
//!
//! # 示例
//!
//! ```ignore
//! PICKUP_GRACE_HOURS=1 LISTING_SWEEP_SECS=60 cargo run
//! ```

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// 商品过期扫描间隔
    pub listing_sweep_interval: Duration,
    /// 滞留订单扫描间隔
    pub order_sweep_interval: Duration,
    /// 通知清理间隔
    pub notification_sweep_interval: Duration,
    /// 取餐宽限期：READY/PREPARING 订单超过 pickup_time + grace 即过期
    pub pickup_grace: Duration,
    /// 通知保留天数
    pub notification_retention_days: i64,
    /// 分布式锁默认 TTL
    pub lock_ttl: Duration,
    /// 库存行锁最长等待，超时返回可重试错误
    pub reserve_wait: Duration,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            listing_sweep_interval: Duration::from_secs(env_u64("LISTING_SWEEP_SECS", 300)),
            order_sweep_interval: Duration::from_secs(env_u64("ORDER_SWEEP_SECS", 600)),
            notification_sweep_interval: Duration::from_secs(env_u64(
                "NOTIFICATION_SWEEP_SECS",
                86400,
            )),
            pickup_grace: Duration::from_secs(env_u64("PICKUP_GRACE_HOURS", 2) * 3600),
            notification_retention_days: env_u64("NOTIFICATION_RETENTION_DAYS", 30) as i64,
            lock_ttl: Duration::from_secs(env_u64("LOCK_TTL_SECS", 10)),
            reserve_wait: Duration::from_millis(env_u64("RESERVE_WAIT_MS", 200)),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 宽限期毫秒数（与 Unix-millis 时间戳运算）
    pub fn pickup_grace_millis(&self) -> i64 {
        self.pickup_grace.as_millis() as i64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_sweep_interval: Duration::from_secs(300),
            order_sweep_interval: Duration::from_secs(600),
            notification_sweep_interval: Duration::from_secs(86400),
            pickup_grace: Duration::from_secs(2 * 3600),
            notification_retention_days: 30,
            lock_ttl: Duration::from_secs(10),
            reserve_wait: Duration::from_millis(200),
            environment: "development".into(),
        }
    }
}
