//! # 时间戳处理
//!
//! 纯函数：当前时间（毫秒）与导出文件名中的日期。

use std::time::{SystemTime, UNIX_EPOCH};

use time::OffsetDateTime;
use time::macros::format_description;

/// 当前 Unix 时间戳（毫秒）
///
/// 系统时钟早于 1970 年时返回 0。
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// 把毫秒时间戳转换为 UTC 日期 `YYYY-MM-DD`
///
/// 超出可表示范围的时间戳按 1970-01-01 处理。
pub fn utc_date(millis: u64) -> String {
    let nanos = i128::from(millis) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// 导出文件名，如 `luci_skills_2026-10-17.json`
pub fn export_file_name(prefix: &str, millis: u64, extension: &str) -> String {
    format!("{prefix}_{}.{extension}", utc_date(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01 之后
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_utc_date() {
        assert_eq!(utc_date(0), "1970-01-01");
        assert_eq!(utc_date(86_399_999), "1970-01-01");
        assert_eq!(utc_date(86_400_000), "1970-01-02");
        // 2000-02-29 12:00:00 UTC
        assert_eq!(utc_date(951_825_600_000), "2000-02-29");
        // 2024-12-31 23:59:59 UTC
        assert_eq!(utc_date(1_735_689_599_000), "2024-12-31");
    }

    #[test]
    fn test_utc_date_out_of_range() {
        assert_eq!(utc_date(u64::MAX), "1970-01-01");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("luci_skills", 1_735_689_599_000, "json"),
            "luci_skills_2024-12-31.json"
        );
    }
}
