//! 地理位置值类型

use serde::{Deserialize, Serialize};

/// "无可用数据" 的占位值
pub const UNKNOWN: &str = "Unknown";

/// 地理位置信息
///
/// 不可变值类型。查不到数据时返回 [`Location::unknown()`]，它是合法返回值而不是错误。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Location {
    pub fn new(
        country: impl Into<String>,
        city: impl Into<String>,
        region: impl Into<String>,
        postal_code: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
            region: region.into(),
            postal_code: postal_code.into(),
            latitude,
            longitude,
            timezone: timezone.into(),
        }
    }

    /// Unknown 哨兵值：字符串字段全部为 "Unknown"，坐标为 0.0
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN, UNKNOWN, UNKNOWN, 0.0, 0.0, UNKNOWN)
    }

    /// 没有国家信息的结果视为不可用
    pub fn is_unknown(&self) -> bool {
        self.country == UNKNOWN
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}
