//! IP 段表
//!
//! 按起始地址升序排列的 IPv4 段集合，支持 O(log n) 点查询。
//! 表一旦构建即不可变，刷新时整体替换。

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use super::location::Location;
use crate::errors::{GeoError, Result};

/// 参考数据的列顺序
pub const EXPECTED_HEADER: [&str; 9] = [
    "ip_start",
    "ip_end",
    "country",
    "city",
    "region",
    "postal_code",
    "latitude",
    "longitude",
    "timezone",
];

/// 单条 IP 段记录，`start..=end` 闭区间
#[derive(Debug, Clone, PartialEq)]
pub struct IpRange {
    pub start: u32,
    pub end: u32,
    pub location: Location,
}

impl IpRange {
    #[inline]
    pub fn contains(&self, ip: u32) -> bool {
        self.start <= ip && ip <= self.end
    }
}

/// 将点分十进制 IPv4 字符串按大端序打包为 u32
///
/// 段数不为 4、含非数字字符或某段超过 255 时返回 `None`
pub fn parse_ipv4(ip: &str) -> Option<u32> {
    let mut value: u32 = 0;
    let mut segments = 0;

    for segment in ip.trim().split('.') {
        segments += 1;
        if segments > 4 || segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let octet: u8 = segment.parse().ok()?;
        value = (value << 8) | u32::from(octet);
    }

    (segments == 4).then_some(value)
}

/// 把一行原始文本按逗号切分为字段
///
/// 不支持引号转义，`"Sydney, NSW"` 会被切成两个字段；空行得到一个空字段
pub fn split_line(line: &str) -> StringRecord {
    line.trim_end_matches('\r').split(',').collect()
}

/// 解析一条数据行
///
/// 校验器与加载器共用，保证两者对"合法记录"的判断一致。
/// 错误字符串直接作为校验诊断信息。
pub fn parse_record(record: &StringRecord) -> std::result::Result<IpRange, String> {
    if record.len() != EXPECTED_HEADER.len() {
        return Err(format!(
            "Invalid number of fields ({}, expected {})",
            record.len(),
            EXPECTED_HEADER.len()
        ));
    }

    let field = |i: usize| record.get(i).unwrap_or_default();

    let start: u32 = field(0)
        .trim()
        .parse()
        .map_err(|_| format!("Invalid ip_start '{}'", field(0)))?;
    let end: u32 = field(1)
        .trim()
        .parse()
        .map_err(|_| format!("Invalid ip_end '{}'", field(1)))?;
    if start > end {
        return Err(format!("Invalid IP range: start {} > end {}", start, end));
    }

    let latitude: f64 = field(6)
        .trim()
        .parse()
        .map_err(|_| format!("Invalid latitude '{}'", field(6)))?;
    let longitude: f64 = field(7)
        .trim()
        .parse()
        .map_err(|_| format!("Invalid longitude '{}'", field(7)))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!(
            "Invalid coordinates: latitude {}, longitude {}",
            latitude, longitude
        ));
    }

    let country = field(2).trim();
    let city = field(3).trim();
    if country.is_empty() || city.is_empty() {
        return Err("Missing required fields: country and city must be non-empty".to_string());
    }

    Ok(IpRange {
        start,
        end,
        location: Location::new(
            country,
            city,
            field(4).trim(),
            field(5).trim(),
            latitude,
            longitude,
            field(8).trim(),
        ),
    })
}

/// 不可变的有序 IP 段表
#[derive(Debug, Default)]
pub struct RangeTable {
    ranges: Vec<IpRange>,
}

impl RangeTable {
    /// 按起始地址排序后构建
    ///
    /// 段之间应当互不重叠；发现相邻重叠时只记录警告，查询结果对重叠部分不作保证
    pub fn new(mut ranges: Vec<IpRange>) -> Self {
        ranges.sort_by_key(|r| r.start);

        let overlaps = ranges
            .windows(2)
            .filter(|pair| pair[1].start <= pair[0].end)
            .count();
        if overlaps > 0 {
            warn!(
                "Range table contains {} overlapping adjacent ranges, lookups in those ranges are ambiguous",
                overlaps
            );
        }

        Self { ranges }
    }

    /// 从 CSV 参考数据文件加载
    ///
    /// 首行视为表头跳过；无法解析的行记录警告后跳过（调用方应先完成校验）
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            GeoError::file_operation(format!("Failed to open {}: {}", path.display(), e))
        })?;

        // 与 split_line 一致：逗号即分隔符，不处理引号
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(BufReader::new(file));

        let mut ranges = Vec::new();
        let mut skipped = 0usize;

        for (row_idx, result) in reader.records().enumerate() {
            let row_num = row_idx + 2; // 1-based，跳过 header
            let record = result?;
            match parse_record(&record) {
                Ok(range) => ranges.push(range),
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping row {} of {}: {}", row_num, path.display(), e);
                }
            }
        }

        debug!(
            "Loaded {} ranges from {} ({} skipped)",
            ranges.len(),
            path.display(),
            skipped
        );

        Ok(Self::new(ranges))
    }

    /// 二分查找包含 `ip` 的段
    pub fn find(&self, ip: u32) -> Option<&Location> {
        // 第一个 start > ip 的位置，候选段在它前面
        let idx = self.ranges.partition_point(|r| r.start <= ip);
        let candidate = self.ranges.get(idx.checked_sub(1)?)?;
        candidate.contains(ip).then_some(&candidate.location)
    }

    /// 按字符串查询，任何失败都返回 Unknown
    pub fn lookup(&self, ip: &str) -> Location {
        parse_ipv4(ip)
            .and_then(|ip| self.find(ip))
            .cloned()
            .unwrap_or_else(Location::unknown)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[IpRange] {
        &self.ranges
    }
}
