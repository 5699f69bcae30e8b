//! 参考数据校验
//!
//! 在数据文件被激活之前做结构与语义校验：
//! - 表头必须与 [`EXPECTED_HEADER`] 完全一致，否则立即失败
//! - 逐行校验全部记录（包括空行），不会因为某一行失败而中止
//! - 只要存在任意一条非法记录，整个文件即判定为不合法

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::range_table::{EXPECTED_HEADER, parse_record, split_line};

/// 表头不合法时的固定提示
pub const INVALID_HEADER_MESSAGE: &str = "Invalid CSV header format";

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationResult {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

/// 单次校验的数据质量统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQualityMetrics {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub validation_errors: Vec<String>,
}

/// 参考数据校验器
///
/// 保存最近一次校验的统计信息，每次 `validate_file` 开始时重置
#[derive(Debug, Default)]
pub struct DataValidator {
    metrics: Mutex<DataQualityMetrics>,
}

impl DataValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 校验 CSV 文件
    pub fn validate_file<P: AsRef<Path>>(&self, path: P) -> ValidationResult {
        let path = path.as_ref();
        let mut metrics = DataQualityMetrics::default();
        let result = Self::run(path, &mut metrics);

        debug!(
            "Validated {}: total={}, valid={}, invalid={}",
            path.display(),
            metrics.total_records,
            metrics.valid_records,
            metrics.invalid_records
        );

        *self.metrics.lock() = metrics;
        result
    }

    /// 最近一次校验的统计信息
    pub fn metrics(&self) -> DataQualityMetrics {
        self.metrics.lock().clone()
    }

    fn run(path: &Path, metrics: &mut DataQualityMetrics) -> ValidationResult {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Error validating CSV file {}: {}", path.display(), e);
                return ValidationResult::invalid(format!("Error reading CSV file: {}", e));
            }
        };

        let mut lines = BufReader::new(file).lines();

        // 1. 表头
        match lines.next() {
            Some(Ok(line)) => {
                let header = split_line(&line);
                if header.len() != EXPECTED_HEADER.len() {
                    metrics.validation_errors.push(format!(
                        "Invalid number of columns in header: {}",
                        header.len()
                    ));
                    return ValidationResult::invalid(INVALID_HEADER_MESSAGE);
                }
                if let Some((actual, expected)) = header
                    .iter()
                    .zip(EXPECTED_HEADER)
                    .find(|(actual, expected)| actual.trim() != *expected)
                {
                    metrics.validation_errors.push(format!(
                        "Invalid column name: '{}' (expected '{}')",
                        actual, expected
                    ));
                    return ValidationResult::invalid(INVALID_HEADER_MESSAGE);
                }
            }
            Some(Err(e)) => {
                metrics
                    .validation_errors
                    .push(format!("Unreadable header: {}", e));
                return ValidationResult::invalid(INVALID_HEADER_MESSAGE);
            }
            None => {
                metrics.validation_errors.push("Missing header".to_string());
                return ValidationResult::invalid(INVALID_HEADER_MESSAGE);
            }
        }

        // 2. 逐行校验，不提前退出；空行同样计入并判为字段数错误
        for (row_idx, line) in lines.enumerate() {
            let row_num = row_idx + 2;
            metrics.total_records += 1;

            let outcome = match line {
                Ok(line) => parse_record(&split_line(&line)).map(|_| ()),
                // 非 UTF-8 的行已被消费，可以继续读下一行
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    Err(format!("Unreadable record: {}", e))
                }
                Err(e) => {
                    metrics.invalid_records += 1;
                    metrics
                        .validation_errors
                        .push(format!("Row {}: Unreadable record: {}", row_num, e));
                    break;
                }
            };

            match outcome {
                Ok(()) => metrics.valid_records += 1,
                Err(e) => {
                    metrics.invalid_records += 1;
                    metrics.validation_errors.push(format!("Row {}: {}", row_num, e));
                }
            }
        }

        // 3. 汇总
        ValidationResult {
            is_valid: metrics.invalid_records == 0,
            message: format!(
                "Validation complete. Total: {}, Valid: {}, Invalid: {}",
                metrics.total_records, metrics.valid_records, metrics.invalid_records
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "ip_start,ip_end,country,city,region,postal_code,latitude,longitude,timezone";

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_file() {
        let file = write_csv(&format!(
            "{}\n16777216,16777471,Australia,Sydney,NSW,2000,-33.8688,151.2093,Australia/Sydney\n",
            HEADER
        ));
        let validator = DataValidator::new();
        let result = validator.validate_file(file.path());

        assert!(result.is_valid, "{}", result.message);
        assert_eq!(
            result.message,
            "Validation complete. Total: 1, Valid: 1, Invalid: 0"
        );
        let metrics = validator.metrics();
        assert_eq!(metrics.total_records, 1);
        assert!(metrics.validation_errors.is_empty());
    }

    #[test]
    fn test_misnamed_header_column() {
        let file = write_csv(
            "ip_start,ip_end,country,city,region,postal_code,latitude,longitude,tz\n1,2,US,NYC,NY,1,0,0,UTC\n",
        );
        let validator = DataValidator::new();
        let result = validator.validate_file(file.path());

        assert!(!result.is_valid);
        assert_eq!(result.message, INVALID_HEADER_MESSAGE);
        // 表头失败后不处理数据行
        assert_eq!(validator.metrics().total_records, 0);
    }

    #[test]
    fn test_header_with_wrong_column_count() {
        let file = write_csv("ip_start,ip_end,country\n");
        let result = DataValidator::new().validate_file(file.path());
        assert!(!result.is_valid);
        assert_eq!(result.message, INVALID_HEADER_MESSAGE);
    }

    #[test]
    fn test_empty_file() {
        let file = write_csv("");
        let result = DataValidator::new().validate_file(file.path());
        assert!(!result.is_valid);
        assert_eq!(result.message, INVALID_HEADER_MESSAGE);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = DataValidator::new().validate_file(dir.path().join("nope.csv"));
        assert!(!result.is_valid);
        assert!(result.message.starts_with("Error reading CSV file"));
    }

    #[test]
    fn test_blank_line_is_an_invalid_record() {
        let file = write_csv(&format!(
            "{}\n{}\n\n{}\n",
            HEADER,
            "16777216,16777471,Australia,Sydney,NSW,2000,-33.8688,151.2093,Australia/Sydney",
            "16777472,16777727,Germany,Berlin,BE,10115,52.52,13.405,Europe/Berlin"
        ));
        let validator = DataValidator::new();
        let result = validator.validate_file(file.path());

        assert!(!result.is_valid);
        assert_eq!(
            result.message,
            "Validation complete. Total: 3, Valid: 2, Invalid: 1"
        );
        let metrics = validator.metrics();
        assert_eq!(metrics.validation_errors.len(), 1);
        assert!(metrics.validation_errors[0].starts_with("Row 3: Invalid number of fields (1"));
    }

    #[test]
    fn test_quoted_comma_is_not_an_escape() {
        let file = write_csv(&format!(
            "{}\n16777216,16777471,Australia,\"Sydney, NSW\",NSW,2000,-33.8688,151.2093,Australia/Sydney\n",
            HEADER
        ));
        let validator = DataValidator::new();
        let result = validator.validate_file(file.path());

        assert!(!result.is_valid);
        assert!(validator.metrics().validation_errors[0].contains("Invalid number of fields (10"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let file = write_csv(&format!(
            "{}\r\n1,5,US,NYC,NY,1,0,0,UTC\r\n",
            HEADER
        ));
        assert!(DataValidator::new().validate_file(file.path()).is_valid);
    }

    #[test]
    fn test_metrics_reset_between_runs() {
        let bad = write_csv(&format!("{}\n5,1,US,NYC,NY,1,0,0,UTC\n", HEADER));
        let good = write_csv(&format!("{}\n1,5,US,NYC,NY,1,0,0,UTC\n", HEADER));
        let validator = DataValidator::new();

        assert!(!validator.validate_file(bad.path()).is_valid);
        assert_eq!(validator.metrics().invalid_records, 1);

        assert!(validator.validate_file(good.path()).is_valid);
        let metrics = validator.metrics();
        assert_eq!(metrics.invalid_records, 0);
        assert_eq!(metrics.total_records, 1);
        assert!(metrics.validation_errors.is_empty());
    }
}
