use geoip_resolver::errors::{GeoError, Result};
use std::error::Error;

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_file_operation_error() {
        let error = GeoError::file_operation("文件读取失败");

        assert!(matches!(error, GeoError::FileOperation(_)));
        assert!(error.to_string().contains("File Operation Error"));
        assert!(error.to_string().contains("文件读取失败"));
    }

    #[test]
    fn test_validation_error() {
        let error = GeoError::validation("Invalid CSV header format");

        assert!(matches!(error, GeoError::Validation(_)));
        assert_eq!(error.code(), "G002");
        assert_eq!(
            error.to_string(),
            "Validation Error: Invalid CSV header format"
        );
    }

    #[test]
    fn test_backup_error() {
        let error = GeoError::backup("快照失败");

        assert!(matches!(error, GeoError::Backup(_)));
        assert_eq!(error.code(), "G003");
        assert_eq!(error.message(), "快照失败");
    }

    #[test]
    fn test_config_error() {
        let error = GeoError::config("bad schedule");

        assert!(matches!(error, GeoError::Config(_)));
        assert_eq!(error.error_type(), "Configuration Error");
    }

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            GeoError::file_operation(""),
            GeoError::validation(""),
            GeoError::backup(""),
            GeoError::data_load(""),
            GeoError::source_unavailable(""),
            GeoError::external_api(""),
            GeoError::config(""),
            GeoError::date_parse(""),
            GeoError::serialization(""),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_format_colored_contains_code_and_message() {
        colored::control::set_override(false);
        let error = GeoError::data_load("corrupt row");
        let formatted = error.format_colored();

        assert!(formatted.contains("G004"));
        assert!(formatted.contains("corrupt row"));
    }
}

#[cfg(test)]
mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "文件未找到");
        let geo_error: GeoError = io_error.into();

        assert!(matches!(geo_error, GeoError::FileOperation(_)));
        assert!(geo_error.to_string().contains("文件未找到"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json").unwrap_err();
        let geo_error: GeoError = json_error.into();

        assert!(matches!(geo_error, GeoError::Serialization(_)));
    }

    #[test]
    fn test_chrono_parse_error_conversion() {
        let parse_error = chrono::NaiveTime::parse_from_str("不是时间", "%H:%M").unwrap_err();
        let geo_error: GeoError = parse_error.into();

        assert!(matches!(geo_error, GeoError::DateParse(_)));
        assert_eq!(geo_error.code(), "G008");
    }

    #[test]
    fn test_csv_error_conversion() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("a,b\nc\n".as_bytes());
        let csv_error = reader
            .records()
            .find_map(|r| r.err())
            .expect("ragged rows should fail without flexible mode");
        let geo_error: GeoError = csv_error.into();

        assert!(matches!(geo_error, GeoError::DataLoad(_)));
    }
}

#[cfg(test)]
mod error_trait_tests {
    use super::*;

    #[test]
    fn test_error_trait_implementation() {
        let error = GeoError::validation("测试错误");

        let error_trait: &dyn Error = &error;
        assert!(!error_trait.to_string().is_empty());
        assert!(error_trait.source().is_none());
    }

    #[test]
    fn test_debug_and_clone() {
        let original = GeoError::source_unavailable("MAXMIND");
        let cloned = original.clone();

        assert_eq!(original.to_string(), cloned.to_string());
        assert!(format!("{:?}", cloned).contains("SourceUnavailable"));
    }

    #[test]
    fn test_send_sync_traits() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<GeoError>();
        assert_sync::<GeoError>();
    }
}

#[cfg(test)]
mod result_type_tests {
    use super::*;

    #[test]
    fn test_result_and_then() {
        let parse = |x: i32| -> Result<i32> {
            if x > 5 {
                Ok(x * 2)
            } else {
                Err(GeoError::validation("数值太小"))
            }
        };

        assert_eq!(parse(10).unwrap(), 20);
        assert!(matches!(parse(1), Err(GeoError::Validation(_))));
    }
}
