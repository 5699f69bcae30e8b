use std::fmt;

#[derive(Debug, Clone)]
pub enum GeoError {
    FileOperation(String),
    Validation(String),
    Backup(String),
    DataLoad(String),
    SourceUnavailable(String),
    ExternalApi(String),
    Config(String),
    DateParse(String),
    Serialization(String),
}

impl GeoError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            GeoError::FileOperation(_) => "G001",
            GeoError::Validation(_) => "G002",
            GeoError::Backup(_) => "G003",
            GeoError::DataLoad(_) => "G004",
            GeoError::SourceUnavailable(_) => "G005",
            GeoError::ExternalApi(_) => "G006",
            GeoError::Config(_) => "G007",
            GeoError::DateParse(_) => "G008",
            GeoError::Serialization(_) => "G009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GeoError::FileOperation(_) => "File Operation Error",
            GeoError::Validation(_) => "Validation Error",
            GeoError::Backup(_) => "Backup Error",
            GeoError::DataLoad(_) => "Data Load Error",
            GeoError::SourceUnavailable(_) => "Source Unavailable",
            GeoError::ExternalApi(_) => "External API Error",
            GeoError::Config(_) => "Configuration Error",
            GeoError::DateParse(_) => "Date Parse Error",
            GeoError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            GeoError::FileOperation(msg) => msg,
            GeoError::Validation(msg) => msg,
            GeoError::Backup(msg) => msg,
            GeoError::DataLoad(msg) => msg,
            GeoError::SourceUnavailable(msg) => msg,
            GeoError::ExternalApi(msg) => msg,
            GeoError::Config(msg) => msg,
            GeoError::DateParse(msg) => msg,
            GeoError::Serialization(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于日志）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GeoError {}

// 便捷的构造函数
impl GeoError {
    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        GeoError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        GeoError::Validation(msg.into())
    }

    pub fn backup<T: Into<String>>(msg: T) -> Self {
        GeoError::Backup(msg.into())
    }

    pub fn data_load<T: Into<String>>(msg: T) -> Self {
        GeoError::DataLoad(msg.into())
    }

    pub fn source_unavailable<T: Into<String>>(msg: T) -> Self {
        GeoError::SourceUnavailable(msg.into())
    }

    pub fn external_api<T: Into<String>>(msg: T) -> Self {
        GeoError::ExternalApi(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        GeoError::Config(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        GeoError::DateParse(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GeoError::Serialization(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for GeoError {
    fn from(err: std::io::Error) -> Self {
        GeoError::FileOperation(err.to_string())
    }
}

impl From<csv::Error> for GeoError {
    fn from(err: csv::Error) -> Self {
        GeoError::DataLoad(err.to_string())
    }
}

impl From<serde_json::Error> for GeoError {
    fn from(err: serde_json::Error) -> Self {
        GeoError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for GeoError {
    fn from(err: chrono::ParseError) -> Self {
        GeoError::DateParse(err.to_string())
    }
}

impl From<config::ConfigError> for GeoError {
    fn from(err: config::ConfigError) -> Self {
        GeoError::Config(err.to_string())
    }
}

impl From<maxminddb::MaxMindDbError> for GeoError {
    fn from(err: maxminddb::MaxMindDbError) -> Self {
        GeoError::DataLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoError>;
