use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - logging: 日志配置
/// - geoip: 数据源与缓存配置
/// - scheduler: 定时任务配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：GEO，分隔符：__
    /// 示例：GEO__GEOIP__CSV_PATH=/srv/geoip/ip-ranges.csv
    pub fn load(path: &str) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// 加载配置，失败时返回错误而不是回退到默认值
    pub fn try_load(path: &str) -> crate::errors::Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 GEO，分隔符 __
            .add_source(
                Environment::with_prefix("GEO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize::<StaticConfig>()?)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// GeoIP 数据源与缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// IP 段参考数据（CSV）路径
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
    /// 快照目录
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    /// 快照保留天数
    #[serde(default = "default_backup_retention_days")]
    pub backup_retention_days: u64,
    #[serde(default = "default_csv_confidence")]
    pub csv_confidence: f64,

    /// MaxMindDB 文件路径 (GeoLite2-City.mmdb)，不配置则不启用
    #[serde(default)]
    pub maxminddb_path: Option<String>,
    #[serde(default = "default_maxmind_confidence")]
    pub maxmind_confidence: f64,

    /// 外部 GeoIP API URL，使用 {ip} 作为占位符，不配置则不启用
    /// 例如: http://ip-api.com/json/{ip}
    #[serde(default)]
    pub external_api_url: Option<String>,
    #[serde(default = "default_external_api_confidence")]
    pub external_api_confidence: f64,
    #[serde(default = "default_external_api_timeout_secs")]
    pub external_api_timeout_secs: u64,

    /// 解析结果缓存上限
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: u64,
}

/// 定时任务配置
///
/// `refresh` / `backup` 支持：`@daily`、`@hourly`、`HH:MM[:SS]`（每天固定时间）、
/// 以及 `6h`、`1d2h` 这样的固定间隔
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_refresh_schedule")]
    pub refresh: String,
    #[serde(default = "default_backup_schedule")]
    pub backup: String,
    #[serde(default = "default_cache_maintenance_interval_secs")]
    pub cache_maintenance_interval_secs: u64,
    #[serde(default = "default_refresh_on_startup")]
    pub refresh_on_startup: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_csv_path() -> String {
    "data/geoip/ip-ranges.csv".to_string()
}

fn default_backup_dir() -> String {
    "backup/geoip".to_string()
}

fn default_backup_retention_days() -> u64 {
    7
}

fn default_csv_confidence() -> f64 {
    0.8
}

fn default_maxmind_confidence() -> f64 {
    0.9
}

fn default_external_api_confidence() -> f64 {
    0.5
}

fn default_external_api_timeout_secs() -> u64 {
    2
}

fn default_max_cache_size() -> u64 {
    10_000
}

fn default_refresh_schedule() -> String {
    "01:00".to_string()
}

fn default_backup_schedule() -> String {
    "00:00".to_string()
}

fn default_cache_maintenance_interval_secs() -> u64 {
    3600
}

fn default_refresh_on_startup() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            backup_dir: default_backup_dir(),
            backup_retention_days: default_backup_retention_days(),
            csv_confidence: default_csv_confidence(),
            maxminddb_path: None,
            maxmind_confidence: default_maxmind_confidence(),
            external_api_url: None,
            external_api_confidence: default_external_api_confidence(),
            external_api_timeout_secs: default_external_api_timeout_secs(),
            max_cache_size: default_max_cache_size(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh: default_refresh_schedule(),
            backup: default_backup_schedule(),
            cache_maintenance_interval_secs: default_cache_maintenance_interval_secs(),
            refresh_on_startup: default_refresh_on_startup(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
