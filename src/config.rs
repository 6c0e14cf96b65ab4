use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::error::{ConfigError, DataError};
use crate::models::{ExecutionMode, JobConfig, Scenario, DEFAULT_BATCH_SIZE};

/// 数据来源
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// 直接粘贴的表格文本
    Inline(String),
    /// 本地 CSV / TSV 文件
    File(PathBuf),
    /// 在线表格链接
    SheetUrl(String),
}

/// 页面选择器
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalSelectors {
    pub username_input: String,
    pub password_input: String,
    pub submit_button: String,
    /// 登录成功后才会出现的元素
    pub logged_in_marker: String,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            username_input: "input[name='username']".to_string(),
            password_input: "input[type='password']".to_string(),
            submit_button: "button[type='submit']".to_string(),
            logged_in_marker: "nav, .dashboard".to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 任务配置 ---
    pub username: String,
    pub password: String,
    /// 每批记录数
    pub batch_size: usize,
    /// 目标环境标签
    pub environment: String,
    /// `simulated` 或 `real`
    pub execution_mode: String,
    /// 模拟模式下的故障场景
    pub scenario: String,
    /// 批次之间的间隔（毫秒）
    pub inter_batch_delay_ms: u64,
    // --- 数据源 ---
    pub upload_data: Option<String>,
    pub data_file: Option<String>,
    pub sheet_url: Option<String>,
    // --- 浏览器配置 ---
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 是否自行启动无头浏览器（否则连接已打开的浏览器）
    pub headless: bool,
    pub chrome_executable: Option<String>,
    pub login_url: String,
    pub upload_page_url: String,
    /// 批次数据 POST 的接口路径
    pub upload_endpoint: String,
    pub selectors: PortalSelectors,
    /// 单个阶段的超时时间（秒）
    pub phase_timeout_secs: u64,
    // --- 输出 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 失败截图目录
    pub screenshot_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            environment: "production".to_string(),
            execution_mode: "simulated".to_string(),
            scenario: "success".to_string(),
            inter_batch_delay_ms: 1000,
            upload_data: None,
            data_file: None,
            sheet_url: None,
            browser_debug_port: 2001,
            headless: false,
            chrome_executable: None,
            login_url: "https://portal.example.com/login".to_string(),
            upload_page_url: "https://portal.example.com/catalog/bulk-upload".to_string(),
            upload_endpoint: "/api/catalog/bulk-upload".to_string(),
            selectors: PortalSelectors::default(),
            phase_timeout_secs: 60,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            screenshot_dir: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"***")
            .field("batch_size", &self.batch_size)
            .field("environment", &self.environment)
            .field("execution_mode", &self.execution_mode)
            .field("scenario", &self.scenario)
            .field("browser_debug_port", &self.browser_debug_port)
            .field("headless", &self.headless)
            .field("login_url", &self.login_url)
            .field("upload_page_url", &self.upload_page_url)
            .finish_non_exhaustive()
    }
}

fn env_parse<T: FromStr>(key: &str, fallback: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("环境变量 {} 的值 '{}' 无法解析，使用默认值", key, raw);
            fallback
        }),
        Err(_) => fallback,
    }
}

fn env_string(key: &str, fallback: String) -> String {
    std::env::var(key).unwrap_or(fallback)
}

fn env_optional(key: &str, fallback: Option<String>) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or(fallback)
}

impl Config {
    /// 只从环境变量读取（缺省值取 `Default`）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 读取 `CONFIG_FILE` 指向的 TOML 文件（如有），再用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("CONFIG_FILE") {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::Missing {
            key: format!("CONFIG_FILE ({})", path.display()),
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::FileParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Self {
        Self {
            username: env_string("PORTAL_USERNAME", self.username),
            password: env_string("PORTAL_PASSWORD", self.password),
            batch_size: env_parse("BATCH_SIZE", self.batch_size),
            environment: env_string("TARGET_ENV", self.environment),
            execution_mode: env_string("EXECUTION_MODE", self.execution_mode),
            scenario: env_string("SCENARIO", self.scenario),
            inter_batch_delay_ms: env_parse("INTER_BATCH_DELAY_MS", self.inter_batch_delay_ms),
            upload_data: env_optional("UPLOAD_DATA", self.upload_data),
            data_file: env_optional("DATA_FILE", self.data_file),
            sheet_url: env_optional("SHEET_URL", self.sheet_url),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", self.browser_debug_port),
            headless: env_parse("HEADLESS", self.headless),
            chrome_executable: env_optional("CHROME_EXECUTABLE", self.chrome_executable),
            login_url: env_string("LOGIN_URL", self.login_url),
            upload_page_url: env_string("UPLOAD_PAGE_URL", self.upload_page_url),
            upload_endpoint: env_string("UPLOAD_ENDPOINT", self.upload_endpoint),
            selectors: self.selectors,
            phase_timeout_secs: env_parse("PHASE_TIMEOUT_SECS", self.phase_timeout_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE", self.output_log_file),
            screenshot_dir: env_optional("SCREENSHOT_DIR", self.screenshot_dir),
        }
    }

    /// 解析执行模式
    pub fn execution_mode(&self) -> Result<ExecutionMode, ConfigError> {
        match self.execution_mode.trim().to_ascii_lowercase().as_str() {
            "simulated" | "simulation" | "demo" => {
                Ok(ExecutionMode::Simulated(self.scenario.parse::<Scenario>()?))
            }
            "real" | "browser" => Ok(ExecutionMode::Real),
            _ => Err(ConfigError::InvalidValue {
                key: "EXECUTION_MODE".to_string(),
                value: self.execution_mode.clone(),
                expected: "simulated | real".to_string(),
            }),
        }
    }

    /// 生成本次任务的不可变配置
    pub fn job_config(&self) -> Result<JobConfig, ConfigError> {
        Ok(JobConfig::new(self.username.clone(), self.password.clone())
            .with_batch_size(self.batch_size)
            .with_environment(self.environment.clone())
            .with_mode(self.execution_mode()?))
    }

    /// 数据源优先级：粘贴数据 > 本地文件 > 在线表格
    pub fn data_source(&self) -> Result<DataSource, DataError> {
        if let Some(text) = &self.upload_data {
            return Ok(DataSource::Inline(text.clone()));
        }
        if let Some(path) = &self.data_file {
            return Ok(DataSource::File(PathBuf::from(path)));
        }
        if let Some(url) = &self.sheet_url {
            return Ok(DataSource::SheetUrl(url.clone()));
        }
        Err(DataError::NoSource)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs.max(1))
    }
}
