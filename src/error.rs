use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 数据源错误
    #[error("数据错误: {0}")]
    Data(#[from] DataError),
    /// 任务编排错误
    #[error("任务错误: {0}")]
    Job(#[from] JobError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面元素不存在
    #[error("未找到页面元素: {selector}")]
    ElementNotFound { selector: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 阶段超时
    #[error("{phase} 阶段超时 ({secs} 秒)")]
    Timeout { phase: String, secs: u64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 取值无法解析
    #[error("配置项 {key} 的值 '{value}' 无效，期望: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
    /// 缺少必要配置
    #[error("缺少配置项: {key}")]
    Missing { key: String },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    FileParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 数据源错误
#[derive(Debug, Error)]
pub enum DataError {
    /// 表格链接无法识别
    #[error("无法识别的表格链接: {url}")]
    UnsupportedSheetUrl { url: String },
    /// 下载失败
    #[error("下载表格失败 ({url}): {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 表格返回非成功状态
    #[error("表格返回状态 {status} ({url})")]
    BadStatus { url: String, status: u16 },
    /// 没有提供任何数据源
    #[error("未提供数据：请设置 UPLOAD_DATA、DATA_FILE 或 SHEET_URL")]
    NoSource,
}

/// 任务编排错误
///
/// 只有前置条件类错误会以 `Err` 返回给调用方；
/// 其余变体用于描述一次运行的结局
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// 前置条件不满足（凭据缺失、数据为空）
    #[error("前置条件不满足: {0}")]
    PreconditionNotMet(String),
    /// 配置无效（批次大小等）
    #[error("配置无效: {0}")]
    InvalidConfiguration(String),
    /// 登录失败
    #[error("登录失败: {0}")]
    LoginFailed(String),
    /// 单个批次失败（不终止任务）
    #[error("批次 {batch_id} 上传失败")]
    BatchFailed { batch_id: usize },
    /// 用户请求停止
    #[error("任务已被用户停止")]
    Cancelled,
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON 解析失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建浏览器启动错误
    pub fn browser_launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_wraps_into_app_error() {
        let err: AppError = JobError::PreconditionNotMet("用户名为空".into()).into();
        assert!(matches!(err, AppError::Job(JobError::PreconditionNotMet(_))));
        assert!(err.to_string().contains("用户名为空"));
    }

    #[test]
    fn test_timeout_message() {
        let err = BrowserError::Timeout {
            phase: "AUTH".into(),
            secs: 30,
        };
        assert_eq!(err.to_string(), "AUTH 阶段超时 (30 秒)");
    }
}
