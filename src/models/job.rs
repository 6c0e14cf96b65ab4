//! 任务配置与状态类型

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Paused,
}

impl JobStatus {
    /// 是否为本次运行的终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Paused
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Idle => "IDLE",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Paused => "PAUSED",
        };
        f.write_str(s)
    }
}

/// 模拟模式下的故障注入场景
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scenario {
    /// 全部成功
    #[default]
    Success,
    /// 登录失败
    LoginFailure,
    /// 指定批次（从 1 开始）上传失败
    FailBatches(BTreeSet<usize>),
    /// 每第三个批次上传失败
    Flaky,
}

impl Scenario {
    /// 该场景下某个批次是否应当失败
    pub fn batch_fails(&self, batch_id: usize) -> bool {
        match self {
            Scenario::FailBatches(ids) => ids.contains(&batch_id),
            Scenario::Flaky => batch_id % 3 == 0,
            Scenario::Success | Scenario::LoginFailure => false,
        }
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    /// 支持 `success` / `login_fail` / `flaky` / `fail_batches:2,4`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        let invalid = || ConfigError::InvalidValue {
            key: "SCENARIO".to_string(),
            value: s.to_string(),
            expected: "success | login_fail | flaky | fail_batches:<ids>".to_string(),
        };

        match value.as_str() {
            "" | "success" => Ok(Scenario::Success),
            "login_fail" | "login_failure" => Ok(Scenario::LoginFailure),
            "flaky" => Ok(Scenario::Flaky),
            other => {
                let ids = other.strip_prefix("fail_batches:").ok_or_else(invalid)?;
                let parsed = ids
                    .split(',')
                    .filter(|part| !part.trim().is_empty())
                    .map(|part| part.trim().parse::<usize>())
                    .collect::<Result<BTreeSet<_>, _>>()
                    .map_err(|_| invalid())?;
                Ok(Scenario::FailBatches(parsed))
            }
        }
    }
}

/// 执行模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// 进程内模拟
    Simulated(Scenario),
    /// 远程控制真实浏览器
    Real,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Simulated(Scenario::Success)
    }
}

/// 登录凭据
///
/// `Debug` 不输出密码
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 单次任务的配置，运行期间不可变
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub credentials: Credentials,
    pub batch_size: usize,
    /// 目标环境标签，例如 `production` / `staging`
    pub environment: String,
    pub mode: ExecutionMode,
}

impl JobConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            batch_size: DEFAULT_BATCH_SIZE,
            environment: "production".to_string(),
            mode: ExecutionMode::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenarios() {
        assert_eq!("success".parse::<Scenario>().unwrap(), Scenario::Success);
        assert_eq!(
            "LOGIN_FAIL".parse::<Scenario>().unwrap(),
            Scenario::LoginFailure
        );
        assert_eq!("flaky".parse::<Scenario>().unwrap(), Scenario::Flaky);
        assert_eq!(
            "fail_batches:2, 4".parse::<Scenario>().unwrap(),
            Scenario::FailBatches(BTreeSet::from([2, 4]))
        );
        assert!("fail_batches:x".parse::<Scenario>().is_err());
        assert!("explode".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_batch_fails() {
        assert!(Scenario::Flaky.batch_fails(3));
        assert!(!Scenario::Flaky.batch_fails(4));
        assert!(!Scenario::Success.batch_fails(1));
        assert!(Scenario::FailBatches(BTreeSet::from([1])).batch_fails(1));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let config = JobConfig::new("alice", "hunter2");
        let debug = format!("{:?}", config);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Idle.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Paused.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
    }
}
