//! 结构化日志事件

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// 事件级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    System,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
            Severity::System => "SYSTEM",
        };
        f.write_str(s)
    }
}

/// 日志事件，追加后不可修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub id: u64,
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
    /// 阶段标签，例如 `AUTH` / `NAV` / `BATCH-3`
    pub phase: String,
    /// 是否附带截图等证据
    pub has_evidence: bool,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<7} [{}] {}{}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.severity,
            self.phase,
            self.message,
            if self.has_evidence { " 📷" } else { "" }
        )
    }
}
