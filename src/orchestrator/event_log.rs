//! 事件日志与事件出口
//!
//! `EventLog` 只允许追加；清空只发生在任务启动或重置时。
//! 阶段执行器通过 `EventSink` 写入事件，同时向观察者广播通知

use chrono::{DateTime, Local};
use tokio::sync::broadcast;

use crate::models::{JobStatus, LogEvent, Severity};
use crate::orchestrator::stats::Stats;

/// 推送给观察者的单向通知
#[derive(Debug, Clone)]
pub enum JobNotification {
    LogAppended(LogEvent),
    StatsUpdated(Stats),
    StatusChanged(JobStatus),
}

/// 只追加的事件日志
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<LogEvent>,
    next_id: u64,
    last_timestamp: Option<DateTime<Local>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条事件并返回它的副本
    ///
    /// 时间戳不早于上一条事件；系统时钟回拨时沿用上一条的时间戳
    pub fn append(
        &mut self,
        severity: Severity,
        phase: impl Into<String>,
        message: impl Into<String>,
        has_evidence: bool,
    ) -> LogEvent {
        let now = Local::now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let event = LogEvent {
            id: self.next_id,
            timestamp,
            severity,
            message: message.into(),
            phase: phase.into(),
            has_evidence,
        };
        self.next_id += 1;
        self.events.push(event.clone());
        event
    }

    /// 清空日志（事件编号继续递增，保证跨运行唯一）
    pub(crate) fn clear(&mut self) {
        self.events.clear();
        self.last_timestamp = None;
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 按级别筛选
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &LogEvent> {
        self.events.iter().filter(move |e| e.severity == severity)
    }
}

/// 交给阶段执行器的事件出口
///
/// 写入运行中的事件日志，并广播 `LogAppended` 通知
pub struct EventSink<'a> {
    log: &'a mut EventLog,
    notifier: &'a broadcast::Sender<JobNotification>,
}

impl<'a> EventSink<'a> {
    pub fn new(log: &'a mut EventLog, notifier: &'a broadcast::Sender<JobNotification>) -> Self {
        Self { log, notifier }
    }

    pub fn emit(&mut self, severity: Severity, phase: &str, message: impl Into<String>) {
        self.push(severity, phase, message.into(), false);
    }

    /// 追加一条附带证据（如截图）的事件
    pub fn emit_with_evidence(&mut self, severity: Severity, phase: &str, message: impl Into<String>) {
        self.push(severity, phase, message.into(), true);
    }

    pub fn info(&mut self, phase: &str, message: impl Into<String>) {
        self.emit(Severity::Info, phase, message);
    }

    pub fn success(&mut self, phase: &str, message: impl Into<String>) {
        self.emit(Severity::Success, phase, message);
    }

    pub fn warning(&mut self, phase: &str, message: impl Into<String>) {
        self.emit(Severity::Warning, phase, message);
    }

    pub fn error(&mut self, phase: &str, message: impl Into<String>) {
        self.emit(Severity::Error, phase, message);
    }

    pub fn system(&mut self, phase: &str, message: impl Into<String>) {
        self.emit(Severity::System, phase, message);
    }

    fn push(&mut self, severity: Severity, phase: &str, message: String, has_evidence: bool) {
        let event = self.log.append(severity, phase, message, has_evidence);
        // 没有订阅者时发送失败，可以忽略
        let _ = self.notifier.send(JobNotification::LogAppended(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order_and_timestamps() {
        let mut log = EventLog::new();
        for i in 0..50 {
            log.append(Severity::Info, "SYSTEM", format!("事件 {}", i), false);
        }

        let events = log.events();
        assert_eq!(events.len(), 50);
        for pair in events.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        assert_eq!(events[49].message, "事件 49");
    }

    #[test]
    fn test_clear_keeps_ids_unique() {
        let mut log = EventLog::new();
        let first = log.append(Severity::Info, "AUTH", "a", false);
        log.clear();
        assert!(log.is_empty());
        let second = log.append(Severity::Info, "AUTH", "b", true);
        assert!(second.id > first.id);
        assert!(second.has_evidence);
    }

    #[test]
    fn test_sink_broadcasts_appended_events() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut log = EventLog::new();
        {
            let mut sink = EventSink::new(&mut log, &tx);
            sink.info("NAV", "打开上传页面");
            sink.emit_with_evidence(Severity::Warning, "NAV", "页面加载缓慢");
        }

        assert_eq!(log.len(), 2);
        assert_eq!(log.with_severity(Severity::Warning).count(), 1);

        match rx.try_recv().unwrap() {
            JobNotification::LogAppended(e) => assert_eq!(e.message, "打开上传页面"),
            other => panic!("unexpected notification: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            JobNotification::LogAppended(e) => assert!(e.has_evidence),
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[test]
    fn test_sink_without_subscribers() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let mut log = EventLog::new();
        let mut sink = EventSink::new(&mut log, &tx);
        sink.error("AUTH", "凭据错误");
        assert_eq!(log.len(), 1);
    }
}
