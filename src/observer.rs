//! 终端观察者
//!
//! 订阅编排器的通知，把事件镜像到 tracing 和运行日志文件，并输出进度。
//! 只读取通知，不修改任务状态

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::{LogEvent, Severity};
use crate::orchestrator::{JobNotification, Stats};

/// 运行日志写入
///
/// 每条事件追加一行到日志文件
pub struct RunLogWriter {
    path: PathBuf,
}

impl RunLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, event: &LogEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", event)?;
        Ok(())
    }
}

/// 启动观察者任务，发送端全部关闭后结束
pub fn spawn_observer(
    mut rx: broadcast::Receiver<JobNotification>,
    writer: Option<RunLogWriter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => handle(&notification, writer.as_ref()),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ 观察者处理过慢，跳过了 {} 条通知", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("观察者退出");
    })
}

fn handle(notification: &JobNotification, writer: Option<&RunLogWriter>) {
    match notification {
        JobNotification::LogAppended(event) => {
            mirror_event(event);
            if let Some(writer) = writer {
                if let Err(e) = writer.append(event) {
                    warn!("写入运行日志失败: {}", e);
                }
            }
        }
        JobNotification::StatsUpdated(stats) => log_progress(stats),
        JobNotification::StatusChanged(status) => info!("🔄 任务状态: {}", status),
    }
}

fn mirror_event(event: &LogEvent) {
    let evidence = if event.has_evidence { " 📷" } else { "" };
    match event.severity {
        Severity::Info => info!("[{}] {}{}", event.phase, event.message, evidence),
        Severity::System => info!("[{}] ⚙️ {}{}", event.phase, event.message, evidence),
        Severity::Success => info!("[{}] ✅ {}{}", event.phase, event.message, evidence),
        Severity::Warning => warn!("[{}] ⚠️ {}{}", event.phase, event.message, evidence),
        Severity::Error => error!("[{}] ❌ {}{}", event.phase, event.message, evidence),
    }
}

fn log_progress(stats: &Stats) {
    if stats.batches_completed == 0 {
        return;
    }
    info!(
        "📊 进度: {}/{} 条 ({:.1}%) | 批次 {}/{} | 成功 {} | 失败 {}",
        stats.processed_records,
        stats.total_records,
        stats.percent_complete(),
        stats.batches_completed,
        stats.batches_total,
        stats.success_count,
        stats.error_count
    );
}
