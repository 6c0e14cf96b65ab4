//! 任务编排器 - 编排层核心
//!
//! ## 职责
//!
//! 持有一次运行的全部状态（状态、统计、事件日志），按顺序驱动阶段执行器：
//!
//! ```text
//! start(前置条件) → login → navigate → batch 1 → 等待 → batch 2 → ... → 终态
//! ```
//!
//! ## 状态机
//!
//! - `Idle → Running → {Completed, Failed, Paused}`
//! - 登录失败进入 `Failed`，之后不再导航或上传
//! - 单个批次失败只计入 `error_count`，继续下一批
//! - 取消只在每个批次开始前检查，已开始的阶段总会执行完毕
//! - 再次启动会整体替换上一次运行的状态和日志
//!
//! ## 并发模型
//!
//! `run` 需要 `&mut self`，同一个编排器同时只有一个运行。
//! 观察者通过 `subscribe()` 获得单向通知，不直接读写状态

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::executors::{phase, PhaseExecutor};
use crate::models::{Batch, JobConfig, JobStatus, Record, Severity};
use crate::orchestrator::batcher;
use crate::orchestrator::event_log::{EventLog, EventSink, JobNotification};
use crate::orchestrator::stats::Stats;

/// 批次之间的默认间隔，避免压垮目标系统
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(1000);

const NOTIFICATION_CAPACITY: usize = 1024;

/// 一次运行的完整状态
#[derive(Debug, Clone)]
pub struct JobState {
    pub status: JobStatus,
    pub stats: Stats,
    pub log: EventLog,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            status: JobStatus::Idle,
            stats: Stats::default(),
            log: EventLog::new(),
        }
    }
}

/// 一次运行的结果摘要
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub status: JobStatus,
    pub stats: Stats,
    /// 本次运行中发生的问题：`LoginFailed` / `BatchFailed` / `Cancelled`
    pub issues: Vec<JobError>,
}

impl RunSummary {
    pub fn failed_batches(&self) -> Vec<usize> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                JobError::BatchFailed { batch_id } => Some(*batch_id),
                _ => None,
            })
            .collect()
    }
}

/// 任务编排器
pub struct JobOrchestrator {
    executor: Arc<dyn PhaseExecutor>,
    inter_batch_delay: Duration,
    state: JobState,
    notifier: broadcast::Sender<JobNotification>,
}

impl JobOrchestrator {
    /// 创建编排器，执行器在此注入，之后不再切换
    pub fn new(executor: Arc<dyn PhaseExecutor>) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            executor,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
            state: JobState::default(),
            notifier,
        }
    }

    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    /// 订阅日志 / 统计 / 状态通知
    pub fn subscribe(&self) -> broadcast::Receiver<JobNotification> {
        self.notifier.subscribe()
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status(&self) -> JobStatus {
        self.state.status
    }

    pub fn stats(&self) -> Stats {
        self.state.stats
    }

    pub fn log(&self) -> &EventLog {
        &self.state.log
    }

    /// 重置为 `Idle`：统计归零，日志清空
    pub fn reset(&mut self) {
        self.state.log.clear();
        self.state.stats = Stats::default();
        self.set_status(JobStatus::Idle);
        self.publish_stats();
    }

    /// 运行一次完整任务
    ///
    /// 只有前置条件错误会以 `Err` 返回，此时状态不发生任何变化。
    /// 登录失败、批次失败、取消都体现在返回的 `RunSummary` 和事件日志中
    pub async fn run(
        &mut self,
        config: &JobConfig,
        records: &[Record],
        cancel: CancellationToken,
    ) -> Result<RunSummary, JobError> {
        let batches = self.start(config, records)?;
        let mut issues = Vec::new();

        // ========== 登录 ==========
        let login_result = {
            let mut sink = EventSink::new(&mut self.state.log, &self.notifier);
            self.executor.login(&config.credentials, &mut sink).await
        };

        let login_error = match login_result {
            Ok(true) => None,
            Ok(false) => Some("门户拒绝了提供的凭据".to_string()),
            Err(e) => Some(format!("{:#}", e)),
        };
        if let Some(reason) = login_error {
            warn!("❌ 登录失败: {}", reason);
            self.emit(Severity::Error, phase::AUTH, format!("登录失败: {}", reason));
            issues.push(JobError::LoginFailed(reason));
            self.set_status(JobStatus::Failed);
            return Ok(self.summary(issues));
        }

        // ========== 导航 ==========
        if cancel.is_cancelled() {
            return Ok(self.pause(batches.len(), issues));
        }

        let nav_result = {
            let mut sink = EventSink::new(&mut self.state.log, &self.notifier);
            self.executor.navigate(&mut sink).await
        };
        if let Err(e) = nav_result {
            warn!("⚠️ 导航异常，继续执行: {:#}", e);
            self.emit(
                Severity::Warning,
                phase::NAV,
                format!("导航出现异常，继续尝试上传: {:#}", e),
            );
        }

        // ========== 批次循环 ==========
        let total_batches = batches.len();
        for (index, batch) in batches.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(self.pause(total_batches - index, issues));
            }

            info!(
                "📦 开始处理第 {}/{} 批 ({} 条记录)",
                batch.id,
                total_batches,
                batch.len()
            );

            let success = self.upload(batch).await;
            if !self.state.stats.record_batch(batch.len(), success) {
                self.emit(
                    Severity::Warning,
                    phase::SYSTEM,
                    format!("批次 {} 的记录数超出剩余总量，统计已截断", batch.id),
                );
            }
            if !success {
                issues.push(JobError::BatchFailed { batch_id: batch.id });
            }
            self.publish_stats();

            debug!(
                "第 {} 批完成: {:?}，当前进度 {:.1}%",
                batch.id,
                success,
                self.state.stats.percent_complete()
            );

            if index + 1 < total_batches {
                self.idle_between_batches(&cancel).await;
            }
        }

        // ========== 完成 ==========
        let stats = self.state.stats;
        self.emit(
            Severity::Success,
            phase::SYSTEM,
            format!(
                "任务完成: 成功 {} 条，失败 {} 条，共 {} 个批次",
                stats.success_count, stats.error_count, stats.batches_completed
            ),
        );
        self.set_status(JobStatus::Completed);
        Ok(self.summary(issues))
    }

    /// 检查前置条件并初始化本次运行
    fn start(&mut self, config: &JobConfig, records: &[Record]) -> Result<Vec<Batch>, JobError> {
        if config.credentials.username.trim().is_empty() {
            return Err(JobError::PreconditionNotMet("用户名不能为空".to_string()));
        }
        if config.credentials.password().is_empty() {
            return Err(JobError::PreconditionNotMet("密码不能为空".to_string()));
        }
        if records.is_empty() {
            return Err(JobError::PreconditionNotMet("没有可上传的数据".to_string()));
        }
        let batches = batcher::split(records, config.batch_size)?;

        self.state.log.clear();
        self.state.stats = Stats::initialized(records.len(), batches.len());
        self.set_status(JobStatus::Running);
        self.publish_stats();
        self.emit(
            Severity::System,
            phase::SYSTEM,
            format!(
                "任务启动: {} 条记录，{} 个批次 (每批 {} 条)，环境 {}",
                records.len(),
                batches.len(),
                config.batch_size,
                config.environment
            ),
        );

        Ok(batches)
    }

    /// 上传单个批次，执行器的错误视为批次失败
    async fn upload(&mut self, batch: &Batch) -> bool {
        let result = {
            let mut sink = EventSink::new(&mut self.state.log, &self.notifier);
            self.executor.upload_batch(batch, &mut sink).await
        };

        let tag = batch.phase_tag();
        match result {
            Ok(true) => true,
            Ok(false) => {
                self.emit(
                    Severity::Error,
                    &tag,
                    format!("批次 {} 上传失败 ({} 条记录)", batch.id, batch.len()),
                );
                false
            }
            Err(e) => {
                self.emit(
                    Severity::Error,
                    &tag,
                    format!("批次 {} 上传失败 ({} 条记录): {:#}", batch.id, batch.len(), e),
                );
                false
            }
        }
    }

    /// 批次间等待；收到停止请求时提前结束等待
    async fn idle_between_batches(&self, cancel: &CancellationToken) {
        if self.inter_batch_delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = sleep(self.inter_batch_delay) => {}
            _ = cancel.cancelled() => {
                debug!("等待期间收到停止请求");
            }
        }
    }

    fn pause(&mut self, remaining: usize, mut issues: Vec<JobError>) -> RunSummary {
        warn!("⏸️ 任务已停止，剩余 {} 个批次未处理", remaining);
        self.emit(
            Severity::Warning,
            phase::SYSTEM,
            format!("收到停止请求，任务已暂停，剩余 {} 个批次未处理", remaining),
        );
        issues.push(JobError::Cancelled);
        self.set_status(JobStatus::Paused);
        self.summary(issues)
    }

    fn summary(&self, issues: Vec<JobError>) -> RunSummary {
        RunSummary {
            status: self.state.status,
            stats: self.state.stats,
            issues,
        }
    }

    fn emit(&mut self, severity: Severity, phase: &str, message: String) {
        EventSink::new(&mut self.state.log, &self.notifier).emit(severity, phase, message);
    }

    fn set_status(&mut self, status: JobStatus) {
        self.state.status = status;
        let _ = self.notifier.send(JobNotification::StatusChanged(status));
    }

    fn publish_stats(&self) {
        let _ = self
            .notifier
            .send(JobNotification::StatsUpdated(self.state.stats));
    }
}
