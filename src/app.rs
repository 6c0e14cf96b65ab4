//! 应用入口 - 组装层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头、按执行模式构造阶段执行器
//! 2. **数据加载**：从粘贴数据 / 文件 / 在线表格解析记录
//! 3. **任务运行**：交给 `JobOrchestrator`，同时挂上观察者和 Ctrl-C 停止
//! 4. **全局统计**：输出最终结果
//!
//! 执行模式只在这里决定一次，编排器只认识 `PhaseExecutor`

use anyhow::Result;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, DataSource};
use crate::executors::{BrowserExecutor, PhaseExecutor, SimulatedExecutor};
use crate::models::{self, ExecutionMode, JobConfig, Record};
use crate::observer::{spawn_observer, RunLogWriter};
use crate::orchestrator::{JobOrchestrator, RunSummary};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    job_config: JobConfig,
    executor: Arc<dyn PhaseExecutor>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        logging::log_startup(&config);

        let job_config = config.job_config()?;
        let executor = build_executor(&config, &job_config).await?;

        Ok(Self {
            config,
            job_config,
            executor,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let records = self.load_records().await?;
        if records.is_empty() {
            warn!("⚠️ 没有解析到任何有效记录");
        }
        logging::log_records_loaded(records.len(), self.job_config.batch_size);

        let mut orchestrator = JobOrchestrator::new(self.executor.clone())
            .with_inter_batch_delay(self.config.inter_batch_delay());

        let observer = spawn_observer(
            orchestrator.subscribe(),
            Some(RunLogWriter::new(&self.config.output_log_file)),
        );

        let cancel = CancellationToken::new();
        let stop_on_ctrl_c = spawn_ctrl_c_listener(cancel.clone());

        let outcome = orchestrator.run(&self.job_config, &records, cancel).await;
        stop_on_ctrl_c.abort();

        // 关闭通知通道，等待观察者写完剩余事件
        drop(orchestrator);
        let _ = observer.await;

        let summary = outcome?;
        logging::print_final_stats(&summary, &self.config.output_log_file);
        Ok(summary)
    }

    /// 加载记录
    async fn load_records(&self) -> Result<Vec<Record>> {
        let source = self.config.data_source()?;
        match &source {
            DataSource::Inline(text) => info!(
                "\n📋 使用粘贴的数据: {}",
                logging::truncate_text(text.lines().next().unwrap_or(""), 60)
            ),
            DataSource::File(path) => info!("\n📁 读取数据文件: {}", path.display()),
            DataSource::SheetUrl(url) => {
                info!("\n🔗 读取在线表格: {}", logging::truncate_text(url, 80))
            }
        }
        models::load_records(&source, self.config.phase_timeout()).await
    }
}

/// 按执行模式构造阶段执行器
async fn build_executor(config: &Config, job_config: &JobConfig) -> Result<Arc<dyn PhaseExecutor>> {
    match &job_config.mode {
        ExecutionMode::Simulated(scenario) => {
            info!("🧪 使用模拟执行器，场景: {:?}", scenario);
            Ok(Arc::new(SimulatedExecutor::new(
                scenario.clone(),
                job_config.environment.clone(),
            )))
        }
        ExecutionMode::Real => {
            info!("🌐 使用真实浏览器执行器");
            Ok(Arc::new(BrowserExecutor::connect(config).await?))
        }
    }
}

/// Ctrl-C 处理
///
/// 第一次请求协作式停止，第二次直接退出进程（用于卡在某个阶段的情况）
fn spawn_ctrl_c_listener(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    let signals = stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
    });
    tokio::spawn(async move {
        if watch_stop_signals(Box::pin(signals), cancel).await == StopOutcome::ForceExit {
            error!("⛔ 再次收到停止请求，立即退出");
            std::process::exit(130);
        }
    })
}

/// 停止信号的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopOutcome {
    /// 信号源结束
    SignalsClosed,
    /// 收到第二次停止请求
    ForceExit,
}

/// 第一个信号取消任务，第二个信号要求强制退出
async fn watch_stop_signals<S>(mut signals: S, cancel: CancellationToken) -> StopOutcome
where
    S: Stream<Item = ()> + Unpin,
{
    if signals.next().await.is_none() {
        return StopOutcome::SignalsClosed;
    }
    warn!("⏹️ 收到停止请求，将在当前批次完成后暂停（再按一次 Ctrl-C 立即退出）");
    cancel.cancel();

    match signals.next().await {
        Some(()) => StopOutcome::ForceExit,
        None => StopOutcome::SignalsClosed,
    }
}
