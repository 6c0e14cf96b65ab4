//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责分批和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batcher` - 分批器
//! - 按批次大小切分记录，保持原有顺序
//!
//! ### `stats` - 统计聚合
//! - 根据每个批次的结果累加统计，供观察者读取
//!
//! ### `event_log` - 事件日志
//! - 只追加的结构化事件序列
//! - `EventSink` 是阶段执行器写事件的唯一入口
//!
//! ### `job_orchestrator` - 任务编排器
//! - 状态机：`Idle → Running → {Completed, Failed, Paused}`
//! - 顺序驱动 login → navigate → 各批次 upload
//! - 响应协作式取消
//!
//! ## 层次关系
//!
//! ```text
//! app (配置、数据源、执行器选择)
//!     ↓
//! orchestrator::JobOrchestrator (处理 Vec<Batch>)
//!     ↓
//! executors::PhaseExecutor (登录 / 导航 / 上传单批)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```

pub mod batcher;
pub mod event_log;
pub mod job_orchestrator;
pub mod stats;

// 重新导出主要类型
pub use event_log::{EventLog, EventSink, JobNotification};
pub use job_orchestrator::{JobOrchestrator, JobState, RunSummary, DEFAULT_INTER_BATCH_DELAY};
pub use stats::Stats;
