//! # Catalog Bulk Upload
//!
//! 一个把表格数据分批上传到目录门户的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval / 导航 / 填写 / 截图能力
//! - `browser/` - 连接已打开的浏览器或启动无头浏览器
//!
//! ### ② 业务能力层（Executors）
//! - `executors/` - 描述"我能做什么"：登录、导航、上传单个批次
//! - `SimulatedExecutor` - 按场景模拟门户行为
//! - `BrowserExecutor` - 远程控制真实浏览器
//!
//! ### ③ 数据层（Models）
//! - `models/` - 记录、批次、任务配置、日志事件
//! - `models/loaders` - 粘贴文本 / 文件 / 在线表格 → 记录
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/job_orchestrator` - 状态机，顺序驱动各阶段并响应取消
//! - `orchestrator/batcher` / `stats` / `event_log` - 分批、统计、事件日志
//!
//! 观察者（`observer`）只订阅通知，不修改状态。
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod executors;
pub mod infrastructure;
pub mod models;
pub mod observer;
pub mod orchestrator;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::{Config, DataSource};
pub use error::{AppError, JobError};
pub use executors::{PhaseExecutor, SimulatedExecutor};
pub use models::{Batch, JobConfig, JobStatus, Record};
pub use orchestrator::{JobNotification, JobOrchestrator, RunSummary, Stats};
