//! 阶段执行器 - 业务能力层
//!
//! 描述"我能做什么"：登录、导航、上传单个批次。
//! 编排层只依赖 `PhaseExecutor` trait，不关心具体是模拟还是真实浏览器。
//!
//! 约定：
//! - 事件只通过传入的 `EventSink` 写出
//! - 登录 / 上传返回 `Ok(false)` 表示业务失败，`Err` 表示执行过程出错，
//!   两者都由编排层转换为状态和日志，不会继续向上抛出
//! - 登录失败时不要自行写 Error 事件，由编排层统一记录

pub mod browser_executor;
pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Batch, Credentials};
use crate::orchestrator::EventSink;

pub use browser_executor::BrowserExecutor;
pub use simulated::{SimulatedDelays, SimulatedExecutor};

/// 阶段标签
pub mod phase {
    pub const AUTH: &str = "AUTH";
    pub const NAV: &str = "NAV";
    pub const SYSTEM: &str = "SYSTEM";
}

/// 阶段执行器
#[async_trait]
pub trait PhaseExecutor: Send + Sync {
    /// 登录门户
    async fn login(&self, credentials: &Credentials, sink: &mut EventSink<'_>) -> Result<bool>;

    /// 进入上传页面
    async fn navigate(&self, sink: &mut EventSink<'_>) -> Result<()>;

    /// 上传单个批次
    async fn upload_batch(&self, batch: &Batch, sink: &mut EventSink<'_>) -> Result<bool>;
}
