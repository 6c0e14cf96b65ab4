//! 模拟执行器
//!
//! 不访问网络，按固定延迟和故障场景模拟门户的行为，用于演示与测试

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::{phase, PhaseExecutor};
use crate::models::{Batch, Credentials, Scenario, Severity};
use crate::orchestrator::EventSink;

/// 各阶段的模拟耗时
#[derive(Debug, Clone, Copy)]
pub struct SimulatedDelays {
    pub login: Duration,
    pub navigate: Duration,
    pub upload: Duration,
}

impl Default for SimulatedDelays {
    fn default() -> Self {
        Self {
            login: Duration::from_millis(1500),
            navigate: Duration::from_millis(1000),
            upload: Duration::from_millis(2000),
        }
    }
}

impl SimulatedDelays {
    /// 不等待，测试使用
    pub fn none() -> Self {
        Self {
            login: Duration::ZERO,
            navigate: Duration::ZERO,
            upload: Duration::ZERO,
        }
    }
}

/// 模拟执行器
pub struct SimulatedExecutor {
    scenario: Scenario,
    environment: String,
    delays: SimulatedDelays,
}

impl SimulatedExecutor {
    pub fn new(scenario: Scenario, environment: impl Into<String>) -> Self {
        Self {
            scenario,
            environment: environment.into(),
            delays: SimulatedDelays::default(),
        }
    }

    pub fn with_delays(mut self, delays: SimulatedDelays) -> Self {
        self.delays = delays;
        self
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

#[async_trait]
impl PhaseExecutor for SimulatedExecutor {
    async fn login(&self, credentials: &Credentials, sink: &mut EventSink<'_>) -> Result<bool> {
        debug!("模拟登录: 用户 {} / 环境 {}", credentials.username, self.environment);

        sink.info(
            phase::AUTH,
            format!("正在打开 {} 环境的登录页面...", self.environment),
        );
        pause(self.delays.login / 2).await;
        sink.emit_with_evidence(Severity::Info, phase::AUTH, "登录页面已加载");
        sink.info(
            phase::AUTH,
            format!("正在以 {} 身份提交凭据...", credentials.username),
        );
        pause(self.delays.login / 2).await;

        if self.scenario == Scenario::LoginFailure {
            return Ok(false);
        }

        sink.success(phase::AUTH, "登录成功");
        Ok(true)
    }

    async fn navigate(&self, sink: &mut EventSink<'_>) -> Result<()> {
        sink.info(phase::NAV, "正在进入批量上传页面...");
        pause(self.delays.navigate).await;
        sink.emit_with_evidence(Severity::Info, phase::NAV, "已到达批量上传页面");
        Ok(())
    }

    async fn upload_batch(&self, batch: &Batch, sink: &mut EventSink<'_>) -> Result<bool> {
        let tag = batch.phase_tag();
        sink.info(
            &tag,
            format!("正在上传批次 {} ({} 条记录)...", batch.id, batch.len()),
        );
        pause(self.delays.upload).await;

        if self.scenario.batch_fails(batch.id) {
            sink.emit_with_evidence(Severity::Warning, &tag, "门户返回错误页面 (HTTP 500)");
            return Ok(false);
        }

        sink.success(&tag, format!("批次 {} 上传成功", batch.id));
        Ok(true)
    }
}
