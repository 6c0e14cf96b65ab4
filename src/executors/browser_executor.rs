//! 真实浏览器执行器
//!
//! 通过 chromiumoxide 远程控制浏览器：
//! - 登录：打开登录页，填写凭据并提交，等待已登录标记出现
//! - 导航：打开批量上传页面
//! - 上传：在页面内用 `fetch` 把批次数据 POST 到上传接口（沿用页面的登录会话）
//!
//! 每个阶段都有超时限制，超时视为该阶段失败

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Browser;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{phase, PhaseExecutor};
use crate::browser;
use crate::config::{Config, PortalSelectors};
use crate::error::BrowserError;
use crate::infrastructure::JsExecutor;
use crate::models::{Batch, Credentials, Severity};
use crate::orchestrator::EventSink;

/// 上传接口的响应
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    ok: bool,
    status: Option<u16>,
    body: Option<JsonValue>,
    error: Option<String>,
}

impl UploadResponse {
    /// HTTP 成功且响应体没有声明失败
    fn is_success(&self) -> bool {
        if self.error.is_some() || !self.ok {
            return false;
        }
        match &self.body {
            Some(body) => {
                let explicit_failure =
                    body.get("success").and_then(JsonValue::as_bool) == Some(false);
                let bad_code = body
                    .get("code")
                    .and_then(JsonValue::as_u64)
                    .is_some_and(|code| code != 0 && code != 200);
                !explicit_failure && !bad_code
            }
            None => true,
        }
    }

    fn describe(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        let message = self
            .body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(JsonValue::as_str)
            .unwrap_or("");
        format!("HTTP {} {}", self.status.unwrap_or(0), message)
            .trim_end()
            .to_string()
    }
}

/// 构建上传脚本
fn build_upload_script(endpoint: &str, environment: &str, batch: &Batch) -> Result<String> {
    let payload = json!({
        "environment": environment,
        "batch": batch.id,
        "count": batch.len(),
        "records": batch.to_json(),
    });

    Ok(format!(
        r#"
        (async () => {{
            try {{
                const response = await fetch({}, {{
                    method: 'POST',
                    headers: {{
                        'Content-Type': 'application/json',
                        'Accept': 'application/json, text/plain, */*',
                    }},
                    credentials: 'include',
                    body: JSON.stringify({})
                }});
                const text = await response.text();
                let body = null;
                try {{ body = JSON.parse(text); }} catch (_) {{}}
                return {{ ok: response.ok, status: response.status, body }};
            }} catch (error) {{
                return {{ error: error.message }};
            }}
        }})()
        "#,
        serde_json::to_string(endpoint)?,
        serde_json::to_string(&payload)?
    ))
}

/// 真实浏览器执行器
pub struct BrowserExecutor {
    _browser: Browser,
    executor: JsExecutor,
    environment: String,
    login_url: String,
    upload_page_url: String,
    upload_endpoint: String,
    selectors: PortalSelectors,
    phase_timeout: Duration,
    screenshot_dir: Option<PathBuf>,
}

impl BrowserExecutor {
    /// 按配置连接或启动浏览器
    pub async fn connect(config: &Config) -> Result<Self> {
        let (browser, page) = if config.headless {
            browser::launch_headless_browser(config.chrome_executable.as_deref()).await?
        } else {
            browser::connect_to_browser_and_page(
                config.browser_debug_port,
                Some(&config.upload_page_url),
            )
            .await?
        };

        Ok(Self {
            _browser: browser,
            executor: JsExecutor::new(page),
            environment: config.environment.clone(),
            login_url: config.login_url.clone(),
            upload_page_url: config.upload_page_url.clone(),
            upload_endpoint: config.upload_endpoint.clone(),
            selectors: config.selectors.clone(),
            phase_timeout: config.phase_timeout(),
            screenshot_dir: config.screenshot_dir.as_ref().map(PathBuf::from),
        })
    }

    /// 给阶段加上超时
    async fn bounded<T>(&self, tag: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout(self.phase_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout {
                phase: tag.to_string(),
                secs: self.phase_timeout.as_secs(),
            }
            .into()),
        }
    }

    /// 保存截图作为证据，未配置目录或截图失败时返回 false
    async fn capture_evidence(&self, tag: &str) -> bool {
        let Some(dir) = &self.screenshot_dir else {
            return false;
        };
        let file = dir.join(format!(
            "{}-{}.png",
            tag,
            chrono::Local::now().format("%Y%m%d-%H%M%S%.3f")
        ));
        match self.executor.save_screenshot(&file).await {
            Ok(()) => {
                debug!("截图已保存: {}", file.display());
                true
            }
            Err(e) => {
                warn!("[{}] 截图失败: {}", tag, e);
                false
            }
        }
    }

    async fn emit_evidence(
        &self,
        sink: &mut EventSink<'_>,
        severity: Severity,
        tag: &str,
        message: String,
    ) {
        if self.capture_evidence(tag).await {
            sink.emit_with_evidence(severity, tag, message);
        } else {
            sink.emit(severity, tag, message);
        }
    }

    async fn submit_credentials(&self, credentials: &Credentials) -> Result<bool> {
        self.executor.goto(&self.login_url).await?;
        self.executor
            .wait_for_selector(&self.selectors.username_input, self.phase_timeout / 2)
            .await?;
        self.executor
            .fill(&self.selectors.username_input, &credentials.username)
            .await?;
        self.executor
            .fill(&self.selectors.password_input, credentials.password())
            .await?;
        self.executor.click(&self.selectors.submit_button).await?;

        let logged_in = self
            .executor
            .wait_for_selector(&self.selectors.logged_in_marker, self.phase_timeout / 2)
            .await
            .is_ok();
        Ok(logged_in)
    }
}

#[async_trait]
impl PhaseExecutor for BrowserExecutor {
    async fn login(&self, credentials: &Credentials, sink: &mut EventSink<'_>) -> Result<bool> {
        info!("🔐 正在登录门户: {}", self.login_url);
        sink.info(
            phase::AUTH,
            format!("正在打开 {} 环境的登录页面...", self.environment),
        );

        let logged_in = self
            .bounded(phase::AUTH, self.submit_credentials(credentials))
            .await?;

        if logged_in {
            sink.success(phase::AUTH, format!("已以 {} 身份登录", credentials.username));
        } else {
            let url = self.executor.current_url().await.ok().flatten().unwrap_or_default();
            self.emit_evidence(
                sink,
                Severity::Warning,
                phase::AUTH,
                format!("提交凭据后未检测到登录状态，当前页面: {}", url),
            )
            .await;
        }
        Ok(logged_in)
    }

    async fn navigate(&self, sink: &mut EventSink<'_>) -> Result<()> {
        sink.info(phase::NAV, "正在进入批量上传页面...");
        self.bounded(phase::NAV, self.executor.goto(&self.upload_page_url))
            .await?;
        self.emit_evidence(
            sink,
            Severity::Info,
            phase::NAV,
            format!("已到达上传页面: {}", self.upload_page_url),
        )
        .await;
        Ok(())
    }

    async fn upload_batch(&self, batch: &Batch, sink: &mut EventSink<'_>) -> Result<bool> {
        let tag = batch.phase_tag();
        sink.info(
            &tag,
            format!("正在提交批次 {} ({} 条记录)...", batch.id, batch.len()),
        );

        let script = build_upload_script(&self.upload_endpoint, &self.environment, batch)?;
        let response: UploadResponse = self
            .bounded(&tag, self.executor.eval_as(script))
            .await?;

        if response.is_success() {
            sink.success(&tag, format!("批次 {} 已被门户接收", batch.id));
            Ok(true)
        } else {
            warn!("[{}] 上传被拒绝: {:?}", tag, response);
            self.emit_evidence(
                sink,
                Severity::Warning,
                &tag,
                format!("门户拒绝了批次 {}: {}", batch.id, response.describe()),
            )
            .await;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, Record};

    fn response(value: JsonValue) -> UploadResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_upload_response_success_rules() {
        assert!(response(json!({"ok": true, "status": 200, "body": null})).is_success());
        assert!(response(json!({"ok": true, "status": 200, "body": {"code": 200}})).is_success());
        assert!(!response(json!({"ok": false, "status": 500})).is_success());
        assert!(!response(json!({"ok": true, "status": 200, "body": {"success": false}})).is_success());
        assert!(!response(json!({"ok": true, "status": 200, "body": {"code": 4001}})).is_success());
        assert!(!response(json!({"error": "Failed to fetch"})).is_success());
    }

    #[test]
    fn test_describe() {
        let r = response(json!({"ok": false, "status": 422, "body": {"message": "bad sku"}}));
        assert_eq!(r.describe(), "HTTP 422 bad sku");
        assert_eq!(response(json!({"error": "offline"})).describe(), "offline");
    }

    #[test]
    fn test_build_upload_script_embeds_payload() {
        let batch = Batch {
            id: 4,
            records: vec![Record::new(
                vec![("name".into(), FieldValue::Text("O'Brien \"lamp\"".into()))],
                1,
            )],
        };
        let script = build_upload_script("/api/upload", "staging", &batch).unwrap();
        assert!(script.contains(r#"fetch("/api/upload""#));
        assert!(script.contains(r#""batch":4"#));
        assert!(script.contains(r#"O'Brien \"lamp\""#));
        assert!(script.contains("credentials: 'include'"));
    }
}
