use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::error::AppError;

/// 连接到已打开调试端口的浏览器并获取页面
///
/// 优先复用 URL 以 `reuse_prefix` 开头的已有标签页（保留人工登录的会话），
/// 否则新建空白页
pub async fn connect_to_browser_and_page(
    port: u16,
    reuse_prefix: Option<&str>,
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("🔌 正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    if let Some(prefix) = reuse_prefix {
        let pages = browser.pages().await?;
        debug!("获取到 {} 个页面", pages.len());
        for page in pages {
            if let Ok(Some(url)) = page.url().await {
                if url.starts_with(prefix) {
                    info!("✓ 复用已打开的页面: {}", url);
                    return Ok((browser, page));
                }
            }
        }
        debug!("未找到可复用的页面，将创建新页面");
    }

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        e
    })?;

    Ok((browser, page))
}
