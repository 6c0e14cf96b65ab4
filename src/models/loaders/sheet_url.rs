//! 在线表格链接处理
//!
//! 把表格的编辑/分享链接转换为 CSV 导出链接并下载

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DataError;

static SHEET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("表格 id 正则无效"));
static GID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#?&]gid=(\d+)").expect("gid 正则无效"));

/// 把表格链接转换为 CSV 导出链接
///
/// - `.../spreadsheets/d/<id>/edit#gid=<gid>` → `.../spreadsheets/d/<id>/export?format=csv&gid=<gid>`
/// - 已经是 CSV 导出/发布链接的原样返回
pub fn to_csv_export_url(url: &str) -> Result<String, DataError> {
    let url = url.trim();
    if url.contains("format=csv") || url.contains("output=csv") {
        return Ok(url.to_string());
    }

    let unsupported = || DataError::UnsupportedSheetUrl {
        url: url.to_string(),
    };

    let sheet_id = SHEET_ID_RE
        .captures(url)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .ok_or_else(unsupported)?;
    let gid = GID_RE
        .captures(url)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .unwrap_or("0");

    Ok(format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
        sheet_id, gid
    ))
}

/// 下载表格的 CSV 文本
pub async fn fetch_sheet_csv(url: &str, timeout: Duration) -> Result<String, DataError> {
    let export_url = to_csv_export_url(url)?;
    info!("📥 正在下载表格数据...");
    debug!("导出链接: {}", export_url);

    let fetch_failed = |source| DataError::FetchFailed {
        url: export_url.clone(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(fetch_failed)?;
    let response = client
        .get(&export_url)
        .send()
        .await
        .map_err(fetch_failed)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DataError::BadStatus {
            url: export_url.clone(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(fetch_failed)?;
    debug!("表格数据长度: {} 字节", body.len());
    Ok(body)
}
