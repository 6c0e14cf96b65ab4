//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::RunSummary;

/// 初始化 tracing 输出
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 `debug` / `info`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量上传日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量上传模式");
    info!("🌐 目标环境: {}", config.environment);
    info!("⚙️ 执行模式: {}", config.execution_mode);
    info!("📦 每批记录数: {}", config.batch_size);
    info!("{}", "=".repeat(60));
}

/// 记录数据加载信息
///
/// # 参数
/// - `total`: 记录总数
/// - `batch_size`: 每批记录数
pub fn log_records_loaded(total: usize, batch_size: usize) {
    info!("✓ 共解析出 {} 条记录", total);
    if batch_size > 0 {
        info!(
            "📋 将以每批 {} 条的方式上传，共 {} 批",
            batch_size,
            total.div_ceil(batch_size)
        );
    }
    info!("💡 按 Ctrl-C 可在当前批次完成后停止\n");
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str) {
    let stats = &summary.stats;
    info!("\n{}", "=".repeat(60));
    info!("📊 上传结束统计 - 状态: {}", summary.status);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "📦 批次: {}/{}",
        stats.batches_completed, stats.batches_total
    );
    info!(
        "✅ 成功: {}/{} ({:.1}% 已处理)",
        stats.success_count,
        stats.total_records,
        stats.percent_complete()
    );
    info!("❌ 失败: {}", stats.error_count);
    let failed = summary.failed_batches();
    if !failed.is_empty() {
        info!("❌ 失败批次: {:?}", failed);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
