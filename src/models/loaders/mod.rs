pub mod csv_loader;
pub mod sheet_url;

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::config::DataSource;
use crate::models::record::Record;

pub use csv_loader::parse;
pub use sheet_url::{fetch_sheet_csv, to_csv_export_url};

/// 从文件读取表格文本并解析为记录
pub async fn load_records_from_file(path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取数据文件: {}", path.display()))?;

    let records = parse(&content);
    info!(
        "✓ 从 {} 解析出 {} 条记录",
        path.file_name().unwrap_or_default().to_string_lossy(),
        records.len()
    );
    Ok(records)
}

/// 按数据源加载记录
pub async fn load_records(source: &DataSource, fetch_timeout: Duration) -> Result<Vec<Record>> {
    match source {
        DataSource::Inline(text) => {
            let records = parse(text);
            info!("✓ 从粘贴数据中解析出 {} 条记录", records.len());
            Ok(records)
        }
        DataSource::File(path) => load_records_from_file(path).await,
        DataSource::SheetUrl(url) => {
            let text = fetch_sheet_csv(url, fetch_timeout)
                .await
                .with_context(|| format!("无法获取表格数据: {}", url))?;
            let records = parse(&text);
            info!("✓ 从在线表格解析出 {} 条记录", records.len());
            Ok(records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_inline() {
        let source = DataSource::Inline("sku\nA\nB\n".to_string());
        let records = load_records(&source, Duration::from_secs(1)).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,sku\nP1,A\nP2,B\nP3,C").unwrap();

        let source = DataSource::File(file.path().to_path_buf());
        let records = load_records(&source, Duration::from_secs(1)).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].id(), "P3");
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let source = DataSource::File("/definitely/not/here.csv".into());
        assert!(load_records(&source, Duration::from_secs(1)).await.is_err());
    }
}
