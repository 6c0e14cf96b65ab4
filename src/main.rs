use anyhow::Result;
use catalog_bulk_upload::models::JobStatus;
use catalog_bulk_upload::utils::logging;
use catalog_bulk_upload::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let summary = App::initialize(config).await?.run().await?;

    if summary.status == JobStatus::Failed {
        anyhow::bail!("任务失败: {:?}", summary.issues);
    }

    Ok(())
}
