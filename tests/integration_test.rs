use anyhow::Result;
use async_trait::async_trait;
use catalog_bulk_upload::browser::connect_to_browser_and_page;
use catalog_bulk_upload::config::Config;
use catalog_bulk_upload::error::JobError;
use catalog_bulk_upload::executors::{
    phase, BrowserExecutor, PhaseExecutor, SimulatedDelays, SimulatedExecutor,
};
use catalog_bulk_upload::models::{
    self, Batch, Credentials, JobConfig, JobStatus, Record, Scenario, Severity,
};
use catalog_bulk_upload::orchestrator::{EventSink, JobNotification, JobOrchestrator, Stats};
use catalog_bulk_upload::utils::logging;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

/// 生成 `n` 行带表头的 CSV
fn csv_rows(n: usize) -> String {
    let mut raw = String::from("sku,name,price\n");
    for i in 1..=n {
        raw.push_str(&format!("S{:04},商品 {},{}.5\n", i, i, i));
    }
    raw
}

fn simulated(scenario: Scenario) -> JobOrchestrator {
    let executor =
        SimulatedExecutor::new(scenario, "staging").with_delays(SimulatedDelays::none());
    JobOrchestrator::new(Arc::new(executor)).with_inter_batch_delay(Duration::ZERO)
}

fn drain(rx: &mut broadcast::Receiver<JobNotification>) -> Vec<JobNotification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

fn status_transitions(notifications: &[JobNotification]) -> Vec<JobStatus> {
    notifications
        .iter()
        .filter_map(|n| match n {
            JobNotification::StatusChanged(status) => Some(*status),
            _ => None,
        })
        .collect()
}

/// 记录调用次数的执行器，可配置登录结果和出错的批次
struct RecordingExecutor {
    login_ok: bool,
    navigate_fails: bool,
    erroring_batch: Option<usize>,
    cancel_after_batch: Option<(usize, CancellationToken)>,
    uploads: AtomicUsize,
}

impl RecordingExecutor {
    fn new() -> Self {
        Self {
            login_ok: true,
            navigate_fails: false,
            erroring_batch: None,
            cancel_after_batch: None,
            uploads: AtomicUsize::new(0),
        }
    }

    fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhaseExecutor for RecordingExecutor {
    async fn login(&self, _credentials: &Credentials, sink: &mut EventSink<'_>) -> Result<bool> {
        sink.info(phase::AUTH, "提交凭据");
        Ok(self.login_ok)
    }

    async fn navigate(&self, sink: &mut EventSink<'_>) -> Result<()> {
        if self.navigate_fails {
            anyhow::bail!("页面加载超时");
        }
        sink.info(phase::NAV, "进入上传页面");
        Ok(())
    }

    async fn upload_batch(&self, batch: &Batch, sink: &mut EventSink<'_>) -> Result<bool> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some((batch_id, token)) = &self.cancel_after_batch {
            if *batch_id == batch.id {
                token.cancel();
            }
        }
        if self.erroring_batch == Some(batch.id) {
            anyhow::bail!("连接被重置");
        }
        sink.success(&batch.phase_tag(), format!("{} 条记录已上传", batch.len()));
        Ok(true)
    }
}

#[tokio::test]
async fn test_full_run_over_parsed_csv() {
    let records = models::parse(&csv_rows(1200));
    assert_eq!(records.len(), 1200);
    assert_eq!(records[0].id(), "1");

    let mut orch = simulated(Scenario::Success);
    let mut rx = orch.subscribe();
    let summary = assert_ok!(
        orch.run(
            &JobConfig::new("admin", "secret").with_batch_size(500),
            &records,
            CancellationToken::new(),
        )
        .await
    );

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(
        summary.stats,
        Stats {
            total_records: 1200,
            processed_records: 1200,
            success_count: 1200,
            error_count: 0,
            batches_total: 3,
            batches_completed: 3,
        }
    );
    assert!(summary.issues.is_empty());

    let notifications = drain(&mut rx);
    assert_eq!(
        status_transitions(&notifications),
        vec![JobStatus::Running, JobStatus::Completed]
    );

    // 事件 id 严格递增，时间戳不下降
    let events = orch.log().events();
    assert!(events.windows(2).all(|w| w[0].id < w[1].id));
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(events.iter().any(|e| e.phase == "BATCH-3"));
}

#[tokio::test]
async fn test_scripted_batch_failures_are_counted() {
    let records = models::parse(&csv_rows(1200));
    let mut orch = simulated("fail_batches:2".parse().unwrap());

    let summary = orch
        .run(
            &JobConfig::new("admin", "secret").with_batch_size(500),
            &records,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.stats.success_count, 700);
    assert_eq!(summary.stats.error_count, 500);
    assert_eq!(summary.stats.batches_completed, 3);
    assert_eq!(summary.failed_batches(), vec![2]);
}

#[tokio::test]
async fn test_login_failure_stops_before_upload() {
    let records = models::parse(&csv_rows(10));
    let executor = Arc::new(RecordingExecutor {
        login_ok: false,
        ..RecordingExecutor::new()
    });
    let mut orch =
        JobOrchestrator::new(executor.clone()).with_inter_batch_delay(Duration::ZERO);
    let mut rx = orch.subscribe();

    let summary = orch
        .run(
            &JobConfig::new("admin", "wrong").with_batch_size(4),
            &records,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Failed);
    assert_eq!(executor.upload_calls(), 0);
    assert_eq!(summary.stats, Stats::initialized(10, 3));

    let auth_errors: Vec<_> = orch
        .log()
        .with_severity(Severity::Error)
        .filter(|e| e.phase == phase::AUTH)
        .collect();
    assert_eq!(auth_errors.len(), 1);
    assert_eq!(orch.log().with_severity(Severity::Error).count(), 1);

    assert_eq!(
        status_transitions(&drain(&mut rx)),
        vec![JobStatus::Running, JobStatus::Failed]
    );
}

#[tokio::test]
async fn test_simulated_login_failure_scenario() {
    let records = models::parse(&csv_rows(3));
    let mut orch = simulated(Scenario::LoginFailure);

    let summary = orch
        .run(
            &JobConfig::new("admin", "secret"),
            &records,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Failed);
    assert_eq!(summary.stats.batches_completed, 0);
    assert_eq!(orch.log().with_severity(Severity::Error).count(), 1);
    assert!(!orch.log().events().iter().any(|e| e.phase.starts_with("BATCH-")));
}

#[tokio::test]
async fn test_stop_after_first_batch_pauses() {
    let records = models::parse(&csv_rows(9));
    let cancel = CancellationToken::new();
    let executor = Arc::new(RecordingExecutor {
        cancel_after_batch: Some((1, cancel.clone())),
        ..RecordingExecutor::new()
    });
    let mut orch =
        JobOrchestrator::new(executor.clone()).with_inter_batch_delay(Duration::from_secs(30));

    let summary = orch
        .run(&JobConfig::new("admin", "secret").with_batch_size(3), &records, cancel)
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Paused);
    assert_eq!(executor.upload_calls(), 1);
    assert_eq!(summary.stats.batches_completed, 1);
    assert_eq!(summary.stats.processed_records, 3);
    assert_eq!(summary.stats.batches_total, 3);
    assert!(orch
        .log()
        .with_severity(Severity::Warning)
        .any(|e| e.phase == phase::SYSTEM));
}

#[tokio::test]
async fn test_executor_error_counts_as_batch_failure() {
    let records = models::parse(&csv_rows(6));
    let executor = Arc::new(RecordingExecutor {
        erroring_batch: Some(2),
        ..RecordingExecutor::new()
    });
    let mut orch =
        JobOrchestrator::new(executor.clone()).with_inter_batch_delay(Duration::ZERO);

    let summary = orch
        .run(
            &JobConfig::new("admin", "secret").with_batch_size(2),
            &records,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(executor.upload_calls(), 3);
    assert_eq!(summary.stats.success_count, 4);
    assert_eq!(summary.stats.error_count, 2);
    assert_eq!(summary.failed_batches(), vec![2]);
    assert!(orch
        .log()
        .with_severity(Severity::Error)
        .any(|e| e.phase == "BATCH-2" && e.message.contains("连接被重置")));
}

#[tokio::test]
async fn test_navigation_error_is_tolerated() {
    let records = models::parse(&csv_rows(4));
    let executor = Arc::new(RecordingExecutor {
        navigate_fails: true,
        ..RecordingExecutor::new()
    });
    let mut orch =
        JobOrchestrator::new(executor.clone()).with_inter_batch_delay(Duration::ZERO);

    let summary = orch
        .run(
            &JobConfig::new("admin", "secret").with_batch_size(2),
            &records,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(executor.upload_calls(), 2);
    assert!(orch
        .log()
        .with_severity(Severity::Warning)
        .any(|e| e.phase == phase::NAV));
}

#[tokio::test]
async fn test_reset_after_terminal_states() {
    let records = models::parse(&csv_rows(5));

    for scenario in [Scenario::Success, Scenario::LoginFailure] {
        let mut orch = simulated(scenario);
        let summary = orch
            .run(
                &JobConfig::new("admin", "secret").with_batch_size(2),
                &records,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(summary.status.is_terminal());

        orch.reset();
        assert_eq!(orch.status(), JobStatus::Idle);
        assert_eq!(orch.stats(), Stats::default());
        assert!(orch.log().is_empty());
    }
}

#[tokio::test]
async fn test_missing_credentials_is_rejected() {
    let records = models::parse(&csv_rows(2));
    let mut orch = simulated(Scenario::Success);

    assert_err!(
        orch.run(&JobConfig::new("", ""), &records, CancellationToken::new())
            .await
    );
    assert_eq!(orch.status(), JobStatus::Idle);
}

#[tokio::test]
async fn test_rejected_restart_keeps_finished_run() {
    let records = models::parse(&csv_rows(4));
    let mut orch = simulated(Scenario::Success);

    let summary = orch
        .run(
            &JobConfig::new("admin", "secret").with_batch_size(2),
            &records,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(summary.status, JobStatus::Completed);

    let log_len = orch.log().len();
    let last_event_id = orch.log().events().last().map(|e| e.id);
    let stats = orch.stats();
    let mut rx = orch.subscribe();

    let err = assert_err!(
        orch.run(&JobConfig::new("", "secret"), &records, CancellationToken::new())
            .await
    );
    assert!(matches!(err, JobError::PreconditionNotMet(_)));

    assert_eq!(orch.status(), JobStatus::Completed);
    assert_eq!(orch.log().len(), log_len);
    assert_eq!(orch.log().events().last().map(|e| e.id), last_event_id);
    assert_eq!(orch.stats(), stats);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_records_loaded_from_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.csv");
    std::fs::write(&path, csv_rows(7)).unwrap();

    let records: Vec<Record> = models::loaders::load_records_from_file(&path).await.unwrap();
    assert_eq!(records.len(), 7);
    assert!(records.iter().all(|r| r.get("price").is_some()));
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    logging::init(true);

    let config = Config::from_env();

    let result = connect_to_browser_and_page(config.browser_debug_port, None).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_real_portal_upload() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    let records = models::parse(&csv_rows(3));

    let executor = BrowserExecutor::connect(&config)
        .await
        .expect("连接浏览器失败");
    let mut orch = JobOrchestrator::new(Arc::new(executor));

    let summary = orch
        .run(
            &config.job_config().expect("配置无效"),
            &records,
            CancellationToken::new(),
        )
        .await
        .expect("前置条件不满足");

    assert_eq!(summary.status, JobStatus::Completed);
}
