use campus_enroll::config::batch_config::BatchConfig;
use campus_enroll::utils::{logger, validation::Validate};
use campus_enroll::{BulkEnroller, CacheSynchronizer, CliConfig, HttpEnrollmentRepository};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting campus-enroll bulk runner");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證批次描述
    let mut config = match BatchConfig::from_file(&cli.batch_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", cli.batch_file, e);
            std::process::exit(1);
        }
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Err(e) = config.validate() {
        tracing::error!("❌ Batch config validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    // 組裝:repository → cache → bulk orchestrator
    let mut repo = HttpEnrollmentRepository::new(&config.api.base_url)?;
    if let Some(headers) = config.api.headers.clone() {
        repo = repo.with_headers(headers);
    }
    if let Some(seconds) = config.api.timeout_seconds {
        repo = repo.with_timeout(Duration::from_secs(seconds));
    }
    let repo = Arc::new(repo);
    let cache = Arc::new(CacheSynchronizer::with_capacity(
        repo.clone(),
        cli.window_size,
    ));
    let bulk = BulkEnroller::new(repo, cache);

    // 分區階段
    let plan = bulk
        .prepare(&config.students.ids, config.template.clone())
        .await?;

    if let Some(warning) = plan.rejection_warning() {
        println!("⚠️ {}", warning);
        if !cli.yes && !cli.dry_run {
            eprintln!(
                "Re-run with --yes to enroll the remaining {} student(s).",
                plan.valid.len()
            );
            std::process::exit(2);
        }
    }

    if cli.dry_run {
        println!(
            "📋 Dry run: {} eligible, {} rejected — nothing dispatched",
            plan.valid.len(),
            plan.rejected.len()
        );
        return Ok(());
    }

    // 執行階段:部分成功是常態,報告完整結果後以 0 結束
    match bulk.execute(plan).await {
        Ok(report) => {
            println!(
                "✅ Bulk enrollment finished: {} succeeded, {} failed, {} rejected locally",
                report.success_count,
                report.error_count,
                report.rejected.len()
            );
            for (student, failure) in &report.failures {
                println!("  ❌ {}: {}", student, failure);
            }
            if cli.verbose {
                println!("{}", serde_json::to_string_pretty(&report.summary())?);
            }
        }
        Err(e) => {
            tracing::error!("❌ Bulk enrollment aborted: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
