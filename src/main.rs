use catalog_import::utils::error::ErrorSeverity;
use catalog_import::utils::{logger, validation::Validate};
use catalog_import::{build_products_import_job, CliConfig, HttpCatalogClient, PipelineSequence};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting catalog-import CLI");

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.import.dry_run {
        tracing::info!("🧪 Dry run: products will be transformed but not created");
    }
    if config.monitoring_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let client = Arc::new(HttpCatalogClient::new(
        &config.catalog.api_url,
        &config.catalog.project_key,
        config.catalog.auth_token.clone(),
    ));

    let execution_id = cli
        .execution_id
        .clone()
        .unwrap_or_else(|| format!("import-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S")));

    let job = match build_products_import_job(&config, client, execution_id) {
        Ok(job) => job,
        Err(e) => {
            tracing::error!("❌ Failed to build import job: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    match job.run().await {
        Ok(context) => {
            let summary = PipelineSequence::get_execution_summary(&context.previous_results);
            tracing::info!("📊 Execution summary: {:?}", summary);
            tracing::info!("✅ Products import completed successfully!");
            println!("✅ Products import completed successfully!");
            if let Some(written) = summary.get("total_written") {
                println!("📦 Products created: {}", written);
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Products import failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
