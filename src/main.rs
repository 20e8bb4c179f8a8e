use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use village_enrich::adapters::event_log::FileEventLog;
use village_enrich::app::{self, stages};
use village_enrich::domain::ports::{EventLog, Stage};
use village_enrich::utils::error::ErrorSeverity;
use village_enrich::utils::{logger, validation::Validate};
use village_enrich::{CliArgs, Command, EnrichConfig, EnrichError, LocalStorage, Result, StageRunner};

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

async fn run_stage<S: Stage>(stage: S) -> Result<String> {
    StageRunner::new(stage).run().await
}

async fn execute(command: &Command, config: &EnrichConfig) -> Result<String> {
    // 事件日誌同時寫入檔案與 tracing
    let log: Arc<dyn EventLog> = Arc::new(FileEventLog::open(config.log_path())?);
    tracing::info!("📝 Run log: {}", config.log_path().display());

    let pipeline = if command.needs_raster() {
        app::build_pipeline(config, log)?
    } else {
        app::build_geocode_pipeline(config, log)?
    };
    let storage = LocalStorage::new(".");
    let output = config.output.clone();

    match command {
        Command::Geocode { names } => {
            run_stage(stages::GeocodeStage::new(storage, pipeline, path_arg(names), output)).await
        }
        Command::Vegetation { table } => {
            run_stage(stages::VegetationStage::new(storage, pipeline, path_arg(table), output)).await
        }
        Command::ForestLoss => run_stage(stages::ForestLossStage::new(storage, pipeline, output)).await,
        Command::Run { names } => {
            run_stage(stages::FullRunStage::new(storage, pipeline, path_arg(names), output)).await
        }
    }
}

fn load_config(args: &CliArgs) -> Result<EnrichConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            EnrichConfig::from_file(path)?
        }
        None => {
            tracing::info!("📁 No config file given, using built-in defaults");
            EnrichConfig::default()
        }
    };

    // 應用命令列覆蓋設定
    if let Some(seed) = args.seed {
        config.raster.seed = Some(seed);
        tracing::info!("🔧 Fallback seed overridden to: {}", seed);
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
        tracing::info!("🔧 Output directory overridden to: {}", dir);
    }

    if args.command.needs_raster() {
        config.validate()?;
    } else {
        config.validate_without_raster()?;
    }
    Ok(config)
}

fn exit_code(e: &EnrichError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 遠端服務錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 輸入或配置錯誤
    }
}

fn report_failure(context: &str, e: &EnrichError) {
    tracing::error!("❌ {}: {} (Severity: {:?})", context, e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting village-enrich");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            report_failure("Configuration failed", &e);
            std::process::exit(1);
        }
    };
    tracing::info!("✅ Configuration loaded and validated successfully");

    match execute(&args.command, &config).await {
        Ok(output_path) => {
            tracing::info!("✅ Enrichment completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Enrichment completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            report_failure("Enrichment failed", &e);

            // 根據錯誤嚴重程度決定退出碼
            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
