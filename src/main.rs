use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toolkit_inspect::{cli, client, config, error, export, logging, pipeline, preprocess, report, scanner};
use toolkit_inspect_common::{default_kit, load_kit, Mode, ModelCatalog, Session, Tool};
use cli::{Cli, Commands};
use client::{resolve_model, DetectParams, DetectionClient};
use config::Config;
use error::Result;
use preprocess::{DownscaleOptions, PreprocessOptions};

fn load_tools(cli_tools: Option<&Path>, config: &Config) -> Result<Vec<Tool>> {
    match cli_tools.or(config.tool_kit.as_deref()) {
        Some(path) => {
            let tools = load_kit(path)?;
            tracing::info!(path = %path.display(), tools = tools.len(), "工具キットを読み込みました");
            Ok(tools)
        }
        None => Ok(default_kit()),
    }
}

fn make_client(config: &Config) -> Result<DetectionClient> {
    DetectionClient::new(&config.service_url(), Duration::from_secs(config.timeout_seconds))
}

fn preprocess_options(config: &Config, no_compress: bool, concurrency: Option<usize>) -> PreprocessOptions {
    PreprocessOptions {
        compress: config.compress && !no_compress,
        downscale: DownscaleOptions {
            max_side: config.max_side,
            quality: config.jpeg_quality,
        },
        concurrency: concurrency.unwrap_or(config.concurrency),
    }
}

/// モデル一覧（起動時に一度だけ取得）
///
/// 取得できなくても検出は続行する。
async fn discover_models(client: &DetectionClient) -> ModelCatalog {
    match client.list_models().await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(error = %e, "モデル一覧を取得できませんでした");
            ModelCatalog::default()
        }
    }
}

fn write_exports(session: &Session, output_dir: &Path) -> Result<()> {
    let written = export::export_all(&session.files, output_dir)?;
    for path in &written {
        println!("✔ 結果を保存: {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Detect { image, output, model, threshold, count, text_detection, no_compress } => {
            println!("🔧 toolkit-inspect - 単体検査\n");

            let thresholds = threshold.iter().map(|t| cli::parse_threshold(t)).collect::<Result<Vec<_>>>()?;
            let counts = count.iter().map(|c| cli::parse_count(c)).collect::<Result<Vec<_>>>()?;
            let tools = load_tools(cli.tools.as_deref(), &config)?;
            let info = scanner::ImageInfo::from_path(&image)?;

            let client = make_client(&config)?;
            let catalog = discover_models(&client).await;
            let params = DetectParams {
                model_name: resolve_model(model.as_deref().or(config.model.as_deref()), &catalog)?,
                confidence_threshold: config.confidence_threshold,
                text_detection: text_detection || config.text_detection,
                batch_size: config.batch_size,
            };

            println!("[1/2] 検出中... (モデル: {})", params.model_name);
            let session = pipeline::load_session(Mode::Single, tools, std::slice::from_ref(&info));
            let session = pipeline::apply_thresholds(session, &thresholds);
            let session = pipeline::apply_counts(session, &counts);
            let session = pipeline::run_single(
                &client,
                session,
                &info,
                &params,
                preprocess_options(&config, no_compress, None),
            )
            .await;

            println!("[2/2] 検査結果\n");
            report::print_tool_table(&session);

            let output_dir = output
                .or_else(|| image.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."));
            println!();
            write_exports(&session, &output_dir)?;

            if session.files.iter().any(|f| f.passed()) {
                println!("\n✅ 合格");
            } else {
                println!("\n❌ 不合格");
            }
        }

        Commands::Batch { folder, output, recursive, model, batch_size, threshold, count, no_compress, concurrency } => {
            println!("🔧 toolkit-inspect - 一括検査\n");

            let thresholds = threshold.iter().map(|t| cli::parse_threshold(t)).collect::<Result<Vec<_>>>()?;
            let counts = count.iter().map(|c| cli::parse_file_count(c)).collect::<Result<Vec<_>>>()?;
            let tools = load_tools(cli.tools.as_deref(), &config)?;

            // 1. 画像スキャン
            println!("[1/3] 写真をスキャン中...");
            let images = scanner::scan_folder(&folder, recursive)?;
            if images.is_empty() {
                return Err(error::InspectError::NoImagesFound(folder.display().to_string()));
            }
            println!("✔ {}枚の写真を検出\n", images.len());

            let client = make_client(&config)?;
            let catalog = discover_models(&client).await;
            let params = DetectParams {
                model_name: resolve_model(model.as_deref().or(config.model.as_deref()), &catalog)?,
                confidence_threshold: config.confidence_threshold,
                text_detection: config.text_detection,
                batch_size: batch_size.unwrap_or(config.batch_size).max(1),
            };

            // 2. 前処理と検出
            println!("[2/3] 検出中... (モデル: {}, bs={})", params.model_name, params.batch_size);
            let session = pipeline::load_session(Mode::Batch, tools, &images);
            let session = pipeline::apply_thresholds(session, &thresholds);
            // 補正対象の指定ミスは送信前に検出する
            pipeline::check_file_counts(&session, &counts)?;
            let session = pipeline::run_batch(
                &client,
                session,
                &images,
                &params,
                preprocess_options(&config, no_compress, concurrency),
            )
            .await;
            let session = pipeline::apply_file_counts(session, &counts)?;
            println!("✔ 検出完了\n");

            // 3. 結果保存
            println!("[3/3] 結果を保存中...");
            let output_dir = output.unwrap_or_else(|| folder.clone());
            write_exports(&session, &output_dir)?;

            println!();
            report::print_summary(&session);
        }

        Commands::Models => {
            let client = make_client(&config)?;
            let catalog = client.list_models().await?;
            if catalog.is_empty() {
                println!("利用可能なモデルがありません");
            }
            for (i, name) in catalog.available().iter().enumerate() {
                let mark = if i == 0 { " (既定)" } else { "" };
                println!("  {}{}", name, mark);
            }
        }

        Commands::Config { set_service_url, show } => {
            let mut config = config;

            if let Some(url) = set_service_url {
                config.set_service_url(url)?;
                println!("✔ 検出サービスURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  検出サービス: {}", config.service_url());
                println!("  モデル: {}", config.model.as_deref().unwrap_or("(自動)"));
                println!("  信頼度閾値: {}", config.confidence_threshold);
                println!("  バッチサイズ: {}", config.batch_size);
                println!("  縮小: {} (最大{}px, 品質{})", if config.compress { "有効" } else { "無効" }, config.max_side, config.jpeg_quality);
                println!("  同時実行数: {}", config.concurrency);
                println!(
                    "  工具キット: {}",
                    config.tool_kit.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "組み込み".into())
                );
            }
        }
    }

    Ok(())
}
