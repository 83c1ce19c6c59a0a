// ==========================================
// 数据上传平台 - 命令行主入口
// ==========================================
// 技术栈: Rust + SQLite + YAML Schema
// 子命令: categories / preview / validate / upload / history / config
// ==========================================

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use data_upload::api::ApiError;
use data_upload::app::AppState;
use data_upload::config::UploadConfig;
use data_upload::domain::upload::HistoryFilter;
use data_upload::importer::{Delimiter, ReadOptions};
use data_upload::{i18n, logging};

/// 数据上传平台 - Schema 校验与分区上传
#[derive(Parser, Debug)]
#[command(name = "data-upload")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 界面语言（zh-CN / pt-BR / en）
    #[arg(
        long,
        global = true,
        env = "UPLOAD_LOCALE",
        default_value = "zh-CN",
        value_parser = PossibleValuesParser::new(i18n::SUPPORTED_LOCALES)
    )]
    locale: String,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct FileArgs {
    /// 待处理文件（.csv / .xlsx / .xls）
    file: PathBuf,

    /// Excel 工作表名（默认第一个）
    #[arg(long)]
    sheet: Option<String>,

    /// CSV 分隔符（默认自动探测）
    #[arg(long)]
    delimiter: Option<char>,

    /// 表头所在行（0 起）
    #[arg(long, default_value_t = 0)]
    header_row: usize,
}

impl FileArgs {
    fn read_options(&self) -> anyhow::Result<ReadOptions> {
        let delimiter = match self.delimiter {
            None => Delimiter::Auto,
            Some(c) if c.is_ascii() => Delimiter::Char(c as u8),
            Some(c) => anyhow::bail!("分隔符必须为 ASCII 字符: '{}'", c),
        };
        Ok(ReadOptions {
            delimiter,
            header_row: self.header_row,
            sheet_name: self.sheet.clone(),
            ..Default::default()
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出可用的 subject/sub_subject 分类
    Categories {
        /// 仅列出该 subject 下的分类
        #[arg(long)]
        subject: Option<String>,
    },

    /// 预览文件内容与列类型（不依赖 Schema）
    Preview {
        #[command(flatten)]
        file: FileArgs,
    },

    /// 按分类 Schema 校验文件
    Validate {
        #[command(flatten)]
        file: FileArgs,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        sub_subject: String,
    },

    /// 校验并上传文件
    Upload {
        #[command(flatten)]
        file: FileArgs,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        sub_subject: String,
        /// 只校验并显示目标 key，不上传
        #[arg(long)]
        dry_run: bool,
    },

    /// 查看上传历史
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        sub_subject: Option<String>,
        /// 输出统计信息
        #[arg(long)]
        stats: bool,
        /// 列出对象存储中的文件
        #[arg(long)]
        stored: bool,
    },

    /// 显示当前配置；指定 --key 时读取（配合 --value 写入）单项覆写值
    Config {
        #[arg(long)]
        key: Option<String>,
        #[arg(long, requires = "key")]
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }
    i18n::set_locale(&cli.locale);

    tracing::info!("==================================================");
    tracing::info!("{}", data_upload::APP_NAME);
    tracing::info!("系统版本: {}", data_upload::VERSION);
    tracing::info!("==================================================");

    let config = UploadConfig::from_env();
    if !config.is_configured() {
        tracing::warn!("未配置存储桶名称，上传目标仅为本地目录");
    }

    let state = AppState::new(config).context("无法初始化AppState")?;

    match cli.command {
        Command::Categories { subject } => {
            let subjects = match subject {
                Some(s) => vec![s],
                None => state.registry.subjects()?,
            };
            for subject in subjects {
                for sub_subject in state.registry.sub_subjects(&subject)? {
                    let schema = state.registry.load(&subject, &sub_subject)?;
                    println!(
                        "{} / {}  {}",
                        schema.subject,
                        schema.sub_subject,
                        schema.display_label()
                    );
                }
            }
            for skipped in state.registry.skipped()? {
                tracing::warn!(path = %skipped.path.display(), reason = %skipped.reason, "Schema 已跳过");
            }
        }

        Command::Preview { file } => {
            let preview = state
                .upload_api
                .preview_file(&file.file, &file.read_options()?)?;
            if let Some(info) = &preview.file_info {
                println!("{} ({}, {})", info.name, info.extension, info.size_formatted());
            }
            println!("{}", preview.headers.join(" | "));
            for row in &preview.rows {
                println!("{}", row.join(" | "));
            }
            println!("--");
            for column in &preview.columns {
                println!(
                    "{}: {} ({} 非空)",
                    column.name,
                    column.friendly_type(),
                    column.non_empty
                );
            }
            if preview.has_header_conflicts() {
                tracing::warn!("存在归一化后重名的列，上传时将被拒绝");
            }
        }

        Command::Validate {
            file,
            subject,
            sub_subject,
        } => {
            let report =
                state
                    .upload_api
                    .validate_file(&file.file, &subject, &sub_subject, &file.read_options()?)?;
            for line in report.display_lines() {
                println!("{}", line);
            }
            if !report.accepted {
                for (field, count) in report.failures_by_field() {
                    println!("  {}: {}", field, count);
                }
                std::process::exit(2);
            }
        }

        Command::Upload {
            file,
            subject,
            sub_subject,
            dry_run: true,
        } => {
            let report = state.upload_api.validate_file(
                &file.file,
                &subject,
                &sub_subject,
                &file.read_options()?,
            )?;
            for line in report.display_lines() {
                println!("{}", line);
            }
            if !report.accepted {
                std::process::exit(2);
            }
            let filename = file
                .file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let key = state.upload_api.destination_key_preview(
                &subject,
                &sub_subject,
                &filename,
                Utc::now(),
            )?;
            println!("{}", key);
        }

        Command::Upload {
            file,
            subject,
            sub_subject,
            dry_run: false,
        } => {
            let options = file.read_options()?;
            match state
                .upload_api
                .upload_file(&file.file, &subject, &sub_subject, &options)
                .await
            {
                Ok(receipt) => {
                    for line in receipt.report.display_lines() {
                        println!("{}", line);
                    }
                    println!(
                        "{}",
                        i18n::t_with_args(
                            "upload.stored",
                            &[(
                                "target",
                                &format!(
                                    "{}/{}",
                                    receipt.storage_target, receipt.record.destination_key
                                )
                            )]
                        )
                    );
                    if !receipt.history_recorded {
                        println!("{}", i18n::t("upload.history_failed"));
                    }
                }
                Err(ApiError::ValidationFailed(report)) => {
                    for line in report.display_lines() {
                        println!("{}", line);
                    }
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::History {
            limit,
            subject,
            sub_subject,
            stats,
            stored,
        } => {
            if stats {
                let s = state.history_api.statistics()?;
                println!("files: {}", s.total_files);
                println!("rows: {}", s.total_rows);
                println!("bytes: {} (avg {:.1})", s.total_size_bytes, s.avg_size_bytes);
                println!("days: {}", s.upload_days);
                for (schema, count) in &s.top_schemas {
                    println!("  {}: {}", schema, count);
                }
            } else if stored {
                for upload in state.history_api.list_stored_uploads(None, limit).await? {
                    println!(
                        "{}  {}/{}  {}  {:.1} KB",
                        upload.upload_date,
                        upload.subject,
                        upload.sub_subject,
                        upload.original_filename.as_deref().unwrap_or(&upload.filename),
                        upload.size_kb()
                    );
                }
            } else {
                let records = if subject.is_none() && sub_subject.is_none() {
                    state.history_api.recent_uploads(limit)?
                } else {
                    state.history_api.query(&HistoryFilter {
                        subject,
                        sub_subject,
                        limit: Some(limit),
                        ..Default::default()
                    })?
                };
                for r in records {
                    println!(
                        "{}  {}/{}  {}  {} 行  {}",
                        r.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
                        r.subject,
                        r.sub_subject,
                        r.filename,
                        r.row_count,
                        r.destination_key
                    );
                }
            }
        }

        Command::Config {
            key: Some(key),
            value,
        } => {
            let manager = &state.config_manager;
            if let Some(value) = value {
                manager
                    .set_global_config_value(&key, &value)
                    .map_err(|e| anyhow::anyhow!("配置写入失败: {}", e))?;
            }
            let current = manager
                .get_global_config_value(&key)
                .map_err(|e| anyhow::anyhow!("配置读取失败: {}", e))?;
            println!("{} = {}", key, current.as_deref().unwrap_or("-"));
        }

        Command::Config { key: None, .. } => {
            for (label, value) in state.config.display_info() {
                println!("{}: {}", label, value);
            }
            let snapshot = state
                .config_manager
                .get_config_snapshot()
                .map_err(|e| anyhow::anyhow!("配置快照读取失败: {}", e))?;
            println!("{}", snapshot);
        }
    }

    Ok(())
}
