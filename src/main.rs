// ==========================================
// DMC 发票系统 - 命令行入口
// ==========================================
// 用法: dmc-invoicing --input <目录> [--from YYYY-MM-DD] [--to YYYY-MM-DD] [--config <文件>]
// 默认账期: 上一个自然月
// 运行在 spawn_blocking 工作线程,前台打印进度消息
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use dmc_invoicing::config::AppConfig;
use dmc_invoicing::domain::DateRange;
use dmc_invoicing::engine::{ChannelProgressSink, InvoiceRun, ProgressReporter, RunRequest};
use dmc_invoicing::logging;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "dmc-invoicing", version, about = "按供应商生成团餐发票")]
struct Cli {
    /// 排期根目录（含月份子目录与费率表）
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// 账期开始（默认上月第一天）
    #[arg(long = "from")]
    from: Option<NaiveDate>,

    /// 账期结束（默认上月最后一天）
    #[arg(long = "to")]
    to: Option<NaiveDate>,

    /// 配置文件（默认 <config_dir>/dmc-invoicing/config.json）
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// 输出根目录（默认同输入目录）
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// 以 JSON 格式输出日志
    #[arg(long = "json-log")]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    let config = AppConfig::load(cli.config.as_deref()).context("加载配置失败")?;

    let default_range = DateRange::previous_month(Local::now().date_naive());
    let range = DateRange::new(
        cli.from.unwrap_or(default_range.from),
        cli.to.unwrap_or(default_range.to),
    );
    if !range.is_valid() {
        bail!("账期无效: {}", range);
    }
    if !cli.input.is_dir() {
        bail!("输入目录不存在: {}", cli.input.display());
    }

    tracing::info!(
        version = dmc_invoicing::VERSION,
        input = %cli.input.display(),
        range = %range,
        "DMC 发票系统启动"
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let reporter = ProgressReporter::with_sink(Arc::new(ChannelProgressSink::new(tx)));

    // Ctrl-C → 协作式取消
    let cancel_flag = Arc::new(AtomicBool::new(false));
    {
        let cancel_flag = cancel_flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel_flag.store(true, Ordering::SeqCst);
            }
        });
    }

    let run = InvoiceRun::new(config, reporter).with_cancel_flag(cancel_flag);
    let request = RunRequest {
        input_dir: cli.input,
        range,
        output_dir: cli.output,
    };
    let worker = tokio::task::spawn_blocking(move || run.execute(&request));

    // 发送端随运行结束而释放,循环随之退出
    while let Some(message) = rx.recv().await {
        println!("{}", message);
    }

    let summary = worker
        .await
        .context("工作线程异常退出")?
        .context("开票运行失败")?;

    println!(
        "Run {} finished: {} invoices written",
        summary.run_id,
        summary.invoices_written()
    );
    Ok(())
}
