// ==========================================
// DMC 发票系统 - 开票运行编排器
// ==========================================
// 用途: 一次用户操作 = 一次完整运行
// 流程: 读取排期 → 读取并规范化费率 → 疑似重复告警 →
//       逐餐厅: 划分 → 写出 Cancelled / Invalid / 每供应商发票
// 输出: <output_dir>/<餐厅>/<YYYY-MM-DD HH-MM-SS>/
// 隔离: 单个供应商发票写出失败只报告,不影响其他供应商
// ==========================================

use crate::config::{AppConfig, RestaurantConfig};
use crate::domain::booking::BookingBatch;
use crate::domain::report::InvalidGroup;
use crate::domain::types::DateRange;
use crate::engine::canonicalizer::VendorCanonicalizer;
use crate::engine::duplicate_detector::DuplicateDetector;
use crate::engine::events::ProgressReporter;
use crate::engine::invoice_assembler::InvoiceAssembler;
use crate::engine::rate_normalizer::RateNormalizer;
use crate::engine::validation_pipeline::ValidationPipeline;
use crate::importer::error::ImportError;
use crate::importer::field_mapper::BookingFieldMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::FieldMapper;
use crate::importer::schedule_reader::ScheduleReader;
use crate::writer::{invoice_file_name, write_table, InvoiceWriter, WriterError};
use chrono::{Local, NaiveDateTime};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 输出子目录时间戳格式
pub const RUN_DIR_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// 作废表文件名（不含扩展名）
pub const CANCELLED_NAME: &str = "Cancelled";

/// 无效表文件名（不含扩展名）
pub const INVALID_NAME: &str = "Invalid";

// ==========================================
// RunError - 运行级错误（致命）
// ==========================================
#[derive(Error, Debug)]
pub enum RunError {
    #[error("排期数据读取失败: {0}")]
    Schedule(#[from] ImportError),

    #[error("账期内没有任何排期数据")]
    NoData,

    #[error("费率表读取失败 ({path}): {source}")]
    Rates {
        path: String,
        #[source]
        source: ImportError,
    },

    #[error("输出目录创建失败 ({path}): {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("报表写出失败: {0}")]
    Writer(#[from] WriterError),

    #[error("运行已取消")]
    Cancelled,
}

// ==========================================
// RunRequest - 运行参数
// ==========================================
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// 排期根目录（含月份子目录与费率表）
    pub input_dir: PathBuf,
    /// 账期
    pub range: DateRange,
    /// 输出根目录（默认同 input_dir）
    pub output_dir: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(input_dir: impl Into<PathBuf>, range: DateRange) -> Self {
        Self {
            input_dir: input_dir.into(),
            range,
            output_dir: None,
        }
    }

    fn output_root(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.input_dir)
    }
}

// ==========================================
// 运行结果
// ==========================================

/// 单个餐厅的结果
#[derive(Debug, Clone, Default)]
pub struct RestaurantSummary {
    pub restaurant: String,
    pub serviced: usize,
    pub cancelled: usize,
    pub invalid: usize,
    pub out_of_period: usize,
    pub output_dir: Option<PathBuf>,
    pub invoices_written: Vec<PathBuf>,
    /// (供应商, 错误信息)
    pub invoice_failures: Vec<(String, String)>,
}

/// 整次运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub files_read: usize,
    pub duplicate_warnings: usize,
    pub restaurants: Vec<RestaurantSummary>,
}

impl RunSummary {
    pub fn invoices_written(&self) -> usize {
        self.restaurants.iter().map(|r| r.invoices_written.len()).sum()
    }
}

// ==========================================
// InvoiceRun - 一次开票运行
// ==========================================
pub struct InvoiceRun {
    run_id: Uuid,
    config: AppConfig,
    reporter: ProgressReporter,
    cancel_flag: Option<Arc<AtomicBool>>,
    started_at: NaiveDateTime,
}

impl InvoiceRun {
    pub fn new(config: AppConfig, reporter: ProgressReporter) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            reporter,
            cancel_flag: None,
            started_at: Local::now().naive_local(),
        }
    }

    /// 设置协作式取消标志（各阶段之间检查）
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// 指定运行开始时间（决定输出子目录名）
    pub fn with_started_at(mut self, started_at: NaiveDateTime) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn check_cancelled(&self) -> Result<(), RunError> {
        match &self.cancel_flag {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                warn!(run_id = %self.run_id, "运行被取消");
                Err(RunError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// 执行完整运行
    #[instrument(skip(self, request), fields(run_id = %self.run_id, range = %request.range))]
    pub fn execute(&self, request: &RunRequest) -> Result<RunSummary, RunError> {
        info!(input_dir = %request.input_dir.display(), "开始开票运行");
        self.check_cancelled()?;

        // ==========================================
        // 步骤1: 读取排期
        // ==========================================
        let reader = ScheduleReader::new(&self.config.restaurants, self.reporter.clone());
        let schedules = reader.read_all(&request.input_dir, &request.range)?;
        if schedules.is_empty() {
            return Err(RunError::NoData);
        }
        self.check_cancelled()?;

        // ==========================================
        // 步骤2: 读取并规范化费率表
        // ==========================================
        let rates_path = request.input_dir.join(&self.config.rates_file_name);
        let rate_rows = UniversalFileParser
            .parse(&rates_path)
            .map_err(|source| RunError::Rates {
                path: rates_path.display().to_string(),
                source,
            })?;
        let rates = RateNormalizer::new(self.reporter.clone()).normalize(&rate_rows);
        self.check_cancelled()?;

        // ==========================================
        // 步骤3: 字段映射 + 疑似重复告警
        // ==========================================
        let mapper = BookingFieldMapper;
        let batches: Vec<(&RestaurantConfig, BookingBatch)> = self
            .config
            .restaurants
            .iter()
            .map(|restaurant| {
                (
                    restaurant,
                    mapper.map_batch(schedules.rows_for(&restaurant.name)),
                )
            })
            .collect();

        let canonicalizer = VendorCanonicalizer::new(&self.config.vendor_aliases);
        let vendor_names: BTreeSet<String> = batches
            .iter()
            .flat_map(|(_, batch)| batch.records.iter())
            .filter_map(|record| record.vendor.as_deref())
            .filter_map(|vendor| canonicalizer.display_name(vendor))
            .collect();
        let detector = DuplicateDetector::new(
            self.config.duplicate_threshold,
            &self.config.ignored_duplicates,
        );
        let duplicate_warnings = detector.report_possible_duplicates(&vendor_names, &self.reporter);

        // ==========================================
        // 步骤4: 逐餐厅划分与写出
        // ==========================================
        let pipeline = ValidationPipeline::new(&rates, &canonicalizer, self.config.pipeline);
        let run_dir_name = self.started_at.format(RUN_DIR_FORMAT).to_string();

        let mut summaries = Vec::with_capacity(batches.len());
        for (restaurant, batch) in batches {
            self.check_cancelled()?;
            let output_dir = request
                .output_root()
                .join(&restaurant.name)
                .join(&run_dir_name);
            let collaborator_groups = schedules.collaborator_groups(&restaurant.name);
            let summary = self.process_restaurant(
                restaurant,
                batch,
                &pipeline,
                &request.range,
                &collaborator_groups,
                &output_dir,
            )?;
            summaries.push(summary);
        }

        let summary = RunSummary {
            run_id: self.run_id,
            files_read: schedules.files_read,
            duplicate_warnings,
            restaurants: summaries,
        };
        info!(
            invoices = summary.invoices_written(),
            duplicate_warnings, "开票运行完成"
        );
        Ok(summary)
    }

    fn process_restaurant(
        &self,
        restaurant: &RestaurantConfig,
        batch: BookingBatch,
        pipeline: &ValidationPipeline<'_>,
        range: &DateRange,
        collaborator_groups: &[InvalidGroup],
        output_dir: &Path,
    ) -> Result<RestaurantSummary, RunError> {
        let name = restaurant.name.as_str();
        let result = pipeline.partition(batch, range);
        let invalid_table = result.invalid_report(collaborator_groups);
        let cancelled_table = result.cancelled_table();
        let invoices = InvoiceAssembler.assemble(&result.serviced);

        let mut summary = RestaurantSummary {
            restaurant: name.to_string(),
            serviced: result.serviced.len(),
            cancelled: result.cancelled.len(),
            invalid: invalid_table.len(),
            out_of_period: result.out_of_period.len(),
            ..Default::default()
        };

        let has_output =
            !(cancelled_table.is_empty() && invalid_table.is_empty() && invoices.is_empty());
        if has_output {
            fs::create_dir_all(output_dir).map_err(|source| RunError::OutputDir {
                path: output_dir.display().to_string(),
                source,
            })?;
            summary.output_dir = Some(output_dir.to_path_buf());
        }

        if cancelled_table.is_empty() {
            self.reporter.report(format!("No cancelled tours for {}", name));
        } else {
            let path = output_dir.join(format!("{}.xlsx", CANCELLED_NAME));
            write_table(&cancelled_table, &path)?;
            self.reporter.report(format!(
                "Saved {} tours to {}",
                CANCELLED_NAME,
                path.display()
            ));
        }

        if invalid_table.is_empty() {
            self.reporter
                .report(format!("No invalid tour entries for {}", name));
        } else {
            let path = output_dir.join(format!("{}.xlsx", INVALID_NAME));
            write_table(&invalid_table, &path)?;
            self.reporter.report(format!(
                "Saved {} tours to {}",
                INVALID_NAME,
                path.display()
            ));
        }

        if invoices.is_empty() {
            self.reporter.report(format!("No tours found for {}", name));
            return Ok(summary);
        }

        let writer = InvoiceWriter::new(restaurant.address.as_str());
        for assembled in &invoices {
            self.check_cancelled()?;
            let invoice = match assembled {
                Ok(invoice) => invoice,
                Err(e) => {
                    self.report_invoice_failure(&mut summary, e.vendor(), &e.to_string());
                    continue;
                }
            };
            let path = output_dir.join(invoice_file_name(&invoice.vendor));
            match writer.write(invoice, &path) {
                Ok(()) => {
                    self.reporter
                        .report(format!("Saved invoice to {}", path.display()));
                    summary.invoices_written.push(path);
                }
                Err(e) => {
                    self.report_invoice_failure(&mut summary, &invoice.vendor, &e.to_string());
                }
            }
        }

        debug!(
            restaurant = name,
            invoices = summary.invoices_written.len(),
            failures = summary.invoice_failures.len(),
            "餐厅处理完成"
        );
        Ok(summary)
    }

    /// 单个供应商失败: 报告并记录,继续处理其他供应商
    fn report_invoice_failure(&self, summary: &mut RestaurantSummary, vendor: &str, reason: &str) {
        error!(vendor, error = reason, "发票生成失败");
        self.reporter
            .report(format!("Unable to write invoice for {}: {}", vendor, reason));
        summary
            .invoice_failures
            .push((vendor.to_string(), reason.to_string()));
    }
}
