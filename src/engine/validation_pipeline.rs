// ==========================================
// DMC 发票系统 - 预订记录校验管道
// ==========================================
// 职责: 将一批预订记录划分为 可开票 / 作废 / 无效(原因) / 账期外
// 阶段顺序（每阶段只消费上一阶段的通过集）:
//   1. 服务日期解析        → 无效: 日期无法解析
//   2. 账期过滤            → 账期外（不进入任何报告）
//   3. 作废判定            → 作废
//   4. 供应商已知          → 无效: DMC 未知
//   5. 服务类型已知（可选）→ 无效: 服务类型未知
//   6. 费率连接            → 无效: 无费率且无显式单价
//   7. 人数校验            → 无效: 成人/儿童人数均缺失
//   8. 行金额计算          → 无效: 金额无法计算
// 红线: 每条记录有且只有一个去向;分类不走错误通道
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::booking::{BookingBatch, BookingRecord, ServicedBooking};
use crate::domain::invoice::InvoiceLine;
use crate::domain::rate::RateLookup;
use crate::domain::report::{combine_invalid_groups, InvalidGroup, Table};
use crate::domain::types::{DateRange, InvalidReason, MissingColumnPolicy, ValidationOutcome};
use crate::engine::canonicalizer::{normalize_service_type, VendorCanonicalizer};
use crate::importer::data_cleaner::DataCleaner;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

/// 作废标记前缀（小写比较）
pub const CANCEL_PREFIX: &str = "cancel";

/// 单阶段结果: (通过, 拒绝)
pub type StageSplit = (Vec<BookingRecord>, Vec<BookingRecord>);

// ==========================================
// PartitionResult - 划分结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PartitionResult {
    pub serviced: Vec<ServicedBooking>,
    pub cancelled: Vec<BookingRecord>,
    /// 按阶段顺序的无效分组（只含非空分组）
    pub invalid: Vec<(InvalidReason, Vec<BookingRecord>)>,
    /// 账期外记录（属于其他账期,不进入任何报告）
    pub out_of_period: Vec<BookingRecord>,
}

impl PartitionResult {
    /// 记录总数（四类之和 = 输入条数）
    pub fn total(&self) -> usize {
        self.serviced.len()
            + self.cancelled.len()
            + self.invalid_count()
            + self.out_of_period.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid.iter().map(|(_, records)| records.len()).sum()
    }

    /// 某原因的无效记录
    pub fn invalid_for(&self, reason: InvalidReason) -> &[BookingRecord] {
        self.invalid
            .iter()
            .find(|(r, _)| *r == reason)
            .map(|(_, records)| records.as_slice())
            .unwrap_or(&[])
    }

    /// 无效分组（全空列已剔除,原因列首列）
    pub fn invalid_groups(&self) -> Vec<InvalidGroup> {
        self.invalid
            .iter()
            .filter_map(|(reason, records)| InvalidGroup::from_records(reason.as_str(), records))
            .collect()
    }

    /// 合并无效报告: 管道分组在前,协作方预构分组追加在后
    pub fn invalid_report(&self, extra_groups: &[InvalidGroup]) -> Table {
        let groups = self.invalid_groups();
        combine_invalid_groups(groups.iter().chain(extra_groups.iter()))
    }

    /// 作废记录表（原样输出）
    pub fn cancelled_table(&self) -> Table {
        Table::from_records(&self.cancelled)
    }

    /// 每条记录的结果（账期外记录不含在内）
    pub fn outcomes(&self) -> Vec<(&BookingRecord, ValidationOutcome)> {
        let mut outcomes: Vec<(&BookingRecord, ValidationOutcome)> = Vec::new();
        outcomes.extend(
            self.serviced
                .iter()
                .map(|s| (&s.record, ValidationOutcome::Serviced)),
        );
        outcomes.extend(
            self.cancelled
                .iter()
                .map(|r| (r, ValidationOutcome::Cancelled)),
        );
        for (reason, records) in &self.invalid {
            outcomes.extend(
                records
                    .iter()
                    .map(|r| (r, ValidationOutcome::Invalid(*reason))),
            );
        }
        outcomes
    }

    fn push_invalid(&mut self, reason: InvalidReason, records: Vec<BookingRecord>) {
        if !records.is_empty() {
            self.invalid.push((reason, records));
        }
    }
}

// ==========================================
// 各阶段划分函数
// ==========================================

/// 阶段1: 服务日期解析（写入派生日期）
pub fn split_unparseable_dates(records: Vec<BookingRecord>) -> StageSplit {
    let cleaner = DataCleaner;
    records.into_iter().partition_map_records(|mut record| {
        match cleaner.parse_service_date(&record.service_date_raw) {
            Some(date) => {
                record.derived.service_date = Some(date);
                Ok(record)
            }
            None => Err(record),
        }
    })
}

/// 阶段2: 账期过滤（闭区间）
pub fn split_out_of_period(records: Vec<BookingRecord>, range: &DateRange) -> StageSplit {
    records.into_iter().partition_map_records(|record| {
        match record.derived.service_date {
            Some(date) if range.contains(date) => Ok(record),
            _ => Err(record),
        }
    })
}

/// 字段是否以作废标记开头（大小写不敏感）
fn is_cancel_marker(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().to_lowercase().starts_with(CANCEL_PREFIX))
}

/// 阶段3: 作废判定
///
/// Remarks 或 Delivery 任一以 "cancel" 开头即作废;
/// 整批缺少某列时,该子条件取 policy 的值
pub fn split_cancelled(
    records: Vec<BookingRecord>,
    has_remarks_column: bool,
    has_delivery_column: bool,
    policy: MissingColumnPolicy,
) -> StageSplit {
    let missing_signal = policy.as_signal();
    records.into_iter().partition_map_records(|record| {
        let remarks_cancelled = if has_remarks_column {
            is_cancel_marker(record.remarks.as_deref())
        } else {
            missing_signal
        };
        let delivery_cancelled = if has_delivery_column {
            is_cancel_marker(record.delivery.as_deref())
        } else {
            missing_signal
        };
        if remarks_cancelled || delivery_cancelled {
            Err(record)
        } else {
            Ok(record)
        }
    })
}

/// 阶段4: 供应商已知（写入连接键与展示名）
pub fn split_unknown_vendors(
    records: Vec<BookingRecord>,
    rates: &RateLookup,
    canonicalizer: &VendorCanonicalizer,
) -> StageSplit {
    records.into_iter().partition_map_records(|mut record| {
        let key = record
            .vendor
            .as_deref()
            .and_then(|v| canonicalizer.vendor_key(v));
        match key {
            Some(key) if rates.knows_vendor(&key) => {
                record.derived.vendor_name = rates.vendor_name(&key).map(str::to_string);
                record.derived.vendor_key = Some(key);
                Ok(record)
            }
            _ => Err(record),
        }
    })
}

/// 标准化服务类型（缺失为空串）
fn derive_service_type(record: &mut BookingRecord) -> String {
    let service_type = normalize_service_type(record.service_type.as_deref().unwrap_or(""));
    record.derived.service_type = Some(service_type.clone());
    service_type
}

/// 阶段5（可选）: 服务类型已知
pub fn split_unknown_service_types(records: Vec<BookingRecord>, rates: &RateLookup) -> StageSplit {
    records.into_iter().partition_map_records(|mut record| {
        let service_type = derive_service_type(&mut record);
        if rates.knows_service_type(&service_type) {
            Ok(record)
        } else {
            Err(record)
        }
    })
}

/// 阶段6: 费率连接（写入匹配费率）
///
/// 无费率且无任何显式单价 → 拒绝
pub fn split_missing_rates(records: Vec<BookingRecord>, rates: &RateLookup) -> StageSplit {
    records.into_iter().partition_map_records(|mut record| {
        let service_type = derive_service_type(&mut record);
        let entry = record
            .derived
            .vendor_key
            .as_ref()
            .and_then(|key| rates.get(key, &service_type));

        match entry {
            Some(entry) => {
                record.derived.rate_adult = Some(entry.adult_rate);
                record.derived.rate_child = entry.child_rate;
                Ok(record)
            }
            None if record.price_adult.is_some() || record.price_child.is_some() => Ok(record),
            None => Err(record),
        }
    })
}

/// 阶段7: 人数校验
///
/// 两项均缺失 → 拒绝;否则缺失项按 0 处理
pub fn split_missing_counts(records: Vec<BookingRecord>) -> StageSplit {
    records
        .into_iter()
        .partition_map_records(|record| {
            if record.adult.is_none() && record.children.is_none() {
                Err(record)
            } else {
                Ok(record)
            }
        })
}

/// 阶段8: 转为可开票记录（计算行金额）
///
/// 显式单价优先于费率;仍缺失的单价按 0 处理并告警。
/// 行金额溢出 → 拒绝
pub fn split_unbillable(records: Vec<BookingRecord>) -> (Vec<ServicedBooking>, Vec<BookingRecord>) {
    let mut serviced = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for record in records {
        match into_serviced(record) {
            Ok(booking) => serviced.push(booking),
            Err(record) => rejected.push(record),
        }
    }
    (serviced, rejected)
}

fn into_serviced(record: BookingRecord) -> Result<ServicedBooking, BookingRecord> {
    let derived = &record.derived;
    let (Some(service_date), Some(vendor_key), Some(vendor_name)) = (
        derived.service_date,
        derived.vendor_key.clone(),
        derived.vendor_name.clone(),
    ) else {
        error!(
            tour_code = ?record.tour_code,
            has_date = derived.service_date.is_some(),
            has_vendor_key = derived.vendor_key.is_some(),
            has_vendor_name = derived.vendor_name.is_some(),
            "派生字段缺失,记录无法开票"
        );
        return Err(record);
    };
    let service_type = derived.service_type.clone().unwrap_or_default();

    let price_adult = record.price_adult.or(derived.rate_adult);
    let price_child = record.price_child.or(derived.rate_child);
    if price_adult.is_none() || price_child.is_none() {
        warn!(
            tour_code = ?record.tour_code,
            vendor = %vendor_name,
            service_type = %service_type,
            adult_missing = price_adult.is_none(),
            child_missing = price_child.is_none(),
            "单价缺失,按 0 处理"
        );
    }

    let adult = record.adult.unwrap_or(Decimal::ZERO);
    let children = record.children.unwrap_or(Decimal::ZERO);
    let price_adult = price_adult.unwrap_or(Decimal::ZERO);
    let price_child = price_child.unwrap_or(Decimal::ZERO);
    if InvoiceLine::compute_total(adult, price_adult, children, price_child).is_none() {
        warn!(
            tour_code = ?record.tour_code,
            vendor = %vendor_name,
            adult = %adult,
            children = %children,
            "行金额溢出"
        );
        return Err(record);
    }

    Ok(ServicedBooking {
        service_date,
        vendor_key,
        vendor_name,
        service_type,
        adult,
        children,
        price_adult,
        price_child,
        record,
    })
}

/// Vec<BookingRecord> 的 (通过, 拒绝) 划分
trait PartitionRecords: Iterator<Item = BookingRecord> + Sized {
    fn partition_map_records<F>(self, mut f: F) -> StageSplit
    where
        F: FnMut(BookingRecord) -> Result<BookingRecord, BookingRecord>,
    {
        let mut pass = Vec::new();
        let mut reject = Vec::new();
        for record in self {
            match f(record) {
                Ok(record) => pass.push(record),
                Err(record) => reject.push(record),
            }
        }
        (pass, reject)
    }
}

impl<I: Iterator<Item = BookingRecord>> PartitionRecords for I {}

// ==========================================
// ValidationPipeline - 校验管道
// ==========================================
pub struct ValidationPipeline<'a> {
    rates: &'a RateLookup,
    canonicalizer: &'a VendorCanonicalizer,
    options: PipelineConfig,
}

impl<'a> ValidationPipeline<'a> {
    pub fn new(
        rates: &'a RateLookup,
        canonicalizer: &'a VendorCanonicalizer,
        options: PipelineConfig,
    ) -> Self {
        Self {
            rates,
            canonicalizer,
            options,
        }
    }

    /// 划分一批预订记录
    ///
    /// # 参数
    /// - batch: 同一餐厅的预订记录
    /// - range: 账期 [from, to]
    #[instrument(skip(self, batch), fields(records = batch.len(), range = %range))]
    pub fn partition(&self, batch: BookingBatch, range: &DateRange) -> PartitionResult {
        let BookingBatch {
            records,
            has_remarks_column,
            has_delivery_column,
        } = batch;
        let mut result = PartitionResult::default();

        // === 阶段1: 日期解析 ===
        let (records, unparseable) = split_unparseable_dates(records);
        result.push_invalid(InvalidReason::UnparseableDate, unparseable);

        // === 阶段2: 账期过滤 ===
        let (records, out_of_period) = split_out_of_period(records, range);
        result.out_of_period = out_of_period;

        // === 阶段3: 作废判定 ===
        if !has_remarks_column || !has_delivery_column {
            debug!(
                has_remarks_column,
                has_delivery_column,
                policy = ?self.options.missing_cancellation_column,
                "作废列缺失,按口径处理"
            );
        }
        let (records, cancelled) = split_cancelled(
            records,
            has_remarks_column,
            has_delivery_column,
            self.options.missing_cancellation_column,
        );
        result.cancelled = cancelled;

        // === 阶段4: 供应商已知 ===
        let (records, unknown_vendors) =
            split_unknown_vendors(records, self.rates, self.canonicalizer);
        result.push_invalid(InvalidReason::UnknownVendor, unknown_vendors);

        // === 阶段5: 服务类型已知（严格模式）===
        let records = if self.options.strict_service_types {
            let (records, unknown_types) = split_unknown_service_types(records, self.rates);
            result.push_invalid(InvalidReason::UnknownServiceType, unknown_types);
            records
        } else {
            records
        };

        // === 阶段6: 费率连接 ===
        let (records, missing_rates) = split_missing_rates(records, self.rates);
        result.push_invalid(InvalidReason::MissingRate, missing_rates);

        // === 阶段7: 人数校验 ===
        let (records, missing_counts) = split_missing_counts(records);
        result.push_invalid(InvalidReason::MissingCounts, missing_counts);

        // === 阶段8: 行金额 ===
        let (serviced, unbillable) = split_unbillable(records);
        result.push_invalid(InvalidReason::Unbillable, unbillable);
        result.serviced = serviced;

        info!(
            serviced = result.serviced.len(),
            cancelled = result.cancelled.len(),
            invalid = result.invalid_count(),
            out_of_period = result.out_of_period.len(),
            "记录划分完成"
        );
        result
    }
}

/// 以默认选项、无别名表划分
pub fn partition(batch: BookingBatch, rates: &RateLookup, range: &DateRange) -> PartitionResult {
    let canonicalizer = VendorCanonicalizer::without_aliases();
    ValidationPipeline::new(rates, &canonicalizer, PipelineConfig::default()).partition(batch, range)
}
