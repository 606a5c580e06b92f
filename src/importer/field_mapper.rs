// ==========================================
// DMC 发票系统 - 字段映射器实现
// ==========================================
// 职责: 排期表列 → BookingRecord 字段 + 类型转换
// 说明: 源列名已做 Title Case;支持少量列名别名
// ==========================================

use crate::domain::booking::{columns, BookingBatch, BookingRecord, BookingDerived};
use crate::domain::cell::{CellValue, Row};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::importer_trait::FieldMapper;
use tracing::debug;

pub struct BookingFieldMapper;

impl FieldMapper for BookingFieldMapper {
    fn map_to_booking(&self, row: Row) -> BookingRecord {
        let cleaner = DataCleaner;
        let mut row = row;

        // Tour Code 原样保留但去掉首尾空白
        if let Some(CellValue::Text(code)) = row.get_mut(columns::TOUR_CODE) {
            *code = cleaner.clean_text(code);
        }

        BookingRecord {
            restaurant: self.get_string(&row, columns::RESTAURANT),
            tour_code: self.get_string(&row, columns::TOUR_CODE),
            service_date_raw: self
                .get_cell(&row, columns::SERVICE_DATE)
                .cloned()
                .unwrap_or_default(),
            service_type: self.get_string(&row, columns::SERVICE_TYPE),
            vendor: self.get_string(&row, columns::VENDOR),
            adult: self
                .get_cell(&row, columns::ADULT)
                .and_then(|v| cleaner.parse_decimal(v)),
            children: self
                .get_cell(&row, columns::CHILDREN)
                .and_then(|v| cleaner.parse_decimal(v)),
            remarks: self.get_string(&row, columns::REMARKS),
            delivery: self.get_string(&row, columns::DELIVERY),
            price_adult: self
                .get_cell(&row, columns::PRICE_ADULT)
                .and_then(|v| cleaner.parse_decimal(v)),
            price_child: self
                .get_cell(&row, columns::PRICE_CHILD)
                .and_then(|v| cleaner.parse_decimal(v)),
            row,
            derived: BookingDerived::default(),
        }
    }

    fn map_batch(&self, rows: Vec<Row>) -> BookingBatch {
        let has_remarks_column = rows
            .iter()
            .any(|row| self.has_column(row, columns::REMARKS));
        let has_delivery_column = rows
            .iter()
            .any(|row| self.has_column(row, columns::DELIVERY));

        let records: Vec<BookingRecord> =
            rows.into_iter().map(|row| self.map_to_booking(row)).collect();
        debug!(
            records = records.len(),
            has_remarks_column, has_delivery_column, "字段映射完成"
        );

        BookingBatch {
            records,
            has_remarks_column,
            has_delivery_column,
        }
    }
}

impl BookingFieldMapper {
    /// 列名别名
    fn aliases(key: &str) -> &'static [&'static str] {
        match key {
            columns::VENDOR => &["Dmc", "DMC", "Vendor"],
            columns::CHILDREN => &["Children", "Child", "Kids"],
            columns::REMARKS => &["Remarks", "Remark"],
            columns::DELIVERY => &["Delivery", "Delivery Status"],
            columns::TOUR_CODE => &["Tour Code"],
            columns::SERVICE_DATE => &["Service Date", "Date"],
            columns::SERVICE_TYPE => &["Service Type"],
            columns::ADULT => &["Adult", "Adults"],
            columns::PRICE_ADULT => &["Price Adult"],
            columns::PRICE_CHILD => &["Price Child"],
            columns::RESTAURANT => &["Restaurant"],
            _ => &[],
        }
    }

    /// 列是否存在（任一别名）
    fn has_column(&self, row: &Row, key: &str) -> bool {
        Self::aliases(key).iter().any(|alias| row.contains_key(*alias))
    }

    /// 取单元格（第一个非空别名）
    fn get_cell<'a>(&self, row: &'a Row, key: &str) -> Option<&'a CellValue> {
        Self::aliases(key)
            .iter()
            .filter_map(|alias| row.get(*alias))
            .find(|value| !value.is_empty())
    }

    /// 取文本字段（TRIM 后非空）
    fn get_string(&self, row: &Row, key: &str) -> Option<String> {
        self.get_cell(row, key).and_then(|v| v.as_text())
    }
}
