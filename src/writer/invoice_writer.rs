// ==========================================
// DMC 发票系统 - 发票工作簿写出
// ==========================================
// 版式:
//   A1:B3 餐厅地址块 | E1:H3 供应商名
//   第5行 "Invoice No."(A5:B5) / "Date"(F5, 值区 G5:H5)
//   第7行 表头: Tour Code .. Total
//   明细行: 日期 "dd mmm",Total 为公式 =D*F+E*G
//   空白行 + "Grand Total" =SUM(H..)
// ==========================================

use crate::domain::invoice::{Invoice, InvoiceLine};
use crate::writer::error::{WriterError, WriterResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::path::Path;
use tracing::debug;

/// 明细表头
pub const INVOICE_HEADERS: [&str; 8] = [
    "Tour Code",
    "Service Date",
    "Service Type",
    "Adult",
    "Children",
    "Price Adult",
    "Price Child",
    "Total",
];

/// 表头所在行（0 基）
const HEADER_ROW: u32 = 6;

/// 明细日期格式
const LINE_DATE_FORMAT: &str = "dd mmm";

/// 列宽: A=20, B/C=16, 其余 13
fn column_width(col: u16) -> f64 {
    match col {
        0 => 20.0,
        1 | 2 => 16.0,
        _ => 13.0,
    }
}

/// chrono 日期 → ExcelDateTime（Excel 只支持 1900..=9999 年）
pub fn excel_date(date: NaiveDate) -> WriterResult<ExcelDateTime> {
    let year = u16::try_from(date.year()).unwrap_or_default();
    Ok(ExcelDateTime::from_ymd(
        year,
        date.month() as u8,
        date.day() as u8,
    )?)
}

/// chrono 日期时间 → ExcelDateTime
pub fn excel_datetime(datetime: NaiveDateTime) -> WriterResult<ExcelDateTime> {
    let time = datetime.time();
    Ok(excel_date(datetime.date())?.and_hms(
        time.hour() as u16,
        time.minute() as u8,
        time.second(),
    )?)
}

pub(crate) fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// 发票文件名（路径分隔符替换为 "-"）
pub fn invoice_file_name(vendor: &str) -> String {
    let safe: String = vendor
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    format!("{}.xlsx", safe.trim())
}

struct InvoiceFormats {
    address: Format,
    vendor: Format,
    label: Format,
    header: Format,
    cell: Format,
    date: Format,
    bold_cell: Format,
}

impl InvoiceFormats {
    fn new() -> Self {
        let cell = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        Self {
            address: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_text_wrap()
                .set_align(FormatAlign::Top),
            vendor: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::Top),
            label: Format::new().set_bold(),
            header: cell.clone().set_bold(),
            date: cell.clone().set_num_format(LINE_DATE_FORMAT),
            bold_cell: cell.clone().set_bold(),
            cell,
        }
    }
}

// ==========================================
// InvoiceWriter - 发票写出器
// ==========================================
#[derive(Debug, Clone)]
pub struct InvoiceWriter {
    address: String,
}

impl InvoiceWriter {
    /// # 参数
    /// - address: 开票餐厅地址块（多行文本）
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// 写出一张发票
    pub fn write(&self, invoice: &Invoice, path: &Path) -> WriterResult<()> {
        if invoice.lines.is_empty() {
            return Err(WriterError::EmptyInvoice(invoice.vendor.clone()));
        }

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let formats = InvoiceFormats::new();

        for col in 0..=8u16 {
            worksheet.set_column_width(col, column_width(col))?;
        }

        self.write_header_area(worksheet, &invoice.vendor, &formats)?;

        for (col, title) in INVOICE_HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(HEADER_ROW, col as u16, *title, &formats.header)?;
        }

        let first_row = HEADER_ROW + 1;
        for (idx, line) in invoice.lines.iter().enumerate() {
            write_line(worksheet, first_row + idx as u32, line, &formats)?;
        }
        let last_row = first_row + invoice.lines.len() as u32 - 1;

        // 空白边框行
        let blank_row = last_row + 1;
        for col in 0..8u16 {
            worksheet.write_blank(blank_row, col, &formats.cell)?;
        }

        // 合计行
        let total_row = blank_row + 1;
        for col in 0..6u16 {
            worksheet.write_blank(total_row, col, &formats.cell)?;
        }
        worksheet.write_string_with_format(total_row, 6, "Grand Total", &formats.bold_cell)?;
        let sum = format!("=SUM(H{}:H{})", first_row + 1, last_row + 1);
        worksheet.write_formula_with_format(total_row, 7, sum.as_str(), &formats.bold_cell)?;

        workbook.save(path)?;
        debug!(
            vendor = %invoice.vendor,
            lines = invoice.lines.len(),
            path = %path.display(),
            "发票已写出"
        );
        Ok(())
    }

    fn write_header_area(
        &self,
        worksheet: &mut Worksheet,
        vendor: &str,
        formats: &InvoiceFormats,
    ) -> WriterResult<()> {
        worksheet.merge_range(0, 0, 2, 1, &self.address, &formats.address)?;
        worksheet.merge_range(0, 4, 2, 7, vendor, &formats.vendor)?;

        worksheet.merge_range(4, 0, 4, 1, "Invoice No.", &formats.label)?;
        worksheet.write_string_with_format(4, 5, "Date", &formats.label)?;
        worksheet.merge_range(4, 6, 4, 7, "", &Format::new())?;
        Ok(())
    }
}

fn write_line(
    worksheet: &mut Worksheet,
    row: u32,
    line: &InvoiceLine,
    formats: &InvoiceFormats,
) -> WriterResult<()> {
    match &line.tour_code {
        Some(code) => worksheet.write_string_with_format(row, 0, code, &formats.cell)?,
        None => worksheet.write_blank(row, 0, &formats.cell)?,
    };
    worksheet.write_datetime_with_format(row, 1, &excel_date(line.service_date)?, &formats.date)?;
    worksheet.write_string_with_format(row, 2, &line.service_type, &formats.cell)?;
    for (col, value) in [
        (3u16, line.adult),
        (4, line.children),
        (5, line.price_adult),
        (6, line.price_child),
    ] {
        worksheet.write_number_with_format(row, col, decimal_to_f64(value), &formats.cell)?;
    }

    let n = row + 1;
    let total = format!("=D{n}*F{n}+E{n}*G{n}");
    worksheet.write_formula_with_format(row, 7, total.as_str(), &formats.cell)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::CellValue;
    use crate::importer::file_parser::cell_from_data;
    use calamine::{open_workbook_auto, Data, Reader};
    use tempfile::tempdir;

    fn line(code: &str, day: u32) -> InvoiceLine {
        InvoiceLine {
            tour_code: Some(code.to_string()),
            service_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            service_type: "City Tour".to_string(),
            adult: Decimal::from(2),
            children: Decimal::from(1),
            price_adult: Decimal::from(13),
            price_child: Decimal::from(8),
            total: Decimal::from(34),
        }
    }

    #[test]
    fn test_excel_date_range() {
        assert!(excel_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).is_ok());
        assert!(excel_date(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()).is_err());
        assert!(excel_date(NaiveDate::from_ymd_opt(-5, 1, 1).unwrap()).is_err());
    }

    #[test]
    fn test_invoice_file_name() {
        assert_eq!(invoice_file_name("Acme Tours"), "Acme Tours.xlsx");
        assert_eq!(invoice_file_name("A/B Travel"), "A-B Travel.xlsx");
    }

    #[test]
    fn test_write_invoice_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Acme Tours.xlsx");
        let invoice = Invoice {
            vendor: "Acme Tours".to_string(),
            lines: vec![line("T1", 3), line("T2", 9)],
            grand_total: Decimal::from(68),
        };

        InvoiceWriter::new("Dawat\nParis").write(&invoice, &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let name = workbook.sheet_names()[0].clone();
        let range = workbook.worksheet_range(&name).unwrap();
        assert_eq!(
            range.get_value((0, 4)),
            Some(&Data::String("Acme Tours".to_string()))
        );
        assert_eq!(
            range.get_value((6, 0)),
            Some(&Data::String("Tour Code".to_string()))
        );
        assert_eq!(range.get_value((7, 0)), Some(&Data::String("T1".to_string())));
        assert_eq!(
            range.get_value((8, 1)).map(cell_from_data),
            Some(CellValue::Date(NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()))
        );
        assert_eq!(
            range.get_value((10, 6)),
            Some(&Data::String("Grand Total".to_string()))
        );

        let formulas = workbook.worksheet_formula(&name).unwrap();
        let total = formulas.get_value((7, 7)).cloned().unwrap_or_default();
        assert_eq!(total.replace(' ', ""), "D8*F8+E8*G8");
        let grand = formulas.get_value((10, 7)).cloned().unwrap_or_default();
        assert_eq!(grand, "SUM(H8:H9)");
    }

    #[test]
    fn test_empty_invoice_rejected() {
        let dir = tempdir().unwrap();
        let invoice = Invoice {
            vendor: "Nobody".to_string(),
            lines: Vec::new(),
            grand_total: Decimal::ZERO,
        };
        let result = InvoiceWriter::new("").write(&invoice, &dir.path().join("x.xlsx"));
        assert!(matches!(result, Err(WriterError::EmptyInvoice(_))));
    }
}
