// ==========================================
// DMC 发票系统 - 辅助表写出（Invalid / Cancelled）
// ==========================================
// 版式: 表头行 + 数据行;首列宽 30,其余 18
// ==========================================

use crate::domain::cell::CellValue;
use crate::domain::report::Table;
use crate::writer::error::WriterResult;
use crate::writer::invoice_writer::{excel_date, excel_datetime};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;
use tracing::debug;

const FIRST_COLUMN_WIDTH: f64 = 30.0;
const COLUMN_WIDTH: f64 = 18.0;

/// 写出二维表
pub fn write_table(table: &Table, path: &Path) -> WriterResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm");

    for (col, column) in table.columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string(0, col, column)?;
        let width = if col == 0 { FIRST_COLUMN_WIDTH } else { COLUMN_WIDTH };
        worksheet.set_column_width(col, width)?;
    }

    for row_idx in 0..table.len() {
        let row = row_idx as u32 + 1;
        for (col, column) in table.columns.iter().enumerate() {
            write_cell(
                worksheet,
                row,
                col as u16,
                table.cell(row_idx, column),
                &date_format,
                &datetime_format,
            )?;
        }
    }

    workbook.save(path)?;
    debug!(rows = table.len(), columns = table.columns.len(), path = %path.display(), "表格已写出");
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    date_format: &Format,
    datetime_format: &Format,
) -> WriterResult<()> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            worksheet.write_string(row, col, text)?;
        }
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Date(date) => {
            worksheet.write_datetime_with_format(row, col, &excel_date(*date)?, date_format)?;
        }
        CellValue::DateTime(dt) => {
            worksheet.write_datetime_with_format(row, col, &excel_datetime(*dt)?, datetime_format)?;
        }
    }
    Ok(())
}
