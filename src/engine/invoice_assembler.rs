// ==========================================
// DMC 发票系统 - 发票组装器
// ==========================================
// 职责: 可开票记录 → 每个供应商一张发票
// 规则: 按展示名分组 → 组内按服务日期升序（稳定）→ 行金额 → 合计
// ==========================================

use crate::domain::booking::ServicedBooking;
use crate::domain::invoice::{Invoice, InvoiceLine};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// 单个供应商的组装失败（不影响其他供应商）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("明细金额溢出 (供应商 {vendor}, 团号 {tour_code})")]
    LineOverflow { vendor: String, tour_code: String },

    #[error("发票合计溢出 (供应商 {vendor})")]
    TotalOverflow { vendor: String },
}

impl AssemblyError {
    pub fn vendor(&self) -> &str {
        match self {
            AssemblyError::LineOverflow { vendor, .. } => vendor,
            AssemblyError::TotalOverflow { vendor } => vendor,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceAssembler;

impl InvoiceAssembler {
    /// 组装发票（按供应商展示名排序;空分组不产生发票）
    ///
    /// # 返回
    /// - 每个供应商一项: Ok(发票) 或 Err(该供应商的金额溢出)
    #[instrument(skip(self, serviced), fields(records = serviced.len()))]
    pub fn assemble(&self, serviced: &[ServicedBooking]) -> Vec<Result<Invoice, AssemblyError>> {
        let mut groups: BTreeMap<&str, Vec<&ServicedBooking>> = BTreeMap::new();
        for booking in serviced {
            groups
                .entry(booking.vendor_name.as_str())
                .or_default()
                .push(booking);
        }

        groups
            .into_iter()
            .filter(|(_, bookings)| !bookings.is_empty())
            .map(|(vendor, mut bookings)| {
                bookings.sort_by_key(|b| b.service_date);
                let result = assemble_vendor(vendor, &bookings);
                if let Err(e) = &result {
                    warn!(vendor, error = %e, "发票组装失败");
                }
                result
            })
            .collect()
    }
}

fn assemble_vendor(vendor: &str, bookings: &[&ServicedBooking]) -> Result<Invoice, AssemblyError> {
    let lines = bookings
        .iter()
        .map(|b| to_line(b))
        .collect::<Result<Vec<InvoiceLine>, AssemblyError>>()?;
    let grand_total = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.total))
        .ok_or_else(|| AssemblyError::TotalOverflow {
            vendor: vendor.to_string(),
        })?;

    debug!(vendor, lines = lines.len(), grand_total = %grand_total, "发票组装完成");
    Ok(Invoice {
        vendor: vendor.to_string(),
        lines,
        grand_total,
    })
}

fn to_line(booking: &ServicedBooking) -> Result<InvoiceLine, AssemblyError> {
    let total = booking
        .line_total()
        .ok_or_else(|| AssemblyError::LineOverflow {
            vendor: booking.vendor_name.clone(),
            tour_code: booking.record.tour_code.clone().unwrap_or_default(),
        })?;
    Ok(InvoiceLine {
        tour_code: booking.record.tour_code.clone(),
        service_date: booking.service_date,
        service_type: booking.service_type.clone(),
        adult: booking.adult,
        children: booking.children,
        price_adult: booking.price_adult,
        price_child: booking.price_child,
        total,
    })
}

/// 组装发票
pub fn assemble(serviced: &[ServicedBooking]) -> Vec<Result<Invoice, AssemblyError>> {
    InvoiceAssembler.assemble(serviced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::{BookingDerived, BookingRecord};
    use crate::domain::cell::{CellValue, Row};
    use crate::domain::types::VendorKey;
    use chrono::NaiveDate;

    fn serviced(
        vendor: &str,
        tour_code: &str,
        day: u32,
        counts: (i64, i64),
        prices: (i64, i64),
    ) -> ServicedBooking {
        let record = BookingRecord {
            restaurant: None,
            tour_code: Some(tour_code.to_string()),
            service_date_raw: CellValue::Empty,
            service_type: None,
            vendor: Some(vendor.to_string()),
            adult: Some(Decimal::from(counts.0)),
            children: Some(Decimal::from(counts.1)),
            remarks: None,
            delivery: None,
            price_adult: None,
            price_child: None,
            row: Row::new(),
            derived: BookingDerived::default(),
        };
        ServicedBooking {
            record,
            service_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            vendor_key: VendorKey::from_raw(vendor),
            vendor_name: vendor.to_string(),
            service_type: "City Tour".to_string(),
            adult: Decimal::from(counts.0),
            children: Decimal::from(counts.1),
            price_adult: Decimal::from(prices.0),
            price_child: Decimal::from(prices.1),
        }
    }

    fn assemble_ok(serviced: &[ServicedBooking]) -> Vec<Invoice> {
        assemble(serviced)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_line_total() {
        let invoices = assemble_ok(&[serviced("Acme Tours", "T1", 5, (2, 1), (13, 8))]);

        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].lines[0].total, Decimal::from(34));
        assert_eq!(invoices[0].grand_total, Decimal::from(34));
    }

    #[test]
    fn test_group_sorted_by_date_and_summed() {
        let invoices = assemble_ok(&[
            serviced("Acme Tours", "late", 20, (2, 1), (13, 8)),
            serviced("Star Tour", "other", 1, (1, 0), (10, 5)),
            serviced("Acme Tours", "early", 3, (1, 2), (13, 8)),
        ]);

        assert_eq!(invoices.len(), 2);
        let acme = &invoices[0];
        assert_eq!(acme.vendor, "Acme Tours");
        let codes: Vec<&str> = acme
            .lines
            .iter()
            .map(|l| l.tour_code.as_deref().unwrap())
            .collect();
        assert_eq!(codes, vec!["early", "late"]);
        assert_eq!(acme.grand_total, Decimal::from(34 + 29));
        assert_eq!(invoices[1].vendor, "Star Tour");
        assert_eq!(invoices[1].grand_total, Decimal::from(10));
    }

    #[test]
    fn test_stable_order_for_same_date() {
        let invoices = assemble_ok(&[
            serviced("Acme Tours", "first", 7, (1, 0), (13, 8)),
            serviced("Acme Tours", "second", 7, (1, 0), (13, 8)),
        ]);
        assert_eq!(invoices[0].lines[0].tour_code.as_deref(), Some("first"));
        assert_eq!(invoices[0].lines[1].tour_code.as_deref(), Some("second"));
    }

    #[test]
    fn test_no_records_no_invoices() {
        assert!(assemble(&[]).is_empty());
    }

    #[test]
    fn test_line_overflow_fails_only_that_vendor() {
        let mut huge = serviced("Acme Tours", "T1", 5, (1, 0), (13, 8));
        huge.adult = Decimal::MAX;

        let results = assemble(&[huge, serviced("Star Tour", "T2", 6, (2, 0), (12, 0))]);

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            Err(AssemblyError::LineOverflow {
                vendor: "Acme Tours".to_string(),
                tour_code: "T1".to_string(),
            })
        );
        let star = results[1].as_ref().unwrap();
        assert_eq!(star.grand_total, Decimal::from(24));
    }

    #[test]
    fn test_grand_total_overflow_fails_vendor() {
        let mut first = serviced("Acme Tours", "T1", 5, (1, 0), (1, 0));
        first.adult = Decimal::MAX;
        let mut second = serviced("Acme Tours", "T2", 6, (1, 0), (1, 0));
        second.adult = Decimal::MAX;

        let results = assemble(&[first, second]);

        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.vendor(), "Acme Tours");
        assert!(matches!(err, AssemblyError::TotalOverflow { .. }));
    }
}
