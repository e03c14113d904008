//! 物料清單報表列印戳記

use chrono::NaiveDateTime;
use mrp_core::{MrpRepository, OrderId, PrintStamp, Result};

/// 標記製造單已列印物料清單報表
///
/// 任一製造單不存在時回傳錯誤（先前已寫入的不回復，交由宿主的交易處理）。
pub fn mark_materials_printed<R: MrpRepository + ?Sized>(
    repo: &mut R,
    ids: &[OrderId],
    user: &str,
    now: NaiveDateTime,
) -> Result<usize> {
    for &id in ids {
        repo.write_print_stamp(
            id,
            Some(PrintStamp {
                printed_at: now,
                user: user.to_string(),
            }),
        )?;
    }
    tracing::info!("{} 張製造單標記為已列印物料清單（{}）", ids.len(), user);
    Ok(ids.len())
}

/// 清除列印戳記
pub fn reset_materials_printed<R: MrpRepository + ?Sized>(
    repo: &mut R,
    ids: &[OrderId],
) -> Result<usize> {
    for &id in ids {
        repo.write_print_stamp(id, None)?;
    }
    tracing::info!("{} 張製造單清除物料清單列印狀態", ids.len());
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::{InMemoryRepository, MrpError, ProductionOrder};
    use rust_decimal::Decimal;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 20)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new()
            .with_order(ProductionOrder::new(1, "MO/001", 10, Decimal::ONE, 1, now()))
            .with_order(ProductionOrder::new(2, "MO/002", 10, Decimal::ONE, 1, now()))
    }

    #[test]
    fn test_mark_and_reset() {
        let mut repo = repo();

        assert_eq!(mark_materials_printed(&mut repo, &[1, 2], "admin", now()).unwrap(), 2);
        let order = repo.require_production(2).unwrap();
        assert_eq!(order.print_status(), "Printed");
        assert_eq!(
            order.print_stamp(),
            Some(PrintStamp {
                printed_at: now(),
                user: "admin".to_string()
            })
        );

        reset_materials_printed(&mut repo, &[2]).unwrap();
        let order = repo.require_production(2).unwrap();
        assert_eq!(order.print_status(), "Not Printed");
        assert!(order.bom_materials_print_date.is_none());
        assert!(repo.require_production(1).unwrap().bom_materials_printed);
    }

    #[test]
    fn test_unknown_order_is_error() {
        let mut repo = repo();
        let err = mark_materials_printed(&mut repo, &[1, 99], "admin", now()).unwrap_err();
        assert!(matches!(err, MrpError::OrderNotFound(_)));
    }
}
