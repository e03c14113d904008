//! 上層製造單欄位帶入子製造單
//!
//! 技術團隊、客戶名稱、業務團隊、運費只在子製造單尚未填寫時帶入。

use mrp_calc::{child_orders, find_parent_order};
use mrp_core::{MrpRepository, OrderFields, OrderId, ProductionOrder, ReportConfig, Result};

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn inherit(parent: &Option<String>, child: &Option<String>) -> Option<String> {
    if !is_blank(parent) && is_blank(child) {
        parent.clone()
    } else {
        None
    }
}

/// 計算子製造單需要帶入的欄位
fn inherited_fields(parent: &ProductionOrder, child: &ProductionOrder) -> OrderFields {
    OrderFields {
        technician_team: inherit(&parent.technician_team, &child.technician_team),
        customer_name: inherit(&parent.customer_name, &child.customer_name),
        sales_team: inherit(&parent.sales_team, &child.sales_team),
        shipping_cost: (!parent.shipping_cost.is_zero() && child.shipping_cost.is_zero())
            .then_some(parent.shipping_cost),
    }
}

/// 新建製造單時，從找到的上層製造單帶入欄位
///
/// 回傳是否有寫入。
pub fn propagate_from_parent<R: MrpRepository + ?Sized>(
    repo: &mut R,
    order_id: OrderId,
) -> Result<bool> {
    let order = repo.require_production(order_id)?;
    let Some(parent) = find_parent_order(&*repo, &order)? else {
        tracing::debug!("製造單 {} 沒有上層製造單", order.name);
        return Ok(false);
    };

    let fields = inherited_fields(&parent, &order);
    if fields.is_empty() {
        return Ok(false);
    }

    repo.write_order_fields(order.id, &fields)?;
    tracing::info!("子製造單 {} 從上層 {} 帶入欄位: {:?}", order.name, parent.name, fields);
    Ok(true)
}

/// 把上層製造單的欄位推送到所有子製造單
///
/// 回傳更新的子製造單數量。
pub fn push_to_children<R: MrpRepository + ?Sized>(
    repo: &mut R,
    order_id: OrderId,
    config: &ReportConfig,
) -> Result<usize> {
    let order = repo.require_production(order_id)?;
    let children = child_orders(&*repo, &order, config);
    if children.is_empty() {
        tracing::info!("製造單 {} 沒有子製造單", order.name);
        return Ok(0);
    }

    let mut updated = 0;
    for child in &children {
        let fields = inherited_fields(&order, child);
        if fields.is_empty() {
            continue;
        }
        repo.write_order_fields(child.id, &fields)?;
        updated += 1;
        tracing::info!("更新子製造單 {} 欄位: {:?}", child.name, fields);
    }

    tracing::info!("製造單 {} 更新了 {} 張子製造單", order.name, updated);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use mrp_core::InMemoryRepository;
    use rust_decimal::Decimal;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new()
            .with_order(
                ProductionOrder::new(1, "MO/001", 10, Decimal::ONE, 1, day(1))
                    .with_parties(Some("Somsak"), Some("Team A"), Some("Sales B"))
                    .with_shipping_cost(Decimal::from(150)),
            )
            .with_order(
                ProductionOrder::new(2, "MO/002", 20, Decimal::ONE, 1, day(2))
                    .with_origin("MO/001")
                    .with_parties(None, Some("Team C"), Some("")),
            )
            .with_order(
                ProductionOrder::new(3, "MO/003", 30, Decimal::ONE, 1, day(3))
                    .with_origin("MO/002")
                    .with_parties(Some("Somsak"), Some("Team A"), Some("Sales B"))
                    .with_shipping_cost(Decimal::from(150)),
            )
    }

    #[test]
    fn test_propagate_only_fills_blank_fields() {
        let mut repo = repo();
        assert!(propagate_from_parent(&mut repo, 2).unwrap());

        let child = repo.require_production(2).unwrap();
        assert_eq!(child.customer_name.as_deref(), Some("Somsak"));
        assert_eq!(child.technician_team.as_deref(), Some("Team C"));
        assert_eq!(child.sales_team.as_deref(), Some("Sales B"));
        assert_eq!(child.shipping_cost, Decimal::from(150));

        // 已完整的製造單與沒有上層的製造單不寫入
        assert!(!propagate_from_parent(&mut repo, 2).unwrap());
        assert!(!propagate_from_parent(&mut repo, 1).unwrap());
    }

    #[test]
    fn test_push_to_children_counts_updates() {
        let mut repo = repo();
        let updated = push_to_children(&mut repo, 1, &ReportConfig::default()).unwrap();

        // MO/003 已有全部欄位
        assert_eq!(updated, 1);
        assert_eq!(
            repo.require_production(2).unwrap().customer_name.as_deref(),
            Some("Somsak")
        );
        assert_eq!(push_to_children(&mut repo, 3, &ReportConfig::default()).unwrap(), 0);
    }
}
