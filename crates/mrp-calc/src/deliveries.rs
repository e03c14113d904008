//! 製造單相關出貨單

use std::collections::BTreeSet;

use mrp_core::{
    Delivery, MoveState, MrpRepository, OrderId, ProductionOrder, ReportConfig, Result,
};

use crate::linkage::child_orders;

/// 找出製造單（含所有子製造單）相關的出貨單
///
/// 1. 來源單號為任一製造單單號的出庫單（排除取消）
/// 2. 含有由任一製造單生產之庫存移動的出貨單
///
/// 兩者聯集，依ID排序。
pub fn related_deliveries<R: MrpRepository + ?Sized>(
    repo: &R,
    order: &ProductionOrder,
    config: &ReportConfig,
) -> Result<Vec<Delivery>> {
    let children = child_orders(repo, order, config);

    let mut names: BTreeSet<&str> = BTreeSet::new();
    let mut ids: BTreeSet<OrderId> = BTreeSet::new();
    names.insert(order.name.as_str());
    ids.insert(order.id);
    for child in &children {
        names.insert(child.name.as_str());
        ids.insert(child.id);
    }

    let by_origin = repo.search_deliveries(&|d: &Delivery| {
        d.is_open_outgoing() && d.origin.as_deref().is_some_and(|o| names.contains(o))
    })?;
    let by_move = repo.search_deliveries(&|d: &Delivery| {
        d.moves.iter().any(|m| {
            m.state != MoveState::Cancel && m.production_id.is_some_and(|p| ids.contains(&p))
        })
    })?;

    let mut seen = BTreeSet::new();
    let mut deliveries: Vec<Delivery> = by_origin
        .into_iter()
        .chain(by_move)
        .filter(|d| seen.insert(d.id))
        .collect();
    deliveries.sort_by_key(|d| d.id);

    tracing::info!(
        "製造單 {} 找到 {} 張相關出貨單（搜尋 {} 張製造單）",
        order.name,
        deliveries.len(),
        ids.len()
    );
    Ok(deliveries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::{DeliveryMove, InMemoryRepository, PickingType};
    use rust_decimal::Decimal;

    fn delivery(id: u64, origin: Option<&str>, picking_type: PickingType, state: MoveState) -> Delivery {
        Delivery {
            id,
            name: format!("WH/OUT/{:05}", id),
            origin: origin.map(str::to_string),
            picking_type,
            state,
            scheduled_date: None,
            moves: Vec::new(),
        }
    }

    #[test]
    fn test_related_deliveries_union() {
        let created = NaiveDate::from_ymd_opt(2025, 11, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        let mut produced = delivery(4, None, PickingType::Internal, MoveState::Assigned);
        produced.moves.push(DeliveryMove {
            product_id: 20,
            product_uom_qty: Decimal::from(4),
            uom_id: 1,
            state: MoveState::Assigned,
            production_id: Some(2),
        });
        let mut cancelled_move = delivery(5, None, PickingType::Outgoing, MoveState::Assigned);
        cancelled_move.moves.push(DeliveryMove {
            product_id: 20,
            product_uom_qty: Decimal::ONE,
            uom_id: 1,
            state: MoveState::Cancel,
            production_id: Some(1),
        });

        let repo = InMemoryRepository::new()
            .with_order(ProductionOrder::new(1, "MO/001", 10, Decimal::ONE, 1, created))
            .with_order(
                ProductionOrder::new(2, "MO/002", 20, Decimal::ONE, 1, created).with_origin("MO/001"),
            )
            .with_delivery(delivery(1, Some("MO/001"), PickingType::Outgoing, MoveState::Assigned))
            .with_delivery(delivery(2, Some("MO/002"), PickingType::Outgoing, MoveState::Done))
            .with_delivery(delivery(3, Some("MO/001"), PickingType::Outgoing, MoveState::Cancel))
            .with_delivery(produced)
            .with_delivery(cancelled_move)
            .with_delivery(delivery(6, Some("MO/001"), PickingType::Incoming, MoveState::Assigned));

        let order = repo.require_production(1).unwrap();
        let ids: Vec<_> = related_deliveries(&repo, &order, &ReportConfig::default())
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }
}
