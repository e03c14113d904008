//! 製造單關聯
//!
//! 宿主沒有上下層製造單的外鍵，只能依來源單號、補貨群組、
//! 庫存移動的目的關係推測。

use std::collections::BTreeSet;

use mrp_core::{
    MoveState, MrpRepository, OrderState, ProductId, ProductionOrder, ReportConfig, Result,
};

fn has_name(order: &ProductionOrder) -> bool {
    !order.name.is_empty() && order.name != "/"
}

/// 以來源單號遞迴找出所有子製造單
///
/// 搜尋層級與每次筆數受配置限制；查詢失敗只記錄，回傳已找到的部分。
pub fn child_orders<R: MrpRepository + ?Sized>(
    repo: &R,
    order: &ProductionOrder,
    config: &ReportConfig,
) -> Vec<ProductionOrder> {
    let mut children = Vec::new();
    if !has_name(order) {
        return children;
    }

    let mut seen_names = BTreeSet::new();
    collect_children(repo, order, &order.name, 0, config, &mut seen_names, &mut children);
    children
}

fn collect_children<R: MrpRepository + ?Sized>(
    repo: &R,
    root: &ProductionOrder,
    name: &str,
    depth: u32,
    config: &ReportConfig,
    seen_names: &mut BTreeSet<String>,
    children: &mut Vec<ProductionOrder>,
) {
    if depth > config.child_search_depth || !seen_names.insert(name.to_string()) {
        return;
    }

    let found = repo.search_productions(
        &|o: &ProductionOrder| o.origin.as_deref() == Some(name) && o.id != root.id,
        Some(config.child_search_limit),
    );

    match found {
        Ok(direct) => {
            for child in direct {
                if children.iter().any(|c| c.id == child.id) {
                    continue;
                }
                let child_name = child.name.clone();
                children.push(child);
                collect_children(repo, root, &child_name, depth + 1, config, seen_names, children);
            }
        }
        Err(err) => tracing::error!("搜尋子製造單失敗（{}）: {}", name, err),
    }
}

/// 第一層子製造單
pub fn direct_child_orders<R: MrpRepository + ?Sized>(
    repo: &R,
    order: &ProductionOrder,
    config: &ReportConfig,
) -> Result<Vec<ProductionOrder>> {
    if !has_name(order) {
        return Ok(Vec::new());
    }
    repo.search_productions(
        &|o: &ProductionOrder| {
            o.origin.as_deref() == Some(order.name.as_str()) && o.id != order.id
        },
        Some(config.child_search_limit),
    )
}

/// 找出上層製造單
///
/// 依序嘗試：
/// 1. 來源單號等於上層單號
/// 2. 相同補貨群組且建立時間較早（取最近建立者）
/// 3. 上層的原料需求行以本單的成品行為目的移動
pub fn find_parent_order<R: MrpRepository + ?Sized>(
    repo: &R,
    order: &ProductionOrder,
) -> Result<Option<ProductionOrder>> {
    if let Some(origin) = order.origin.as_deref().filter(|o| !o.is_empty()) {
        let by_origin = repo.search_productions(
            &|o: &ProductionOrder| o.name == origin && o.id != order.id,
            Some(1),
        )?;
        if let Some(parent) = by_origin.into_iter().next() {
            tracing::info!("製造單 {} 的上層為 {}（來源單號）", order.name, parent.name);
            return Ok(Some(parent));
        }
    }

    if let Some(group_id) = order.procurement_group_id {
        let mut by_group = repo.search_productions(
            &|o: &ProductionOrder| {
                o.procurement_group_id == Some(group_id)
                    && o.id != order.id
                    && o.create_date < order.create_date
            },
            None,
        )?;
        by_group.sort_by(|a, b| b.create_date.cmp(&a.create_date));
        if let Some(parent) = by_group.into_iter().next() {
            tracing::info!("製造單 {} 的上層為 {}（補貨群組）", order.name, parent.name);
            return Ok(Some(parent));
        }
    }

    let finished = order
        .finished_moves
        .iter()
        .find(|m| m.state != MoveState::Cancel);
    if let Some(finished) = finished {
        let by_move = repo.search_productions(
            &|o: &ProductionOrder| {
                o.id != order.id
                    && o
                        .raw_moves
                        .iter()
                        .any(|m| m.dest_move_ids.contains(&finished.id))
            },
            Some(1),
        );
        match by_move {
            Ok(found) => {
                if let Some(parent) = found.into_iter().next() {
                    tracing::info!("製造單 {} 的上層為 {}（庫存移動）", order.name, parent.name);
                    return Ok(Some(parent));
                }
            }
            Err(err) => tracing::warn!("以庫存移動搜尋上層製造單失敗: {}", err),
        }
    }

    Ok(None)
}

/// 子製造單顯示的狀態
const SUB_ORDER_STATES: [OrderState; 5] = [
    OrderState::Draft,
    OrderState::Confirmed,
    OrderState::Progress,
    OrderState::ToClose,
    OrderState::Done,
];

/// 生產指定組成件的子製造單
pub fn sub_orders_for_component<R: MrpRepository + ?Sized>(
    repo: &R,
    order: &ProductionOrder,
    product_id: ProductId,
    config: &ReportConfig,
) -> Vec<ProductionOrder> {
    let sub_orders: Vec<_> = child_orders(repo, order, config)
        .into_iter()
        .filter(|c| c.product_id == product_id && SUB_ORDER_STATES.contains(&c.state))
        .take(config.sub_mos_per_component)
        .collect();

    tracing::debug!(
        "製造單 {} 的產品 {} 有 {} 張相關子製造單",
        order.name,
        product_id,
        sub_orders.len()
    );
    sub_orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use mrp_core::{DemandLine, FinishedLine, InMemoryRepository};
    use rust_decimal::Decimal;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn mo(id: u64, name: &str, product: u64) -> ProductionOrder {
        ProductionOrder::new(id, name, product, Decimal::ONE, 1, day(id as u32))
    }

    fn chain_repo() -> InMemoryRepository {
        InMemoryRepository::new()
            .with_order(mo(1, "MO/001", 10))
            .with_order(mo(2, "MO/002", 20).with_origin("MO/001"))
            .with_order(mo(3, "MO/003", 30).with_origin("MO/001"))
            .with_order(mo(4, "MO/004", 40).with_origin("MO/002"))
            .with_order(mo(5, "MO/005", 50).with_origin("MO/004"))
            .with_order(mo(6, "MO/006", 60).with_origin("MO/005"))
            .with_order(mo(7, "MO/007", 70).with_origin("MO/006"))
    }

    #[test]
    fn test_child_orders_respect_depth() {
        let repo = chain_repo();
        let root = repo.require_production(1).unwrap();

        let ids: Vec<_> = child_orders(&repo, &root, &ReportConfig::default())
            .iter()
            .map(|o| o.id)
            .collect();
        // 深度 0..=3：MO/002、MO/003、MO/004、MO/005、MO/006
        assert_eq!(ids, vec![2, 4, 5, 6, 3]);

        let shallow = ReportConfig::default().with_child_search(0, 20);
        let ids: Vec<_> = child_orders(&repo, &root, &shallow)
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_child_orders_survive_cycles() {
        let repo = InMemoryRepository::new()
            .with_order(mo(1, "MO/001", 10).with_origin("MO/002"))
            .with_order(mo(2, "MO/002", 20).with_origin("MO/001"));
        let root = repo.require_production(1).unwrap();

        let children = child_orders(&repo, &root, &ReportConfig::default());
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, 2);
    }

    #[test]
    fn test_direct_child_orders() {
        let repo = chain_repo();
        let root = repo.require_production(1).unwrap();
        let ids: Vec<_> = direct_child_orders(&repo, &root, &ReportConfig::default())
            .unwrap()
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_find_parent_by_origin() {
        let repo = chain_repo();
        let child = repo.require_production(4).unwrap();
        let parent = find_parent_order(&repo, &child).unwrap().unwrap();
        assert_eq!(parent.id, 2);
    }

    #[test]
    fn test_find_parent_by_procurement_group_prefers_latest_earlier() {
        let repo = InMemoryRepository::new()
            .with_order(mo(1, "MO/001", 10).with_procurement_group(9))
            .with_order(mo(2, "MO/002", 20).with_procurement_group(9))
            .with_order(mo(3, "MO/003", 30).with_procurement_group(9))
            .with_order(mo(4, "MO/004", 40).with_procurement_group(9));
        let child = repo.require_production(3).unwrap();
        let parent = find_parent_order(&repo, &child).unwrap().unwrap();
        assert_eq!(parent.id, 2);

        let first = repo.require_production(1).unwrap();
        assert!(find_parent_order(&repo, &first).unwrap().is_none());
    }

    #[test]
    fn test_find_parent_by_destination_move() {
        let finished = FinishedLine {
            id: 200,
            product_id: 20,
            product_uom_qty: Decimal::ONE,
            uom_id: 1,
            state: MoveState::Confirmed,
            dest_move_ids: vec![100],
        };
        let repo = InMemoryRepository::new()
            .with_order(mo(1, "MO/001", 10).with_raw_move(
                DemandLine::new(100, 1, 20, Decimal::ONE, 1).with_dest_moves(vec![200]),
            ))
            .with_order(mo(2, "MO/002", 20).with_finished_move(finished));
        let child = repo.require_production(2).unwrap();
        let parent = find_parent_order(&repo, &child).unwrap().unwrap();
        assert_eq!(parent.id, 1);
    }

    #[test]
    fn test_sub_orders_for_component_filters_state_and_limit() {
        let repo = InMemoryRepository::new()
            .with_order(mo(1, "MO/001", 10))
            .with_order(mo(2, "MO/002", 20).with_origin("MO/001"))
            .with_order(
                mo(3, "MO/003", 20)
                    .with_origin("MO/001")
                    .with_state(OrderState::Cancel),
            )
            .with_order(mo(4, "MO/004", 20).with_origin("MO/001"))
            .with_order(mo(5, "MO/005", 30).with_origin("MO/001"));
        let root = repo.require_production(1).unwrap();

        let config = ReportConfig::default();
        let ids: Vec<_> = sub_orders_for_component(&repo, &root, 20, &config)
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![2, 4]);

        let mut limited = ReportConfig::default();
        limited.sub_mos_per_component = 1;
        assert_eq!(sub_orders_for_component(&repo, &root, 20, &limited).len(), 1);
    }
}
