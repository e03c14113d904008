//! 記憶體資料存取實作
//!
//! 以 `BTreeMap` 依ID保存所有記錄，查詢結果順序固定，
//! 可從 JSON 快照載入（測試資料、示範程式使用）。

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    BillOfMaterials, BomType, Delivery, DeliveryFilter, MoveId, MrpError, MrpRepository,
    OrderFields, OrderFilter, OrderId, OrderState, PrintStamp, Product, ProductId,
    ProductionOrder, Result, Uom, UomId, WorkOrder, WorkOrderState, Workcenter,
};

/// 資料快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub orders: Vec<ProductionOrder>,
    pub products: Vec<Product>,
    pub uoms: Vec<Uom>,
    pub boms: Vec<BillOfMaterials>,
    pub workcenters: Vec<Workcenter>,
    pub deliveries: Vec<Delivery>,
}

/// 記憶體資料存取
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    orders: BTreeMap<OrderId, ProductionOrder>,
    products: BTreeMap<ProductId, Product>,
    uoms: BTreeMap<UomId, Uom>,
    boms: BTreeMap<u64, BillOfMaterials>,
    workcenters: BTreeMap<u64, Workcenter>,
    deliveries: BTreeMap<u64, Delivery>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從快照建立
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut repo = Self::new();
        for order in snapshot.orders {
            repo.insert_order(order);
        }
        repo.products
            .extend(snapshot.products.into_iter().map(|p| (p.id, p)));
        repo.uoms.extend(snapshot.uoms.into_iter().map(|u| (u.id, u)));
        repo.boms.extend(snapshot.boms.into_iter().map(|b| (b.id, b)));
        repo.workcenters
            .extend(snapshot.workcenters.into_iter().map(|w| (w.id, w)));
        repo.deliveries
            .extend(snapshot.deliveries.into_iter().map(|d| (d.id, d)));
        repo
    }

    /// 從 JSON 快照建立
    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// 匯出快照
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            orders: self.orders.values().cloned().collect(),
            products: self.products.values().cloned().collect(),
            uoms: self.uoms.values().cloned().collect(),
            boms: self.boms.values().cloned().collect(),
            workcenters: self.workcenters.values().cloned().collect(),
            deliveries: self.deliveries.values().cloned().collect(),
        }
    }

    /// 建構器模式：添加製造單
    pub fn with_order(mut self, order: ProductionOrder) -> Self {
        self.insert_order(order);
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.insert(product.id, product);
        self
    }

    pub fn with_uom(mut self, uom: Uom) -> Self {
        self.uoms.insert(uom.id, uom);
        self
    }

    pub fn with_bom(mut self, bom: BillOfMaterials) -> Self {
        self.boms.insert(bom.id, bom);
        self
    }

    pub fn with_workcenter(mut self, workcenter: Workcenter) -> Self {
        self.workcenters.insert(workcenter.id, workcenter);
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.deliveries.insert(delivery.id, delivery);
        self
    }

    /// 新增或取代製造單
    ///
    /// 需求行與工單的 `production_id` 一律改寫為本單ID。
    pub fn insert_order(&mut self, mut order: ProductionOrder) {
        for line in &mut order.raw_moves {
            line.production_id = order.id;
        }
        for wo in &mut order.work_orders {
            wo.production_id = order.id;
        }
        self.orders.insert(order.id, order);
    }

    /// 所有製造單（依ID排序）
    pub fn orders(&self) -> impl Iterator<Item = &ProductionOrder> {
        self.orders.values()
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut ProductionOrder> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| MrpError::OrderNotFound(id.to_string()))
    }
}

impl MrpRepository for InMemoryRepository {
    fn production(&self, id: OrderId) -> Result<Option<ProductionOrder>> {
        Ok(self.orders.get(&id).cloned())
    }

    fn search_productions(
        &self,
        filter: &OrderFilter<'_>,
        limit: Option<usize>,
    ) -> Result<Vec<ProductionOrder>> {
        let matched = self.orders.values().filter(|o| filter(o)).cloned();
        Ok(match limit {
            Some(n) => matched.take(n).collect(),
            None => matched.collect(),
        })
    }

    fn count_productions(&self, filter: &OrderFilter<'_>) -> Result<usize> {
        Ok(self.orders.values().filter(|o| filter(o)).count())
    }

    fn production_of_move(&self, move_id: MoveId) -> Result<Option<ProductionOrder>> {
        Ok(self.orders.values().find(|o| o.owns_move(move_id)).cloned())
    }

    fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.get(&id).cloned())
    }

    fn uom(&self, id: UomId) -> Result<Option<Uom>> {
        Ok(self.uoms.get(&id).cloned())
    }

    fn workcenter(&self, id: u64) -> Result<Option<Workcenter>> {
        Ok(self.workcenters.get(&id).cloned())
    }

    fn bom(&self, id: u64) -> Result<Option<BillOfMaterials>> {
        Ok(self.boms.get(&id).cloned())
    }

    fn bom_for_product(
        &self,
        product_id: ProductId,
        company_id: u64,
    ) -> Result<Option<BillOfMaterials>> {
        Ok(self
            .boms
            .values()
            .find(|b| {
                b.product_id == product_id
                    && b.bom_type == BomType::Normal
                    && b.applies_to_company(company_id)
            })
            .cloned())
    }

    fn search_deliveries(&self, filter: &DeliveryFilter<'_>) -> Result<Vec<Delivery>> {
        Ok(self
            .deliveries
            .values()
            .filter(|d| filter(d))
            .cloned()
            .collect())
    }

    fn work_order(&self, id: u64) -> Result<Option<WorkOrder>> {
        Ok(self
            .orders
            .values()
            .flat_map(|o| o.work_orders.iter())
            .find(|wo| wo.id == id)
            .cloned())
    }

    fn write_print_stamp(&mut self, id: OrderId, stamp: Option<PrintStamp>) -> Result<()> {
        let order = self.order_mut(id)?;
        match stamp {
            Some(stamp) => {
                order.bom_materials_printed = true;
                order.bom_materials_print_date = Some(stamp.printed_at);
                order.bom_materials_print_user = Some(stamp.user);
            }
            None => {
                order.bom_materials_printed = false;
                order.bom_materials_print_date = None;
                order.bom_materials_print_user = None;
            }
        }
        Ok(())
    }

    fn write_order_fields(&mut self, id: OrderId, fields: &OrderFields) -> Result<()> {
        let order = self.order_mut(id)?;
        if let Some(team) = &fields.technician_team {
            order.technician_team = Some(team.clone());
        }
        if let Some(customer) = &fields.customer_name {
            order.customer_name = Some(customer.clone());
        }
        if let Some(team) = &fields.sales_team {
            order.sales_team = Some(team.clone());
        }
        if let Some(cost) = fields.shipping_cost {
            order.shipping_cost = cost;
        }
        Ok(())
    }

    fn write_state(
        &mut self,
        id: OrderId,
        state: OrderState,
        finished_at: Option<NaiveDateTime>,
    ) -> Result<()> {
        let order = self.order_mut(id)?;
        order.state = state;
        if finished_at.is_some() {
            order.date_finished = finished_at;
        }
        Ok(())
    }

    fn write_work_order_state(&mut self, id: u64, state: WorkOrderState) -> Result<()> {
        let wo = self
            .orders
            .values_mut()
            .flat_map(|o| o.work_orders.iter_mut())
            .find(|wo| wo.id == id)
            .ok_or(MrpError::WorkOrderNotFound(id))?;
        wo.state = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DemandLine;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 3)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new()
            .with_order(
                ProductionOrder::new(2, "MO/002", 20, Decimal::ONE, 1, now())
                    .with_origin("MO/001")
                    .with_work_order(WorkOrder::new(7, "Weld", 0, 1, Decimal::from(45))),
            )
            .with_order(
                ProductionOrder::new(1, "MO/001", 10, Decimal::from(2), 1, now())
                    .with_raw_move(DemandLine::new(100, 0, 20, Decimal::from(2), 1)),
            )
            .with_bom(BillOfMaterials::new(5, 20, Decimal::ONE, 1).with_company(2))
            .with_bom(BillOfMaterials::new(6, 20, Decimal::ONE, 1).with_type(BomType::Phantom))
            .with_bom(BillOfMaterials::new(9, 20, Decimal::ONE, 1))
    }

    #[test]
    fn test_search_is_ordered_and_limited() {
        let repo = repo();
        let all = repo.search_productions(&|_| true, None).unwrap();
        assert_eq!(all.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 2]);

        let limited = repo.search_productions(&|_| true, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);

        let children = repo
            .count_productions(&|o: &ProductionOrder| o.origin.as_deref() == Some("MO/001"))
            .unwrap();
        assert_eq!(children, 1);
    }

    #[test]
    fn test_insert_rewrites_owner_ids() {
        let repo = repo();
        let owner = repo.production_of_move(100).unwrap().unwrap();
        assert_eq!(owner.id, 1);
        assert_eq!(owner.raw_moves[0].production_id, 1);
        assert_eq!(repo.work_order(7).unwrap().unwrap().production_id, 2);
    }

    #[test]
    fn test_bom_for_product_respects_type_and_company() {
        let repo = repo();
        assert_eq!(repo.bom_for_product(20, 1).unwrap().unwrap().id, 9);
        assert_eq!(repo.bom_for_product(20, 2).unwrap().unwrap().id, 5);
        assert!(repo.bom_for_product(99, 1).unwrap().is_none());
    }

    #[test]
    fn test_writes() {
        let mut repo = repo();
        repo.write_print_stamp(
            1,
            Some(PrintStamp {
                printed_at: now(),
                user: "admin".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(repo.require_production(1).unwrap().print_status(), "Printed");

        repo.write_print_stamp(1, None).unwrap();
        assert!(!repo.require_production(1).unwrap().bom_materials_printed);

        repo.write_state(2, OrderState::Done, Some(now())).unwrap();
        let done = repo.require_production(2).unwrap();
        assert_eq!(done.state, OrderState::Done);
        assert_eq!(done.date_finished, Some(now()));

        repo.write_work_order_state(7, WorkOrderState::Progress).unwrap();
        assert_eq!(
            repo.work_order(7).unwrap().unwrap().state,
            WorkOrderState::Progress
        );

        assert!(matches!(
            repo.write_state(99, OrderState::Done, None),
            Err(MrpError::OrderNotFound(_))
        ));
        assert!(matches!(
            repo.write_work_order_state(99, WorkOrderState::Done),
            Err(MrpError::WorkOrderNotFound(99))
        ));
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let json = serde_json::to_string(&repo().snapshot()).unwrap();
        let loaded = InMemoryRepository::from_json_str(&json).unwrap();
        assert_eq!(loaded.orders().count(), 2);
        assert_eq!(loaded.bom_for_product(20, 1).unwrap().unwrap().id, 9);
    }
}
