//! 資料存取介面
//!
//! 宿主 ERP 的資料層（查詢、權限、交易）不在本系統範圍內，
//! 本模組只定義報表與生命週期邏輯需要的讀寫操作。

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::{
    BillOfMaterials, Delivery, MoveId, MrpError, OrderId, OrderState, PrintStamp, Product,
    ProductId, ProductionOrder, Result, Uom, UomId, WorkOrder, WorkOrderState, Workcenter,
};

/// 製造單查詢條件
pub type OrderFilter<'a> = dyn Fn(&ProductionOrder) -> bool + 'a;

/// 出貨單查詢條件
pub type DeliveryFilter<'a> = dyn Fn(&Delivery) -> bool + 'a;

/// 可由上層製造單帶入子製造單的欄位（None 表示不修改）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFields {
    pub technician_team: Option<String>,
    pub customer_name: Option<String>,
    pub sales_team: Option<String>,
    pub shipping_cost: Option<Decimal>,
}

impl OrderFields {
    pub fn is_empty(&self) -> bool {
        self.technician_team.is_none()
            && self.customer_name.is_none()
            && self.sales_team.is_none()
            && self.shipping_cost.is_none()
    }
}

/// 製造資料存取
pub trait MrpRepository {
    /// 讀取製造單
    fn production(&self, id: OrderId) -> Result<Option<ProductionOrder>>;

    /// 依條件搜尋製造單（依ID排序）
    fn search_productions(
        &self,
        filter: &OrderFilter<'_>,
        limit: Option<usize>,
    ) -> Result<Vec<ProductionOrder>>;

    /// 找出擁有指定庫存移動的製造單
    fn production_of_move(&self, move_id: MoveId) -> Result<Option<ProductionOrder>>;

    fn product(&self, id: ProductId) -> Result<Option<Product>>;

    fn uom(&self, id: UomId) -> Result<Option<Uom>>;

    fn workcenter(&self, id: u64) -> Result<Option<Workcenter>>;

    fn bom(&self, id: u64) -> Result<Option<BillOfMaterials>>;

    /// 找出產品的一般 BOM（符合公司或不限公司）
    fn bom_for_product(
        &self,
        product_id: ProductId,
        company_id: u64,
    ) -> Result<Option<BillOfMaterials>>;

    fn search_deliveries(&self, filter: &DeliveryFilter<'_>) -> Result<Vec<Delivery>>;

    fn work_order(&self, id: u64) -> Result<Option<WorkOrder>>;

    /// 寫入（或清除）物料清單報表列印戳記
    fn write_print_stamp(&mut self, id: OrderId, stamp: Option<PrintStamp>) -> Result<()>;

    fn write_order_fields(&mut self, id: OrderId, fields: &OrderFields) -> Result<()>;

    /// 寫入製造單狀態
    fn write_state(
        &mut self,
        id: OrderId,
        state: OrderState,
        finished_at: Option<NaiveDateTime>,
    ) -> Result<()>;

    fn write_work_order_state(&mut self, id: u64, state: WorkOrderState) -> Result<()>;

    /// 依ID讀取多張製造單（不存在的ID略過）
    fn productions(&self, ids: &[OrderId]) -> Result<Vec<ProductionOrder>> {
        let mut orders = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(order) = self.production(id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// 依條件計數
    fn count_productions(&self, filter: &OrderFilter<'_>) -> Result<usize> {
        Ok(self.search_productions(filter, None)?.len())
    }

    /// 讀取製造單，不存在時回傳錯誤
    fn require_production(&self, id: OrderId) -> Result<ProductionOrder> {
        self.production(id)?
            .ok_or_else(|| MrpError::OrderNotFound(id.to_string()))
    }

    /// 讀取計量單位，不存在時回傳錯誤
    fn require_uom(&self, id: UomId) -> Result<Uom> {
        self.uom(id)?.ok_or(MrpError::UomNotFound(id))
    }
}
