//! 工單作業表
//!
//! 每張製造單列出工單與掃碼網址（列印為 QR Code）。

use mrp_core::{MrpRepository, OrderId, ReportConfig, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 工單列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksheetLine {
    pub id: u64,
    pub name: String,
    pub workcenter: String,
    pub duration_expected: Decimal,
    pub state_label: String,
    pub qr_payload: String,
}

/// 作業表上的製造單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksheetOrder {
    pub order_name: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub uom_name: String,
    pub state_label: String,
    pub work_orders: Vec<WorksheetLine>,
}

pub struct WorksheetReport;

impl WorksheetReport {
    /// 依選取順序產生作業表，任一製造單不存在時回傳錯誤
    pub fn generate<R: MrpRepository + ?Sized>(
        repo: &R,
        config: &ReportConfig,
        ids: &[OrderId],
    ) -> Result<Vec<WorksheetOrder>> {
        let mut orders = Vec::with_capacity(ids.len());

        for &id in ids {
            let order = repo.require_production(id)?;
            let product_name = repo
                .product(order.product_id)?
                .map(|p| p.display_name())
                .unwrap_or_default();
            let uom_name = repo.uom(order.uom_id)?.map(|u| u.name).unwrap_or_default();

            let mut work_orders = Vec::with_capacity(order.work_orders.len());
            for wo in &order.work_orders {
                let workcenter = repo
                    .workcenter(wo.workcenter_id)?
                    .map(|wc| wc.name)
                    .unwrap_or_else(|| "Unknown".to_string());
                work_orders.push(WorksheetLine {
                    id: wo.id,
                    name: wo.name.clone(),
                    workcenter,
                    duration_expected: wo.duration_expected,
                    state_label: wo.state.label().to_string(),
                    qr_payload: config.scan_url(wo.id),
                });
            }

            tracing::debug!("作業表 {}：{} 張工單", order.name, work_orders.len());
            orders.push(WorksheetOrder {
                order_name: order.name,
                product_name,
                quantity: order.product_qty,
                uom_name,
                state_label: order.state.label().to_string(),
                work_orders,
            });
        }

        tracing::info!("產生工單作業表，共 {} 張製造單", orders.len());
        Ok(orders)
    }
}
