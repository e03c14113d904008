//! 製造單總覽
//!
//! 彙整單張製造單的摘要、組成件（含子製造單）、製程、工資與成本，
//! 供畫面與試算表匯出使用。

use chrono::NaiveDateTime;
use mrp_core::{
    BillOfMaterials, DemandLine, MoveId, MoveState, MrpError, MrpRepository, OrderId, OrderState,
    Product, ProductId, ProductionOrder, ReportConfig, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::costing::CostCalculator;
use crate::linkage::{child_orders, sub_orders_for_component};

/// 收料狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Received,
    Available,
    NotAvailable,
}

impl ReceiptStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReceiptStatus::Received => "Received",
            ReceiptStatus::Available => "Available",
            ReceiptStatus::NotAvailable => "Not Available",
        }
    }

    fn for_line(line: &DemandLine) -> Self {
        if line.state == MoveState::Done {
            ReceiptStatus::Received
        } else if line.reserved_quantity() >= line.product_uom_qty {
            ReceiptStatus::Available
        } else {
            ReceiptStatus::NotAvailable
        }
    }
}

/// 製造單摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoSummary {
    pub id: OrderId,
    pub product_name: String,
    pub mo_name: String,
    pub quantity: Decimal,
    pub uom_name: String,
    pub state: OrderState,
    pub state_label: String,
    pub planned_cost: Decimal,
    pub unit_cost: Decimal,
    pub real_cost: Decimal,
    pub customer_name: String,
    pub technician_team: String,
    pub sales_team: String,
    pub total_labor_cost: Decimal,
    pub shipping_cost: Decimal,
}

/// 子製造單的組成件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubComponentRow {
    pub name: String,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    pub uom_name: String,
    pub state_label: String,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

/// 子製造單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubOrderView {
    pub id: OrderId,
    pub name: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub uom_name: String,
    pub state_label: String,
    pub components: Vec<SubComponentRow>,
    pub total_cost: Decimal,
}

/// 組成件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentRow {
    /// 需求行ID（由 BOM 推得時為 None）
    pub move_id: Option<MoveId>,
    pub name: String,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    pub uom_name: String,
    pub quantity_on_hand: Decimal,
    pub quantity_free: Decimal,
    pub quantity_reserved: Decimal,
    pub state_label: String,
    pub unit_cost: Decimal,
    pub cost: Decimal,
    pub receipt: ReceiptStatus,
    pub sub_orders: Vec<SubOrderView>,
}

/// 製程明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRow {
    pub name: String,
    pub workcenter: String,
    /// 每分鐘成本（找不到工作中心時為 0）
    pub cost_per_minute: Decimal,
    pub duration_expected: Decimal,
    pub duration: Decimal,
    pub state_label: String,
}

/// 製程彙總
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationsView {
    /// 預計總工時（分鐘）
    pub total_minutes: Decimal,
    pub planned_cost: Decimal,
    pub real_cost: Decimal,
    pub details: Vec<OperationRow>,
}

/// 工資領用紀錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborRow {
    pub date: NaiveDateTime,
    pub amount: Decimal,
    pub description: String,
    pub user: String,
}

/// 成本彙總
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub material: Decimal,
    pub labor: Decimal,
    pub shipping: Decimal,
    pub sub_order_labor: Decimal,
    pub sub_order_shipping: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverviewExtras {
    pub unit_planned_cost: Decimal,
    pub unit_real_cost: Decimal,
    pub child_count: usize,
}

/// 製造單總覽
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoOverview {
    pub summary: MoSummary,
    pub components: Vec<ComponentRow>,
    pub operations: OperationsView,
    pub labor_transactions: Vec<LaborRow>,
    pub cost_summary: CostSummary,
    pub extras: OverviewExtras,
}

fn per_unit(amount: Decimal, quantity: Decimal) -> Decimal {
    if quantity.is_zero() {
        Decimal::ZERO
    } else {
        amount / quantity
    }
}

fn description_of(product: &Product) -> String {
    product.description.clone().unwrap_or_default()
}

/// 製造單總覽建構器
pub struct MoOverviewBuilder<'a, R: MrpRepository + ?Sized> {
    repo: &'a R,
    config: &'a ReportConfig,
}

impl<'a, R: MrpRepository + ?Sized> MoOverviewBuilder<'a, R> {
    pub fn new(repo: &'a R, config: &'a ReportConfig) -> Self {
        Self { repo, config }
    }

    /// 建立總覽（找不到製造單時回傳錯誤）
    pub fn build(&self, order_id: OrderId) -> Result<MoOverview> {
        let order = self.repo.require_production(order_id)?;
        tracing::info!("建立製造單總覽: {}", order.name);

        let costs = CostCalculator::new(self.repo, self.config);
        let planned = costs.planned_cost(&order).total;
        let real = costs.real_cost(&order).total;

        let product_name = self
            .repo
            .product(order.product_id)?
            .map(|p| p.name)
            .ok_or(MrpError::ProductNotFound(order.product_id))?;

        let summary = MoSummary {
            id: order.id,
            product_name,
            mo_name: order.name.clone(),
            quantity: order.product_qty,
            uom_name: self.uom_name(order.uom_id),
            state: order.state,
            state_label: order.state.label().to_string(),
            planned_cost: planned,
            unit_cost: per_unit(planned, order.product_qty),
            real_cost: real,
            customer_name: order.customer_name.clone().unwrap_or_default(),
            technician_team: order.technician_team.clone().unwrap_or_default(),
            sales_team: order.sales_team.clone().unwrap_or_default(),
            total_labor_cost: order.total_labor_cost(),
            shipping_cost: order.shipping_cost,
        };

        let mut components = self.components_from_moves(&order);
        if components.is_empty() {
            if let Some(bom) = self.order_bom(&order) {
                components = self.components_from_bom(&order, &bom);
            }
        }

        let operations = if order.work_orders.is_empty() {
            self.order_bom(&order)
                .map(|bom| self.operations_from_bom(&order, &bom))
                .unwrap_or_default()
        } else {
            self.operations_from_work_orders(&order)
        };

        let labor_transactions = order
            .labor_transactions
            .iter()
            .map(|t| LaborRow {
                date: t.transaction_date,
                amount: t.amount,
                description: t.description.clone().unwrap_or_default(),
                user: t.user.clone().unwrap_or_default(),
            })
            .collect();

        let children = child_orders(self.repo, &order, self.config);
        let sub_order_labor: Decimal = children.iter().map(|c| c.total_labor_cost()).sum();
        let sub_order_shipping: Decimal = children.iter().map(|c| c.shipping_cost).sum();

        let cost_summary = CostSummary {
            material: summary.planned_cost,
            labor: summary.total_labor_cost,
            shipping: summary.shipping_cost,
            sub_order_labor,
            sub_order_shipping,
            total: summary.planned_cost
                + summary.total_labor_cost
                + summary.shipping_cost
                + sub_order_labor
                + sub_order_shipping,
        };

        let extras = OverviewExtras {
            unit_planned_cost: per_unit(summary.planned_cost, summary.quantity),
            unit_real_cost: per_unit(summary.real_cost, summary.quantity),
            child_count: children.len(),
        };

        Ok(MoOverview {
            summary,
            components,
            operations,
            labor_transactions,
            cost_summary,
            extras,
        })
    }

    fn uom_name(&self, uom_id: u64) -> String {
        match self.repo.uom(uom_id) {
            Ok(Some(uom)) => uom.name,
            _ => "Units".to_string(),
        }
    }

    fn order_bom(&self, order: &ProductionOrder) -> Option<BillOfMaterials> {
        let bom_id = order.bom_id?;
        match self.repo.bom(bom_id) {
            Ok(bom) => bom,
            Err(err) => {
                tracing::error!("讀取製造單 {} 的 BOM 失敗: {}", order.name, err);
                None
            }
        }
    }

    fn components_from_moves(&self, order: &ProductionOrder) -> Vec<ComponentRow> {
        let mut rows = Vec::new();
        for line in &order.raw_moves {
            let product = match self.repo.product(line.product_id) {
                Ok(Some(product)) => product,
                Ok(None) => {
                    tracing::error!("處理需求行 {} 失敗: 找不到產品 {}", line.id, line.product_id);
                    continue;
                }
                Err(err) => {
                    tracing::error!("處理需求行 {} 失敗: {}", line.id, err);
                    continue;
                }
            };

            rows.push(ComponentRow {
                move_id: Some(line.id),
                name: product.display_name(),
                product_id: product.id,
                description: description_of(&product),
                quantity: line.product_uom_qty,
                uom_name: self.uom_name(line.uom_id),
                quantity_on_hand: product.qty_on_hand,
                quantity_free: product.qty_available,
                quantity_reserved: line.reserved_quantity(),
                state_label: line.state.label().to_string(),
                unit_cost: product.standard_price,
                cost: line.product_uom_qty * product.standard_price,
                receipt: ReceiptStatus::for_line(line),
                sub_orders: self.sub_order_views(order, product.id),
            });
        }
        rows
    }

    fn components_from_bom(&self, order: &ProductionOrder, bom: &BillOfMaterials) -> Vec<ComponentRow> {
        let factor = per_unit(order.product_qty, bom.product_qty);
        let mut rows = Vec::new();

        for bom_line in &bom.lines {
            let product = match self.repo.product(bom_line.product_id) {
                Ok(Some(product)) => product,
                _ => {
                    tracing::error!("BOM 組成件找不到產品 {}", bom_line.product_id);
                    continue;
                }
            };

            let needed = bom_line.product_qty * factor;
            let enough = product.qty_on_hand >= needed;
            rows.push(ComponentRow {
                move_id: None,
                name: product.display_name(),
                product_id: product.id,
                description: description_of(&product),
                quantity: needed,
                uom_name: self.uom_name(bom_line.uom_id),
                quantity_on_hand: product.qty_on_hand,
                quantity_free: product.qty_available,
                quantity_reserved: Decimal::ZERO,
                state_label: if enough { "Available" } else { "To Order" }.to_string(),
                unit_cost: product.standard_price,
                cost: needed * product.standard_price,
                receipt: if enough {
                    ReceiptStatus::Available
                } else {
                    ReceiptStatus::NotAvailable
                },
                sub_orders: self.sub_order_views(order, product.id),
            });
        }
        rows
    }

    fn sub_order_views(&self, order: &ProductionOrder, product_id: ProductId) -> Vec<SubOrderView> {
        let costs = CostCalculator::new(self.repo, self.config);

        sub_orders_for_component(self.repo, order, product_id, self.config)
            .into_iter()
            .map(|sub| {
                let components = self.sub_components(&sub);
                tracing::debug!("子製造單 {} 含 {} 項組成件", sub.name, components.len());

                SubOrderView {
                    id: sub.id,
                    name: sub.name.clone(),
                    product_name: self
                        .repo
                        .product(sub.product_id)
                        .ok()
                        .flatten()
                        .map(|p| p.name)
                        .unwrap_or_default(),
                    quantity: sub.product_qty,
                    uom_name: self.uom_name(sub.uom_id),
                    state_label: sub.state.label().to_string(),
                    total_cost: costs.planned_cost(&sub).total,
                    components,
                }
            })
            .collect()
    }

    /// 子製造單的組成件（無需求行時改用 BOM）
    fn sub_components(&self, sub: &ProductionOrder) -> Vec<SubComponentRow> {
        let limit = self.config.sub_mo_components_limit;
        let mut rows = Vec::new();

        if sub.raw_moves.is_empty() {
            if let Some(bom) = self.order_bom(sub) {
                for bom_line in bom.lines.iter().take(limit) {
                    let Some(product) = self.repo.product(bom_line.product_id).ok().flatten() else {
                        tracing::warn!("子製造單 {} 的 BOM 組成件找不到產品", sub.name);
                        continue;
                    };
                    let quantity = bom_line.product_qty * sub.product_qty;
                    rows.push(SubComponentRow {
                        name: product.display_name(),
                        product_id: product.id,
                        description: description_of(&product),
                        quantity,
                        uom_name: self.uom_name(bom_line.uom_id),
                        state_label: "From BOM".to_string(),
                        unit_cost: product.standard_price,
                        total_cost: quantity * product.standard_price,
                    });
                }
            }
            return rows;
        }

        for line in sub.raw_moves.iter().take(limit) {
            let Some(product) = self.repo.product(line.product_id).ok().flatten() else {
                tracing::warn!("子製造單 {} 的需求行 {} 找不到產品", sub.name, line.id);
                continue;
            };
            rows.push(SubComponentRow {
                name: product.display_name(),
                product_id: product.id,
                description: description_of(&product),
                quantity: line.product_uom_qty,
                uom_name: self.uom_name(line.uom_id),
                state_label: line.state.label().to_string(),
                unit_cost: product.standard_price,
                total_cost: line.product_uom_qty * product.standard_price,
            });
        }
        rows
    }

    fn operations_from_work_orders(&self, order: &ProductionOrder) -> OperationsView {
        let mut view = OperationsView::default();

        for wo in &order.work_orders {
            let workcenter = self.repo.workcenter(wo.workcenter_id).ok().flatten();
            let (wc_name, per_minute) = match &workcenter {
                Some(wc) => (wc.name.clone(), wc.cost_per_minute()),
                None => ("Unknown".to_string(), Decimal::ZERO),
            };

            view.total_minutes += wo.duration_expected;
            view.planned_cost += wo.duration_expected * per_minute;
            view.real_cost += wo.duration * per_minute;
            view.details.push(OperationRow {
                name: wo.name.clone(),
                workcenter: wc_name,
                cost_per_minute: per_minute,
                duration_expected: wo.duration_expected,
                duration: wo.duration,
                state_label: wo.state.label().to_string(),
            });
        }
        view
    }

    fn operations_from_bom(&self, order: &ProductionOrder, bom: &BillOfMaterials) -> OperationsView {
        let mut view = OperationsView::default();

        for operation in &bom.operations {
            let workcenter = self.repo.workcenter(operation.workcenter_id).ok().flatten();
            let (wc_name, per_minute) = match &workcenter {
                Some(wc) => (wc.name.clone(), wc.cost_per_minute()),
                None => ("Unknown".to_string(), Decimal::ZERO),
            };

            let minutes = operation.time_cycle * order.product_qty;
            view.total_minutes += minutes;
            view.planned_cost += minutes * per_minute;
            view.details.push(OperationRow {
                name: operation.name.clone(),
                workcenter: wc_name,
                cost_per_minute: per_minute,
                duration_expected: minutes,
                duration: Decimal::ZERO,
                state_label: OrderState::Draft.label().to_string(),
            });
        }
        view
    }
}
