//! 製造單成本計算
//!
//! 計劃成本與實際成本結構相同：
//! 原料（排除由子製造單供應的產品）+ 製程 + 子製造單成本。

use std::collections::BTreeSet;

use mrp_core::{
    MoveState, MrpRepository, OrderId, OrderState, ProductId, ProductionOrder, ReportConfig,
    Result, WorkOrderState,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::linkage::direct_child_orders;

/// 成本明細
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material: Decimal,
    pub operations: Decimal,
    pub sub_orders: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CostBasis {
    Planned,
    Real,
}

impl CostBasis {
    fn label(self) -> &'static str {
        match self {
            CostBasis::Planned => "計劃",
            CostBasis::Real => "實際",
        }
    }
}

/// 成本計算器
pub struct CostCalculator<'a, R: MrpRepository + ?Sized> {
    repo: &'a R,
    config: &'a ReportConfig,
}

impl<'a, R: MrpRepository + ?Sized> CostCalculator<'a, R> {
    pub fn new(repo: &'a R, config: &'a ReportConfig) -> Self {
        Self { repo, config }
    }

    /// 計劃成本：需求數量 × 標準成本、預計工時、所有子製造單
    pub fn planned_cost(&self, order: &ProductionOrder) -> CostBreakdown {
        self.cost_of(order, CostBasis::Planned, &mut BTreeSet::new())
    }

    /// 實際成本：已完成需求行的消耗量、已完成工單的實際工時、已完成的子製造單
    pub fn real_cost(&self, order: &ProductionOrder) -> CostBreakdown {
        self.cost_of(order, CostBasis::Real, &mut BTreeSet::new())
    }

    /// 單張製造單失敗時成本視為 0
    fn cost_of(
        &self,
        order: &ProductionOrder,
        basis: CostBasis,
        visited: &mut BTreeSet<OrderId>,
    ) -> CostBreakdown {
        visited.insert(order.id);
        match self.try_cost_of(order, basis, visited) {
            Ok(breakdown) => breakdown,
            Err(err) => {
                tracing::error!("計算製造單 {} {}成本失敗: {}", order.name, basis.label(), err);
                CostBreakdown::default()
            }
        }
    }

    fn try_cost_of(
        &self,
        order: &ProductionOrder,
        basis: CostBasis,
        visited: &mut BTreeSet<OrderId>,
    ) -> Result<CostBreakdown> {
        let children = direct_child_orders(self.repo, order, self.config)?;
        let child_products: BTreeSet<ProductId> = children.iter().map(|c| c.product_id).collect();

        let mut material = Decimal::ZERO;
        for line in order.active_raw_moves() {
            if basis == CostBasis::Real && line.state != MoveState::Done {
                continue;
            }
            if child_products.contains(&line.product_id) {
                tracing::debug!("產品 {} 由子製造單供應，不計原料成本", line.product_id);
                continue;
            }

            let price = match self.repo.product(line.product_id) {
                Ok(Some(product)) => product.standard_price,
                Ok(None) => {
                    tracing::warn!("找不到產品 {}，略過原料成本", line.product_id);
                    continue;
                }
                Err(err) => {
                    tracing::warn!("讀取產品 {} 失敗: {}", line.product_id, err);
                    continue;
                }
            };
            let qty = match basis {
                CostBasis::Planned => line.product_uom_qty,
                CostBasis::Real => line.quantity,
            };
            material += qty * price;
        }

        let mut operations = Decimal::ZERO;
        for wo in &order.work_orders {
            if basis == CostBasis::Real && wo.state != WorkOrderState::Done {
                continue;
            }

            let costs_hour = match self.repo.workcenter(wo.workcenter_id) {
                Ok(Some(wc)) => wc.costs_hour,
                Ok(None) => {
                    tracing::warn!("找不到工作中心 {}，略過工單 {}", wo.workcenter_id, wo.name);
                    continue;
                }
                Err(err) => {
                    tracing::warn!("讀取工作中心 {} 失敗: {}", wo.workcenter_id, err);
                    continue;
                }
            };
            let minutes = match basis {
                CostBasis::Planned => wo.duration_expected,
                CostBasis::Real => wo.duration,
            };
            operations += minutes * costs_hour / Decimal::from(60);
        }

        let mut sub_orders = Decimal::ZERO;
        for child in &children {
            if basis == CostBasis::Real && child.state != OrderState::Done {
                continue;
            }
            if visited.contains(&child.id) {
                tracing::debug!("子製造單 {} 已計算，略過", child.name);
                continue;
            }
            sub_orders += self.cost_of(child, basis, visited).total;
        }

        let total = material + operations + sub_orders;
        tracing::info!(
            "製造單 {} {}成本：原料 {}，製程 {}，子製造單 {}，合計 {}",
            order.name,
            basis.label(),
            material,
            operations,
            sub_orders,
            total
        );

        Ok(CostBreakdown {
            material,
            operations,
            sub_orders,
            total,
        })
    }
}
