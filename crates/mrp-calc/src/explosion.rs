//! BOM 成本展開
//!
//! 從選定的製造單出發，逐層展開原料需求：
//! - 組成件若由子製造單（MTO）供應，改走子製造單的原料需求
//! - 否則依組成件的一般 BOM 展開
//!
//! 每次執行都重新建立彙總表，執行結束即丟棄。

use std::collections::{BTreeMap, BTreeSet};

use mrp_core::{
    DemandLine, MoveState, MrpError, MrpRepository, OrderId, OrderState, ProductId,
    ProductionOrder, ReportConfig, Result, UomId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 物料彙總（每個產品一筆）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialAggregate {
    pub product_id: ProductId,

    /// 彙總使用的計量單位（第一次出現時的單位）
    pub uom_id: UomId,

    /// 累計需求量
    pub required_qty: Decimal,

    /// 累計已預留量
    pub reserved_qty: Decimal,

    /// 出現的最淺層級
    pub level: u32,

    /// 上層產品
    pub parents: Vec<ProductId>,
}

impl MaterialAggregate {
    /// 缺料量（不小於 0）
    pub fn shortage(&self) -> Decimal {
        (self.required_qty - self.reserved_qty).max(Decimal::ZERO)
    }
}

/// 展開警告（已記錄並略過的失敗）
#[derive(Debug, Clone)]
pub struct ExplosionWarning {
    pub order: String,
    pub product_id: Option<ProductId>,
    pub message: String,
}

/// 展開結果
#[derive(Debug, Clone)]
pub struct ExplosionResult {
    /// 本次執行ID
    pub run_id: Uuid,

    /// 依產品彙總的物料
    pub materials: BTreeMap<ProductId, MaterialAggregate>,

    /// 已展開的製造單
    pub processed_orders: BTreeSet<OrderId>,

    /// 因超過層級上限而截斷的分支數
    pub truncated_branches: usize,

    pub warnings: Vec<ExplosionWarning>,
}

impl ExplosionResult {
    pub fn material(&self, product_id: ProductId) -> Option<&MaterialAggregate> {
        self.materials.get(&product_id)
    }
}

/// 單一製造單的需求明細（執行中使用，輸出前移除）
#[derive(Debug, Default)]
struct OrderShare {
    required: Decimal,
    reserved: Decimal,
    state: Option<MoveState>,
}

#[derive(Debug)]
struct WorkingAggregate {
    uom_id: UomId,
    required: Decimal,
    reserved: Decimal,
    level: u32,
    parents: BTreeSet<ProductId>,
    by_order: BTreeMap<OrderId, OrderShare>,
}

impl WorkingAggregate {
    fn new(uom_id: UomId, level: u32) -> Self {
        Self {
            uom_id,
            required: Decimal::ZERO,
            reserved: Decimal::ZERO,
            level,
            parents: BTreeSet::new(),
            by_order: BTreeMap::new(),
        }
    }
}

/// 單次展開的工作狀態
#[derive(Debug, Default)]
struct ExplosionRun {
    materials: BTreeMap<ProductId, WorkingAggregate>,
    processed: BTreeSet<OrderId>,
    truncated: usize,
    warnings: Vec<ExplosionWarning>,
}

impl ExplosionRun {
    fn finish(self) -> ExplosionResult {
        let materials = self
            .materials
            .into_iter()
            .map(|(product_id, agg)| {
                for (order_id, share) in &agg.by_order {
                    tracing::debug!(
                        "產品 {} / 製造單 {}：需求 {}，預留 {}，狀態 {}",
                        product_id,
                        order_id,
                        share.required,
                        share.reserved,
                        share.state.map_or("N/A", |s| s.label())
                    );
                }
                (
                    product_id,
                    MaterialAggregate {
                        product_id,
                        uom_id: agg.uom_id,
                        required_qty: agg.required,
                        reserved_qty: agg.reserved,
                        level: agg.level,
                        parents: agg.parents.into_iter().collect(),
                    },
                )
            })
            .collect();

        ExplosionResult {
            run_id: Uuid::new_v4(),
            materials,
            processed_orders: self.processed,
            truncated_branches: self.truncated,
            warnings: self.warnings,
        }
    }
}

/// 一次遞迴拜訪的參數
struct Visit<'o> {
    product_id: ProductId,
    qty: Decimal,
    uom_id: UomId,
    context: &'o ProductionOrder,
    level: u32,
    is_direct: bool,
    parent: Option<ProductId>,
}

/// BOM 成本展開引擎
pub struct BomExplosion<'a, R: MrpRepository + ?Sized> {
    repo: &'a R,
    config: &'a ReportConfig,
}

impl<'a, R: MrpRepository + ?Sized> BomExplosion<'a, R> {
    pub fn new(repo: &'a R, config: &'a ReportConfig) -> Self {
        Self { repo, config }
    }

    /// 展開選定的製造單
    pub fn explode(&self, order_ids: &[OrderId]) -> Result<ExplosionResult> {
        if order_ids.is_empty() {
            return Err(MrpError::EmptySelection);
        }

        tracing::info!("開始 BOM 展開：製造單 {} 筆", order_ids.len());

        let mut run = ExplosionRun::default();

        for &order_id in order_ids {
            if run.processed.contains(&order_id) {
                tracing::debug!("製造單 {} 已作為子製造單展開，略過", order_id);
                continue;
            }

            let order = match self.repo.production(order_id) {
                Ok(Some(order)) => order,
                Ok(None) => {
                    tracing::warn!("找不到製造單 {}，略過", order_id);
                    continue;
                }
                Err(err) => {
                    tracing::warn!("讀取製造單 {} 失敗: {}", order_id, err);
                    run.warnings.push(ExplosionWarning {
                        order: order_id.to_string(),
                        product_id: None,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            run.processed.insert(order.id);
            tracing::debug!("展開製造單 {}", order.name);

            for line in order.active_raw_moves() {
                self.visit(
                    &mut run,
                    Visit {
                        product_id: line.product_id,
                        qty: line.product_uom_qty,
                        uom_id: line.uom_id,
                        context: &order,
                        level: 0,
                        is_direct: true,
                        parent: None,
                    },
                );
            }
        }

        let result = run.finish();
        tracing::info!(
            "BOM 展開完成：物料 {} 項，製造單 {} 張，截斷分支 {} 個",
            result.materials.len(),
            result.processed_orders.len(),
            result.truncated_branches
        );

        Ok(result)
    }

    /// 單一組成件的失敗只記錄，不中斷整體展開
    fn visit(&self, run: &mut ExplosionRun, visit: Visit<'_>) {
        let product_id = visit.product_id;
        let order_name = visit.context.name.clone();

        if let Err(err) = self.try_visit(run, visit) {
            record_failure(run, order_name, product_id, &err);
        }
    }

    /// 依倍數展開下一層；數量溢位時只略過該組成件
    fn visit_scaled<'o>(
        &self,
        run: &mut ExplosionRun,
        base: Decimal,
        multiplier: Decimal,
        visit: impl FnOnce(Decimal) -> Visit<'o>,
    ) {
        match base.checked_mul(multiplier) {
            Some(qty) => self.visit(run, visit(qty)),
            None => {
                let visit = visit(Decimal::ZERO);
                let err = MrpError::Other(format!("需求量 {} × {} 溢位", base, multiplier));
                record_failure(run, visit.context.name.clone(), visit.product_id, &err);
            }
        }
    }

    fn try_visit(&self, run: &mut ExplosionRun, visit: Visit<'_>) -> Result<()> {
        let Visit {
            product_id,
            qty,
            uom_id,
            context,
            level,
            is_direct,
            parent,
        } = visit;

        // 層級上限
        if level > self.config.max_explosion_depth {
            tracing::debug!("產品 {} 超過層級上限 {}，截斷", product_id, level);
            run.truncated += 1;
            return Ok(());
        }

        // 累計需求
        let agg_uom = run
            .materials
            .get(&product_id)
            .map_or(uom_id, |agg| agg.uom_id);
        let required = self.to_aggregate_uom(qty, uom_id, agg_uom);

        let agg = run
            .materials
            .entry(product_id)
            .or_insert_with(|| WorkingAggregate::new(uom_id, level));
        agg.required = checked_sum(agg.required, required)?;
        agg.level = agg.level.min(level);
        if let Some(parent) = parent {
            agg.parents.insert(parent);
        }
        let share = agg.by_order.entry(context.id).or_default();
        share.required = checked_sum(share.required, required)?;

        if !is_direct {
            return self.explode_bom(run, product_id, qty, uom_id, context, level);
        }

        // 預留量
        let line = context.demand_line_for(product_id);
        if let Some(line) = line {
            let reserved = self.to_aggregate_uom(line.reserved_quantity(), line.uom_id, agg_uom);
            if let Some(agg) = run.materials.get_mut(&product_id) {
                agg.reserved = checked_sum(agg.reserved, reserved)?;
                let share = agg.by_order.entry(context.id).or_default();
                share.reserved = checked_sum(share.reserved, reserved)?;
                share.state = Some(line.state);
            }
        }

        // 子製造單優先於 BOM 展開
        let sub_order = match self.find_sub_order(run, product_id, context, line) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(
                    "搜尋子製造單失敗（製造單 {}，產品 {}），改依 BOM 展開: {}",
                    context.name,
                    product_id,
                    err
                );
                None
            }
        };
        if let Some(sub_order) = sub_order {
            tracing::debug!(
                "產品 {} 由子製造單 {} 供應（上層 {}）",
                product_id,
                sub_order.name,
                context.name
            );
            run.processed.insert(sub_order.id);

            let ratio = match line {
                Some(line) if !line.product_uom_qty.is_zero() => qty
                    .checked_div(line.product_uom_qty)
                    .ok_or_else(|| {
                        MrpError::Other(format!(
                            "需求量 {} ÷ {} 溢位",
                            qty, line.product_uom_qty
                        ))
                    })?,
                _ => Decimal::ONE,
            };

            for sub_line in sub_order.active_raw_moves() {
                self.visit_scaled(run, sub_line.product_uom_qty, ratio, |qty| Visit {
                    product_id: sub_line.product_id,
                    qty,
                    uom_id: sub_line.uom_id,
                    context: &sub_order,
                    level: level + 1,
                    is_direct: true,
                    parent: Some(product_id),
                });
            }
            return Ok(());
        }

        // 一般 BOM 展開
        self.explode_bom(run, product_id, qty, uom_id, context, level)
    }

    fn explode_bom(
        &self,
        run: &mut ExplosionRun,
        product_id: ProductId,
        qty: Decimal,
        uom_id: UomId,
        context: &ProductionOrder,
        level: u32,
    ) -> Result<()> {
        let Some(bom) = self.repo.bom_for_product(product_id, context.company_id)? else {
            return Ok(());
        };

        let bom_uom = self.repo.require_uom(bom.uom_id)?;
        let factor = if bom.product_qty.is_zero() {
            Decimal::ZERO
        } else {
            let converted = if uom_id == bom.uom_id {
                qty
            } else {
                self.repo.require_uom(uom_id)?.compute_quantity(qty, &bom_uom)?
            };
            let per_unit = converted.checked_div(bom.product_qty).ok_or_else(|| {
                MrpError::Other(format!("需求量 {} ÷ {} 溢位", converted, bom.product_qty))
            })?;
            bom_uom.round(per_unit)?
        };

        for bom_line in &bom.lines {
            self.visit_scaled(run, bom_line.product_qty, factor, |qty| Visit {
                product_id: bom_line.product_id,
                qty,
                uom_id: bom_line.uom_id,
                context,
                level: level + 1,
                is_direct: false,
                parent: Some(product_id),
            });
        }

        Ok(())
    }

    /// 找出為上層製造單生產此組成件的子製造單
    ///
    /// 依序嘗試：來源單號、補貨群組、目的移動，取第一張尚未展開的。
    fn find_sub_order(
        &self,
        run: &ExplosionRun,
        product_id: ProductId,
        context: &ProductionOrder,
        line: Option<&DemandLine>,
    ) -> Result<Option<ProductionOrder>> {
        let limit = Some(self.config.sub_order_search_limit);

        let by_origin = self.repo.search_productions(
            &|o: &ProductionOrder| {
                o.origin.as_deref() == Some(context.name.as_str())
                    && o.product_id == product_id
                    && o.id != context.id
                    && !o.state.is_closed()
            },
            limit,
        )?;
        if let Some(found) = by_origin
            .into_iter()
            .find(|o| !run.processed.contains(&o.id))
        {
            return Ok(Some(found));
        }

        let Some(line) = line else {
            return Ok(None);
        };

        if let Some(group_id) = line.procurement_group_id {
            let by_group = self.repo.search_productions(
                &|o: &ProductionOrder| {
                    o.procurement_group_id == Some(group_id)
                        && o.product_id == product_id
                        && o.id != context.id
                        && o.state != OrderState::Cancel
                },
                limit,
            )?;
            if let Some(found) = by_group
                .into_iter()
                .find(|o| !run.processed.contains(&o.id))
            {
                return Ok(Some(found));
            }
        }

        for &dest_id in &line.dest_move_ids {
            if let Some(owner) = self.repo.production_of_move(dest_id)? {
                if owner.id != context.id && !run.processed.contains(&owner.id) {
                    return Ok(Some(owner));
                }
            }
        }

        Ok(None)
    }

    /// 換算為彙總單位；換算失敗時記錄並使用原始數量
    fn to_aggregate_uom(&self, qty: Decimal, from: UomId, to: UomId) -> Decimal {
        if from == to {
            return qty;
        }

        let converted = self.repo.require_uom(from).and_then(|from_uom| {
            let to_uom = self.repo.require_uom(to)?;
            from_uom.compute_quantity(qty, &to_uom)
        });

        match converted {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("單位換算失敗（{} → {}），使用原始數量: {}", from, to, err);
                qty
            }
        }
    }
}

fn record_failure(run: &mut ExplosionRun, order: String, product_id: ProductId, err: &MrpError) {
    tracing::warn!("展開組成件失敗（製造單 {}，產品 {}）: {}", order, product_id, err);
    run.warnings.push(ExplosionWarning {
        order,
        product_id: Some(product_id),
        message: err.to_string(),
    });
}

fn checked_sum(total: Decimal, qty: Decimal) -> Result<Decimal> {
    total
        .checked_add(qty)
        .ok_or_else(|| MrpError::Other(format!("累計量 {} + {} 溢位", total, qty)))
}
