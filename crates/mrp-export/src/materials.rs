//! 物料清單報表
//!
//! 產生報表時會在選定的製造單上記錄列印戳記。

use chrono::NaiveDateTime;
use mrp_calc::BomExplosion;
use mrp_core::{MrpRepository, OrderId, ProductId, ReportConfig, Result, UomId};
use mrp_lifecycle::mark_materials_printed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 報表列（每個產品一列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub uom_name: String,
    pub required_qty: Decimal,
    pub reserved_qty: Decimal,
    pub shortage: Decimal,
    /// 0 為製造單直接需求
    pub level: u32,
    pub parents: Vec<String>,
}

impl MaterialRow {
    pub fn is_subcomponent(&self) -> bool {
        self.level > 0
    }
}

/// 物料清單報表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialsReport {
    pub run_id: Uuid,
    pub generated_at: NaiveDateTime,
    pub printed_by: String,
    pub orders: Vec<String>,
    /// 依層級、產品名稱排序
    pub rows: Vec<MaterialRow>,
    pub truncated_branches: usize,
    pub warnings: Vec<String>,
}

impl MaterialsReport {
    /// 產生報表並標記列印
    pub fn generate<R: MrpRepository + ?Sized>(
        repo: &mut R,
        config: &ReportConfig,
        ids: &[OrderId],
        user: &str,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let result = BomExplosion::new(&*repo, config).explode(ids)?;
        let selected = repo.productions(ids)?;

        let mut rows = Vec::with_capacity(result.materials.len());
        for aggregate in result.materials.values() {
            let parents = aggregate
                .parents
                .iter()
                .map(|&id| product_name(&*repo, id))
                .collect();
            rows.push(MaterialRow {
                product_id: aggregate.product_id,
                product_name: product_name(&*repo, aggregate.product_id),
                uom_name: uom_name(&*repo, aggregate.uom_id),
                required_qty: aggregate.required_qty,
                reserved_qty: aggregate.reserved_qty,
                shortage: aggregate.shortage(),
                level: aggregate.level,
                parents,
            });
        }
        rows.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });

        let selected_ids: Vec<OrderId> = selected.iter().map(|o| o.id).collect();
        mark_materials_printed(repo, &selected_ids, user, now)?;

        tracing::info!(
            "物料清單報表 {}：製造單 {} 張，物料 {} 項",
            result.run_id,
            selected.len(),
            rows.len()
        );

        Ok(Self {
            run_id: result.run_id,
            generated_at: now,
            printed_by: user.to_string(),
            orders: selected.into_iter().map(|o| o.name).collect(),
            rows,
            truncated_branches: result.truncated_branches,
            warnings: result
                .warnings
                .into_iter()
                .map(|w| format!("{}: {}", w.order, w.message))
                .collect(),
        })
    }

    pub fn row(&self, product_id: ProductId) -> Option<&MaterialRow> {
        self.rows.iter().find(|r| r.product_id == product_id)
    }

    /// 缺料的物料
    pub fn shortages(&self) -> impl Iterator<Item = &MaterialRow> {
        self.rows.iter().filter(|r| r.shortage > Decimal::ZERO)
    }
}

fn product_name<R: MrpRepository + ?Sized>(repo: &R, id: ProductId) -> String {
    match repo.product(id) {
        Ok(Some(product)) => product.display_name(),
        _ => format!("#{}", id),
    }
}

fn uom_name<R: MrpRepository + ?Sized>(repo: &R, id: UomId) -> String {
    match repo.uom(id) {
        Ok(Some(uom)) => uom.name,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::{
        BillOfMaterials, DemandLine, InMemoryRepository, MoveState, MrpError, Product,
        ProductionOrder, Uom,
    };

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 20)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    /// 桌子需要桌面 1 片（依 BOM 展開為木板 2 片）與螺絲 8 顆
    fn repo() -> InMemoryRepository {
        InMemoryRepository::new()
            .with_uom(Uom::reference(1, "Units", 1))
            .with_product(Product::new(20, "Top", 1).with_default_code("TOP"))
            .with_product(Product::new(30, "Screw", 1))
            .with_product(Product::new(40, "Board", 1))
            .with_bom(BillOfMaterials::new(1, 20, Decimal::ONE, 1).with_line(40, Decimal::from(2), 1))
            .with_order(
                ProductionOrder::new(1, "MO/001", 10, Decimal::ONE, 1, now())
                    .with_raw_move(
                        DemandLine::new(11, 1, 20, Decimal::ONE, 1).with_state(MoveState::Assigned),
                    )
                    .with_raw_move(
                        DemandLine::new(12, 1, 30, Decimal::from(8), 1)
                            .with_state(MoveState::PartiallyAvailable)
                            .with_move_line(Decimal::from(5)),
                    ),
            )
    }

    #[test]
    fn test_generate_rows_and_stamp() {
        let mut repo = repo();
        let report =
            MaterialsReport::generate(&mut repo, &ReportConfig::default(), &[1], "admin", now())
                .unwrap();

        let names: Vec<_> = report.rows.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["Screw", "[TOP] Top", "Board"]);

        let screw = report.row(30).unwrap();
        assert_eq!(screw.reserved_qty, Decimal::from(5));
        assert_eq!(screw.shortage, Decimal::from(3));
        assert_eq!(screw.uom_name, "Units");

        let board = report.row(40).unwrap();
        assert!(board.is_subcomponent());
        assert_eq!(board.required_qty, Decimal::from(2));
        assert_eq!(board.parents, vec!["[TOP] Top".to_string()]);

        assert_eq!(report.shortages().count(), 2);
        assert_eq!(report.orders, vec!["MO/001".to_string()]);

        let order = repo.require_production(1).unwrap();
        assert!(order.bom_materials_printed);
        assert_eq!(order.bom_materials_print_user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_empty_selection_is_error() {
        let mut repo = repo();
        let err = MaterialsReport::generate(&mut repo, &ReportConfig::default(), &[], "admin", now())
            .unwrap_err();
        assert!(matches!(err, MrpError::EmptySelection));
        assert!(!repo.require_production(1).unwrap().bom_materials_printed);
    }
}
