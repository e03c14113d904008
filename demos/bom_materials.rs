//! 物料清單報表範例
//!
//! 一張腳踏車製造單：車架有自己的 BOM（鋼管、焊料），輪組直接領料。

use chrono::NaiveDate;
use mrp_dashboard::mrp_core::{
    BillOfMaterials, DemandLine, InMemoryRepository, MoveState, Product, ProductionOrder,
    ReportConfig, Uom, WorkOrder, Workcenter,
};
use mrp_dashboard::mrp_export::{MaterialsReport, WorksheetReport};
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    mrp_dashboard::logging::init();

    let now = NaiveDate::from_ymd_opt(2025, 11, 20)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid date"))?;

    let mut repo = InMemoryRepository::new()
        .with_uom(Uom::reference(1, "Units", 1))
        .with_uom(Uom::reference(2, "m", 2))
        .with_product(Product::new(100, "Bike", 1).with_default_code("BIKE-001"))
        .with_product(Product::new(110, "Frame", 1).with_default_code("FRAME-001"))
        .with_product(Product::new(120, "Wheel", 1).with_stock(Decimal::from(40)))
        .with_product(Product::new(111, "Steel Tube", 2))
        .with_product(Product::new(112, "Welding Wire", 2))
        .with_workcenter(Workcenter::new(1, "Assembly Line", Decimal::from(600)))
        .with_bom(
            BillOfMaterials::new(1, 110, Decimal::ONE, 1)
                .with_line(111, Decimal::new(35, 1), 2)
                .with_line(112, Decimal::new(5, 1), 2),
        )
        .with_order(
            ProductionOrder::new(1, "WH/MO/00042", 100, Decimal::from(10), 1, now)
                .with_raw_move(
                    DemandLine::new(1, 1, 110, Decimal::from(10), 1).with_state(MoveState::Confirmed),
                )
                .with_raw_move(
                    DemandLine::new(2, 1, 120, Decimal::from(20), 1)
                        .with_state(MoveState::PartiallyAvailable)
                        .with_move_line(Decimal::from(12)),
                )
                .with_work_order(WorkOrder::new(1, "Assemble", 1, 1, Decimal::from(120))),
        );

    let config = ReportConfig::default().with_web_base_url("https://erp.example.com");
    let report = MaterialsReport::generate(&mut repo, &config, &[1], "planner", now)?;

    println!("===== 物料清單 {} =====", report.run_id);
    println!("製造單: {}", report.orders.join(", "));
    for row in &report.rows {
        let indent = "  ".repeat(row.level as usize);
        println!(
            "{}{:<24} 需求 {:>6} {:<5} 保留 {:>6} 缺料 {:>6}",
            indent, row.product_name, row.required_qty, row.uom_name, row.reserved_qty, row.shortage
        );
    }
    for warning in &report.warnings {
        println!("警告: {}", warning);
    }

    println!("\n===== 工單作業表 =====");
    for order in WorksheetReport::generate(&repo, &config, &[1])? {
        println!("{} {} × {} {}", order.order_name, order.product_name, order.quantity, order.uom_name);
        for line in &order.work_orders {
            println!(
                "  {:<10} {:<14} {:>5} 分鐘  {}",
                line.name, line.workcenter, line.duration_expected, line.qr_payload
            );
        }
    }

    Ok(())
}
