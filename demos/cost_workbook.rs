//! 製造單成本試算表範例
//!
//! 上層製造單（桌子）與生產桌腳的子製造單，輸出四張工作表為 CSV。

use chrono::NaiveDate;
use mrp_dashboard::mrp_core::{
    Delivery, DeliveryMove, DemandLine, InMemoryRepository, LaborTransaction, MoveState,
    PickingType, Product, ProductionOrder, ReportConfig, Uom, WorkOrder, Workcenter,
};
use mrp_dashboard::mrp_export::{format_amount, CostWorkbook, CsvWorkbookWriter, WorkbookWriter};
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    mrp_dashboard::logging::init();

    let now = NaiveDate::from_ymd_opt(2025, 11, 20)
        .and_then(|d| d.and_hms_opt(16, 45, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid date"))?;

    let repo = InMemoryRepository::new()
        .with_uom(Uom::reference(1, "Units", 1))
        .with_product(Product::new(10, "Dining Table", 1).with_standard_price(Decimal::from(4500)))
        .with_product(Product::new(20, "Table Leg", 1).with_standard_price(Decimal::from(250)))
        .with_product(Product::new(30, "Table Top", 1).with_standard_price(Decimal::from(1200)))
        .with_product(Product::new(40, "Oak Plank", 1).with_standard_price(Decimal::from(180)))
        .with_workcenter(Workcenter::new(1, "Carpentry", Decimal::from(360)))
        .with_order(
            ProductionOrder::new(1, "WH/MO/00100", 10, Decimal::from(2), 1, now)
                .with_parties(Some("Siam Furniture"), Some("Team North"), Some("Retail"))
                .with_shipping_cost(Decimal::from(800))
                .with_labor(
                    LaborTransaction::new(1, now, Decimal::from(1500))
                        .with_description("Assembly overtime")
                        .with_user("somchai"),
                )
                .with_raw_move(DemandLine::new(1, 1, 20, Decimal::from(8), 1))
                .with_raw_move(DemandLine::new(2, 1, 30, Decimal::from(2), 1))
                .with_work_order(WorkOrder::new(1, "Assemble", 1, 1, Decimal::from(90))),
        )
        .with_order(
            ProductionOrder::new(2, "WH/MO/00101", 20, Decimal::from(8), 1, now)
                .with_origin("WH/MO/00100")
                .with_labor(LaborTransaction::new(2, now, Decimal::from(400)))
                .with_raw_move(DemandLine::new(3, 2, 40, Decimal::from(4), 1))
                .with_work_order(WorkOrder::new(2, "Turn legs", 2, 1, Decimal::from(60))),
        )
        .with_delivery(Delivery {
            id: 1,
            name: "WH/OUT/00007".to_string(),
            origin: Some("WH/MO/00100".to_string()),
            picking_type: PickingType::Outgoing,
            state: MoveState::Assigned,
            scheduled_date: Some(now),
            moves: vec![DeliveryMove {
                product_id: 10,
                product_uom_qty: Decimal::from(2),
                uom_id: 1,
                state: MoveState::Assigned,
                production_id: None,
            }],
        });

    let config = ReportConfig::default();
    let workbook = CostWorkbook::generate(&repo, &config, 1, now)?;

    if let Some(summary) = workbook.sheet(CostWorkbook::SUMMARY_SHEET) {
        for row in &summary.rows {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            println!("{}", cells.join(" | "));
        }
    }
    println!("\n單位標準成本參考: {}", format_amount(Decimal::from(4500)));

    let dir = std::env::temp_dir().join("mrp-dashboard");
    let paths = CsvWorkbookWriter::new(&dir).write(&workbook)?;
    println!("\n已輸出 {} 個檔案:", paths.len());
    for path in paths {
        println!("  {}", path.display());
    }

    Ok(())
}
