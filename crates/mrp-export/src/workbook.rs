//! 製造單成本試算表
//!
//! 只建立試算表的資料模型（工作表、儲存格），實際檔案格式由
//! [`WorkbookWriter`](crate::writer::WorkbookWriter) 負責。

use std::fmt;

use chrono::NaiveDateTime;
use mrp_calc::{related_deliveries, MoOverview, MoOverviewBuilder};
use mrp_core::{Delivery, MoveState, MrpRepository, OrderId, ReportConfig, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 儲存格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(Decimal),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => write!(f, "{}", value.normalize()),
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        if text.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(text.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        if text.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(text)
        }
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

/// 工作表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, C>(&mut self, cells: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn push_empty_row(&mut self) {
        self.rows.push(Vec::new());
    }

    /// 第一欄等於指定文字的列
    pub fn find_row(&self, label: &str) -> Option<&[Cell]> {
        self.rows
            .iter()
            .find(|row| matches!(row.first(), Some(Cell::Text(text)) if text == label))
            .map(Vec::as_slice)
    }
}

/// 試算表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// 檔名（不含副檔名）
    pub file_stem: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// 金額格式：千分位、兩位小數
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

fn per_unit(amount: Decimal, quantity: Decimal) -> Decimal {
    if quantity > Decimal::ZERO {
        amount / quantity
    } else {
        Decimal::ZERO
    }
}

fn with_uom(quantity: Decimal, uom: &str) -> String {
    format!("{} {}", quantity.normalize(), uom)
}

/// 出貨明細列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRow {
    pub product: String,
    pub description: String,
    pub quantity: Decimal,
    pub uom: String,
    pub total_cost: Decimal,
    /// 來源單號（無來源時為出貨單號）
    pub origin: String,
}

/// 把出貨單展開為明細列（排除已取消的明細）
pub fn delivery_rows<R: MrpRepository + ?Sized>(repo: &R, deliveries: &[Delivery]) -> Vec<DeliveryRow> {
    let mut rows = Vec::new();
    for delivery in deliveries {
        for mv in delivery.moves.iter().filter(|m| m.state != MoveState::Cancel) {
            let product = match repo.product(mv.product_id) {
                Ok(Some(product)) => product,
                _ => {
                    tracing::warn!("出貨單 {} 找不到產品 {}", delivery.name, mv.product_id);
                    continue;
                }
            };
            let uom = match repo.uom(mv.uom_id) {
                Ok(Some(uom)) => uom.name,
                _ => String::new(),
            };
            rows.push(DeliveryRow {
                product: product.display_name(),
                description: product.description.clone().unwrap_or_default(),
                quantity: mv.product_uom_qty,
                uom,
                total_cost: mv.product_uom_qty * product.standard_price,
                origin: delivery
                    .origin
                    .clone()
                    .filter(|o| !o.is_empty())
                    .unwrap_or_else(|| delivery.name.clone()),
            });
        }
    }
    rows
}

/// 製造單成本試算表
pub struct CostWorkbook;

impl CostWorkbook {
    pub const SUMMARY_SHEET: &'static str = "MO Cost Summary";
    pub const LABOR_SHEET: &'static str = "Labor & Operations";
    pub const COMPONENTS_SHEET: &'static str = "Components";
    pub const DELIVERIES_SHEET: &'static str = "Deliveries";

    /// 讀取製造單總覽與相關出貨單，建立試算表
    pub fn generate<R: MrpRepository + ?Sized>(
        repo: &R,
        config: &ReportConfig,
        order_id: OrderId,
        now: NaiveDateTime,
    ) -> Result<Workbook> {
        let overview = MoOverviewBuilder::new(repo, config).build(order_id)?;
        let order = repo.require_production(order_id)?;
        let deliveries = related_deliveries(repo, &order, config)?;
        let rows = delivery_rows(repo, &deliveries);
        let searched_orders = overview.extras.child_count + 1;

        Ok(Self::build(config, &overview, &rows, searched_orders, now))
    }

    /// 由總覽資料建立四張工作表
    pub fn build(
        config: &ReportConfig,
        overview: &MoOverview,
        deliveries: &[DeliveryRow],
        searched_orders: usize,
        generated_at: NaiveDateTime,
    ) -> Workbook {
        let file_stem = format!(
            "MO_Overview_{}_{}",
            overview.summary.mo_name.replace('/', "_"),
            generated_at.format("%Y%m%d_%H%M%S")
        );
        tracing::info!("建立成本試算表 {}", file_stem);

        Workbook {
            file_stem,
            sheets: vec![
                summary_sheet(config, overview),
                labor_operations_sheet(config, overview),
                components_sheet(overview),
                deliveries_sheet(deliveries, searched_orders),
            ],
        }
    }
}

fn summary_sheet(config: &ReportConfig, overview: &MoOverview) -> Sheet {
    let summary = &overview.summary;
    let costs = &overview.cost_summary;
    let amount_header = format!("Amount ({})", config.currency);
    let mut sheet = Sheet::new(CostWorkbook::SUMMARY_SHEET);

    sheet.push_row(["MO INFORMATION", "", ""]);
    let info = [
        ("MO Name", summary.mo_name.clone(), "Manufacturing order number"),
        ("Product", summary.product_name.clone(), "Product name"),
        ("Quantity", with_uom(summary.quantity, &summary.uom_name), "Quantity to produce"),
        ("State", summary.state_label.clone(), "Status"),
        ("Customer", summary.customer_name.clone(), "Customer name"),
        ("Sales Team", summary.sales_team.clone(), "Sales team"),
        ("Technician Team", summary.technician_team.clone(), "Technician team"),
    ];
    for (label, value, description) in info {
        sheet.push_row([Cell::from(label), Cell::from(value), Cell::from(description)]);
    }
    sheet.push_empty_row();

    sheet.push_row(["COST BREAKDOWN", amount_header.as_str(), "Description"]);
    let items = [
        ("Material Cost", costs.material, "Materials and components"),
        ("Labor Cost (This MO)", costs.labor, "Labor of this MO"),
        ("Sub MO Labor Cost", costs.sub_order_labor, "Labor of sub MOs"),
        ("Shipping Cost (This MO)", costs.shipping, "Shipping of this MO"),
        ("Sub MO Shipping Cost", costs.sub_order_shipping, "Shipping of sub MOs"),
    ];
    let mut total = Decimal::ZERO;
    for (label, amount, description) in items {
        total += amount;
        sheet.push_row([label.to_string(), format_amount(amount), description.to_string()]);
    }
    sheet.push_row([
        "TOTAL COST".to_string(),
        format_amount(total),
        "Total cost".to_string(),
    ]);
    sheet.push_empty_row();

    let quantity = if summary.quantity.is_zero() {
        Decimal::ONE
    } else {
        summary.quantity
    };
    sheet.push_row([
        "UNIT COSTS".to_string(),
        format!("Per Unit ({})", config.currency),
        "Description".to_string(),
    ]);
    let unit_costs = [
        ("Unit Material Cost", costs.material / quantity, "Material cost per unit"),
        (
            "Unit Labor Cost",
            (costs.labor + costs.sub_order_labor) / quantity,
            "Labor cost per unit",
        ),
        (
            "Unit Shipping Cost",
            (costs.shipping + costs.sub_order_shipping) / quantity,
            "Shipping cost per unit",
        ),
        ("Unit Total Cost", total / quantity, "Total cost per unit"),
    ];
    for (label, amount, description) in unit_costs {
        sheet.push_row([label.to_string(), format_amount(amount), description.to_string()]);
    }

    if !overview.labor_transactions.is_empty() {
        sheet.push_empty_row();
        sheet.push_row(["LABOR TRANSACTION HISTORY", "", ""]);
        sheet.push_row(["Date", amount_header.as_str(), "Description", "By User"]);
        for labor in &overview.labor_transactions {
            sheet.push_row([
                labor.date.format("%Y-%m-%d %H:%M").to_string(),
                format_amount(labor.amount),
                labor.description.clone(),
                labor.user.clone(),
            ]);
        }
        sheet.push_row([
            "LABOR TOTAL".to_string(),
            format_amount(summary.total_labor_cost),
            "Total labor".to_string(),
        ]);
    }

    sheet
}

fn labor_operations_sheet(config: &ReportConfig, overview: &MoOverview) -> Sheet {
    let currency = &config.currency;
    let mut sheet = Sheet::new(CostWorkbook::LABOR_SHEET);

    if !overview.operations.details.is_empty() {
        sheet.push_row([
            "WORK ORDERS".to_string(),
            "Workcenter".to_string(),
            "Duration (min)".to_string(),
            format!("Cost/Min ({})", currency),
            format!("Total Cost ({})", currency),
            "State".to_string(),
            "Description".to_string(),
        ]);
        for op in &overview.operations.details {
            sheet.push_row([
                Cell::from(op.name.as_str()),
                Cell::from(op.workcenter.as_str()),
                Cell::Number(op.duration_expected),
                Cell::from(format_amount(op.cost_per_minute)),
                Cell::from(format_amount(op.duration_expected * op.cost_per_minute)),
                Cell::from(op.state_label.as_str()),
                Cell::from("Work Order Operation"),
            ]);
        }
    }

    if !overview.components.is_empty() {
        if !sheet.rows.is_empty() {
            sheet.push_empty_row();
        }
        sheet.push_row([
            "COMPONENTS".to_string(),
            "Product Code".to_string(),
            "Quantity".to_string(),
            format!("Unit Cost ({})", currency),
            format!("Total Cost ({})", currency),
            "State".to_string(),
            "Description".to_string(),
        ]);

        for component in &overview.components {
            sheet.push_row([
                component.name.clone(),
                component.product_id.to_string(),
                with_uom(component.quantity, &component.uom_name),
                format_amount(per_unit(component.cost, component.quantity)),
                format_amount(component.cost),
                component.state_label.clone(),
                component.description.clone(),
            ]);

            for sub in &component.sub_orders {
                sheet.push_row([
                    format!("  └─ Sub MO: {}", sub.name),
                    sub.product_name.clone(),
                    with_uom(sub.quantity, &sub.uom_name),
                    format_amount(per_unit(sub.total_cost, sub.quantity)),
                    format_amount(sub.total_cost),
                    sub.state_label.clone(),
                    "Sub Manufacturing Order".to_string(),
                ]);

                for sub_component in &sub.components {
                    sheet.push_row([
                        format!("      ├─ {}", sub_component.name),
                        "Sub Component".to_string(),
                        with_uom(sub_component.quantity, &sub_component.uom_name),
                        format_amount(per_unit(sub_component.total_cost, sub_component.quantity)),
                        format_amount(sub_component.total_cost),
                        sub_component.state_label.clone(),
                        format!("Component of {}", sub.name),
                    ]);
                }
            }
        }
    }

    sheet
}

fn components_sheet(overview: &MoOverview) -> Sheet {
    let mut sheet = Sheet::new(CostWorkbook::COMPONENTS_SHEET);
    sheet.push_row(["Component Name", "Description", "Quantity", "UOM", "Total Cost"]);

    for component in &overview.components {
        sheet.push_row([
            Cell::from(component.name.as_str()),
            Cell::from(component.description.as_str()),
            Cell::Number(component.quantity),
            Cell::from(component.uom_name.as_str()),
            Cell::Number(component.cost),
        ]);

        for sub in &component.sub_orders {
            sheet.push_row([
                Cell::from(format!("  └─ Sub MO: {} ({})", sub.name, sub.product_name)),
                Cell::from("Sub Manufacturing Order"),
                Cell::Number(sub.quantity),
                Cell::from(sub.uom_name.as_str()),
                Cell::Number(sub.total_cost),
            ]);
            for sub_component in &sub.components {
                sheet.push_row([
                    Cell::from(format!("    ├─ {}", sub_component.name)),
                    Cell::from(sub_component.description.as_str()),
                    Cell::Number(sub_component.quantity),
                    Cell::from(sub_component.uom_name.as_str()),
                    Cell::Number(sub_component.total_cost),
                ]);
            }
        }
    }

    sheet
}

fn deliveries_sheet(deliveries: &[DeliveryRow], searched_orders: usize) -> Sheet {
    let mut sheet = Sheet::new(CostWorkbook::DELIVERIES_SHEET);
    sheet.push_row(["Product", "Description", "Quantity", "UOM", "Total Cost", "Origin MO"]);

    for row in deliveries {
        sheet.push_row([
            Cell::from(row.product.as_str()),
            Cell::from(row.description.as_str()),
            Cell::Number(row.quantity),
            Cell::from(row.uom.as_str()),
            Cell::Number(row.total_cost),
            Cell::from(row.origin.as_str()),
        ]);
    }

    if deliveries.is_empty() {
        sheet.push_row([
            Cell::from("No delivery data found"),
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::from(format!("Searched in {} MOs", searched_orders)),
        ]);
    }

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::{
        DeliveryMove, DemandLine, InMemoryRepository, LaborTransaction, PickingType, Product,
        ProductionOrder, Uom, WorkOrder, Workcenter,
    };
    use rstest::rstest;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 20)
            .unwrap()
            .and_hms_opt(hour, 30, 15)
            .unwrap()
    }

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new()
            .with_uom(Uom::reference(1, "Units", 1))
            .with_product(Product::new(10, "Table", 1).with_standard_price(Decimal::from(900)))
            .with_product(Product::new(20, "Leg", 1).with_standard_price(Decimal::from(50)))
            .with_product(Product::new(30, "Screw", 1).with_standard_price(Decimal::from(2)))
            .with_workcenter(Workcenter::new(1, "Assembly", Decimal::from(90)))
            .with_order(
                ProductionOrder::new(1, "WH/MO/001", 10, Decimal::from(2), 1, at(8))
                    .with_shipping_cost(Decimal::from(100))
                    .with_labor(
                        LaborTransaction::new(1, at(9), Decimal::from(1500)).with_user("somchai"),
                    )
                    .with_raw_move(DemandLine::new(11, 1, 20, Decimal::from(8), 1))
                    .with_work_order(WorkOrder::new(1, "Assemble", 1, 1, Decimal::from(40))),
            )
            .with_order(
                ProductionOrder::new(2, "WH/MO/002", 20, Decimal::from(8), 1, at(8))
                    .with_origin("WH/MO/001")
                    .with_labor(LaborTransaction::new(2, at(9), Decimal::from(200)))
                    .with_raw_move(DemandLine::new(21, 2, 30, Decimal::from(32), 1)),
            )
    }

    #[rstest]
    #[case(Decimal::ZERO, "0.00")]
    #[case(Decimal::new(5, 1), "0.50")]
    #[case(Decimal::from(1234), "1,234.00")]
    #[case(Decimal::new(123456789, 2), "1,234,567.89")]
    #[case(Decimal::new(-1000006, 3), "-1,000.01")]
    fn test_format_amount(#[case] amount: Decimal, #[case] expected: &str) {
        assert_eq!(format_amount(amount), expected);
    }

    #[test]
    fn test_generate_workbook() {
        let repo = repo();
        let config = ReportConfig::default();
        let workbook = CostWorkbook::generate(&repo, &config, 1, at(14)).unwrap();

        assert_eq!(workbook.file_stem, "MO_Overview_WH_MO_001_20251120_143015");
        let names: Vec<_> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["MO Cost Summary", "Labor & Operations", "Components", "Deliveries"]
        );

        let summary = workbook.sheet(CostWorkbook::SUMMARY_SHEET).unwrap();
        // 原料：子製造單的螺絲 64；製程：40 分鐘 × 1.5
        assert_eq!(
            summary.find_row("Material Cost").unwrap()[1],
            Cell::from("124.00")
        );
        assert_eq!(
            summary.find_row("Sub MO Labor Cost").unwrap()[1],
            Cell::from("200.00")
        );
        assert_eq!(
            summary.find_row("TOTAL COST").unwrap()[1],
            Cell::from("1,924.00")
        );
        assert_eq!(
            summary.find_row("Unit Total Cost").unwrap()[1],
            Cell::from("962.00")
        );
        assert_eq!(summary.find_row("LABOR TOTAL").unwrap()[1], Cell::from("1,500.00"));

        let labor = workbook.sheet(CostWorkbook::LABOR_SHEET).unwrap();
        let assemble = labor.find_row("Assemble").unwrap();
        assert_eq!(assemble[3], Cell::from("1.50"));
        assert_eq!(assemble[4], Cell::from("60.00"));
        assert!(labor.find_row("  └─ Sub MO: WH/MO/002").is_some());
        assert!(labor.find_row("      ├─ Screw").is_some());

        let components = workbook.sheet(CostWorkbook::COMPONENTS_SHEET).unwrap();
        assert_eq!(components.rows.len(), 4);
        assert!(components.find_row("  └─ Sub MO: WH/MO/002 (Leg)").is_some());

        let deliveries = workbook.sheet(CostWorkbook::DELIVERIES_SHEET).unwrap();
        let empty = deliveries.find_row("No delivery data found").unwrap();
        assert_eq!(empty[5], Cell::from("Searched in 2 MOs"));
    }

    #[test]
    fn test_delivery_rows() {
        let repo = repo();
        let delivery = Delivery {
            id: 1,
            name: "WH/OUT/00001".to_string(),
            origin: None,
            picking_type: PickingType::Outgoing,
            state: MoveState::Assigned,
            scheduled_date: None,
            moves: vec![
                DeliveryMove {
                    product_id: 10,
                    product_uom_qty: Decimal::from(2),
                    uom_id: 1,
                    state: MoveState::Assigned,
                    production_id: Some(1),
                },
                DeliveryMove {
                    product_id: 10,
                    product_uom_qty: Decimal::ONE,
                    uom_id: 1,
                    state: MoveState::Cancel,
                    production_id: Some(1),
                },
            ],
        };

        let rows = delivery_rows(&repo, &[delivery]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_cost, Decimal::from(1800));
        assert_eq!(rows[0].origin, "WH/OUT/00001");
        assert_eq!(rows[0].uom, "Units");
    }
}
