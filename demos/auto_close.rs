//! 自動結案範例
//!
//! 掃碼完成最後一張工單後製造單直接結案，再以排程作業結案其他 to_close 製造單。

use chrono::NaiveDate;
use mrp_dashboard::mrp_core::{
    CloseStrategy, InMemoryRepository, MrpRepository, OrderState, ProductionOrder, ReportConfig,
    WorkOrder, WorkOrderState,
};
use mrp_dashboard::mrp_lifecycle::{scan_work_order, AutoCloseConfig, AutoCloser};
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    mrp_dashboard::logging::init();

    let now = NaiveDate::from_ymd_opt(2025, 11, 20)
        .and_then(|d| d.and_hms_opt(17, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid date"))?;

    let mut repo = InMemoryRepository::new()
        .with_order(
            ProductionOrder::new(1, "WH/MO/00200", 10, Decimal::ONE, 1, now)
                .with_state(OrderState::Progress)
                .with_work_order(
                    WorkOrder::new(1, "Cut", 1, 1, Decimal::from(30)).with_state(WorkOrderState::Done),
                )
                .with_work_order(
                    WorkOrder::new(2, "Paint", 1, 1, Decimal::from(45))
                        .with_state(WorkOrderState::Progress),
                ),
        )
        .with_order(ProductionOrder::new(2, "WH/MO/00201", 10, Decimal::ONE, 1, now).with_state(OrderState::ToClose))
        .with_order(ProductionOrder::new(3, "WH/MO/00202", 10, Decimal::ONE, 1, now).with_state(OrderState::ToClose));

    let config = ReportConfig::default()
        .with_skip_to_close_state(true)
        .with_close_strategy(CloseStrategy::Complete);
    let mut closer = AutoCloser::new(AutoCloseConfig::from(&config));

    let outcome = scan_work_order(&mut repo, &mut closer, 2, now)?;
    println!("掃描工單 Paint: {:?}", outcome);

    let report = closer.sweep(&mut repo, now)?;
    println!("排程結案: 成功 {}，失敗 {}", report.closed, report.failed);

    for id in 1..=3 {
        let order = repo.require_production(id)?;
        println!("  {:<12} {:<10} {:?}", order.name, order.state.label(), order.date_finished);
    }

    Ok(())
}
