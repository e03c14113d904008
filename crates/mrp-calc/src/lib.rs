//! # MRP Calculation Engine
//!
//! 報表計算核心：BOM 成本展開、製造單關聯、成本計算、製造單總覽與看板統計

pub mod costing;
pub mod dashboard;
pub mod deliveries;
pub mod explosion;
pub mod linkage;
pub mod overview;

// Re-export 主要類型
pub use costing::{CostBreakdown, CostCalculator};
pub use dashboard::{
    card_counts, daily_state_counts, workcenter_load, DailyStateCount, DashboardCard, MoCounts,
    WorkcenterLoad,
};
pub use deliveries::related_deliveries;
pub use explosion::{BomExplosion, ExplosionResult, ExplosionWarning, MaterialAggregate};
pub use linkage::{child_orders, direct_child_orders, find_parent_order, sub_orders_for_component};
pub use overview::{
    ComponentRow, CostSummary, LaborRow, MoOverview, MoOverviewBuilder, MoSummary, OperationRow,
    OperationsView, OverviewExtras, ReceiptStatus, SubComponentRow, SubOrderView,
};
