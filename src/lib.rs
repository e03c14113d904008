//! # MRP Dashboard
//!
//! 製造報表擴充：物料展開、製造單成本與總覽、儀表板統計、
//! 自動結案與報表匯出。
//!
//! ```no_run
//! use mrp_dashboard::prelude::*;
//!
//! mrp_dashboard::logging::init();
//! let repo = InMemoryRepository::new();
//! let config = ReportConfig::default();
//! let result = BomExplosion::new(&repo, &config).explode(&[1]);
//! ```

pub mod logging;

pub use mrp_calc;
pub use mrp_core;
pub use mrp_export;
pub use mrp_lifecycle;

pub mod prelude {
    pub use mrp_calc::{
        card_counts, child_orders, daily_state_counts, find_parent_order, related_deliveries,
        workcenter_load, BomExplosion, CostCalculator, DashboardCard, ExplosionResult,
        MoOverviewBuilder,
    };
    pub use mrp_core::{
        CloseStrategy, InMemoryRepository, MrpError, MrpRepository, OrderState, ProductionOrder,
        ReportConfig, Result,
    };
    pub use mrp_export::{CostWorkbook, CsvWorkbookWriter, MaterialsReport, WorkbookWriter, WorksheetReport};
    pub use mrp_lifecycle::{
        mark_materials_printed, propagate_from_parent, push_to_children, scan_work_order,
        AutoCloseConfig, AutoCloser, Completion, LifecycleEvent,
    };
}
