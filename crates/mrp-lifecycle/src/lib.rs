//! # MRP Lifecycle
//!
//! 製造單生命週期的附加行為：自動結案、報表列印戳記、
//! 上層欄位帶入子製造單、工單掃碼

pub mod auto_close;
pub mod printing;
pub mod propagation;
pub mod scan;

// Re-export 主要類型
pub use auto_close::{
    AutoCloseConfig, AutoCloser, CloseOutcome, Completion, LifecycleEvent, SweepReport,
};
pub use printing::{mark_materials_printed, reset_materials_printed};
pub use propagation::{propagate_from_parent, push_to_children};
pub use scan::{scan_work_order, ScanOutcome};
