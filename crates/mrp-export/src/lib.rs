//! # MRP Export
//!
//! 報表資料與試算表匯出：物料清單報表、工單作業表、製造單成本試算表

pub mod materials;
pub mod workbook;
pub mod worksheet;
pub mod writer;

// Re-export 主要類型
pub use materials::{MaterialRow, MaterialsReport};
pub use workbook::{delivery_rows, format_amount, Cell, CostWorkbook, DeliveryRow, Sheet, Workbook};
pub use worksheet::{WorksheetLine, WorksheetOrder, WorksheetReport};
pub use writer::{CsvWorkbookWriter, WorkbookWriter};
