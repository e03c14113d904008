//! # MRP Core
//!
//! 製造報表擴充的核心資料模型、單位換算、配置與資料存取介面

pub mod bom;
pub mod config;
pub mod order;
pub mod product;
pub mod repository;
pub mod stock;
pub mod store;
pub mod uom;
pub mod workorder;

// Re-export 主要類型
pub use bom::{BillOfMaterials, BomLine, BomOperation, BomType};
pub use config::{CloseStrategy, ReportConfig};
pub use order::{LaborTransaction, OrderState, PrintStamp, ProductionOrder, ReservationState};
pub use product::{Product, Workcenter};
pub use repository::{DeliveryFilter, MrpRepository, OrderFields, OrderFilter};
pub use stock::{DemandLine, Delivery, DeliveryMove, FinishedLine, MoveLine, MoveState, PickingType};
pub use store::{InMemoryRepository, Snapshot};
pub use uom::Uom;
pub use workorder::{WorkOrder, WorkOrderState};

/// 製造單識別碼
pub type OrderId = u64;
/// 產品識別碼
pub type ProductId = u64;
/// 庫存移動（需求行）識別碼
pub type MoveId = u64;
/// 計量單位識別碼
pub type UomId = u64;

/// 報表錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum MrpError {
    #[error("找不到製造單: {0}")]
    OrderNotFound(String),

    #[error("找不到產品: {0}")]
    ProductNotFound(ProductId),

    #[error("找不到計量單位: {0}")]
    UomNotFound(UomId),

    #[error("計量單位類別不同，無法換算: {from} → {to}")]
    UomCategoryMismatch { from: String, to: String },

    #[error("找不到工單: {0}")]
    WorkOrderNotFound(u64),

    #[error("未選擇任何製造單")]
    EmptySelection,

    #[error("無效的狀態轉換: {from} → {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("外部作業失敗 ({order}): {message}")]
    ExternalOperation { order: String, message: String },

    #[error("匯出失敗: {0}")]
    Export(String),

    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("其他錯誤: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MrpError>;
