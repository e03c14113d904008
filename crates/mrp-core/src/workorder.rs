//! 工單模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::OrderId;

/// 工單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderState {
    Pending,
    Waiting,
    Ready,
    Progress,
    Done,
    Cancel,
}

impl WorkOrderState {
    pub fn label(&self) -> &'static str {
        match self {
            WorkOrderState::Pending => "Pending",
            WorkOrderState::Waiting => "Waiting",
            WorkOrderState::Ready => "Ready",
            WorkOrderState::Progress => "In Progress",
            WorkOrderState::Done => "Done",
            WorkOrderState::Cancel => "Cancelled",
        }
    }

    /// 尚未完成的工單（看板計數用）
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            WorkOrderState::Pending
                | WorkOrderState::Waiting
                | WorkOrderState::Ready
                | WorkOrderState::Progress
        )
    }
}

/// 工單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: u64,
    pub name: String,
    pub production_id: OrderId,
    pub workcenter_id: u64,
    pub state: WorkOrderState,

    /// 預計工時（分鐘）
    #[serde(default)]
    pub duration_expected: Decimal,

    /// 實際工時（分鐘）
    #[serde(default)]
    pub duration: Decimal,
}

impl WorkOrder {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        production_id: OrderId,
        workcenter_id: u64,
        duration_expected: Decimal,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            production_id,
            workcenter_id,
            state: WorkOrderState::Pending,
            duration_expected,
            duration: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_state(mut self, state: WorkOrderState) -> Self {
        self.state = state;
        self
    }

    /// 建構器模式：設置實際工時
    pub fn with_duration(mut self, duration: Decimal) -> Self {
        self.duration = duration;
        self
    }
}
