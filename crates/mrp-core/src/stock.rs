//! 庫存移動模型（原料需求行、成品行、出貨單）

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MoveId, OrderId, ProductId, UomId};

/// 庫存移動狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveState {
    Draft,
    Waiting,
    Confirmed,
    PartiallyAvailable,
    Assigned,
    Done,
    Cancel,
}

impl MoveState {
    /// 顯示用標籤
    pub fn label(&self) -> &'static str {
        match self {
            MoveState::Draft => "Draft",
            MoveState::Waiting => "Waiting",
            MoveState::Confirmed => "Confirmed",
            MoveState::PartiallyAvailable => "Partially Available",
            MoveState::Assigned => "Available",
            MoveState::Done => "Done",
            MoveState::Cancel => "Cancelled",
        }
    }
}

/// 預留明細（一筆已保留的庫存）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveLine {
    pub quantity: Decimal,
}

/// 原料需求行（製造單的一個組成件需求）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandLine {
    /// 移動ID
    pub id: MoveId,

    /// 所屬製造單
    pub production_id: OrderId,

    /// 物料
    pub product_id: ProductId,

    /// 需求數量
    pub product_uom_qty: Decimal,

    /// 計量單位
    pub uom_id: UomId,

    /// 履行狀態
    pub state: MoveState,

    /// 預留明細
    #[serde(default)]
    pub move_lines: Vec<MoveLine>,

    /// 已消耗數量
    #[serde(default)]
    pub quantity: Decimal,

    /// 下游（目的）移動
    #[serde(default)]
    pub dest_move_ids: Vec<MoveId>,

    /// 補貨群組
    #[serde(default)]
    pub procurement_group_id: Option<u64>,
}

impl DemandLine {
    /// 創建新的需求行
    pub fn new(
        id: MoveId,
        production_id: OrderId,
        product_id: ProductId,
        product_uom_qty: Decimal,
        uom_id: UomId,
    ) -> Self {
        Self {
            id,
            production_id,
            product_id,
            product_uom_qty,
            uom_id,
            state: MoveState::Confirmed,
            move_lines: Vec::new(),
            quantity: Decimal::ZERO,
            dest_move_ids: Vec::new(),
            procurement_group_id: None,
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_state(mut self, state: MoveState) -> Self {
        self.state = state;
        self
    }

    /// 建構器模式：添加預留明細
    pub fn with_move_line(mut self, quantity: Decimal) -> Self {
        self.move_lines.push(MoveLine { quantity });
        self
    }

    /// 建構器模式：設置已消耗數量
    pub fn with_consumed(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    /// 建構器模式：設置目的移動
    pub fn with_dest_moves(mut self, dest_move_ids: Vec<MoveId>) -> Self {
        self.dest_move_ids = dest_move_ids;
        self
    }

    /// 建構器模式：設置補貨群組
    pub fn with_procurement_group(mut self, group_id: u64) -> Self {
        self.procurement_group_id = Some(group_id);
        self
    }

    /// 已預留數量
    ///
    /// - assigned：整行需求數量
    /// - partially_available：預留明細數量加總
    /// - 其他狀態：0
    pub fn reserved_quantity(&self) -> Decimal {
        match self.state {
            MoveState::Assigned => self.product_uom_qty,
            MoveState::PartiallyAvailable => self.move_lines.iter().map(|l| l.quantity).sum(),
            _ => Decimal::ZERO,
        }
    }

    /// 是否已取消
    pub fn is_cancelled(&self) -> bool {
        self.state == MoveState::Cancel
    }

    /// 是否為有效需求（排除取消與草稿）
    pub fn is_active(&self) -> bool {
        !matches!(self.state, MoveState::Cancel | MoveState::Draft)
    }
}

/// 成品行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedLine {
    pub id: MoveId,
    pub product_id: ProductId,
    pub product_uom_qty: Decimal,
    pub uom_id: UomId,
    pub state: MoveState,
    #[serde(default)]
    pub dest_move_ids: Vec<MoveId>,
}

/// 作業類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickingType {
    Incoming,
    Outgoing,
    Internal,
    MrpOperation,
}

/// 出貨單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryMove {
    pub product_id: ProductId,
    pub product_uom_qty: Decimal,
    pub uom_id: UomId,
    pub state: MoveState,

    /// 產出此移動的製造單
    #[serde(default)]
    pub production_id: Option<OrderId>,
}

/// 出貨單（庫存作業單）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub origin: Option<String>,
    pub picking_type: PickingType,
    pub state: MoveState,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub moves: Vec<DeliveryMove>,
}

impl Delivery {
    /// 是否為有效的出貨作業
    pub fn is_open_outgoing(&self) -> bool {
        self.picking_type == PickingType::Outgoing && self.state != MoveState::Cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn line(state: MoveState) -> DemandLine {
        DemandLine::new(1, 1, 100, Decimal::from(10), 1)
            .with_state(state)
            .with_move_line(Decimal::from(3))
            .with_move_line(Decimal::new(15, 1))
    }

    #[rstest]
    #[case(MoveState::Assigned, Decimal::from(10))]
    #[case(MoveState::PartiallyAvailable, Decimal::new(45, 1))]
    #[case(MoveState::Confirmed, Decimal::ZERO)]
    #[case(MoveState::Waiting, Decimal::ZERO)]
    #[case(MoveState::Done, Decimal::ZERO)]
    #[case(MoveState::Draft, Decimal::ZERO)]
    fn test_reserved_quantity(#[case] state: MoveState, #[case] expected: Decimal) {
        assert_eq!(line(state).reserved_quantity(), expected);
    }

    #[test]
    fn test_active_excludes_draft_and_cancel() {
        assert!(!line(MoveState::Draft).is_active());
        assert!(!line(MoveState::Cancel).is_active());
        assert!(line(MoveState::Waiting).is_active());
        assert!(line(MoveState::Cancel).is_cancelled());
    }

    #[test]
    fn test_state_serde_names() {
        let json = serde_json::to_string(&MoveState::PartiallyAvailable).unwrap();
        assert_eq!(json, "\"partially_available\"");
    }
}
