//! 製造單模型

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stock::{DemandLine, FinishedLine};
use crate::workorder::{WorkOrder, WorkOrderState};
use crate::{OrderId, ProductId, UomId};

/// 製造單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Draft,
    Confirmed,
    Planned,
    Progress,
    ToClose,
    Done,
    Cancel,
}

impl OrderState {
    /// 顯示用標籤
    pub fn label(&self) -> &'static str {
        match self {
            OrderState::Draft => "Draft",
            OrderState::Confirmed => "Confirmed",
            OrderState::Planned => "Planned",
            OrderState::Progress => "In Progress",
            OrderState::ToClose => "To Close",
            OrderState::Done => "Done",
            OrderState::Cancel => "Cancelled",
        }
    }

    /// 是否為終結狀態（完成或取消）
    pub fn is_closed(&self) -> bool {
        matches!(self, OrderState::Done | OrderState::Cancel)
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 物料預留狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    Waiting,
    Confirmed,
    Assigned,
}

/// 工資領用紀錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborTransaction {
    pub id: Uuid,
    pub production_id: OrderId,
    pub transaction_date: NaiveDateTime,

    /// 金額
    pub amount: Decimal,

    #[serde(default)]
    pub description: Option<String>,

    /// 記錄人
    #[serde(default)]
    pub user: Option<String>,
}

impl LaborTransaction {
    /// 創建新的工資領用紀錄
    pub fn new(production_id: OrderId, transaction_date: NaiveDateTime, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            production_id,
            transaction_date,
            amount,
            description: None,
            user: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// 物料清單報表列印戳記
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintStamp {
    pub printed_at: NaiveDateTime,
    pub user: String,
}

/// 製造單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    /// 製造單ID
    pub id: OrderId,

    /// 單號（例如 WH/MO/00012）
    pub name: String,

    /// 成品
    pub product_id: ProductId,

    /// 生產數量
    pub product_qty: Decimal,

    /// 計量單位
    pub uom_id: UomId,

    /// 狀態
    pub state: OrderState,

    /// 物料預留狀態
    #[serde(default)]
    pub reservation_state: Option<ReservationState>,

    /// 來源單據（通常是觸發本單的上層製造單單號）
    #[serde(default)]
    pub origin: Option<String>,

    /// 補貨群組
    #[serde(default)]
    pub procurement_group_id: Option<u64>,

    /// 公司
    pub company_id: u64,

    /// 使用的 BOM
    #[serde(default)]
    pub bom_id: Option<u64>,

    /// 原料需求行
    #[serde(default)]
    pub raw_moves: Vec<DemandLine>,

    /// 成品行
    #[serde(default)]
    pub finished_moves: Vec<FinishedLine>,

    /// 工單
    #[serde(default)]
    pub work_orders: Vec<WorkOrder>,

    /// 工資領用紀錄
    #[serde(default)]
    pub labor_transactions: Vec<LaborTransaction>,

    /// 運費
    #[serde(default)]
    pub shipping_cost: Decimal,

    #[serde(default)]
    pub customer_name: Option<String>,

    #[serde(default)]
    pub technician_team: Option<String>,

    #[serde(default)]
    pub sales_team: Option<String>,

    pub create_date: NaiveDateTime,

    #[serde(default)]
    pub date_start: Option<NaiveDateTime>,

    #[serde(default)]
    pub date_finished: Option<NaiveDateTime>,

    /// 物料清單報表是否已列印
    #[serde(default)]
    pub bom_materials_printed: bool,

    #[serde(default)]
    pub bom_materials_print_date: Option<NaiveDateTime>,

    #[serde(default)]
    pub bom_materials_print_user: Option<String>,
}

impl ProductionOrder {
    /// 創建新的製造單（已確認狀態）
    pub fn new(
        id: OrderId,
        name: impl Into<String>,
        product_id: ProductId,
        product_qty: Decimal,
        uom_id: UomId,
        create_date: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            product_id,
            product_qty,
            uom_id,
            state: OrderState::Confirmed,
            reservation_state: None,
            origin: None,
            procurement_group_id: None,
            company_id: 1,
            bom_id: None,
            raw_moves: Vec::new(),
            finished_moves: Vec::new(),
            work_orders: Vec::new(),
            labor_transactions: Vec::new(),
            shipping_cost: Decimal::ZERO,
            customer_name: None,
            technician_team: None,
            sales_team: None,
            create_date,
            date_start: None,
            date_finished: None,
            bom_materials_printed: false,
            bom_materials_print_date: None,
            bom_materials_print_user: None,
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_state(mut self, state: OrderState) -> Self {
        self.state = state;
        self
    }

    /// 建構器模式：設置預留狀態
    pub fn with_reservation_state(mut self, state: ReservationState) -> Self {
        self.reservation_state = Some(state);
        self
    }

    /// 建構器模式：設置來源單據
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// 建構器模式：設置補貨群組
    pub fn with_procurement_group(mut self, group_id: u64) -> Self {
        self.procurement_group_id = Some(group_id);
        self
    }

    /// 建構器模式：設置公司
    pub fn with_company(mut self, company_id: u64) -> Self {
        self.company_id = company_id;
        self
    }

    /// 建構器模式：設置 BOM
    pub fn with_bom(mut self, bom_id: u64) -> Self {
        self.bom_id = Some(bom_id);
        self
    }

    /// 建構器模式：添加原料需求行
    pub fn with_raw_move(mut self, line: DemandLine) -> Self {
        self.raw_moves.push(line);
        self
    }

    /// 建構器模式：添加成品行
    pub fn with_finished_move(mut self, line: FinishedLine) -> Self {
        self.finished_moves.push(line);
        self
    }

    /// 建構器模式：添加工單
    pub fn with_work_order(mut self, work_order: WorkOrder) -> Self {
        self.work_orders.push(work_order);
        self
    }

    /// 建構器模式：添加工資領用紀錄
    pub fn with_labor(mut self, transaction: LaborTransaction) -> Self {
        self.labor_transactions.push(transaction);
        self
    }

    /// 建構器模式：設置運費
    pub fn with_shipping_cost(mut self, cost: Decimal) -> Self {
        self.shipping_cost = cost;
        self
    }

    /// 建構器模式：設置客戶與團隊資訊
    pub fn with_parties(
        mut self,
        customer_name: Option<&str>,
        technician_team: Option<&str>,
        sales_team: Option<&str>,
    ) -> Self {
        self.customer_name = customer_name.map(str::to_string);
        self.technician_team = technician_team.map(str::to_string);
        self.sales_team = sales_team.map(str::to_string);
        self
    }

    /// 建構器模式：設置預計開工時間
    pub fn with_date_start(mut self, date: NaiveDateTime) -> Self {
        self.date_start = Some(date);
        self
    }

    /// 建構器模式：設置完工時間
    pub fn with_date_finished(mut self, date: NaiveDateTime) -> Self {
        self.date_finished = Some(date);
        self
    }

    /// 工資總額
    pub fn total_labor_cost(&self) -> Decimal {
        self.labor_transactions.iter().map(|t| t.amount).sum()
    }

    /// 有效的原料需求行（排除已取消）
    pub fn active_raw_moves(&self) -> impl Iterator<Item = &DemandLine> {
        self.raw_moves.iter().filter(|m| !m.is_cancelled())
    }

    /// 找出指定物料的需求行（排除取消與草稿）
    pub fn demand_line_for(&self, product_id: ProductId) -> Option<&DemandLine> {
        self.raw_moves
            .iter()
            .find(|m| m.product_id == product_id && m.is_active())
    }

    /// 是否擁有指定的庫存移動（原料或成品）
    pub fn owns_move(&self, move_id: u64) -> bool {
        self.raw_moves.iter().any(|m| m.id == move_id)
            || self.finished_moves.iter().any(|m| m.id == move_id)
    }

    /// 所有工單皆已完成（且至少有一張工單）
    pub fn all_work_orders_done(&self) -> bool {
        !self.work_orders.is_empty()
            && self
                .work_orders
                .iter()
                .all(|wo| wo.state == WorkOrderState::Done)
    }

    /// 列印狀態標籤
    pub fn print_status(&self) -> &'static str {
        if self.bom_materials_printed {
            "Printed"
        } else {
            "Not Printed"
        }
    }

    /// 列印戳記
    pub fn print_stamp(&self) -> Option<PrintStamp> {
        if !self.bom_materials_printed {
            return None;
        }
        Some(PrintStamp {
            printed_at: self.bom_materials_print_date?,
            user: self.bom_materials_print_user.clone().unwrap_or_default(),
        })
    }
}
