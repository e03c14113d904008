//! 產品與工作中心模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ProductId, UomId};

/// 產品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// 產品ID
    pub id: ProductId,

    /// 產品名稱
    pub name: String,

    /// 內部參考編號
    #[serde(default)]
    pub default_code: Option<String>,

    /// 預設計量單位
    pub uom_id: UomId,

    /// 標準成本
    #[serde(default)]
    pub standard_price: Decimal,

    /// 內部庫位現有量
    #[serde(default)]
    pub qty_on_hand: Decimal,

    /// 可用量
    #[serde(default)]
    pub qty_available: Decimal,

    /// 產品描述
    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    /// 創建新的產品
    pub fn new(id: ProductId, name: impl Into<String>, uom_id: UomId) -> Self {
        Self {
            id,
            name: name.into(),
            default_code: None,
            uom_id,
            standard_price: Decimal::ZERO,
            qty_on_hand: Decimal::ZERO,
            qty_available: Decimal::ZERO,
            description: None,
        }
    }

    /// 建構器模式：設置內部參考編號
    pub fn with_default_code(mut self, code: impl Into<String>) -> Self {
        self.default_code = Some(code.into());
        self
    }

    /// 建構器模式：設置標準成本
    pub fn with_standard_price(mut self, price: Decimal) -> Self {
        self.standard_price = price;
        self
    }

    /// 建構器模式：設置庫存量（現有量與可用量相同）
    pub fn with_stock(mut self, qty: Decimal) -> Self {
        self.qty_on_hand = qty;
        self.qty_available = qty;
        self
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 顯示名稱：`[REF] 名稱`，無參考編號時只顯示名稱
    pub fn display_name(&self) -> String {
        match self.default_code.as_deref() {
            Some(code) if !code.is_empty() => format!("[{}] {}", code, self.name),
            _ => self.name.clone(),
        }
    }
}

/// 工作中心
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workcenter {
    pub id: u64,
    pub name: String,

    /// 每小時成本
    #[serde(default)]
    pub costs_hour: Decimal,
}

impl Workcenter {
    pub fn new(id: u64, name: impl Into<String>, costs_hour: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            costs_hour,
        }
    }

    /// 每分鐘成本
    pub fn cost_per_minute(&self) -> Decimal {
        self.costs_hour / Decimal::from(60)
    }
}
