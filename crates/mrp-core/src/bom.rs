//! 物料清單模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ProductId, UomId};

/// BOM 類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BomType {
    /// 一般製造
    Normal,
    /// 虛擬件（套件）
    Phantom,
}

/// 物料清單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillOfMaterials {
    /// BOM ID
    pub id: u64,

    /// 成品
    pub product_id: ProductId,

    /// 所屬公司（None 表示所有公司共用）
    #[serde(default)]
    pub company_id: Option<u64>,

    /// BOM 類型
    pub bom_type: BomType,

    /// 參考數量（lines 的用量以此數量為基準）
    pub product_qty: Decimal,

    /// 參考數量的計量單位
    pub uom_id: UomId,

    /// 組成件（保持順序）
    #[serde(default)]
    pub lines: Vec<BomLine>,

    /// 製程
    #[serde(default)]
    pub operations: Vec<BomOperation>,
}

impl BillOfMaterials {
    /// 創建一般 BOM
    pub fn new(id: u64, product_id: ProductId, product_qty: Decimal, uom_id: UomId) -> Self {
        Self {
            id,
            product_id,
            company_id: None,
            bom_type: BomType::Normal,
            product_qty,
            uom_id,
            lines: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// 建構器模式：設置公司
    pub fn with_company(mut self, company_id: u64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    /// 建構器模式：設置類型
    pub fn with_type(mut self, bom_type: BomType) -> Self {
        self.bom_type = bom_type;
        self
    }

    /// 建構器模式：添加組成件
    pub fn with_line(mut self, product_id: ProductId, product_qty: Decimal, uom_id: UomId) -> Self {
        self.lines.push(BomLine {
            product_id,
            product_qty,
            uom_id,
        });
        self
    }

    /// 建構器模式：添加製程
    pub fn with_operation(mut self, operation: BomOperation) -> Self {
        self.operations.push(operation);
        self
    }

    /// 是否適用於指定公司
    pub fn applies_to_company(&self, company_id: u64) -> bool {
        self.company_id.map_or(true, |c| c == company_id)
    }
}

/// BOM 組成件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    pub product_id: ProductId,

    /// 每參考數量的用量
    pub product_qty: Decimal,

    pub uom_id: UomId,
}

/// BOM 製程
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomOperation {
    pub name: String,
    pub workcenter_id: u64,

    /// 每單位成品的週期時間（分鐘）
    pub time_cycle: Decimal,
}
