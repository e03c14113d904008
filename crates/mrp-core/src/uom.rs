//! 計量單位模型

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{MrpError, Result, UomId};

/// 計量單位
///
/// 同一類別內的單位以 `factor` 相對於類別參考單位換算：
/// `參考單位數量 = 數量 / factor`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uom {
    /// 單位ID
    pub id: UomId,

    /// 單位名稱
    pub name: String,

    /// 單位類別（只有同類別才能換算）
    pub category_id: u64,

    /// 換算係數
    pub factor: Decimal,

    /// 捨入精度（例如 0.01）
    pub rounding: Decimal,
}

impl Uom {
    /// 創建類別參考單位（factor = 1）
    pub fn reference(id: UomId, name: impl Into<String>, category_id: u64) -> Self {
        Self {
            id,
            name: name.into(),
            category_id,
            factor: Decimal::ONE,
            rounding: Decimal::new(1, 2),
        }
    }

    /// 建構器模式：設置換算係數
    pub fn with_factor(mut self, factor: Decimal) -> Self {
        self.factor = factor;
        self
    }

    /// 建構器模式：設置捨入精度
    pub fn with_rounding(mut self, rounding: Decimal) -> Self {
        self.rounding = rounding;
        self
    }

    /// 依本單位精度四捨五入（half-up）
    pub fn round(&self, quantity: Decimal) -> Result<Decimal> {
        round_to_precision(quantity, self.rounding)
    }

    /// 將本單位的數量換算為目標單位
    pub fn compute_quantity(&self, quantity: Decimal, to: &Uom) -> Result<Decimal> {
        if self.id == to.id {
            return Ok(quantity);
        }

        if self.category_id != to.category_id {
            return Err(MrpError::UomCategoryMismatch {
                from: self.name.clone(),
                to: to.name.clone(),
            });
        }

        if self.factor.is_zero() {
            return Err(MrpError::Other(format!("單位 {} 的換算係數為 0", self.name)));
        }

        let amount = quantity
            .checked_div(self.factor)
            .and_then(|q| q.checked_mul(to.factor))
            .ok_or_else(|| overflow(quantity, &self.name, &to.name))?;
        to.round(amount)
    }
}

fn overflow(quantity: Decimal, from: &str, to: &str) -> MrpError {
    MrpError::Other(format!("數量 {} 換算溢位（{} → {}）", quantity, from, to))
}

/// 依精度步長四捨五入（0 或負值表示不捨入），數值溢位時回傳錯誤
pub fn round_to_precision(quantity: Decimal, precision: Decimal) -> Result<Decimal> {
    if precision <= Decimal::ZERO {
        return Ok(quantity);
    }
    quantity
        .checked_div(precision)
        .map(|steps| steps.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|steps| steps.checked_mul(precision))
        .ok_or_else(|| MrpError::Other(format!("數量 {} 依精度 {} 捨入時溢位", quantity, precision)))
}
