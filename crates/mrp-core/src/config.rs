//! 報表配置模型

use serde::{Deserialize, Serialize};

/// 自動結案策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseStrategy {
    /// 重複呼叫宿主的完成作業，直到狀態離開 to_close
    Complete,
    /// 直接寫入 done 狀態與完工時間
    Direct,
}

/// 報表與生命週期配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// BOM 展開最大層級
    pub max_explosion_depth: u32,

    /// 子製造單搜尋最大層級
    pub child_search_depth: u32,

    /// 子製造單每次查詢的筆數上限
    pub child_search_limit: usize,

    /// 展開時搜尋子製造單的筆數上限
    pub sub_order_search_limit: usize,

    /// 每個組成件顯示的子製造單上限
    pub sub_mos_per_component: usize,

    /// 每張子製造單顯示的組成件上限
    pub sub_mo_components_limit: usize,

    /// 是否跳過 to_close 狀態（自動結案）
    ///
    /// - true: 製造單停在 to_close 時自動推進到 done
    /// - false: 保持宿主原本的流程（預設）
    pub skip_to_close_state: bool,

    /// 自動結案策略
    pub close_strategy: CloseStrategy,

    /// 系統網址（工單 QR Code 使用）
    pub web_base_url: String,

    /// 幣別標籤
    pub currency: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_explosion_depth: 10,
            child_search_depth: 3,
            child_search_limit: 20,
            sub_order_search_limit: 20,
            sub_mos_per_component: 5,
            sub_mo_components_limit: 10,
            skip_to_close_state: false,
            close_strategy: CloseStrategy::Complete,
            web_base_url: "http://localhost:8069".to_string(),
            currency: "THB".to_string(),
        }
    }
}

impl ReportConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 文件內容載入（缺少的欄位使用預設值）
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 建構器模式：設置 BOM 展開最大層級
    pub fn with_max_explosion_depth(mut self, depth: u32) -> Self {
        self.max_explosion_depth = depth;
        self
    }

    /// 建構器模式：設置子製造單搜尋範圍
    pub fn with_child_search(mut self, depth: u32, limit: usize) -> Self {
        self.child_search_depth = depth;
        self.child_search_limit = limit;
        self
    }

    /// 建構器模式：啟用或停用自動結案
    pub fn with_skip_to_close_state(mut self, enabled: bool) -> Self {
        self.skip_to_close_state = enabled;
        self
    }

    /// 建構器模式：設置自動結案策略
    pub fn with_close_strategy(mut self, strategy: CloseStrategy) -> Self {
        self.close_strategy = strategy;
        self
    }

    /// 建構器模式：設置系統網址
    pub fn with_web_base_url(mut self, url: impl Into<String>) -> Self {
        self.web_base_url = url.into();
        self
    }

    /// 工單掃描網址
    pub fn scan_url(&self, work_order_id: u64) -> String {
        format!(
            "{}/mrp/wo/scan_action?workorder_id={}",
            self.web_base_url.trim_end_matches('/'),
            work_order_id
        )
    }
}
