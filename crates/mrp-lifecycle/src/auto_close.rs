//! 自動結案
//!
//! 啟用後，停在 to_close 的製造單會被自動推進到 done。
//! 觸發點：公司檢查後、設定生產數量後、狀態寫入 to_close 時、工單完工後。
//!
//! 結案期間以製造單為單位設置標記，完成作業過程中宿主再觸發的事件
//! 遇到標記即忽略。

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use mrp_core::{
    CloseStrategy, InMemoryRepository, MrpError, MrpRepository, OrderId, OrderState,
    ProductionOrder, ReportConfig, Result,
};
use serde::{Deserialize, Serialize};

/// 完成作業最多呼叫次數
const MAX_COMPLETION_CALLS: usize = 2;

/// 生命週期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// 公司檢查完成
    CompanyValidated { order: OrderId },
    /// 已設定生產數量
    QtyProducingSet { order: OrderId },
    /// 製造單狀態被寫入
    StateWritten { order: OrderId, state: OrderState },
    /// 工單完工
    WorkOrderFinished { order: OrderId },
}

impl LifecycleEvent {
    pub fn order_id(&self) -> OrderId {
        match *self {
            LifecycleEvent::CompanyValidated { order }
            | LifecycleEvent::QtyProducingSet { order }
            | LifecycleEvent::StateWritten { order, .. }
            | LifecycleEvent::WorkOrderFinished { order } => order,
        }
    }
}

/// 宿主的製造單完成作業
pub trait Completion {
    fn order(&self, id: OrderId) -> Result<Option<ProductionOrder>>;

    /// 所有 to_close 狀態的製造單
    fn orders_to_close(&self) -> Result<Vec<ProductionOrder>>;

    /// 執行宿主的完成作業，回傳過程中觸發的事件
    fn mark_done(&mut self, id: OrderId, now: NaiveDateTime) -> Result<Vec<LifecycleEvent>>;

    /// 直接寫入 done 狀態與完工時間
    fn write_done(&mut self, id: OrderId, now: NaiveDateTime) -> Result<()>;
}

impl Completion for InMemoryRepository {
    fn order(&self, id: OrderId) -> Result<Option<ProductionOrder>> {
        self.production(id)
    }

    fn orders_to_close(&self) -> Result<Vec<ProductionOrder>> {
        self.search_productions(&|o: &ProductionOrder| o.state == OrderState::ToClose, None)
    }

    fn mark_done(&mut self, id: OrderId, now: NaiveDateTime) -> Result<Vec<LifecycleEvent>> {
        let order = self.require_production(id)?;
        match order.state {
            OrderState::Confirmed
            | OrderState::Planned
            | OrderState::Progress
            | OrderState::ToClose => {
                self.write_state(id, OrderState::Done, Some(now))?;
                Ok(vec![LifecycleEvent::StateWritten {
                    order: id,
                    state: OrderState::Done,
                }])
            }
            other => Err(MrpError::InvalidStateTransition {
                from: other.to_string(),
                to: OrderState::Done.to_string(),
            }),
        }
    }

    fn write_done(&mut self, id: OrderId, now: NaiveDateTime) -> Result<()> {
        self.write_state(id, OrderState::Done, Some(now))
    }
}

/// 自動結案配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCloseConfig {
    pub enabled: bool,
    pub strategy: CloseStrategy,
}

impl Default for AutoCloseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: CloseStrategy::Complete,
        }
    }
}

impl From<&ReportConfig> for AutoCloseConfig {
    fn from(config: &ReportConfig) -> Self {
        Self {
            enabled: config.skip_to_close_state,
            strategy: config.close_strategy,
        }
    }
}

/// 事件處理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// 未啟用自動結案
    Disabled,
    /// 狀態不需結案
    Skipped(OrderState),
    /// 製造單正在結案中
    AlreadyClosing,
    Closed,
    /// 結案失敗（已記錄，製造單維持原狀）
    Failed(String),
}

/// 定期結案的統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub closed: usize,
    pub failed: usize,
    pub failed_orders: Vec<String>,
}

/// 自動結案器
#[derive(Debug, Default)]
pub struct AutoCloser {
    config: AutoCloseConfig,
    closing: BTreeSet<OrderId>,
}

impl AutoCloser {
    pub fn new(config: AutoCloseConfig) -> Self {
        Self {
            config,
            closing: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &AutoCloseConfig {
        &self.config
    }

    /// 製造單是否正在結案
    pub fn is_closing(&self, id: OrderId) -> bool {
        self.closing.contains(&id)
    }

    /// 處理生命週期事件
    pub fn on_event<H: Completion + ?Sized>(
        &mut self,
        host: &mut H,
        event: LifecycleEvent,
        now: NaiveDateTime,
    ) -> CloseOutcome {
        if !self.config.enabled {
            return CloseOutcome::Disabled;
        }
        if let LifecycleEvent::StateWritten { state, .. } = event {
            if state != OrderState::ToClose {
                return CloseOutcome::Skipped(state);
            }
        }

        let id = event.order_id();
        if self.closing.contains(&id) {
            tracing::debug!("製造單 {} 正在結案，忽略事件 {:?}", id, event);
            return CloseOutcome::AlreadyClosing;
        }

        let order = match host.order(id) {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!("自動結案找不到製造單 {}", id);
                return CloseOutcome::Failed(MrpError::OrderNotFound(id.to_string()).to_string());
            }
            Err(err) => {
                tracing::warn!("自動結案讀取製造單 {} 失敗: {}", id, err);
                return CloseOutcome::Failed(err.to_string());
            }
        };

        if !should_close(&order) {
            return CloseOutcome::Skipped(order.state);
        }

        tracing::info!("自動結案製造單 {}（事件 {:?}）", order.name, event);
        self.close(host, &order, now)
    }

    /// 結案所有 to_close 製造單（排程作業）
    pub fn sweep<H: Completion + ?Sized>(
        &mut self,
        host: &mut H,
        now: NaiveDateTime,
    ) -> Result<SweepReport> {
        let orders = host.orders_to_close()?;
        tracing::info!("找到 {} 張 to_close 製造單", orders.len());

        let mut report = SweepReport::default();
        for order in &orders {
            if self.closing.contains(&order.id) {
                continue;
            }
            match self.close(host, order, now) {
                CloseOutcome::Closed => report.closed += 1,
                _ => {
                    report.failed += 1;
                    report.failed_orders.push(order.name.clone());
                }
            }
        }

        if report.closed > 0 || report.failed > 0 {
            tracing::info!("自動結案完成: 成功 {}，失敗 {}", report.closed, report.failed);
        }
        Ok(report)
    }

    fn close<H: Completion + ?Sized>(
        &mut self,
        host: &mut H,
        order: &ProductionOrder,
        now: NaiveDateTime,
    ) -> CloseOutcome {
        self.closing.insert(order.id);
        let result = self.force_complete(host, order, now);
        self.closing.remove(&order.id);

        match result {
            Ok(()) => {
                tracing::info!("製造單 {} 已自動結案", order.name);
                CloseOutcome::Closed
            }
            Err(err) => {
                tracing::error!("製造單 {} 自動結案失敗: {}", order.name, err);
                CloseOutcome::Failed(err.to_string())
            }
        }
    }

    fn force_complete<H: Completion + ?Sized>(
        &mut self,
        host: &mut H,
        order: &ProductionOrder,
        now: NaiveDateTime,
    ) -> Result<()> {
        let external = |err: MrpError| MrpError::ExternalOperation {
            order: order.name.clone(),
            message: err.to_string(),
        };

        match self.config.strategy {
            CloseStrategy::Direct => host.write_done(order.id, now).map_err(external),
            CloseStrategy::Complete => {
                for attempt in 1..=MAX_COMPLETION_CALLS {
                    let events = host.mark_done(order.id, now).map_err(external)?;
                    for event in events {
                        let outcome = self.on_event(host, event, now);
                        tracing::debug!("完成作業觸發事件 {:?}: {:?}", event, outcome);
                    }

                    let state = host.order(order.id).map_err(external)?.map(|o| o.state);
                    if state != Some(OrderState::ToClose) {
                        tracing::debug!("製造單 {} 第 {} 次完成作業後狀態 {:?}", order.name, attempt, state);
                        return Ok(());
                    }
                    tracing::info!("製造單 {} 仍在 to_close，再次執行完成作業", order.name);
                }

                Err(MrpError::ExternalOperation {
                    order: order.name.clone(),
                    message: format!("完成作業 {} 次後仍停在 to_close", MAX_COMPLETION_CALLS),
                })
            }
        }
    }
}

/// to_close，或進行中且所有工單都已完成
fn should_close(order: &ProductionOrder) -> bool {
    match order.state {
        OrderState::ToClose => true,
        OrderState::Progress => order.all_work_orders_done(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::{WorkOrder, WorkOrderState};
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 20)
            .unwrap()
            .and_hms_opt(16, 45, 0)
            .unwrap()
    }

    fn mo(id: OrderId, state: OrderState) -> ProductionOrder {
        let created = NaiveDate::from_ymd_opt(2025, 11, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        ProductionOrder::new(id, format!("MO/{:03}", id), 10, Decimal::ONE, 1, created)
            .with_state(state)
    }

    fn enabled(strategy: CloseStrategy) -> AutoCloser {
        AutoCloser::new(AutoCloseConfig {
            enabled: true,
            strategy,
        })
    }

    /// 模擬需要多次完成作業、或完成作業失敗的宿主
    struct ScriptedHost {
        repo: InMemoryRepository,
        calls: usize,
        stays_to_close: usize,
        fail: bool,
    }

    impl ScriptedHost {
        fn new(repo: InMemoryRepository) -> Self {
            Self {
                repo,
                calls: 0,
                stays_to_close: 0,
                fail: false,
            }
        }
    }

    impl Completion for ScriptedHost {
        fn order(&self, id: OrderId) -> Result<Option<ProductionOrder>> {
            self.repo.production(id)
        }

        fn orders_to_close(&self) -> Result<Vec<ProductionOrder>> {
            self.repo.orders_to_close()
        }

        fn mark_done(&mut self, id: OrderId, now: NaiveDateTime) -> Result<Vec<LifecycleEvent>> {
            self.calls += 1;
            if self.fail {
                return Err(MrpError::Other("庫存不足".to_string()));
            }
            if self.calls <= self.stays_to_close {
                self.repo.write_state(id, OrderState::ToClose, None)?;
                return Ok(vec![LifecycleEvent::StateWritten {
                    order: id,
                    state: OrderState::ToClose,
                }]);
            }
            Completion::mark_done(&mut self.repo, id, now)
        }

        fn write_done(&mut self, id: OrderId, now: NaiveDateTime) -> Result<()> {
            self.repo.write_done(id, now)
        }
    }

    #[test]
    fn test_disabled_leaves_order_in_to_close() {
        let mut repo = InMemoryRepository::new().with_order(mo(1, OrderState::ToClose));
        let mut closer = AutoCloser::default();

        let outcome = closer.on_event(
            &mut repo,
            LifecycleEvent::StateWritten {
                order: 1,
                state: OrderState::ToClose,
            },
            now(),
        );
        assert_eq!(outcome, CloseOutcome::Disabled);
        assert_eq!(repo.require_production(1).unwrap().state, OrderState::ToClose);
    }

    #[rstest]
    #[case(CloseStrategy::Complete)]
    #[case(CloseStrategy::Direct)]
    fn test_closes_to_close_order(#[case] strategy: CloseStrategy) {
        let mut repo = InMemoryRepository::new().with_order(mo(1, OrderState::ToClose));
        let mut closer = enabled(strategy);

        let outcome = closer.on_event(&mut repo, LifecycleEvent::QtyProducingSet { order: 1 }, now());
        assert_eq!(outcome, CloseOutcome::Closed);

        let order = repo.require_production(1).unwrap();
        assert_eq!(order.state, OrderState::Done);
        assert_eq!(order.date_finished, Some(now()));
        assert!(!closer.is_closing(1));
    }

    #[rstest]
    #[case(OrderState::Confirmed)]
    #[case(OrderState::Done)]
    fn test_state_written_other_than_to_close_is_skipped(#[case] state: OrderState) {
        let mut repo = InMemoryRepository::new().with_order(mo(1, state));
        let mut closer = enabled(CloseStrategy::Complete);

        let outcome = closer.on_event(
            &mut repo,
            LifecycleEvent::StateWritten { order: 1, state },
            now(),
        );
        assert_eq!(outcome, CloseOutcome::Skipped(state));
    }

    #[test]
    fn test_work_order_finished_closes_in_progress_order() {
        let finished = WorkOrder::new(1, "Cut", 1, 1, Decimal::from(30)).with_state(WorkOrderState::Done);
        let open = WorkOrder::new(2, "Weld", 2, 1, Decimal::from(30));
        let mut repo = InMemoryRepository::new()
            .with_order(mo(1, OrderState::Progress).with_work_order(finished))
            .with_order(mo(2, OrderState::Progress).with_work_order(open));
        let mut closer = enabled(CloseStrategy::Complete);

        let closed = closer.on_event(&mut repo, LifecycleEvent::WorkOrderFinished { order: 1 }, now());
        assert_eq!(closed, CloseOutcome::Closed);

        let skipped = closer.on_event(&mut repo, LifecycleEvent::WorkOrderFinished { order: 2 }, now());
        assert_eq!(skipped, CloseOutcome::Skipped(OrderState::Progress));
        assert_eq!(repo.require_production(2).unwrap().state, OrderState::Progress);
    }

    #[test]
    fn test_second_completion_call_and_reentry_guard() {
        let mut host = ScriptedHost::new(InMemoryRepository::new().with_order(mo(1, OrderState::ToClose)));
        host.stays_to_close = 1;
        let mut closer = enabled(CloseStrategy::Complete);

        let outcome = closer.on_event(&mut host, LifecycleEvent::CompanyValidated { order: 1 }, now());
        assert_eq!(outcome, CloseOutcome::Closed);
        // 第一次呼叫觸發的 to_close 事件被忽略，不會再進入結案
        assert_eq!(host.calls, 2);
        assert_eq!(host.repo.require_production(1).unwrap().state, OrderState::Done);
    }

    #[test]
    fn test_gives_up_after_two_calls() {
        let mut host = ScriptedHost::new(InMemoryRepository::new().with_order(mo(1, OrderState::ToClose)));
        host.stays_to_close = 5;
        let mut closer = enabled(CloseStrategy::Complete);

        let outcome = closer.on_event(&mut host, LifecycleEvent::CompanyValidated { order: 1 }, now());
        assert!(matches!(outcome, CloseOutcome::Failed(_)));
        assert_eq!(host.calls, MAX_COMPLETION_CALLS);
    }

    #[test]
    fn test_failure_leaves_order_untouched() {
        let mut host = ScriptedHost::new(InMemoryRepository::new().with_order(mo(1, OrderState::ToClose)));
        host.fail = true;
        let mut closer = enabled(CloseStrategy::Complete);

        let outcome = closer.on_event(&mut host, LifecycleEvent::QtyProducingSet { order: 1 }, now());
        match outcome {
            CloseOutcome::Failed(message) => assert!(message.contains("MO/001")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(host.calls, 1);
        assert_eq!(host.repo.require_production(1).unwrap().state, OrderState::ToClose);
        assert!(!closer.is_closing(1));
    }

    #[test]
    fn test_sweep_counts_results() {
        let mut repo = InMemoryRepository::new()
            .with_order(mo(1, OrderState::ToClose))
            .with_order(mo(2, OrderState::ToClose))
            .with_order(mo(3, OrderState::Progress));
        let mut closer = AutoCloser::default();

        let report = closer.sweep(&mut repo, now()).unwrap();
        assert_eq!(report.closed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(repo.require_production(3).unwrap().state, OrderState::Progress);
        assert!(repo.orders_to_close().unwrap().is_empty());
    }

    #[test]
    fn test_sweep_reports_failures() {
        let mut host = ScriptedHost::new(InMemoryRepository::new().with_order(mo(1, OrderState::ToClose)));
        host.fail = true;
        let mut closer = AutoCloser::default();

        let report = closer.sweep(&mut host, now()).unwrap();
        assert_eq!(report.closed, 0);
        assert_eq!(report.failed_orders, vec!["MO/001".to_string()]);
    }

    #[test]
    fn test_config_from_report_config() {
        let config = ReportConfig::default()
            .with_skip_to_close_state(true)
            .with_close_strategy(CloseStrategy::Direct);
        let auto = AutoCloseConfig::from(&config);
        assert!(auto.enabled);
        assert_eq!(auto.strategy, CloseStrategy::Direct);
    }
}
