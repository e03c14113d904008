//! 製造看板統計

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use mrp_core::{
    MrpRepository, OrderState, ProductionOrder, ReservationState, Result, WorkOrderState,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 看板卡片
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardCard {
    AllManufacturing,
    WorkInProgress,
    WaitingForMaterials,
    CompletedToday,
}

/// 卡片上的四個計數
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoCounts {
    pub ready: usize,
    pub waiting: usize,
    pub late: usize,
    pub in_progress: usize,
}

const WAITING_STATES: [OrderState; 3] = [OrderState::Confirmed, OrderState::Planned, OrderState::Draft];

const LATE_STATES: [OrderState; 5] = [
    OrderState::Confirmed,
    OrderState::Planned,
    OrderState::Progress,
    OrderState::ToClose,
    OrderState::Draft,
];

fn in_base(card: DashboardCard, order: &ProductionOrder) -> bool {
    match card {
        DashboardCard::AllManufacturing => true,
        DashboardCard::WorkInProgress => {
            matches!(order.state, OrderState::Confirmed | OrderState::Progress)
        }
        DashboardCard::WaitingForMaterials => {
            order.state == OrderState::Confirmed
                && order.reservation_state == Some(ReservationState::Waiting)
        }
        DashboardCard::CompletedToday => false,
    }
}

/// 計算卡片計數
///
/// 今日完工卡片只有一個數字，四個欄位填入相同值。
pub fn card_counts<R: MrpRepository + ?Sized>(
    repo: &R,
    card: DashboardCard,
    now: NaiveDateTime,
) -> Result<MoCounts> {
    if card == DashboardCard::CompletedToday {
        let today = now.date();
        let done = repo.count_productions(&|o: &ProductionOrder| {
            o.state == OrderState::Done && o.date_finished.map(|d| d.date()) == Some(today)
        })?;
        return Ok(MoCounts {
            ready: done,
            waiting: done,
            late: done,
            in_progress: done,
        });
    }

    let ready = repo.count_productions(&|o: &ProductionOrder| {
        in_base(card, o)
            && WAITING_STATES.contains(&o.state)
            && o.reservation_state == Some(ReservationState::Assigned)
    })?;
    let waiting = repo.count_productions(&|o: &ProductionOrder| {
        in_base(card, o)
            && WAITING_STATES.contains(&o.state)
            && o.reservation_state == Some(ReservationState::Waiting)
    })?;
    let late = repo.count_productions(&|o: &ProductionOrder| {
        in_base(card, o) && LATE_STATES.contains(&o.state) && o.date_start.is_some_and(|d| d < now)
    })?;
    let in_progress = repo.count_productions(&|o: &ProductionOrder| {
        in_base(card, o) && matches!(o.state, OrderState::Progress | OrderState::ToClose)
    })?;

    let counts = MoCounts {
        ready,
        waiting,
        late,
        in_progress,
    };
    tracing::debug!("看板 {:?} 計數: {:?}", card, counts);
    Ok(counts)
}

/// 單日各狀態製造單數量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStateCount {
    pub date: NaiveDate,
    pub draft: usize,
    pub confirmed: usize,
    pub progress: usize,
    pub done: usize,
    pub cancel: usize,
}

/// 依建立日期統計每日各狀態數量（含起訖日）
pub fn daily_state_counts(
    orders: &[ProductionOrder],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyStateCount> {
    if end < start {
        return Vec::new();
    }
    let days: Vec<NaiveDate> = (0..=(end - start).num_days())
        .map(|offset| start + Duration::days(offset))
        .collect();

    days.par_iter()
        .map(|&date| {
            let mut count = DailyStateCount {
                date,
                ..Default::default()
            };
            for order in orders.iter().filter(|o| o.create_date.date() == date) {
                match order.state {
                    OrderState::Draft => count.draft += 1,
                    OrderState::Confirmed => count.confirmed += 1,
                    OrderState::Progress => count.progress += 1,
                    OrderState::Done => count.done += 1,
                    OrderState::Cancel => count.cancel += 1,
                    OrderState::Planned | OrderState::ToClose => {}
                }
            }
            count
        })
        .collect()
}

/// 工作中心負荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkcenterLoad {
    pub workcenter_id: u64,
    pub workcenter: String,
    pub work_orders: usize,
    /// 預計工時合計（分鐘）
    pub duration_expected: Decimal,
}

/// 各工作中心未完工工單
///
/// 進行中、就緒、等待中的工單，以及所屬製造單非草稿的待處理工單。
pub fn workcenter_load<R: MrpRepository + ?Sized>(repo: &R) -> Result<Vec<WorkcenterLoad>> {
    let orders = repo.search_productions(&|o: &ProductionOrder| !o.work_orders.is_empty(), None)?;

    let mut by_workcenter: BTreeMap<u64, (usize, Decimal)> = BTreeMap::new();
    for order in &orders {
        for wo in &order.work_orders {
            let counted = match wo.state {
                WorkOrderState::Progress | WorkOrderState::Ready | WorkOrderState::Waiting => true,
                WorkOrderState::Pending => order.state != OrderState::Draft,
                WorkOrderState::Done | WorkOrderState::Cancel => false,
            };
            if counted {
                let entry = by_workcenter.entry(wo.workcenter_id).or_default();
                entry.0 += 1;
                entry.1 += wo.duration_expected;
            }
        }
    }

    let mut loads = Vec::with_capacity(by_workcenter.len());
    for (workcenter_id, (work_orders, duration_expected)) in by_workcenter {
        let workcenter = match repo.workcenter(workcenter_id) {
            Ok(Some(wc)) => wc.name,
            Ok(None) => format!("#{}", workcenter_id),
            Err(err) => {
                tracing::warn!("讀取工作中心 {} 失敗: {}", workcenter_id, err);
                format!("#{}", workcenter_id)
            }
        };
        loads.push(WorkcenterLoad {
            workcenter_id,
            workcenter,
            work_orders,
            duration_expected,
        });
    }
    Ok(loads)
}
