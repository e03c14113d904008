//! 工單掃碼
//!
//! 作業員掃描工單 QR Code：尚未開工的工單開工，進行中的工單完工。

use chrono::NaiveDateTime;
use mrp_core::{MrpError, MrpRepository, OrderState, Result, WorkOrderState};

use crate::auto_close::{AutoCloser, CloseOutcome, Completion, LifecycleEvent};

/// 掃碼結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Started,
    /// 工單完工，附帶製造單自動結案的結果
    Finished(CloseOutcome),
    /// 工單已完工，不做任何動作
    AlreadyFinished,
    /// 工單狀態不允許掃碼
    Rejected(WorkOrderState),
}

/// 處理工單掃碼
pub fn scan_work_order<H>(
    host: &mut H,
    closer: &mut AutoCloser,
    work_order_id: u64,
    now: NaiveDateTime,
) -> Result<ScanOutcome>
where
    H: MrpRepository + Completion,
{
    let wo = host
        .work_order(work_order_id)?
        .ok_or(MrpError::WorkOrderNotFound(work_order_id))?;
    tracing::info!("掃描工單 {}（{}），目前狀態 {}", wo.id, wo.name, wo.state.label());

    match wo.state {
        WorkOrderState::Ready | WorkOrderState::Pending | WorkOrderState::Waiting => {
            host.write_work_order_state(wo.id, WorkOrderState::Progress)?;
            let order = host.require_production(wo.production_id)?;
            if matches!(order.state, OrderState::Confirmed | OrderState::Planned) {
                host.write_state(order.id, OrderState::Progress, None)?;
            }
            tracing::info!("工單 {} 已開工", wo.id);
            Ok(ScanOutcome::Started)
        }
        WorkOrderState::Progress => {
            host.write_work_order_state(wo.id, WorkOrderState::Done)?;
            tracing::info!("工單 {} 已完工", wo.id);
            let closed = closer.on_event(
                host,
                LifecycleEvent::WorkOrderFinished {
                    order: wo.production_id,
                },
                now,
            );
            Ok(ScanOutcome::Finished(closed))
        }
        WorkOrderState::Done => {
            tracing::info!("工單 {} 已完工，不需處理", wo.id);
            Ok(ScanOutcome::AlreadyFinished)
        }
        other => {
            tracing::warn!("工單 {} 狀態為 {}，掃碼只能開工或完工", wo.id, other.label());
            Ok(ScanOutcome::Rejected(other))
        }
    }
}
