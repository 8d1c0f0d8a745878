use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::model::leave_request::{LeaveCategory, LeaveDecision, LeaveRecord, NewLeave};
use crate::store::{LeaveQuery, LeaveStore, Page};

pub const MAX_REASON_LEN: usize = 1_000;

/// A leave application after it has been typed at the HTTP boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveApplication {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: LeaveCategory,
    pub reason: String,
    pub attachment: Option<String>,
}

impl LeaveApplication {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.start_date > self.end_date {
            return Err(AppError::validation("start_date cannot be after end_date"));
        }
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason must not be empty"));
        }
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(AppError::validation("reason is too long"));
        }
        Ok(())
    }
}

#[instrument(name = "submit_leave", skip(store, application))]
pub async fn submit<S: LeaveStore>(
    store: &S,
    employee_id: u64,
    application: LeaveApplication,
) -> Result<LeaveRecord, AppError> {
    application.validate()?;

    let record = store
        .insert_leave(NewLeave {
            employee_id,
            start_date: application.start_date,
            end_date: application.end_date,
            category: application.category,
            reason: application.reason.trim().to_string(),
            attachment: application.attachment,
        })
        .await?;

    info!(leave_id = record.id, "Leave request submitted");
    Ok(record)
}

/// Applies an approval or rejection. A decided request never changes again.
#[instrument(name = "decide_leave", skip(store))]
pub async fn decide<S: LeaveStore>(
    store: &S,
    leave_id: u64,
    decision: LeaveDecision,
    decided_by: u64,
) -> Result<LeaveRecord, AppError> {
    let mut leave = store
        .leave(leave_id)
        .await?
        .ok_or(AppError::NotFound("leave request"))?;

    let next = leave
        .status
        .apply(decision)
        .map_err(|e| AppError::finalized(leave_id, e))?;

    if !store
        .set_leave_status(leave_id, leave.status, next, decided_by)
        .await?
    {
        // Another decision landed between our read and write.
        let current = store
            .leave(leave_id)
            .await?
            .ok_or(AppError::NotFound("leave request"))?;
        warn!(status = %current.status, "Concurrent leave decision lost");
        return Err(AppError::AlreadyFinalized {
            leave_id,
            status: current.status,
        });
    }

    leave.status = next;
    leave.decided_by = Some(decided_by);
    info!(status = %next, "Leave request decided");
    Ok(leave)
}

pub async fn get<S: LeaveStore>(store: &S, leave_id: u64) -> Result<LeaveRecord, AppError> {
    store
        .leave(leave_id)
        .await?
        .ok_or(AppError::NotFound("leave request"))
}

pub async fn list<S: LeaveStore>(store: &S, query: &LeaveQuery) -> Result<Page<LeaveRecord>, AppError> {
    Ok(store.list_leaves(query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::LeaveStatus;
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn application(start: u32, end: u32) -> LeaveApplication {
        LeaveApplication {
            start_date: d(start),
            end_date: d(end),
            category: LeaveCategory::Vacation,
            reason: "  family trip ".into(),
            attachment: None,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[actix_web::test]
    async fn submitted_leave_starts_pending() {
        let store = store();
        let leave = submit(&store, 5, application(10, 12)).await.unwrap();
        assert_eq!(leave.status, LeaveStatus::Pending);
        assert_eq!(leave.reason, "family trip");
        assert_eq!(leave.employee_id, 5);
    }

    #[actix_web::test]
    async fn inverted_range_is_rejected() {
        let store = store();
        let err = submit(&store, 5, application(12, 10)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.snapshot().leaves.is_empty());
    }

    #[actix_web::test]
    async fn blank_reason_is_rejected() {
        let store = store();
        let mut app = application(10, 10);
        app.reason = "   ".into();
        assert!(matches!(submit(&store, 5, app).await, Err(AppError::Validation(_))));
    }

    #[actix_web::test]
    async fn approve_once_then_already_finalized() {
        let store = store();
        let leave = submit(&store, 5, application(10, 12)).await.unwrap();

        let approved = decide(&store, leave.id, LeaveDecision::Approve, 99).await.unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.decided_by, Some(99));

        for decision in [LeaveDecision::Approve, LeaveDecision::Reject] {
            let err = decide(&store, leave.id, decision, 99).await.unwrap_err();
            assert!(matches!(
                err,
                AppError::AlreadyFinalized { status: LeaveStatus::Approved, .. }
            ));
        }
        assert_eq!(get(&store, leave.id).await.unwrap().status, LeaveStatus::Approved);
    }

    #[actix_web::test]
    async fn rejected_leave_cannot_be_approved() {
        let store = store();
        let leave = submit(&store, 5, application(10, 12)).await.unwrap();
        decide(&store, leave.id, LeaveDecision::Reject, 1).await.unwrap();

        let err = decide(&store, leave.id, LeaveDecision::Approve, 1).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::AlreadyFinalized { status: LeaveStatus::Rejected, .. }
        ));
    }

    #[actix_web::test]
    async fn losing_a_concurrent_decision_reports_the_winner() {
        let store = store();
        let leave = submit(&store, 5, application(10, 12)).await.unwrap();
        store.decide_concurrently(LeaveStatus::Rejected, 7);

        let err = decide(&store, leave.id, LeaveDecision::Approve, 8).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::AlreadyFinalized { status: LeaveStatus::Rejected, .. }
        ));

        let stored = get(&store, leave.id).await.unwrap();
        assert_eq!(stored.status, LeaveStatus::Rejected);
        assert_eq!(stored.decided_by, Some(7));
    }

    #[actix_web::test]
    async fn page_past_the_end_is_empty() {
        let store = store();
        submit(&store, 5, application(10, 12)).await.unwrap();

        let page = list(
            &store,
            &LeaveQuery {
                employee_id: None,
                status: None,
                page: u64::MAX,
                per_page: 10,
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());
    }

    #[actix_web::test]
    async fn unknown_leave_is_not_found() {
        let err = decide(&store(), 404, LeaveDecision::Approve, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn list_filters_by_status_and_pages() {
        let store = store();
        for _ in 0..3 {
            submit(&store, 5, application(10, 12)).await.unwrap();
        }
        let other = submit(&store, 6, application(1, 2)).await.unwrap();
        decide(&store, other.id, LeaveDecision::Approve, 1).await.unwrap();

        let pending = list(
            &store,
            &LeaveQuery {
                employee_id: None,
                status: Some(LeaveStatus::Pending),
                page: 1,
                per_page: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.total, 3);
        assert_eq!(pending.items.len(), 2);

        let approved = list(
            &store,
            &LeaveQuery {
                employee_id: Some(6),
                status: None,
                page: 1,
                per_page: 10,
            },
        )
        .await
        .unwrap();
        assert_eq!(approved.items, vec![LeaveRecord { status: LeaveStatus::Approved, decided_by: Some(1), ..other }]);
    }
}
