//! Borrow record model and the lending policy applied to it

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
};

/// Whether a loan is still open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Active,
    Closed { real_return_date: DateTime<Utc> },
}

/// One user holding (or having held) one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RecordResponse", try_from = "RecordResponse")]
pub struct BorrowRecord {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    /// Deadline for giving the book back
    pub return_date: DateTime<Utc>,
    pub extend_times: u32,
    pub state: RecordState,
}

impl BorrowRecord {
    pub fn is_active(&self) -> bool {
        self.state == RecordState::Active
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.return_date < now
    }

    pub fn real_return_date(&self) -> Option<DateTime<Utc>> {
        match self.state {
            RecordState::Active => None,
            RecordState::Closed { real_return_date } => Some(real_return_date),
        }
    }

    /// The record after one more deadline extension.
    ///
    /// Overdue loans can still be extended.
    pub fn extended(&self, policy: &LendingPolicy) -> AppResult<BorrowRecord> {
        if !self.is_active() {
            return Err(AppError::RecordNotFound);
        }
        if self.extend_times >= policy.max_extend_times {
            return Err(AppError::ExceedMaxExtendTimes);
        }
        let return_date = self
            .return_date
            .checked_add_signed(policy.ddl_extend)
            .ok_or_else(|| AppError::InvalidInput("deadline out of range".to_string()))?;
        Ok(BorrowRecord {
            return_date,
            extend_times: self.extend_times + 1,
            ..self.clone()
        })
    }

    /// The record soft-closed at `at`
    pub fn closed(&self, at: DateTime<Utc>) -> AppResult<BorrowRecord> {
        if !self.is_active() {
            return Err(AppError::RecordNotFound);
        }
        Ok(BorrowRecord {
            state: RecordState::Closed {
                real_return_date: at,
            },
            ..self.clone()
        })
    }
}

/// Order records by deadline, oldest first; ties keep creation order
pub fn sort_by_return_date(records: &mut [BorrowRecord]) {
    records.sort_by(|a, b| a.return_date.cmp(&b.return_date).then(a.id.cmp(&b.id)));
}

/// Wire representation of a borrow record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordResponse {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub extend_times: u32,
    /// Set once the book has been returned
    pub real_return_date: Option<DateTime<Utc>>,
}

impl From<BorrowRecord> for RecordResponse {
    fn from(record: BorrowRecord) -> Self {
        RecordResponse {
            real_return_date: record.real_return_date(),
            id: record.id,
            user_id: record.user_id,
            book_id: record.book_id,
            borrow_date: record.borrow_date,
            return_date: record.return_date,
            extend_times: record.extend_times,
        }
    }
}

impl TryFrom<RecordResponse> for BorrowRecord {
    type Error = String;

    fn try_from(wire: RecordResponse) -> Result<Self, Self::Error> {
        let state = match wire.real_return_date {
            None => RecordState::Active,
            Some(real_return_date) => RecordState::Closed { real_return_date },
        };
        Ok(BorrowRecord {
            id: wire.id,
            user_id: wire.user_id,
            book_id: wire.book_id,
            borrow_date: wire.borrow_date,
            return_date: wire.return_date,
            extend_times: wire.extend_times,
            state,
        })
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub extend_times: i32,
    pub returned_at: Option<DateTime<Utc>>,
}

impl TryFrom<RecordRow> for BorrowRecord {
    type Error = AppError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let extend_times = u32::try_from(row.extend_times).map_err(|_| {
            AppError::Internal(format!("record {} has a negative extension count", row.id))
        })?;
        Ok(BorrowRecord {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            borrow_date: row.borrow_date,
            return_date: row.return_date,
            extend_times,
            state: match row.returned_at {
                None => RecordState::Active,
                Some(real_return_date) => RecordState::Closed { real_return_date },
            },
        })
    }
}

/// A loan about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
}

/// Borrow request body
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct BorrowRequest {
    /// Overrides "now" when computing the deadline (ISO 8601)
    pub borrow_date: Option<DateTime<Utc>>,
}

/// Lending rules derived from the library configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingPolicy {
    pub borrow_expire: Duration,
    pub ddl_extend: Duration,
    pub max_extend_times: u32,
    pub max_overdue_books: u32,
}

impl LendingPolicy {
    pub fn new(config: &LibraryConfig) -> Self {
        Self {
            borrow_expire: Duration::days(i64::from(config.borrow_expire_days)),
            ddl_extend: Duration::days(i64::from(config.ddl_extend_days)),
            max_extend_times: config.max_extend_times,
            max_overdue_books: config.max_overdue_books,
        }
    }

    /// Users holding this many overdue books cannot borrow more
    pub fn is_suspended(&self, overdue_count: u64) -> bool {
        overdue_count >= u64::from(self.max_overdue_books)
    }

    /// Fails when the deadline would fall outside the representable range
    pub fn new_record(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: DateTime<Utc>,
    ) -> AppResult<NewRecord> {
        let return_date = borrow_date
            .checked_add_signed(self.borrow_expire)
            .ok_or_else(|| AppError::InvalidInput("borrow date out of range".to_string()))?;
        Ok(NewRecord {
            user_id,
            book_id,
            borrow_date,
            return_date,
        })
    }
}

impl From<LibraryConfig> for LendingPolicy {
    fn from(config: LibraryConfig) -> Self {
        Self::new(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> LendingPolicy {
        LendingPolicy::new(&LibraryConfig::default())
    }

    fn record(t: DateTime<Utc>) -> BorrowRecord {
        let new = policy().new_record(1, 2, t).unwrap();
        BorrowRecord {
            id: 10,
            user_id: new.user_id,
            book_id: new.book_id,
            borrow_date: new.borrow_date,
            return_date: new.return_date,
            extend_times: 0,
            state: RecordState::Active,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_deadline_is_borrow_date_plus_expiry() {
        let r = record(t0());
        assert_eq!(r.return_date, t0() + Duration::days(14));
    }

    #[test]
    fn test_extension_limit() {
        let mut r = record(t0());
        for n in 1..=3 {
            r = r.extended(&policy()).unwrap();
            assert_eq!(r.extend_times, n);
            assert_eq!(r.return_date, t0() + Duration::days(14 + 7 * i64::from(n)));
        }
        assert!(matches!(r.extended(&policy()), Err(AppError::ExceedMaxExtendTimes)));
        assert_eq!(r.extend_times, 3);
    }

    #[test]
    fn test_overdue_record_can_be_extended() {
        let r = record(t0());
        assert!(r.is_overdue(t0() + Duration::days(30)));
        assert!(r.extended(&policy()).is_ok());
    }

    #[test]
    fn test_close_is_terminal() {
        let r = record(t0());
        let closed = r.closed(t0() + Duration::days(3)).unwrap();
        assert!(!closed.is_active());
        assert!(!closed.is_overdue(t0() + Duration::days(100)));
        assert_eq!(closed.real_return_date(), Some(t0() + Duration::days(3)));
        assert!(matches!(closed.closed(t0()), Err(AppError::RecordNotFound)));
        assert!(matches!(closed.extended(&policy()), Err(AppError::RecordNotFound)));
    }

    #[test]
    fn test_overdue_is_strict() {
        let r = record(t0());
        assert!(!r.is_overdue(r.return_date));
        assert!(r.is_overdue(r.return_date + Duration::seconds(1)));
    }

    #[test]
    fn test_deadline_past_calendar_end_is_rejected() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        assert!(matches!(
            policy().new_record(1, 2, late),
            Err(AppError::InvalidInput(_))
        ));

        let mut r = record(t0());
        r.return_date = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        assert!(matches!(r.extended(&policy()), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_suspension_threshold() {
        let p = policy();
        assert!(!p.is_suspended(4));
        assert!(p.is_suspended(5));
        assert!(p.is_suspended(6));
    }

    #[test]
    fn test_wire_format() {
        let r = record(t0());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["extend_times"], 0);
        assert!(json["real_return_date"].is_null());

        let closed = r.closed(t0()).unwrap();
        let json = serde_json::to_value(&closed).unwrap();
        let back: BorrowRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, closed);
    }

    #[test]
    fn test_sort_by_return_date() {
        let mut a = record(t0() + Duration::days(2));
        a.id = 1;
        let mut b = record(t0());
        b.id = 2;
        let mut c = record(t0());
        c.id = 3;
        let mut all = vec![a, c, b];
        sort_by_return_date(&mut all);
        let ids: Vec<i32> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_negative_extend_times_rejected() {
        let row = RecordRow {
            id: 1,
            user_id: 1,
            book_id: 1,
            borrow_date: t0(),
            return_date: t0(),
            extend_times: -1,
            returned_at: None,
        };
        assert!(BorrowRecord::try_from(row).is_err());
    }
}
