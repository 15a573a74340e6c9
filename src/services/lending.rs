//! Lending service: borrowing, deadline extension and returns

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::record::{BorrowRecord, LendingPolicy},
    repository::RecordsStore,
    services::catalog::CatalogService,
};

#[derive(Clone)]
pub struct LendingService {
    records: Arc<dyn RecordsStore>,
    catalog: CatalogService,
    policy: LendingPolicy,
}

impl LendingService {
    pub fn new(records: Arc<dyn RecordsStore>, catalog: CatalogService, policy: LendingPolicy) -> Self {
        Self {
            records,
            catalog,
            policy,
        }
    }

    pub fn policy(&self) -> &LendingPolicy {
        &self.policy
    }

    /// Borrow a book.
    ///
    /// `borrow_date` overrides "now" for the deadline computation only;
    /// suspension is always judged against the current time.
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: Option<DateTime<Utc>>,
    ) -> AppResult<BorrowRecord> {
        let now = Utc::now();

        let overdue = self.records.count_overdue(user_id, now).await?;
        if self.policy.is_suspended(overdue) {
            tracing::info!(user_id, overdue, "Borrow refused, user suspended");
            return Err(AppError::SuspendedUser);
        }

        if !self.catalog.book_exists(book_id).await? {
            return Err(AppError::BookNotFound);
        }

        if self.records.get_active(user_id, book_id).await?.is_some() {
            return Err(AppError::AlreadyBorrowed);
        }

        let new_record = self
            .policy
            .new_record(user_id, book_id, borrow_date.unwrap_or(now))?;
        // The store re-checks the pair atomically; a concurrent borrow loses here
        let record = self.records.create(new_record).await?;

        tracing::info!(user_id, book_id, return_date = %record.return_date, "User borrowed book");
        Ok(record)
    }

    /// Push the deadline of an active loan back by the configured number of days
    pub async fn extend_deadline(&self, user_id: i32, book_id: i32) -> AppResult<BorrowRecord> {
        let record = self
            .records
            .extend_active(user_id, book_id, &self.policy)
            .await?;

        tracing::info!(
            user_id,
            book_id,
            extend_times = record.extend_times,
            return_date = %record.return_date,
            "User extended deadline"
        );
        Ok(record)
    }

    /// Return a borrowed book; the record is kept for history
    pub async fn return_book(&self, user_id: i32, book_id: i32) -> AppResult<BorrowRecord> {
        let record = self
            .records
            .close_active(user_id, book_id, Utc::now())
            .await?;

        tracing::info!(user_id, book_id, "User returned book");
        Ok(record)
    }

    /// Active loans, earliest deadline first
    pub async fn list_active(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        self.records.list_active(user_id).await
    }

    /// Active loans past their deadline, earliest deadline first
    pub async fn list_overdue(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        self.records.list_overdue(user_id, Utc::now()).await
    }

    /// Every loan of the user, returned ones included
    pub async fn list_history(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        self.records.list_history(user_id).await
    }

    /// The active loan of one book
    pub async fn get_active(&self, user_id: i32, book_id: i32) -> AppResult<BorrowRecord> {
        self.records
            .get_active(user_id, book_id)
            .await?
            .ok_or(AppError::NotBorrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::LibraryConfig,
        models::book::CreateBook,
        models::record::RecordState,
        repository::memory::{MemoryBooksStore, MemoryRecordsStore},
    };
    use chrono::Duration;

    const ALICE: i32 = 1;

    async fn setup(books: usize) -> LendingService {
        let catalog = CatalogService::new(Arc::new(MemoryBooksStore::new()));
        for n in 0..books {
            catalog
                .add_book(CreateBook {
                    title: format!("Book {}", n + 1),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        LendingService::new(
            Arc::new(MemoryRecordsStore::new()),
            catalog,
            LendingPolicy::new(&LibraryConfig::default()),
        )
    }

    fn days_ago(days: i64) -> Option<DateTime<Utc>> {
        Some(Utc::now() - Duration::days(days))
    }

    #[tokio::test]
    async fn test_borrow_and_extend_scenario() {
        let lending = setup(1).await;
        let t = Utc::now();

        let record = lending.borrow(ALICE, 1, Some(t)).await.unwrap();
        assert_eq!(record.return_date, t + Duration::days(14));
        assert_eq!(record.extend_times, 0);
        assert_eq!(record.state, RecordState::Active);

        let record = lending.extend_deadline(ALICE, 1).await.unwrap();
        assert_eq!(record.return_date, t + Duration::days(21));
        assert_eq!(record.extend_times, 1);

        lending.extend_deadline(ALICE, 1).await.unwrap();
        let record = lending.extend_deadline(ALICE, 1).await.unwrap();
        assert_eq!(record.extend_times, 3);
        assert_eq!(record.return_date, t + Duration::days(35));

        assert!(matches!(
            lending.extend_deadline(ALICE, 1).await,
            Err(AppError::ExceedMaxExtendTimes)
        ));
        assert_eq!(lending.get_active(ALICE, 1).await.unwrap().extend_times, 3);
    }

    #[tokio::test]
    async fn test_suspended_user_cannot_borrow_anything() {
        let lending = setup(6).await;
        for book in 1..=5 {
            lending.borrow(ALICE, book, days_ago(30)).await.unwrap();
        }
        assert_eq!(lending.list_overdue(ALICE).await.unwrap().len(), 5);

        assert!(matches!(lending.borrow(ALICE, 6, None).await, Err(AppError::SuspendedUser)));
        // judged before the book lookup
        assert!(matches!(lending.borrow(ALICE, 999, None).await, Err(AppError::SuspendedUser)));
        // other users are unaffected
        assert!(lending.borrow(2, 6, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_suspension_lifts_after_return() {
        let lending = setup(6).await;
        for book in 1..=5 {
            lending.borrow(ALICE, book, days_ago(30)).await.unwrap();
        }
        lending.return_book(ALICE, 1).await.unwrap();
        assert!(lending.borrow(ALICE, 6, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_borrow_unknown_book() {
        let lending = setup(1).await;
        assert!(matches!(lending.borrow(ALICE, 42, None).await, Err(AppError::BookNotFound)));
    }

    #[tokio::test]
    async fn test_borrow_twice_is_rejected() {
        let lending = setup(1).await;
        lending.borrow(ALICE, 1, None).await.unwrap();
        assert!(matches!(lending.borrow(ALICE, 1, None).await, Err(AppError::AlreadyBorrowed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_yield_one_record() {
        let lending = setup(1).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lending = lending.clone();
                tokio::spawn(async move { lending.borrow(ALICE, 1, None).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::AlreadyBorrowed) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(lending.list_active(ALICE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_borrow_return_borrow_round_trip() {
        let lending = setup(1).await;
        lending.borrow(ALICE, 1, None).await.unwrap();

        let returned = lending.return_book(ALICE, 1).await.unwrap();
        assert!(returned.real_return_date().is_some());
        assert!(matches!(lending.get_active(ALICE, 1).await, Err(AppError::NotBorrowed)));

        let again = lending.borrow(ALICE, 1, None).await.unwrap();
        assert_eq!(again.extend_times, 0);

        let history = lending.list_history(ALICE).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|r| r.is_active()).count(), 1);
    }

    #[tokio::test]
    async fn test_history_survives_book_removal() {
        let lending = setup(2).await;
        lending.borrow(ALICE, 1, None).await.unwrap();
        lending.return_book(ALICE, 1).await.unwrap();
        lending.borrow(ALICE, 2, None).await.unwrap();

        lending.catalog.remove_book(1, None).await.unwrap();
        lending.catalog.remove_book(2, Some("lost")).await.unwrap();

        assert_eq!(lending.list_history(ALICE).await.unwrap().len(), 2);
        // an open loan on a removed book can still be closed
        let returned = lending.return_book(ALICE, 2).await.unwrap();
        assert!(returned.real_return_date().is_some());
        assert!(matches!(
            lending.borrow(ALICE, 1, None).await,
            Err(AppError::BookNotFound)
        ));
    }

    #[tokio::test]
    async fn test_return_and_extend_require_active_record() {
        let lending = setup(1).await;
        assert!(matches!(lending.return_book(ALICE, 1).await, Err(AppError::RecordNotFound)));
        assert!(matches!(lending.extend_deadline(ALICE, 1).await, Err(AppError::RecordNotFound)));

        lending.borrow(ALICE, 1, None).await.unwrap();
        lending.return_book(ALICE, 1).await.unwrap();
        assert!(matches!(lending.return_book(ALICE, 1).await, Err(AppError::RecordNotFound)));
        assert!(matches!(lending.extend_deadline(ALICE, 1).await, Err(AppError::RecordNotFound)));
    }

    #[tokio::test]
    async fn test_overdue_loan_can_be_extended() {
        let lending = setup(1).await;
        lending.borrow(ALICE, 1, days_ago(30)).await.unwrap();
        let record = lending.extend_deadline(ALICE, 1).await.unwrap();
        assert_eq!(record.extend_times, 1);
    }

    #[tokio::test]
    async fn test_overdue_is_subset_of_active() {
        let lending = setup(4).await;
        lending.borrow(ALICE, 1, days_ago(20)).await.unwrap();
        lending.borrow(ALICE, 2, None).await.unwrap();
        lending.borrow(ALICE, 3, days_ago(40)).await.unwrap();
        lending.borrow(ALICE, 4, days_ago(40)).await.unwrap();
        lending.return_book(ALICE, 4).await.unwrap();

        let now = Utc::now();
        let active = lending.list_active(ALICE).await.unwrap();
        let overdue = lending.list_overdue(ALICE).await.unwrap();

        assert_eq!(active.len(), 3);
        assert_eq!(overdue.len(), 2);
        for record in &overdue {
            assert!(active.contains(record));
            assert!(record.return_date < now);
        }
        // ascending by deadline
        assert_eq!(overdue[0].book_id, 3);
        assert_eq!(overdue[1].book_id, 1);
        assert!(active.windows(2).all(|w| w[0].return_date <= w[1].return_date));
    }

    #[tokio::test]
    async fn test_history_is_ordered_by_return_date() {
        let lending = setup(3).await;
        lending.borrow(ALICE, 1, None).await.unwrap();
        lending.borrow(ALICE, 2, days_ago(10)).await.unwrap();
        lending.borrow(ALICE, 3, days_ago(5)).await.unwrap();
        lending.return_book(ALICE, 2).await.unwrap();

        let books: Vec<i32> = lending
            .list_history(ALICE)
            .await
            .unwrap()
            .iter()
            .map(|r| r.book_id)
            .collect();
        assert_eq!(books, vec![2, 3, 1]);
    }
}
