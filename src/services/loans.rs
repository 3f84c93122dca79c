//! Loans service: borrowed-copy views and the due-date renewal workflow

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{BookInstance, BorrowedCopy, BorrowedOrder, Capability, Page, Pagination, UserClaims},
    policy,
    repository::Repository,
};

use super::Clock;

/// Copies per page in the borrowed views
pub const BORROWED_PER_PAGE: i64 = 10;
/// Latest accepted renewal date, counted from today
pub const MAX_RENEWAL_WEEKS: i64 = 4;
/// Renewal date proposed by the form
pub const PROPOSED_RENEWAL_WEEKS: i64 = 3;
/// Where a successful renewal sends the client
pub const RENEWAL_REDIRECT: &str = "/catalog/borrowed";

/// Renewal form: the copy and the proposed due date
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewalForm {
    pub copy: BookInstance,
    pub proposed_due_back: NaiveDate,
}

/// Result of a successful renewal
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewedCopy {
    pub copy: BookInstance,
    pub redirect_to: String,
}

/// Accept dates in `today..=today + 4 weeks`
pub fn validate_renewal_date(due_back: NaiveDate, today: NaiveDate) -> AppResult<()> {
    if due_back < today {
        return Err(AppError::InvalidDate(
            "Invalid date - renewal in past".to_string(),
        ));
    }
    if due_back > today + Duration::weeks(MAX_RENEWAL_WEEKS) {
        return Err(AppError::InvalidDate(
            "Invalid date - renewal more than 4 weeks ahead".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl LoansService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Copy to renew with a proposed due date three weeks from today
    pub async fn renewal_form(
        &self,
        copy_id: Uuid,
        principal: Option<&UserClaims>,
    ) -> AppResult<RenewalForm> {
        policy::require_capability(principal, Capability::MarkReturned)?;
        let copy = self.repository.book_instances.get_by_id(copy_id).await?;

        Ok(RenewalForm {
            copy,
            proposed_due_back: self.clock.today() + Duration::weeks(PROPOSED_RENEWAL_WEEKS),
        })
    }

    /// Set a new due date on a loaned copy. Nothing but `due_back` is written.
    ///
    /// `due_back` is `None` when the submitted form carried no readable date;
    /// that is reported as an invalid date once the copy is known to exist.
    pub async fn renew(
        &self,
        copy_id: Uuid,
        due_back: Option<NaiveDate>,
        principal: Option<&UserClaims>,
    ) -> AppResult<RenewedCopy> {
        let librarian = policy::require_capability(principal, Capability::MarkReturned)?;
        let copy = self.repository.book_instances.get_by_id(copy_id).await?;
        let due_back = due_back.ok_or_else(|| {
            AppError::InvalidDate("Invalid date - expected a renewal date as YYYY-MM-DD".to_string())
        })?;
        validate_renewal_date(due_back, self.clock.today())?;
        if !copy.is_on_loan() {
            return Err(AppError::not_on_loan(copy_id));
        }

        // The write re-checks the status, so a copy returned meanwhile is refused

        let copy = self
            .repository
            .book_instances
            .update_due_back(copy_id, due_back)
            .await?;

        tracing::info!(
            copy_id = %copy_id,
            due_back = %due_back,
            librarian = %librarian.sub,
            "Loan renewed"
        );

        Ok(RenewedCopy {
            copy,
            redirect_to: RENEWAL_REDIRECT.to_string(),
        })
    }

    /// Copies on loan to the caller, earliest due date first
    pub async fn my_borrowed(
        &self,
        principal: Option<&UserClaims>,
        pagination: Pagination,
    ) -> AppResult<Page<BorrowedCopy>> {
        let patron = policy::require_authenticated(principal)?;
        self.borrowed_page(Some(patron.user_id), BorrowedOrder::DueBack, pagination)
            .await
    }

    /// Every copy on loan, for staff
    pub async fn all_borrowed(
        &self,
        principal: Option<&UserClaims>,
        order: BorrowedOrder,
        pagination: Pagination,
    ) -> AppResult<Page<BorrowedCopy>> {
        policy::require_capability(principal, Capability::ViewBorrowed)?;
        self.borrowed_page(None, order, pagination).await
    }

    async fn borrowed_page(
        &self,
        borrower_id: Option<i64>,
        order: BorrowedOrder,
        pagination: Pagination,
    ) -> AppResult<Page<BorrowedCopy>> {
        let instances = &self.repository.book_instances;
        let total = instances.count_on_loan(borrower_id).await?;
        pagination.check(total)?;

        let today = self.clock.today();
        let copies = instances
            .list_on_loan(borrower_id, order, pagination.limit(), pagination.offset())
            .await?
            .into_iter()
            .map(|copy| copy.mark_overdue(today))
            .collect();

        Ok(Page::new(copies, total, pagination))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::eq;

    use super::*;
    use crate::{
        models::{LoanStatus, PageQuery},
        repository::{
            MockAuthorsRepository, MockBookInstancesRepository, MockBooksRepository,
            MockGenresRepository, MockGroupsRepository, MockUsersRepository,
        },
    };

    struct FixedClock(NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn service(instances: MockBookInstancesRepository) -> LoansService {
        let repository = Repository::from_parts(
            Arc::new(MockGenresRepository::new()),
            Arc::new(MockAuthorsRepository::new()),
            Arc::new(MockBooksRepository::new()),
            Arc::new(instances),
            Arc::new(MockUsersRepository::new()),
            Arc::new(MockGroupsRepository::new()),
        );
        LoansService::new(repository, Arc::new(FixedClock(today())))
    }

    fn principal(user_id: i64, capabilities: Vec<Capability>) -> UserClaims {
        UserClaims {
            sub: format!("user{}", user_id),
            user_id,
            capabilities,
            exp: 0,
            iat: 0,
        }
    }

    fn librarian() -> UserClaims {
        principal(1, vec![Capability::ViewBorrowed, Capability::MarkReturned])
    }

    fn loaned_copy(id: Uuid) -> BookInstance {
        BookInstance {
            id,
            book_id: 4,
            imprint: "Ace, 1969".to_string(),
            due_back: NaiveDate::from_ymd_opt(2024, 5, 20),
            borrower_id: Some(9),
            status: LoanStatus::OnLoan,
            created_at: Utc::now(),
        }
    }

    fn instances_with_copy(copy: BookInstance) -> MockBookInstancesRepository {
        let mut instances = MockBookInstancesRepository::new();
        instances
            .expect_get_by_id()
            .with(eq(copy.id))
            .returning(move |_| Ok(copy.clone()));
        instances
    }

    #[test]
    fn test_renewal_date_bounds() {
        let today = today();
        assert!(validate_renewal_date(today, today).is_ok());
        assert!(validate_renewal_date(today + Duration::days(28), today).is_ok());
        assert!(matches!(
            validate_renewal_date(today - Duration::days(1), today),
            Err(AppError::InvalidDate(msg)) if msg == "Invalid date - renewal in past"
        ));
        assert!(matches!(
            validate_renewal_date(today + Duration::days(29), today),
            Err(AppError::InvalidDate(msg)) if msg == "Invalid date - renewal more than 4 weeks ahead"
        ));
    }

    #[tokio::test]
    async fn test_renew_overwrites_due_back_only() {
        let id = Uuid::new_v4();
        let original = loaned_copy(id);
        let requested = today() + Duration::days(28);

        let mut instances = instances_with_copy(original.clone());
        let updated = BookInstance {
            due_back: Some(requested),
            ..original.clone()
        };
        instances
            .expect_update_due_back()
            .with(eq(id), eq(requested))
            .times(1)
            .returning(move |_, _| Ok(updated.clone()));

        let renewed = service(instances)
            .renew(id, Some(requested), Some(&librarian()))
            .await
            .unwrap();

        assert_eq!(renewed.copy.due_back, Some(requested));
        assert_eq!(renewed.copy.borrower_id, original.borrower_id);
        assert_eq!(renewed.copy.status, original.status);
        assert_eq!(renewed.copy.imprint, original.imprint);
        assert_eq!(renewed.redirect_to, "/catalog/borrowed");
    }

    #[tokio::test]
    async fn test_renew_rejects_out_of_range_dates_without_writing() {
        let id = Uuid::new_v4();
        for requested in [today() - Duration::days(1), today() + Duration::days(29)] {
            let mut instances = instances_with_copy(loaned_copy(id));
            instances.expect_update_due_back().never();

            let result = service(instances)
                .renew(id, Some(requested), Some(&librarian()))
                .await;
            assert!(matches!(result, Err(AppError::InvalidDate(_))));
        }
    }

    #[tokio::test]
    async fn test_renew_without_capability_forbidden_before_any_access() {
        let mut instances = MockBookInstancesRepository::new();
        instances.expect_get_by_id().never();
        instances.expect_update_due_back().never();
        let patron = principal(9, vec![Capability::ViewBorrowed]);

        let result = service(instances)
            .renew(Uuid::new_v4(), Some(today()), Some(&patron))
            .await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_renew_anonymous_unauthenticated() {
        let result = service(MockBookInstancesRepository::new())
            .renew(Uuid::new_v4(), Some(today() - Duration::days(3)), None)
            .await;
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_renew_unknown_copy_not_found() {
        let mut instances = MockBookInstancesRepository::new();
        instances
            .expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("Book instance {} not found", id))));
        instances.expect_update_due_back().never();

        let result = service(instances)
            .renew(Uuid::new_v4(), Some(today() + Duration::days(60)), Some(&librarian()))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_renew_copy_not_on_loan_rejected() {
        let id = Uuid::new_v4();
        let available = BookInstance {
            status: LoanStatus::Available,
            due_back: None,
            borrower_id: None,
            ..loaned_copy(id)
        };
        let mut instances = instances_with_copy(available);
        instances.expect_update_due_back().never();

        let result = service(instances)
            .renew(id, Some(today() + Duration::days(7)), Some(&librarian()))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_renew_copy_returned_before_write_is_validation_error() {
        let id = Uuid::new_v4();
        let mut instances = instances_with_copy(loaned_copy(id));
        instances
            .expect_update_due_back()
            .times(1)
            .returning(|id, _| Err(AppError::not_on_loan(id)));

        let result = service(instances)
            .renew(id, Some(today() + Duration::days(7)), Some(&librarian()))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_renew_without_date_reported_after_lookup() {
        let id = Uuid::new_v4();
        let mut instances = instances_with_copy(loaned_copy(id));
        instances.expect_update_due_back().never();

        let result = service(instances).renew(id, None, Some(&librarian())).await;
        assert!(matches!(result, Err(AppError::InvalidDate(_))));

        let mut instances = MockBookInstancesRepository::new();
        instances
            .expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("Book instance {} not found", id))));
        let result = service(instances)
            .renew(Uuid::new_v4(), None, Some(&librarian()))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_renewal_form_proposes_three_weeks() {
        let id = Uuid::new_v4();
        let mut instances = instances_with_copy(loaned_copy(id));
        instances.expect_update_due_back().never();

        let form = service(instances)
            .renewal_form(id, Some(&librarian()))
            .await
            .unwrap();

        assert_eq!(form.proposed_due_back, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
        assert_eq!(form.copy.id, id);
    }

    fn borrowed(borrower_id: i64, due: u32) -> BorrowedCopy {
        BorrowedCopy {
            id: Uuid::new_v4(),
            book_id: 1,
            book_title: "Kindred".to_string(),
            imprint: String::new(),
            due_back: NaiveDate::from_ymd_opt(2024, 5, due),
            borrower_id: Some(borrower_id),
            borrower_username: Some(format!("user{}", borrower_id)),
            is_overdue: false,
        }
    }

    #[tokio::test]
    async fn test_my_borrowed_scoped_to_caller() {
        let mut instances = MockBookInstancesRepository::new();
        instances
            .expect_count_on_loan()
            .with(eq(Some(9)))
            .returning(|_| Ok(2));
        instances
            .expect_list_on_loan()
            .with(eq(Some(9)), eq(BorrowedOrder::DueBack), eq(BORROWED_PER_PAGE), eq(0))
            .returning(|_, _, _, _| Ok(vec![borrowed(9, 10), borrowed(9, 20)]));

        let patron = principal(9, vec![]);
        let page = service(instances)
            .my_borrowed(Some(&patron), Pagination::new(PageQuery::default(), BORROWED_PER_PAGE))
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert!(page.items[0].is_overdue);
        assert!(!page.items[1].is_overdue);
    }

    #[tokio::test]
    async fn test_my_borrowed_requires_login() {
        let result = service(MockBookInstancesRepository::new())
            .my_borrowed(None, Pagination::new(PageQuery::default(), BORROWED_PER_PAGE))
            .await;
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_all_borrowed_policy() {
        let first_page = Pagination::new(PageQuery::default(), BORROWED_PER_PAGE);

        let anonymous = service(MockBookInstancesRepository::new())
            .all_borrowed(None, BorrowedOrder::Insertion, first_page)
            .await;
        assert!(matches!(anonymous, Err(AppError::Authentication(_))));

        let patron = principal(9, vec![Capability::MarkReturned]);
        let forbidden = service(MockBookInstancesRepository::new())
            .all_borrowed(Some(&patron), BorrowedOrder::Insertion, first_page)
            .await;
        assert!(matches!(forbidden, Err(AppError::Authorization(_))));

        let mut instances = MockBookInstancesRepository::new();
        instances
            .expect_count_on_loan()
            .with(eq(None))
            .returning(|_| Ok(3));
        instances
            .expect_list_on_loan()
            .with(eq(None), eq(BorrowedOrder::Insertion), eq(BORROWED_PER_PAGE), eq(0))
            .returning(|_, _, _, _| Ok(vec![borrowed(9, 20), borrowed(4, 16), borrowed(5, 30)]));

        let page = service(instances)
            .all_borrowed(Some(&librarian()), BorrowedOrder::Insertion, first_page)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
    }
}
