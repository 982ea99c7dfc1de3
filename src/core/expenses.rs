//! Expense management for the signed-in user.

use crate::core::aggregate::recent;
use crate::core::auth::{AuthError, AuthProvider};
use crate::core::currency::normalize_code;
use crate::core::expense::{Category, ExpenseRecord};
use crate::core::period::Calendar;
use crate::core::store::ExpenseStore;
use anyhow::{Result, bail};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const FULL_DATE_FORMAT: &str = "%d/%m/%Y";

/// Fields of an expense as entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub amount: f64,
    pub timestamp: i64,
    pub currency: String,
}

/// Title search plus category selection for the expense list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub query: Option<String>,
    pub categories: BTreeSet<Category>,
}

impl ExpenseFilter {
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn with_categories<I: IntoIterator<Item = Category>>(mut self, categories: I) -> Self {
        self.categories.extend(categories);
        self
    }

    /// Adds the category to the selection, or removes it if already selected.
    pub fn toggle_category(&mut self, category: Category) {
        if !self.categories.remove(&category) {
            self.categories.insert(category);
        }
    }

    pub fn clear_categories(&mut self) {
        self.categories.clear();
    }

    pub fn matches(&self, record: &ExpenseRecord) -> bool {
        let query_matches = match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => record
                .title
                .to_lowercase()
                .contains(&query.to_lowercase()),
        };
        query_matches && (self.categories.is_empty() || self.categories.contains(&record.category))
    }

    pub fn apply(&self, records: Vec<ExpenseRecord>) -> Vec<ExpenseRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

pub struct ExpenseService {
    store: Arc<dyn ExpenseStore>,
    auth: Arc<dyn AuthProvider>,
    calendar: Calendar,
}

impl ExpenseService {
    pub fn new(
        store: Arc<dyn ExpenseStore>,
        auth: Arc<dyn AuthProvider>,
        calendar: Calendar,
    ) -> Self {
        Self {
            store,
            auth,
            calendar,
        }
    }

    pub fn store(&self) -> Arc<dyn ExpenseStore> {
        self.store.clone()
    }

    async fn user_id(&self) -> Result<Option<String>> {
        Ok(self.auth.current_user().await?.map(|user| user.uid))
    }

    async fn require_user_id(&self) -> Result<String> {
        self.user_id().await?.ok_or_else(|| AuthError::NotSignedIn.into())
    }

    fn full_date(&self, timestamp: i64) -> String {
        self.calendar
            .local_date(timestamp)
            .format(FULL_DATE_FORMAT)
            .to_string()
    }

    pub async fn add(&self, expense: NewExpense) -> Result<ExpenseRecord> {
        let user = self.require_user_id().await?;
        let record = ExpenseRecord {
            id: Uuid::new_v4().to_string(),
            title: expense.title.trim().to_string(),
            category: expense.category,
            description: expense.description,
            amount: expense.amount,
            timestamp: expense.timestamp,
            full_date: self.full_date(expense.timestamp),
            currency: normalize_code(&expense.currency).to_uppercase(),
        };
        self.store.upsert(&user, &record).await?;
        info!("Added expense {} ({})", record.id, record.title);
        Ok(record)
    }

    /// Replaces the stored expense with the same id.
    pub async fn edit(&self, mut record: ExpenseRecord) -> Result<ExpenseRecord> {
        let user = self.require_user_id().await?;
        if self.store.get(&user, &record.id).await?.is_none() {
            bail!("Expense not found: {}", record.id);
        }
        record.title = record.title.trim().to_string();
        record.currency = normalize_code(&record.currency).to_uppercase();
        record.full_date = self.full_date(record.timestamp);
        self.store.upsert(&user, &record).await?;
        info!("Updated expense {}", record.id);
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let user = self.require_user_id().await?;
        let removed = self.store.delete(&user, id).await?;
        debug!("Delete {id}: removed={removed}");
        Ok(removed)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ExpenseRecord>> {
        match self.user_id().await? {
            Some(user) => self.store.get(&user, id).await,
            None => Ok(None),
        }
    }

    pub async fn all(&self) -> Result<Vec<ExpenseRecord>> {
        match self.user_id().await? {
            Some(user) => self.store.list(&user).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn recent(&self, n: usize) -> Result<Vec<ExpenseRecord>> {
        Ok(recent(&self.all().await?, n))
    }

    /// Case-sensitive title prefix search, ordered by title.
    pub async fn search(&self, prefix: &str) -> Result<Vec<ExpenseRecord>> {
        match self.user_id().await? {
            Some(user) => self.store.search_prefix(&user, prefix).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn filtered(&self, filter: &ExpenseFilter) -> Result<Vec<ExpenseRecord>> {
        Ok(filter.apply(self.all().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{AuthResult, User};
    use crate::store::memory::MemoryExpenseStore;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Auth stub whose signed-in user can be switched by the test.
    struct StubAuth {
        user: Mutex<Option<User>>,
    }

    impl StubAuth {
        fn signed_in(uid: &str) -> Self {
            Self {
                user: Mutex::new(Some(User {
                    uid: uid.to_string(),
                    email: format!("{uid}@example.com"),
                })),
            }
        }
    }

    #[async_trait]
    impl AuthProvider for StubAuth {
        async fn register(&self, _email: &str, _password: &str) -> AuthResult<User> {
            Err(AuthError::InvalidCredentials)
        }

        async fn login(&self, _email: &str, _password: &str) -> AuthResult<User> {
            Err(AuthError::InvalidCredentials)
        }

        async fn current_user(&self) -> AuthResult<Option<User>> {
            Ok(self.user.lock().unwrap().clone())
        }

        async fn sign_out(&self) -> AuthResult<()> {
            *self.user.lock().unwrap() = None;
            Ok(())
        }
    }

    fn new_expense(title: &str, category: Category, day: u32) -> NewExpense {
        NewExpense {
            title: title.to_string(),
            category,
            description: String::new(),
            amount: 12.5,
            timestamp: Utc
                .with_ymd_and_hms(2024, 3, day, 9, 30, 0)
                .unwrap()
                .timestamp_millis(),
            currency: "usd".to_string(),
        }
    }

    fn service(auth: Arc<StubAuth>) -> ExpenseService {
        ExpenseService::new(Arc::new(MemoryExpenseStore::new()), auth, Calendar::default())
    }

    #[tokio::test]
    async fn test_add_generates_id_and_full_date() {
        let service = service(Arc::new(StubAuth::signed_in("u1")));
        let record = service
            .add(new_expense("  Lunch ", Category::FoodDrinks, 7))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&record.id).is_ok());
        assert_eq!(record.title, "Lunch");
        assert_eq!(record.full_date, "07/03/2024");
        assert_eq!(record.currency, "USD");
        assert_eq!(service.get(&record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_edit_requires_existing_record() {
        let service = service(Arc::new(StubAuth::signed_in("u1")));
        let mut record = service
            .add(new_expense("Taxi", Category::Transport, 2))
            .await
            .unwrap();

        record.amount = 30.0;
        record.timestamp = Utc
            .with_ymd_and_hms(2024, 3, 20, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let edited = service.edit(record.clone()).await.unwrap();
        assert_eq!(edited.full_date, "20/03/2024");
        assert_eq!(service.all().await.unwrap(), vec![edited]);

        record.id = "missing".to_string();
        assert!(service.edit(record).await.is_err());
    }

    #[tokio::test]
    async fn test_signed_out_reads_are_empty_and_writes_fail() {
        let auth = Arc::new(StubAuth::signed_in("u1"));
        let service = service(auth.clone());
        let record = service
            .add(new_expense("Taxi", Category::Transport, 2))
            .await
            .unwrap();
        auth.sign_out().await.unwrap();

        assert!(service.all().await.unwrap().is_empty());
        assert!(service.get(&record.id).await.unwrap().is_none());
        assert!(service.search("T").await.unwrap().is_empty());

        let err = service
            .add(new_expense("Bus", Category::Transport, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::NotSignedIn)
        ));
        assert!(service.delete(&record.id).await.is_err());
    }

    #[tokio::test]
    async fn test_recent_search_and_delete() {
        let service = service(Arc::new(StubAuth::signed_in("u1")));
        for (title, day) in [("Coffee", 1), ("Cinema", 3), ("Books", 2)] {
            service
                .add(new_expense(title, Category::Entertainment, day))
                .await
                .unwrap();
        }

        let titles = |records: Vec<ExpenseRecord>| -> Vec<String> {
            records.into_iter().map(|r| r.title).collect()
        };
        assert_eq!(titles(service.recent(2).await.unwrap()), vec!["Cinema", "Books"]);
        assert_eq!(titles(service.search("C").await.unwrap()), vec!["Cinema", "Coffee"]);

        let books = service.search("Books").await.unwrap().remove(0);
        assert!(service.delete(&books.id).await.unwrap());
        assert!(!service.delete(&books.id).await.unwrap());
        assert_eq!(service.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_filtered_list() {
        let service = service(Arc::new(StubAuth::signed_in("u1")));
        service.add(new_expense("Groceries", Category::FoodDrinks, 1)).await.unwrap();
        service.add(new_expense("Gym", Category::Health, 2)).await.unwrap();
        service.add(new_expense("Pharmacy", Category::Health, 3)).await.unwrap();

        let mut filter = ExpenseFilter::default().with_query("g");
        assert_eq!(service.filtered(&filter).await.unwrap().len(), 2);

        filter.toggle_category(Category::Health);
        let health = service.filtered(&filter).await.unwrap();
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].title, "Gym");

        filter.toggle_category(Category::Health);
        assert!(filter.categories.is_empty());
        filter.query = Some("   ".to_string());
        assert_eq!(service.filtered(&filter).await.unwrap().len(), 3);
    }

    #[test]
    fn test_filter_matching() {
        let record = ExpenseRecord {
            id: "1".to_string(),
            title: "Monthly Rent".to_string(),
            category: Category::HomeBills,
            description: String::new(),
            amount: 800.0,
            timestamp: 0,
            full_date: String::new(),
            currency: "EUR".to_string(),
        };
        assert!(ExpenseFilter::default().matches(&record));
        assert!(ExpenseFilter::default().with_query("RENT").matches(&record));
        assert!(!ExpenseFilter::default().with_query("gas").matches(&record));

        let mut filter = ExpenseFilter::default().with_categories([Category::Shopping]);
        assert!(!filter.matches(&record));
        filter.toggle_category(Category::HomeBills);
        assert!(filter.matches(&record));
        filter.clear_categories();
        assert!(filter.matches(&record));
    }
}
