use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{StoreError, UserStore};
use super::repo_types::{PageRequest, User, UserFilter};

struct Row {
    user: User,
    deleted: bool,
}

/// `UserStore` kept in a vector, mirroring the Postgres semantics.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: RwLock<Vec<Row>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(filter: &UserFilter, user: &User) -> bool {
    filter.email.as_deref().map_or(true, |e| e == user.email)
        && filter.full_name.as_deref().map_or(true, |n| n == user.full_name)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(
        &self,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| !r.deleted && r.user.email == email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            password_hash: password_hash.to_string(),
        };
        rows.push(Row {
            user: user.clone(),
            deleted: false,
        });
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|r| !r.deleted && r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|r| !r.deleted && r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Vec<User>, StoreError> {
        let rows = self.rows.read().await;
        let mut users: Vec<User> = rows
            .iter()
            .filter(|r| !r.deleted && matches(filter, &r.user))
            .map(|r| r.user.clone())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count_active(&self) -> Result<i64, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| !r.deleted).count() as i64)
    }

    async fn update(
        &self,
        id: Uuid,
        full_name: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| !r.deleted && r.user.id == id) {
            Some(row) => {
                row.user.full_name = full_name.to_string();
                row.user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| !r.deleted && r.user.id == id) {
            Some(row) => {
                row.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn email_is_unique_among_active_rows() {
        let store = MemoryUserStore::new();
        let first = store.create("a@x.com", "A", "h").await.unwrap();
        assert!(matches!(
            store.create("a@x.com", "B", "h").await,
            Err(StoreError::Duplicate)
        ));

        assert!(store.soft_delete(first.id).await.unwrap());
        store.create("a@x.com", "B", "h").await.expect("email free again");
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let store = MemoryUserStore::new();
        for (email, name) in [("a@x.com", "A"), ("b@x.com", "B"), ("c@x.com", "C")] {
            store.create(email, name, "h").await.unwrap();
        }
        let all = store
            .list(&UserFilter::default(), PageRequest { page: 1, size: 10 })
            .await
            .unwrap();
        let second = store
            .list(&UserFilter::default(), PageRequest { page: 2, size: 2 })
            .await
            .unwrap();
        assert_eq!(second, vec![all[2].clone()]);
    }
}
