//! User persistence.
//!
//! # Design Decisions
//! - Email uniqueness is enforced by the store (unique index / map entry),
//!   so concurrent registrations for one email cannot both succeed
//! - The in-memory store backs tests and local runs without MongoDB

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::services::auth::types::User;
use crate::services::store::StoreError;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] if the email exists.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn shutdown(&self) {}
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(email).map(|u| u.value().clone()))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    email: String,
    password: String,
    fullname: String,
    role: String,
    created_at: BsonDateTime,
}

impl TryFrom<&User> for UserDocument {
    type Error = StoreError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let id = ObjectId::parse_str(&user.id)
            .map_err(|e| StoreError::InvalidDocument(format!("user id: {e}")))?;
        Ok(Self {
            id,
            email: user.email.clone(),
            password: user.password_hash.clone(),
            fullname: user.fullname.clone(),
            role: user.role.clone(),
            created_at: BsonDateTime::from_millis(user.created_at.timestamp_millis()),
        })
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        let created_at = Utc
            .timestamp_millis_opt(doc.created_at.timestamp_millis())
            .single()
            .unwrap_or_default();
        Self {
            id: doc.id.to_hex(),
            email: doc.email,
            fullname: doc.fullname,
            role: doc.role,
            password_hash: doc.password,
            created_at,
        }
    }
}

/// Users in the `users` collection.
pub struct MongoUserStore {
    client: Client,
    users: Collection<UserDocument>,
}

impl MongoUserStore {
    pub async fn new(client: Client, db: &mongodb::Database) -> Result<Self, StoreError> {
        let users = db.collection::<UserDocument>("users");
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(index).await?;
        Ok(Self { client, users })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let found = self.users.find_one(doc! { "email": email }).await?;
        Ok(found.map(User::from))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let document = UserDocument::try_from(user)?;
        self.users.insert_one(document).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            id: ObjectId::new().to_hex(),
            email: email.to_string(),
            fullname: "Ada".to_string(),
            role: "user".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.insert(&user("a@example.com")).await.unwrap();
        let err = store.insert(&user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.users.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_finds_by_email() {
        let store = MemoryUserStore::new();
        let u = user("b@example.com");
        store.insert(&u).await.unwrap();

        let found = store.find_by_email("b@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, u.id);
        assert!(store.find_by_email("c@example.com").await.unwrap().is_none());
    }

    #[test]
    fn document_rejects_non_object_id() {
        let mut u = user("d@example.com");
        u.id = "not-hex".to_string();
        assert!(UserDocument::try_from(&u).is_err());
    }
}
