//! Contact message persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::{
    bson::{oid::ObjectId, DateTime as BsonDateTime},
    Client, Collection,
};
use serde::{Deserialize, Serialize};

use crate::services::contact::types::ContactRecord;
use crate::services::store::StoreError;

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert_one(&self, record: &ContactRecord) -> Result<(), StoreError>;

    async fn shutdown(&self) {}
}

#[derive(Debug, Default)]
pub struct MemoryContactStore {
    records: DashMap<String, ContactRecord>,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<ContactRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn insert_one(&self, record: &ContactRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ContactDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: String,
    message: String,
    created_at: BsonDateTime,
}

/// Messages in the `contacts` collection.
pub struct MongoContactStore {
    client: Client,
    contacts: Collection<ContactDocument>,
}

impl MongoContactStore {
    pub fn new(client: Client, db: &mongodb::Database) -> Self {
        Self {
            client,
            contacts: db.collection::<ContactDocument>("contacts"),
        }
    }
}

#[async_trait]
impl ContactStore for MongoContactStore {
    async fn insert_one(&self, record: &ContactRecord) -> Result<(), StoreError> {
        let id = ObjectId::parse_str(&record.id)
            .map_err(|e| StoreError::InvalidDocument(format!("contact id: {e}")))?;
        let document = ContactDocument {
            id,
            name: record.name.clone(),
            email: record.email.clone(),
            message: record.message.clone(),
            created_at: BsonDateTime::from_millis(record.created_at.timestamp_millis()),
        };
        self.contacts.insert_one(document).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}
