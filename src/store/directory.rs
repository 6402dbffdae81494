use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::models::{Branch, ContactMessage, Seller};

use super::{StoreError, StoreResult};

/// Branches and the sellers working at them. Read-only after startup.
#[derive(Debug, Default, Clone)]
pub struct Directory {
    branches: Vec<Branch>,
    sellers: Vec<Seller>,
}

impl Directory {
    pub fn new(branches: Vec<Branch>, sellers: Vec<Seller>) -> Self {
        Self { branches, sellers }
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, id: i64) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn seller(&self, id: i64) -> Option<&Seller> {
        self.sellers.iter().find(|s| s.id == id)
    }

    pub fn sellers_of_branch(&self, branch_id: i64) -> Vec<Seller> {
        self.sellers
            .iter()
            .filter(|s| s.branch_id == branch_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
pub struct ContactInbox {
    messages: RwLock<Vec<ContactMessage>>,
    next_id: AtomicI64,
}

impl Default for ContactInbox {
    fn default() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl ContactInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, client_username: &str, seller_id: i64, message: String) -> StoreResult<ContactMessage> {
        let mut messages = self.messages.write().map_err(|_| StoreError::Poisoned)?;
        let message = ContactMessage {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            client_username: client_username.to_string(),
            seller_id,
            message,
            sent_at: Utc::now(),
            status: "sent".to_string(),
        };
        messages.push(message.clone());
        Ok(message)
    }

    pub fn list(&self) -> StoreResult<Vec<ContactMessage>> {
        Ok(self
            .messages
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .clone())
    }
}
