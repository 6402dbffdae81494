use std::collections::HashMap;

use crate::models::User;

/// Accounts keyed by username. Populated before the server starts; there is
/// no self-registration.
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: User) {
        self.users.insert(user.username.clone(), user);
    }

    pub fn find(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
