//! User directory owned by the surrounding application

use crate::{DirectoryError, UserId, UserRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Read access to the application's users
///
/// A missing user is `Ok(None)`; errors mean the directory itself failed.
pub trait UserDirectory: Send + Sync + 'static {
    fn all_users(&self) -> Result<Vec<UserRecord>, DirectoryError>;

    fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError>;

    /// id -> name for every user, fetched once for bulk joins
    fn name_map(&self) -> Result<HashMap<UserId, String>, DirectoryError> {
        Ok(self
            .all_users()?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect())
    }
}

/// In-memory directory, ordered by id
pub struct InMemoryDirectory {
    users: RwLock<BTreeMap<UserId, String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = UserRecord>,
    {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u.name)).collect()),
        }
    }

    pub fn insert(&self, user: UserRecord) -> Result<(), DirectoryError> {
        let mut users = self
            .users
            .write()
            .map_err(|e| DirectoryError::Unavailable(e.to_string().into()))?;
        users.insert(user.id, user.name);
        Ok(())
    }

    pub fn remove(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let mut users = self
            .users
            .write()
            .map_err(|e| DirectoryError::Unavailable(e.to_string().into()))?;
        Ok(users.remove(&id).map(|name| UserRecord { id, name }))
    }
}

impl UserDirectory for InMemoryDirectory {
    fn all_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let users = self
            .users
            .read()
            .map_err(|e| DirectoryError::Unavailable(e.to_string().into()))?;
        Ok(users
            .iter()
            .map(|(id, name)| UserRecord {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self
            .users
            .read()
            .map_err(|e| DirectoryError::Unavailable(e.to_string().into()))?;
        Ok(users.get(&id).map(|name| UserRecord {
            id,
            name: name.clone(),
        }))
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}
