//! Mock sign-in backed by the key-value store.
//!
//! There is no credential check. Passwords are required on input and then discarded.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::KeyValueStore;

pub const DEFAULT_USER_KEY: &str = "user";

const DEMO_NAME: &str = "Demo User";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignIn {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
}

/// Partial profile update. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(value.to_string())
}

impl SignIn {
    pub fn into_user(self) -> Result<User, String> {
        let email = required("Email", &self.email)?;
        required("Password", &self.password)?;
        Ok(User {
            email,
            name: DEMO_NAME.to_string(),
            phone: None,
            is_authenticated: true,
        })
    }
}

impl SignUp {
    pub fn into_user(self) -> Result<User, String> {
        let email = required("Email", &self.email)?;
        let name = required("Name", &self.name)?;
        let phone = required("Phone", &self.phone)?;
        required("Password", &self.password)?;
        Ok(User {
            email,
            name,
            phone: Some(phone),
            is_authenticated: true,
        })
    }
}

impl ProfileUpdate {
    /// Apply to `user`. Blank strings are rejected rather than stored.
    pub fn apply(self, user: &User) -> Result<User, String> {
        let mut updated = user.clone();
        if let Some(email) = self.email {
            updated.email = required("Email", &email)?;
        }
        if let Some(name) = self.name {
            updated.name = required("Name", &name)?;
        }
        if let Some(phone) = self.phone {
            updated.phone = Some(required("Phone", &phone)?);
        }
        Ok(updated)
    }
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Restore the persisted session. Unreadable data is removed.
    pub async fn load(&self) -> eyre::Result<Option<User>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Stored session unreadable, clearing");
                self.store.remove(&self.key).await?;
                Ok(None)
            }
        }
    }

    pub async fn save(&self, user: &User) -> eyre::Result<()> {
        let raw = serde_json::to_string(user)?;
        self.store.set(&self.key, raw).await?;
        tracing::info!(email = %user.email, "Session saved");
        Ok(())
    }

    pub async fn clear(&self) -> eyre::Result<()> {
        self.store.remove(&self.key).await?;
        tracing::info!("Session cleared");
        Ok(())
    }
}
