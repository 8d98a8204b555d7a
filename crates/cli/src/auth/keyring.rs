//! Account passwords kept in the system keyring, one entry per account and host

use anyhow::{Context, Result};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "fmx";

fn keyring_user(account: &str, host: &str) -> String {
    format!("{account}@{host}")
}

/// Keyring entry holding the password of `account` on `host`.
pub struct StoredPassword {
    user: String,
    entry: Entry,
}

impl StoredPassword {
    pub fn for_account(account: &str, host: &str) -> Result<Self> {
        let user = keyring_user(account, host);
        let entry = Entry::new(SERVICE, &user)
            .with_context(|| format!("Failed to open keyring entry for {user}"))?;
        Ok(Self { user, entry })
    }

    /// Keyring user name, `account@host`.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The stored password, or `None` when nothing is stored yet.
    pub fn load(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read password for {}", self.user)),
        }
    }

    pub fn save(&self, password: &str) -> Result<()> {
        self.entry
            .set_password(password)
            .with_context(|| format!("Failed to store password for {}", self.user))
    }

    /// Removes the entry. Returns whether there was one.
    pub fn forget(&self) -> Result<bool> {
        match self.entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(KeyringError::NoEntry) => Ok(false),
            Err(err) => Err(err).with_context(|| format!("Failed to remove password for {}", self.user)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_combine_account_and_host() {
        assert_eq!(keyring_user("web", "fm.example.com"), "web@fm.example.com");
        assert_eq!(keyring_user("web", "10.0.0.5"), "web@10.0.0.5");
    }
}
