//! Configuration and credential management module

pub mod config;
pub mod keyring;

pub use self::config::load_config;
pub use self::keyring::StoredPassword;

use tracing::debug;

/// Password for `account` on `host`: the given one, else the keyring's.
pub fn resolve_password(given: Option<String>, account: &str, host: &str) -> Option<String> {
    if given.is_some() || account.is_empty() {
        return given;
    }
    let stored = StoredPassword::for_account(account, host).and_then(|stored| stored.load());
    match stored {
        Ok(password) => password,
        Err(err) => {
            debug!(account, host, "no stored password: {:#}", err);
            None
        }
    }
}
