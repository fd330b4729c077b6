use tracing::{debug, info};

use crate::error::{PortalError, PortalResult};
use crate::models::{Role, User};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct AccountRegistry {
    users: Vec<User>,
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self {
            users: vec![User {
                username: "admin".to_string(),
                password: "admin".to_string(),
                role: Role::Admin,
            }],
        }
    }

    pub fn find_by_username(&self, name: &str) -> Option<&User> {
        let needle = name.to_lowercase();
        self.users.iter().find(|u| u.username.to_lowercase() == needle)
    }

    pub fn authenticate(&self, name: &str, password: &str) -> PortalResult<User> {
        match self.find_by_username(name) {
            Some(user) if user.password == password => {
                debug!(username = %user.username, "authenticated");
                Ok(user.clone())
            }
            _ => Err(PortalError::InvalidCredentials),
        }
    }

    pub fn register(&mut self, name: &str, password: &str) -> PortalResult<User> {
        if self.find_by_username(name).is_some() {
            return Err(PortalError::AlreadyExists(name.to_string()));
        }

        let user = User {
            username: name.to_string(),
            password: password.to_string(),
            role: Role::User,
        };
        self.users.push(user.clone());
        info!(username = %user.username, "registered new account");
        Ok(user)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

pub fn validate_login_form(username: &str, password: &str) -> PortalResult<()> {
    if username.is_empty() || password.is_empty() {
        return Err(PortalError::Validation(
            "Please enter both username and password.".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_signup_form(username: &str, password: &str, confirm: &str) -> PortalResult<()> {
    if username.is_empty() || password.is_empty() || confirm.is_empty() {
        return Err(PortalError::Validation("Please fill in all fields.".to_string()));
    }
    if password != confirm {
        return Err(PortalError::Validation("Passwords do not match.".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::Validation(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
