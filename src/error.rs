use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    #[error("Username '{0}' already exists.")]
    AlreadyExists(String),

    // must not reveal whether the username exists
    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Only an admin can do that.")]
    Forbidden,

    #[error("You need to log in first.")]
    Unauthorized,

    #[error("Experience #{0} not found.")]
    ExperienceNotFound(i64),

    #[error("Company '{name}' not found.{}", suggestion_hint(.suggestion))]
    CompanyNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("{0}")]
    Validation(String),
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" Did you mean '{}'?", name),
        None => String::new(),
    }
}

pub type PortalResult<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_not_found_mentions_suggestion() {
        let err = PortalError::CompanyNotFound {
            name: "Gogle".to_string(),
            suggestion: Some("Google".to_string()),
        };
        assert_eq!(err.to_string(), "Company 'Gogle' not found. Did you mean 'Google'?");

        let err = PortalError::CompanyNotFound {
            name: "Nope".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Company 'Nope' not found.");
    }

    #[test]
    fn test_invalid_credentials_is_generic() {
        assert_eq!(
            PortalError::InvalidCredentials.to_string(),
            "Invalid username or password."
        );
    }
}
