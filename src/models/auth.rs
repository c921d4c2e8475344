use std::fmt;

use serde::Deserialize;
use validator::Validate;

/// Login form payload. Authentication itself happens outside this crate.
#[derive(Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_rules() {
        assert!(Credentials::new("ops@forwarder.co.id", "secret1").validate().is_ok());

        let errors = Credentials::new("", "12345").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));

        assert!(Credentials::new("not-an-email", "longenough").validate().is_err());
    }

    #[test]
    fn password_is_not_logged() {
        let rendered = format!("{:?}", Credentials::new("a@b.co", "hunter22"));
        assert!(!rendered.contains("hunter22"));
    }
}
