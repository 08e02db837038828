use serde::{Deserialize, Serialize};

use crate::model::{Entity, ValidationErrors};

pub const ADMIN_ROLE: &str = "Admin";

/// Role names compare case-insensitively, ignoring surrounding whitespace.
pub fn is_admin_role(role: &str) -> bool {
    role.trim().eq_ignore_ascii_case(ADMIN_ROLE)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    pub id: i32,
    pub user_name: String,
    pub pass: String,
    /// Only checked against `pass` when the user is validated.
    pub confirm_pass: String,
    pub role: String,
}

impl User {
    pub fn new(
        user_name: impl Into<String>,
        pass: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        let pass = pass.into();
        Self {
            id: 0,
            user_name: user_name.into(),
            confirm_pass: pass.clone(),
            pass,
            role: role.into(),
        }
    }
}

impl Entity for User {
    const RESOURCE: &'static str = "user";
    const SEARCH_FIELDS: &'static [&'static str] = &["UserName", "Role"];

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "UserName" => Some(&self.user_name),
            "Role" => Some(&self.role),
            _ => None,
        }
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("UserName", &self.user_name, "Username is required");
        errors.require("Pass", &self.pass, "Password is required");
        if self.confirm_pass != self.pass {
            errors.add("ConfirmPass", "Passwords do not match");
        }
        errors.require("Role", &self.role, "Role is required");
        errors
    }

    fn natural_key(&self) -> Option<(&'static str, &str)> {
        Some(("UserName", &self.user_name))
    }

    fn redacted(self) -> Self {
        Self {
            pass: String::new(),
            confirm_pass: String::new(),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_pass_must_match() {
        let mut user = User::new("alice", "secret", "Student");
        assert!(user.validate().is_empty());

        user.confirm_pass = "other".into();
        let errors = user.validate();
        assert_eq!(
            errors.get("ConfirmPass"),
            Some(&["Passwords do not match".to_string()][..])
        );
    }

    #[test]
    fn blank_user_reports_every_required_field() {
        let errors = User::default().validate();
        for field in ["UserName", "Pass", "Role"] {
            assert!(errors.contains(field), "{field} should be required");
        }
        assert!(!errors.contains("ConfirmPass"));
    }

    #[test]
    fn redacted_user_hides_passwords() {
        let user = User::new("alice", "secret", "Student").redacted();
        assert!(user.pass.is_empty());
        assert!(user.confirm_pass.is_empty());
        assert_eq!(user.user_name, "alice");
    }

    #[test]
    fn admin_role_is_case_insensitive() {
        assert!(is_admin_role("admin"));
        assert!(is_admin_role(" ADMIN "));
        assert!(!is_admin_role("Teacher"));
        assert!(!is_admin_role(""));
    }
}
