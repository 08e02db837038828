use serde::{Deserialize, Serialize};

use crate::model::{Entity, ValidationErrors};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "PascalCase", default)]
pub struct Class {
    pub id: i32,
    pub class_name: String,
    pub major: String,
    pub lecturer: String,
}

impl Class {
    pub fn new(
        id: i32,
        class_name: impl Into<String>,
        major: impl Into<String>,
        lecturer: impl Into<String>,
    ) -> Self {
        Self {
            id,
            class_name: class_name.into(),
            major: major.into(),
            lecturer: lecturer.into(),
        }
    }
}

impl Entity for Class {
    const RESOURCE: &'static str = "class";
    const SEARCH_FIELDS: &'static [&'static str] = &["ClassName", "Major", "Lecturer"];

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "ClassName" => Some(&self.class_name),
            "Major" => Some(&self.major),
            "Lecturer" => Some(&self.lecturer),
            _ => None,
        }
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("ClassName", &self.class_name, "Class name is required");
        errors
    }

    fn natural_key(&self) -> Option<(&'static str, &str)> {
        Some(("ClassName", &self.class_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_attribute_names() {
        let class = Class::new(1, "Math", "Science", "Mr. A");
        let json = serde_json::to_value(&class).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "Id": 1,
                "ClassName": "Math",
                "Major": "Science",
                "Lecturer": "Mr. A"
            })
        );
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let class: Class = serde_json::from_str(r#"{ "ClassName": "Physics" }"#).unwrap();
        assert_eq!(class.id, 0);
        assert!(!class.has_id());
        assert_eq!(class.class_name, "Physics");
    }

    #[test]
    fn class_name_is_required() {
        let errors = Class::new(0, "", "", "").validate();
        assert!(errors.contains("ClassName"));
        assert!(!errors.contains("Major"));
    }
}
