use serde::{Deserialize, Serialize};

use crate::model::{Entity, ValidationErrors};

/// A course taught to a class. `class` names a [`Class`](super::Class) by its
/// `ClassName`; nothing at the storage level enforces that the class exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "PascalCase", default)]
pub struct Course {
    pub id: i32,
    pub name: String,
    #[sqlx(rename = "class_name")]
    pub class: String,
    pub major: String,
    pub lecturer: String,
    pub status: String,
}

impl Entity for Course {
    const RESOURCE: &'static str = "course";
    const SEARCH_FIELDS: &'static [&'static str] = &["Name", "Class", "Major", "Lecturer", "Status"];

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "Name" => Some(&self.name),
            "Class" => Some(&self.class),
            "Major" => Some(&self.major),
            "Lecturer" => Some(&self.lecturer),
            "Status" => Some(&self.status),
            _ => None,
        }
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("Name", &self.name, "Course name is required");
        errors.require("Class", &self.class, "Class is required");
        errors
    }

    fn class_reference(&self) -> Option<&str> {
        Some(&self.class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_snapshot_record() {
        let course: Course = serde_json::from_str(
            r#"{"Id":2,"Name":"Computing","Class":"SE06103","Major":"IT","Lecturer":"Nguyen Thanh Trieu","Status":"Active"}"#,
        )
        .unwrap();

        assert_eq!(course.id, 2);
        assert_eq!(course.class_reference(), Some("SE06103"));
        assert_eq!(course.field("Status"), Some("Active"));
        assert!(course.validate().is_empty());
    }

    #[test]
    fn name_and_class_are_required() {
        let errors = Course::default().validate();
        assert!(errors.contains("Name"));
        assert!(errors.contains("Class"));
        assert!(!errors.contains("Status"));
    }
}
