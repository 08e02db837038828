//! Case-insensitive substring search over entity attributes.

use crate::model::Entity;

/// Keeps the entities where at least one of `fields` contains `query`,
/// ignoring case. Order is preserved. A missing or blank query keeps everything.
pub fn filter<T: Entity>(items: Vec<T>, query: Option<&str>, fields: &[&str]) -> Vec<T> {
    let Some(needle) = normalize(query) else {
        return items;
    };

    items
        .into_iter()
        .filter(|item| {
            fields.iter().any(|field| {
                item.field(field)
                    .is_some_and(|value| value.to_lowercase().contains(&needle))
            })
        })
        .collect()
}

/// Same as [`filter`] with the entity's default search fields.
pub fn filter_default<T: Entity>(items: Vec<T>, query: Option<&str>) -> Vec<T> {
    filter(items, query, T::SEARCH_FIELDS)
}

fn normalize(query: Option<&str>) -> Option<String> {
    let query = query?.trim();
    if query.is_empty() {
        None
    } else {
        Some(query.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Course};

    fn classes() -> Vec<Class> {
        vec![
            Class::new(1, "Math", "Science", "Mr. A"),
            Class::new(2, "Literature", "Arts", "Ms. B"),
            Class::new(3, "Applied Mathematics", "Science", "Mr. C"),
        ]
    }

    #[test]
    fn matches_class_name_ignoring_case() {
        let found = filter(classes()[..2].to_vec(), Some("math"), &["ClassName"]);
        assert_eq!(found, vec![Class::new(1, "Math", "Science", "Mr. A")]);
    }

    #[test]
    fn preserves_relative_order() {
        let ids: Vec<i32> = filter_default(classes(), Some("MATH"))
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn blank_query_returns_input_unchanged() {
        assert_eq!(filter_default(classes(), None), classes());
        assert_eq!(filter_default(classes(), Some("")), classes());
        assert_eq!(filter_default(classes(), Some("   ")), classes());
    }

    #[test]
    fn any_configured_field_can_match() {
        let found = filter_default(classes(), Some("ms. b"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class_name, "Literature");

        // Lecturer is not searched when only ClassName is configured
        assert!(filter(classes(), Some("ms. b"), &["ClassName"]).is_empty());
    }

    #[test]
    fn unknown_fields_never_match() {
        assert!(filter(classes(), Some("math"), &["Nope"]).is_empty());
    }

    #[test]
    fn result_is_a_subsequence() {
        let courses = vec![
            Course { id: 1, name: "Design".into(), status: "Active".into(), ..Default::default() },
            Course { id: 2, name: "Computing".into(), status: "Closed".into(), ..Default::default() },
            Course { id: 3, name: "Databases".into(), status: "Active".into(), ..Default::default() },
        ];
        let found = filter_default(courses.clone(), Some("active"));

        let mut source = courses.iter();
        for item in &found {
            assert!(source.any(|c| c == item));
        }
        assert_eq!(found.len(), 2);
    }
}
