//! Entity types and the contract shared by every persisted collection.

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};

pub mod class;
pub mod course;
pub mod login_object;
pub mod session;
pub mod user;
pub mod validation;

pub use class::Class;
pub use course::Course;
pub use user::User;
pub use validation::ValidationErrors;

/// A record kept in one collection, addressed by an integer `Id`.
///
/// An `Id` of zero or below means "unset"; the repository assigns one on `add`.
pub trait Entity:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name of the collection, also the stem of its snapshot file.
    const RESOURCE: &'static str;

    /// Attributes searched when listing.
    const SEARCH_FIELDS: &'static [&'static str];

    fn id(&self) -> i32;

    fn set_id(&mut self, id: i32);

    /// Looks up a string attribute by its persisted name.
    fn field(&self, name: &str) -> Option<&str>;

    /// Field-level rules that need nothing but the entity itself.
    fn validate(&self) -> ValidationErrors;

    /// Attribute that must be unique across the collection, with its value.
    fn natural_key(&self) -> Option<(&'static str, &str)> {
        None
    }

    /// `ClassName` this entity points at by value, if any.
    fn class_reference(&self) -> Option<&str> {
        None
    }

    /// The entity as it may be shown to a client.
    fn redacted(self) -> Self {
        self
    }

    fn has_id(&self) -> bool {
        self.id() > 0
    }
}
