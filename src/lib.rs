//! Academic records service: classes, courses and users kept as JSON
//! snapshots or PostgreSQL tables, behind session-gated CRUD workflows.

pub mod config;
pub mod database;
pub mod endpoints;
pub mod error;
pub mod model;
pub mod paginate;
pub mod search;
pub mod security;
pub mod workflow;

pub use error::{Error, PersistenceError, Result};
