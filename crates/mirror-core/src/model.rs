//! Entity types mirrored from the server.
//!
//! These are opaque records as far as the client is concerned: the server
//! owns identity, ordering, and referential integrity. The client stores
//! them verbatim and never sorts, dedups, or validates.

use serde::{Deserialize, Serialize};

/// A class (group of students), identified by a server-assigned ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub alias: String,
}

/// A course taught to zero or more classes.
///
/// `class_ids` references `Class::id` but is not enforced client-side;
/// dangling IDs are the server's problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub subject: String,
    pub class_ids: Vec<String>,
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

/// Full snapshot of the classroom collections, as returned by `GET /data`
/// and carried by `data_updated` pushes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomSnapshot {
    pub classes: Vec<Class>,
    pub courses: Vec<Course>,
}
