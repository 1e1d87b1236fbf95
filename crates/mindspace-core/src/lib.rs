//! # mindspace-core
//!
//! Core types, traits, and rules for the mindspace notes service.
//!
//! This crate holds the data model, the repository traits that storage
//! backends implement, and the pure logic (validation, slugs, tree assembly,
//! password hashing) that does not touch the database.

pub mod error;
pub mod models;
pub mod password;
pub mod slug;
pub mod traits;
pub mod tree;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result, ValidationErrors, NON_FIELD_ERRORS};
pub use models::*;
pub use password::{hash_password, verify_password};
pub use slug::{derive_slug, slugify};
pub use traits::*;
pub use tree::{assemble_children, AssembledTree, TreeEntry, DEFAULT_MAX_TREE_DEPTH};
pub use validation::{validate_note_title, validate_registration, validate_tag_name};
