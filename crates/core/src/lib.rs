//! Core domain types and shared logic for the whoisit recognition service.
//!
//! This crate defines the data model used across all other crates:
//! - Image upload requests and their validation
//! - Image identifiers, object keys and public URLs
//! - Object-created notifications consumed by the analysis pipeline
//! - Application configuration

pub mod config;
pub mod error;
pub mod event;
pub mod upload;

pub use error::{Error, Result};
pub use event::{ImageRef, ObjectCreatedEvent, ObjectRecord};
pub use upload::{ImageExtension, ImageId, ImageUploadRequest, UploadResponse, public_url};

/// Maximum length of a table identifier (PostgreSQL's NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Check that `name` is safe to splice into SQL as a table identifier.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to [`MAX_IDENTIFIER_LEN`] bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::InvalidIdentifier("identifier is empty".to_string()));
    };
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "{name:?} exceeds {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(Error::InvalidIdentifier(format!(
            "{name:?} must start with a letter or underscore"
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidIdentifier(format!(
            "{name:?} may only contain letters, digits and underscores"
        )));
    }
    Ok(())
}
