//! Repository traits for metadata operations.

pub mod identities;
pub mod uploads;

pub use identities::IdentityRepo;
pub use uploads::UploadRepo;
