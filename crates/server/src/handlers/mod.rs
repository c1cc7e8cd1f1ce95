//! HTTP request handlers.

pub mod health;
pub mod identities;
pub mod images;
pub mod notifications;
pub mod uploads;

pub use health::*;
pub use identities::*;
pub use images::*;
pub use notifications::*;
pub use uploads::*;
