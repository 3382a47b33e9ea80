//! Auth-domain models: bearer credentials, user profiles, and form field errors.

pub mod credential;
pub mod field_errors;
pub mod profile;

pub use credential::*;
pub use field_errors::*;
pub use profile::*;
