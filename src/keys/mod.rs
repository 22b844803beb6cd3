pub mod fingerprint;
pub mod recipient;
pub mod store;

pub use recipient::RecipientKey;
