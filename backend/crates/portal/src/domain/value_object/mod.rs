//! Value Object Module

pub mod auth_method;
pub mod email;
pub mod interaction_kind;
pub mod mac_address;
pub mod session_id;

pub use auth_method::AuthMethod;
pub use email::Email;
pub use interaction_kind::InteractionKind;
pub use mac_address::MacAddress;
pub use session_id::SessionId;
