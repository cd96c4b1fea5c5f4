//! These models represent the objects passed between the pipeline stages
//!
//! A request travels inward through the stages carrying the conversation so far and
//! the capabilities advertised for this call. The innermost stage turns it into a
//! response: the exact request that was sent plus the single message the backend
//! produced. Stages only ever append to or truncate the front of the message list.
pub mod capability;
pub mod message;
pub mod request;
pub mod role;
