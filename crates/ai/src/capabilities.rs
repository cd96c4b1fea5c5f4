//! Host actions the backend may ask to run.
//!
//! A [`Capability`] pairs a statically declared descriptor with the routine that
//! produces its result. Capabilities are registered in a [`Registry`] before the
//! pipeline is assembled; registering one yields the [`Advertise`] stage that adds
//! its descriptor to each request.
use async_trait::async_trait;
use serde_json::Value;

use crate::context::Context;
use crate::errors::CapabilityResult;
use crate::models::capability::CapabilityDescriptor;

pub mod arguments;
pub mod confirm;
pub mod images;
pub mod registry;
pub mod script;

pub use arguments::Arguments;
pub use registry::{Advertise, Registry};

#[async_trait]
pub trait Capability: Send + Sync {
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Run the capability. Errors are reported back to the backend as the
    /// function result rather than failing the invocation.
    async fn call(&self, ctx: &Context, args: Arguments) -> CapabilityResult<Value>;
}
