use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::{Arguments, Capability};
use crate::context::Context;
use crate::errors::{CapabilityError, CapabilityResult, ChatError, ChatResult};
use crate::models::capability::CapabilityDescriptor;
use crate::models::message::FunctionCall;
use crate::models::request::{Request, Response};
use crate::pipeline::{Next, Stage};

/// Name-keyed lookup of capability routines for one pipeline.
///
/// Populate it with [`Registry::register`] while assembling the pipeline, then
/// share it read-only with the dispatch stage.
#[derive(Default, Clone)]
pub struct Registry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `capability` under its descriptor name and return the stage that
    /// advertises it. Names must be unique.
    pub fn register<C>(&mut self, capability: C) -> ChatResult<Advertise>
    where
        C: Capability + 'static,
    {
        let descriptor = capability.descriptor().clone();
        if self.capabilities.contains_key(&descriptor.name) {
            return Err(ChatError::DuplicateCapability(descriptor.name));
        }

        self.capabilities
            .insert(descriptor.name.clone(), Arc::new(capability));
        Ok(Advertise { descriptor })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Descriptors of every registered capability, sorted by name
    pub fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        let mut descriptors: Vec<_> = self
            .capabilities
            .values()
            .map(|c| c.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Decode the call's arguments, find the routine and run it
    pub async fn call(&self, ctx: &Context, call: &FunctionCall) -> CapabilityResult<Value> {
        let args = Arguments::decode(&call.arguments)?;
        let capability = self
            .get(&call.name)
            .ok_or_else(|| CapabilityError::NotFound(call.name.clone()))?;
        capability.call(ctx, args).await
    }
}

/// Adds one capability's descriptor to every request passing through, then delegates.
pub struct Advertise {
    descriptor: CapabilityDescriptor,
}

impl Advertise {
    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl Stage for Advertise {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    async fn run(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> ChatResult<Response> {
        if request.is_advertised(&self.descriptor.name) {
            warn!(capability = %self.descriptor.name, "capability advertised twice, skipping");
        } else {
            request.capabilities.push(self.descriptor.clone());
        }
        next.run(ctx, request).await
    }
}
