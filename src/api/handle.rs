//! Shared access to a service.

use std::sync::Arc;

use parking_lot::Mutex;

use super::service::{ApiResult, Request, Response, Service, ServiceConfig};

/// Cloneable, thread-safe handle to one [`Service`].
///
/// Every request runs to completion under the lock, so callers on different
/// threads observe the engine one whole operation at a time.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<Mutex<Service>>,
}

impl ServiceHandle {
    pub fn new(service: Service) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    /// Open a service and wrap it.
    pub fn open(config: ServiceConfig) -> ApiResult<Self> {
        Ok(Self::new(Service::open(config)?))
    }

    pub fn in_memory() -> Self {
        Self::new(Service::in_memory())
    }

    pub fn handle(&self, request: Request) -> ApiResult<Response> {
        self.inner.lock().handle(request)
    }

    pub fn handle_json(&self, input: &str) -> ApiResult<String> {
        self.inner.lock().handle_json(input)
    }

    /// Run `f` with exclusive access to the service.
    pub fn with<T>(&self, f: impl FnOnce(&mut Service) -> T) -> T {
        f(&mut self.inner.lock())
    }

    /// Number of live handles sharing this service.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}
