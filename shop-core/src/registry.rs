use std::collections::HashMap;
use std::sync::Arc;

use crate::ShopService;

/// Maps service names to service instances.
pub struct ServiceRegistry<R, P = ()>
where
    R: Send + 'static,
    P: Send + 'static,
{
    services: HashMap<String, Arc<dyn ShopService<R, P>>>,
}

impl<R, P> ServiceRegistry<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register a service under a name, replacing any previous one.
    pub fn register<S>(&mut self, name: S, service: Arc<dyn ShopService<R, P>>)
    where
        S: Into<String>,
    {
        self.services.insert(name.into(), service);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ShopService<R, P>>> {
        self.services.get(name)
    }
}

impl<R, P> Default for ServiceRegistry<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
