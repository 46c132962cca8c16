//! Provider registry (C2): resolves a company's `provider_type` tag to an adapter.
//!
//! One adapter instance per provider *type*, not per company — adapters must keep
//! any per-credential state (the ServiceTitan OAuth token cache, the mock
//! provider's lead store) keyed by the caller's own credentials/company config
//! rather than assuming a single shared slot, since the same adapter instance
//! serves every company configured with that provider type.

use std::sync::Arc;

use crate::domains::companies::ProviderType;

use super::housecallpro::HousecallProProvider;
use super::mock::MockProvider;
use super::model::ProviderAdapter;
use super::servicetitan::ServiceTitanProvider;

pub struct ProviderRegistry {
    servicetitan: Arc<ServiceTitanProvider>,
    housecallpro: Arc<HousecallProProvider>,
    mock: Arc<MockProvider>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            servicetitan: Arc::new(ServiceTitanProvider::new()),
            housecallpro: Arc::new(HousecallProProvider::new()),
            mock: Arc::new(MockProvider::new()),
        }
    }

    pub fn resolve(&self, provider_type: ProviderType) -> Arc<dyn ProviderAdapter> {
        match provider_type {
            ProviderType::Servicetitan => self.servicetitan.clone(),
            ProviderType::Housecallpro => self.housecallpro.clone(),
            ProviderType::Mock => self.mock.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_provider_type() {
        let registry = ProviderRegistry::new();
        for provider_type in [
            ProviderType::Servicetitan,
            ProviderType::Housecallpro,
            ProviderType::Mock,
        ] {
            let _adapter = registry.resolve(provider_type);
        }
    }
}
