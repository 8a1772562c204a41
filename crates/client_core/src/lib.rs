use std::sync::Arc;

use anyhow::{Context, Result};
use shared::domain::{Company, Depot, Driver, FreightOrder, Route, Vehicle, VehicleOwner};
use tracing::info;

pub mod catalog;
pub mod config;
pub mod error;
pub mod form;
pub mod messages;
pub mod notify;
pub mod screen;
pub mod search;
pub mod state;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{Catalogued, ScreenConfig};
pub use config::{load_settings, ClientSettings};
pub use error::{StoreError, TransportError};
pub use messages::MessageCatalog;
pub use notify::{Notifier, Severity, Toast};
pub use screen::{CrudScreen, DeleteOutcome, DialogMode, IdentificationCheck, SubmitOutcome};
pub use store::{DeletePolicy, ResourceSnapshot, ResourceStore, StoreEvent};
pub use transport::{ApiRequest, ApiTransport, HttpTransport};

/// Process-wide registry: one store per entity type, shared by every screen.
pub struct Backoffice {
    settings: ClientSettings,
    notifier: Notifier,
    pub companies: Arc<ResourceStore<Company>>,
    pub drivers: Arc<ResourceStore<Driver>>,
    pub vehicles: Arc<ResourceStore<Vehicle>>,
    pub vehicle_owners: Arc<ResourceStore<VehicleOwner>>,
    pub depots: Arc<ResourceStore<Depot>>,
    pub routes: Arc<ResourceStore<Route>>,
    pub freight_orders: Arc<ResourceStore<FreightOrder>>,
}

fn build_store<T: Catalogued>(
    transport: &Arc<dyn ApiTransport>,
    catalog: &Arc<MessageCatalog>,
    settings: &ClientSettings,
) -> Arc<ResourceStore<T>> {
    Arc::new(
        ResourceStore::new(Arc::clone(transport), Arc::clone(catalog))
            .with_delete_policy(T::screen_config().delete_policy)
            .with_default_page_size(settings.default_page_size),
    )
}

impl Backoffice {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let transport = HttpTransport::from_settings(&settings)
            .with_context(|| format!("failed to set up api client for {}", settings.api_base_url))?;
        info!(base_url = %transport.base_url(), "back-office api client ready");
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    pub fn with_transport(settings: ClientSettings, transport: Arc<dyn ApiTransport>) -> Self {
        let catalog = Arc::new(MessageCatalog::from_settings(&settings));
        Self {
            notifier: Notifier::new(),
            companies: build_store(&transport, &catalog, &settings),
            drivers: build_store(&transport, &catalog, &settings),
            vehicles: build_store(&transport, &catalog, &settings),
            vehicle_owners: build_store(&transport, &catalog, &settings),
            depots: build_store(&transport, &catalog, &settings),
            routes: build_store(&transport, &catalog, &settings),
            freight_orders: build_store(&transport, &catalog, &settings),
            settings,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn store<T: Catalogued>(&self) -> Arc<ResourceStore<T>> {
        Arc::clone(T::store(self))
    }

    /// Builds a screen; requires a running tokio runtime.
    pub fn screen<T: Catalogued>(&self) -> CrudScreen<T> {
        let mut config = T::screen_config();
        config.search_debounce = self
            .settings
            .search_debounce(T::PATH, config.search_debounce);
        CrudScreen::new(self.store::<T>(), self.notifier.clone(), config)
    }

    /// Loads the lookup tables the vehicle and freight screens read from.
    /// The stores are independent; no cross-store consistency is implied.
    pub async fn preload_reference_data(&self) -> Result<(), StoreError> {
        let page_size = self.settings.default_page_size;
        futures::try_join!(
            self.companies.list(1, page_size, None),
            self.vehicle_owners.list(1, page_size, None),
            self.drivers.list(1, page_size, None),
            self.routes.list(1, page_size, None),
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
