use std::sync::Arc;

use tokio::sync::broadcast;
use tourdesk_core::{BookingRepository, GoogleVerifier, PackageRepository, UserRepository};
use tourdesk_shared::DomainEvent;
use tourdesk_store::app_config::AuthConfig;
use tourdesk_store::{MediaStore, MemoryStore};

const EVENT_CHANNEL_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub packages: Arc<dyn PackageRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub google: Arc<dyn GoogleVerifier>,
    pub media: Arc<MediaStore>,
    pub auth: AuthConfig,
    pub events: broadcast::Sender<DomainEvent>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        packages: Arc<dyn PackageRepository>,
        bookings: Arc<dyn BookingRepository>,
        google: Arc<dyn GoogleVerifier>,
        media: MediaStore,
        auth: AuthConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            users,
            packages,
            bookings,
            google,
            media: Arc::new(media),
            auth,
            events,
        }
    }

    /// All three repositories backed by one shared in-memory store.
    pub fn in_memory(
        store: MemoryStore,
        google: Arc<dyn GoogleVerifier>,
        media: MediaStore,
        auth: AuthConfig,
    ) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, google, media, auth)
    }

    /// Fan out a domain event. Having no subscribers is not an error.
    pub fn publish(&self, event: DomainEvent) {
        tracing::info!(topic = event.topic(), "Publishing domain event");
        let _ = self.events.send(event);
    }
}
