//! Application Startup
//!
//! Application building and server initialization. The bus client is
//! constructed here and handed down explicitly; its lifecycle is scoped to
//! process startup/shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::application::{EventReceiver, LocalBus, QueueBinding};
use crate::config::Settings;
use crate::infrastructure::auth::{AuthVerifier, JwtVerifier};
use crate::infrastructure::bus::{client::BusClient, topology};
use crate::presentation::http::routes;
use crate::presentation::websocket::{DeliveryMode, Gateway, Namespace};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<BusClient>,
    pub local_bus: Arc<LocalBus>,
    pub verifier: Arc<dyn AuthVerifier>,
    pub user_gateway: Arc<Gateway>,
    pub dm_gateway: Arc<Gateway>,
    pub room_gateway: Arc<Gateway>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    bus: Arc<BusClient>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create the bus client and declare the exchange topology
        let bus = Arc::new(BusClient::new());
        topology::declare_topology(&bus, &settings.bus)?;

        // Local event bus decoupling transport from socket delivery
        let local_bus = Arc::new(LocalBus::new(settings.bus.local_capacity));

        // Auth verifier gating every socket admission
        let verifier: Arc<dyn AuthVerifier> = Arc::new(JwtVerifier::new(&settings.jwt.secret));

        let delivery = if settings.delivery.dedup_per_user {
            DeliveryMode::PerUser
        } else {
            DeliveryMode::PerConnection
        };

        // One gateway per event namespace
        let user_gateway = Arc::new(Gateway::new(Namespace::UserStatus, delivery));
        let dm_gateway = Arc::new(Gateway::new(Namespace::DirectMessages, delivery));
        let room_gateway = Arc::new(Gateway::new(Namespace::Rooms, delivery));

        // Bind one receiver per event category and start consuming
        let bindings = [
            QueueBinding {
                queue: "user-status-notifications".into(),
                exchange: settings.bus.status_exchange.clone(),
                pattern: "events.user.*".into(),
                options: topology::status_queue(&settings.bus),
            },
            QueueBinding {
                queue: "dm-notifications".into(),
                exchange: settings.bus.events_exchange.clone(),
                pattern: "events.dms".into(),
                options: topology::durable_queue(),
            },
            QueueBinding {
                queue: "room-notifications".into(),
                exchange: settings.bus.events_exchange.clone(),
                pattern: "events.publicRooms".into(),
                options: topology::durable_queue(),
            },
        ];
        for binding in bindings {
            EventReceiver::bind(Arc::clone(&bus), Arc::clone(&local_bus), binding)?.spawn();
        }

        // Bridge each gateway to the local bus
        Gateway::spawn_pumps(&user_gateway, &local_bus);
        Gateway::spawn_pumps(&dm_gateway, &local_bus);
        Gateway::spawn_pumps(&room_gateway, &local_bus);

        // Create app state
        let state = AppState {
            bus: Arc::clone(&bus),
            local_bus,
            verifier,
            user_gateway,
            dm_gateway,
            room_gateway,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state);

        // Bind to address
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router, bus })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        let outcome = axum::serve(self.listener, self.router).await;
        self.bus.shutdown();
        outcome?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
