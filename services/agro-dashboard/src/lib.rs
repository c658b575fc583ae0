//! Agro Dashboard - live view and command relay for agricultural sensors
//!
//! Subscribes to the backend's real-time sensor channel, serves the
//! dashboard to the browser and forwards gated control commands back to the
//! backend over HTTP.

pub mod cards;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod io;
pub mod protocol;
pub mod snapshot;
pub mod state;
pub mod subscriber;
pub mod transport;

pub use config::{load_config, Config};
pub use error::{DashboardError, Result};
pub use snapshot::SensorSnapshot;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::dashboard::{DashboardState, Dispatchers};
use crate::demo::SyntheticGenerator;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::subscriber::LiveStatusSubscriber;
use crate::transport::{RealtimeConnector, WebSocketConnector};

/// Builder for the dashboard service.
///
/// Validates the configuration and binds the HTTP listener; the returned
/// [`Dashboard`] runs until its cancellation token fires.
pub struct DashboardBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    connector: Option<Arc<dyn RealtimeConnector>>,
    cancel: Option<CancellationToken>,
}

impl DashboardBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            connector: None,
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn RealtimeConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Use an external token instead of stopping on ctrl-c
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn build(self) -> Result<Dashboard> {
        let base_url = self.config.base_url().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DashboardError::Config(format!(
                "backend address '{}' must start with http:// or https://",
                base_url
            )));
        }
        if self.config.demo.enabled && self.config.demo.interval_ms == 0 {
            return Err(DashboardError::Config(
                "demo.interval_ms must be greater than zero".to_string(),
            ));
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.dashboard.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            DashboardError::Config(format!("Failed to bind dashboard to {}: {}", addr, e))
        })?;

        let (cancel, handle_signals) = match self.cancel {
            Some(cancel) => (cancel, false),
            None => (CancellationToken::new(), true),
        };

        Ok(Dashboard {
            http: self
                .http
                .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new())),
            connector: self
                .connector
                .unwrap_or_else(|| Arc::new(WebSocketConnector)),
            config: self.config,
            base_url,
            listener,
            cancel,
            handle_signals,
        })
    }
}

/// A configured dashboard, ready to start
pub struct Dashboard {
    config: Config,
    base_url: String,
    http: Arc<dyn HttpClient>,
    connector: Arc<dyn RealtimeConnector>,
    listener: TcpListener,
    cancel: CancellationToken,
    handle_signals: bool,
}

impl Dashboard {
    /// Address the dashboard is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until cancelled, then stop every task before returning
    pub async fn start(self) -> Result<()> {
        let cancel = self.cancel;

        if self.handle_signals {
            let cancel_for_signal = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Shutdown signal received");
                        cancel_for_signal.cancel();
                    }
                    Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
                }
            });
        }

        let subscription = if self.config.subscriber.enabled {
            let subscriber = LiveStatusSubscriber::new(
                Arc::clone(&self.connector),
                self.base_url.clone(),
                self.config.subscriber.event_name.clone(),
            );
            Some(subscriber.spawn(cancel.clone()))
        } else {
            tracing::info!("Live status subscription disabled");
            None
        };
        let snapshots = match &subscription {
            Some(subscription) => subscription.watch(),
            None => watch::channel(None).1,
        };

        let state = state::new_state_handle(self.config.demo.history_size);
        let generator = if self.config.demo.enabled {
            let interval = Duration::from_millis(self.config.demo.interval_ms);
            Some(SyntheticGenerator::new(interval).spawn(Arc::clone(&state), cancel.clone()))
        } else {
            None
        };

        let router = dashboard::build_router(DashboardState {
            snapshots,
            state,
            dispatchers: Dispatchers::new(&self.base_url, self.http),
        });

        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!("Dashboard listening on http://{}", addr);
        }

        let cancel_for_server = cancel.clone();
        let served = axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                cancel_for_server.cancelled().await;
            })
            .await;

        // the server can also stop on its own; take everything else down with it
        cancel.cancel();
        if let Some(subscription) = subscription {
            subscription.teardown().await;
        }
        if let Some(generator) = generator {
            if let Err(e) = generator.await {
                tracing::warn!("Synthetic generator ended abnormally: {}", e);
            }
        }

        served?;
        tracing::info!("Dashboard stopped");
        Ok(())
    }
}
