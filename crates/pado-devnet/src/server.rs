//! Devnet gateway server

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;

use crate::config::DevnetConfig;
use crate::error::{DevnetError, Result};
use crate::routes::{create_router, AppState};
use crate::state::{create_shared_state, SharedState};

pub struct DevnetServer {
    app: AppState,
    addr: SocketAddr,
}

impl DevnetServer {
    pub fn new(config: DevnetConfig, addr: SocketAddr) -> Self {
        Self {
            app: AppState {
                ledger: create_shared_state(config),
                prometheus: None,
            },
            addr,
        }
    }

    /// Run the server until the process exits
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let router = create_router(self.app);

        tracing::info!("Starting devnet gateway on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .await
            .map_err(|e| DevnetError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Ledger state, for inspection in tests
    pub fn state(&self) -> SharedState {
        self.app.ledger.clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Builder for DevnetServer
pub struct ServerBuilder {
    config: DevnetConfig,
    addr: SocketAddr,
    prometheus: Option<PrometheusHandle>,
}

impl ServerBuilder {
    pub fn new(config: DevnetConfig) -> Self {
        Self {
            config,
            addr: ([127, 0, 0, 1], 3000).into(),
            prometheus: None,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.addr = ([0, 0, 0, 0], port).into();
        self
    }

    /// Serve `/metrics` from this recorder handle
    pub fn prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn build(self) -> DevnetServer {
        let mut server = DevnetServer::new(self.config, self.addr);
        server.app.prometheus = self.prometheus;
        server
    }
}
