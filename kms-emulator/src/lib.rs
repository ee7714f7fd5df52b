//! Local Cloud KMS emulator
//!
//! Wires the in-memory store, the AES-GCM engine and the KMS service behind
//! the HTTP transport. [`Emulator::start`] runs everything in-process and
//! hands back an [`EmulatorHandle`], which is also what the binary uses.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


pub mod http;
pub mod seed;

use kms_config::{ConfigError, EmulatorConfig, StoreType};
use kms_core::{
    AesGcmEngine, KeyManagementService, KmsService, MemoryStore, RequestContext, StateStore,
};
use seed::SeedError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("apply seed file: {0}")]
    Seed(#[from] SeedError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("Server task failed: {0}")]
    Task(String),
}

/// Entry point for running the emulator in-process
pub struct Emulator;

impl Emulator {
    /// Build the service, apply the seed file if configured, bind and serve.
    ///
    /// A listen port of `0` binds an ephemeral port; the bound address is
    /// reported by [`EmulatorHandle::addr`].
    pub async fn start(config: &EmulatorConfig) -> Result<EmulatorHandle, EmulatorError> {
        config.validate()?;

        let store: Arc<dyn StateStore> = match config.store_type()? {
            StoreType::Memory => Arc::new(MemoryStore::new()),
        };
        let service: Arc<dyn KeyManagementService> =
            Arc::new(KmsService::new(store, Arc::new(AesGcmEngine::new())));

        if let Some(path) = &config.seed_file {
            seed::apply_seed_file(&RequestContext::background(), service.as_ref(), path).await?;
        }

        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| EmulatorError::Bind { addr, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| EmulatorError::Bind { addr, source })?;

        let shutdown = CancellationToken::new();
        let root = RequestContext::from_token(shutdown.clone());
        let state = http::AppState::new(service.clone())
            .with_root_context(root.clone())
            .with_request_timeout(config.request_timeout());
        let app = http::router(state);

        let task = tokio::spawn(
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .into_future(),
        );

        info!(addr = %addr, "KMS emulator started");

        Ok(EmulatorHandle {
            addr,
            service,
            root,
            shutdown,
            task,
        })
    }
}

/// A running emulator
pub struct EmulatorHandle {
    addr: SocketAddr,
    service: Arc<dyn KeyManagementService>,
    root: RequestContext,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

impl EmulatorHandle {
    /// Address the HTTP server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The in-process service behind the HTTP server
    pub fn service(&self) -> Arc<dyn KeyManagementService> {
        self.service.clone()
    }

    /// Context for in-process calls; cancelled when the emulator stops
    pub fn context(&self) -> RequestContext {
        self.root.child()
    }

    /// Stop accepting connections and cancel in-flight requests, then wait
    /// for the server to wind down
    pub async fn stop(self) -> Result<(), EmulatorError> {
        self.shutdown.cancel();

        let result = match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EmulatorError::Server(e)),
            Err(e) => Err(EmulatorError::Task(e.to_string())),
        };
        match &result {
            Ok(()) => info!(addr = %self.addr, "KMS emulator stopped"),
            Err(e) => error!(addr = %self.addr, error = %e, "KMS emulator stopped with error"),
        }
        result
    }
}
