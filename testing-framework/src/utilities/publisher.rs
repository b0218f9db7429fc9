// File: testing-framework/src/utilities/publisher.rs
//
// Trusted Publisher Server
//
// Serves one signed validator list over HTTP on a loopback port so
// validator site scenarios can fetch it like they would from a real
// publisher.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::{runtime::Handle, sync::oneshot};
use trackable_common::crypto::KeyPair;
use trackable_daemon::validators::{ListBlob, ListedValidator, Manifest, PublishedList};
use warp::Filter;

/// Path the list is served on.
pub const LIST_PATH: &str = "validators";

/// A validator the publisher lists: its master key, and the manifest
/// delegating to its signing key.
#[derive(Clone, Debug)]
pub struct PublishedValidator {
    pub master: KeyPair,
    pub signing: KeyPair,
    pub manifest: Manifest,
}

impl PublishedValidator {
    /// A validator with fresh master and signing keys and a sequence 1
    /// manifest.
    pub fn random() -> Result<Self> {
        let master = KeyPair::random();
        let signing = KeyPair::random();
        let manifest = Manifest::make(&master, &signing, 1)?;
        Ok(Self {
            master,
            signing,
            manifest,
        })
    }

    fn listed(&self) -> Result<ListedValidator> {
        Ok(ListedValidator {
            validation_public_key: self.master.public_key().to_hex(),
            manifest: Some(self.manifest.to_base64()?),
        })
    }
}

/// HTTP server answering `GET /validators` with a signed list. Shut down on
/// drop.
pub struct TrustedPublisherServer {
    address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TrustedPublisherServer {
    /// Sign a list of `validators` with `signing` (delegated to by
    /// `manifest`) and serve it on `runtime`.
    pub fn start(
        runtime: &Handle,
        manifest: &Manifest,
        signing: &KeyPair,
        sequence: u32,
        expiration: u32,
        version: u32,
        validators: &[PublishedValidator],
    ) -> Result<Self> {
        let blob = ListBlob {
            sequence,
            expiration,
            validators: validators
                .iter()
                .map(PublishedValidator::listed)
                .collect::<Result<_>>()?,
        };
        let list = PublishedList::sign(manifest, signing, &blob, version)?;

        let route = warp::get()
            .and(warp::path(LIST_PATH))
            .and(warp::path::end())
            .map(move || warp::reply::json(&list));

        let (shutdown, signal) = oneshot::channel::<()>();
        let _guard = runtime.enter();
        let (address, server) = warp::serve(route)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                signal.await.ok();
            })
            .context("Unable to bind the publisher server")?;
        runtime.spawn(server);
        log::debug!("Publisher serving {} validators on {}", validators.len(), address);

        Ok(Self {
            address,
            shutdown: Some(shutdown),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// The uri a validator site should load.
    pub fn uri(&self) -> String {
        format!("http://{}/{}", self.address, LIST_PATH)
    }
}

impl Drop for TrustedPublisherServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The server may already be gone with its runtime
            let _ = shutdown.send(());
        }
    }
}
