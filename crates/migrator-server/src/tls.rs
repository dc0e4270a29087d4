// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! TLS listener for the admission webhook.

use std::fs::File;
use std::future::Future;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::error::ServerError;

fn tls_error(path: &Path, message: impl ToString) -> ServerError {
	ServerError::Tls {
		path: path.display().to_string(),
		message: message.to_string(),
	}
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
	let mut reader = BufReader::new(File::open(path).map_err(|e| tls_error(path, e))?);
	let certs = rustls_pemfile::certs(&mut reader)
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| tls_error(path, e))?;
	if certs.is_empty() {
		return Err(tls_error(path, "no certificates found"));
	}
	Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ServerError> {
	let mut reader = BufReader::new(File::open(path).map_err(|e| tls_error(path, e))?);
	rustls_pemfile::private_key(&mut reader)
		.map_err(|e| tls_error(path, e))?
		.ok_or_else(|| tls_error(path, "no private key found"))
}

/// Build a server config from PEM encoded certificate chain and key files.
pub fn load_server_config(
	cert_path: &Path,
	key_path: &Path,
) -> Result<Arc<rustls::ServerConfig>, ServerError> {
	let certs = load_certs(cert_path)?;
	let key = load_key(key_path)?;
	let mut config =
		rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
			.with_safe_default_protocol_versions()
			.map_err(|e| tls_error(cert_path, e))?
			.with_no_client_auth()
			.with_single_cert(certs, key)
			.map_err(|e| tls_error(key_path, e))?;
	config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
	Ok(Arc::new(config))
}

/// Serve `app` over TLS on `listener` until `shutdown` resolves.
pub async fn serve_tls(
	listener: TcpListener,
	config: Arc<rustls::ServerConfig>,
	app: Router,
	shutdown: impl Future<Output = ()>,
) -> Result<(), ServerError> {
	let acceptor = TlsAcceptor::from(config);
	tokio::pin!(shutdown);

	loop {
		let (stream, peer) = tokio::select! {
			accepted = listener.accept() => match accepted {
				Ok(conn) => conn,
				Err(e) => {
					warn!(error = %e, "Failed to accept webhook connection");
					continue;
				}
			},
			_ = &mut shutdown => break,
		};

		let acceptor = acceptor.clone();
		let service = TowerToHyperService::new(app.clone());
		tokio::spawn(async move {
			let tls = match acceptor.accept(stream).await {
				Ok(tls) => tls,
				Err(e) => {
					debug!(peer = %peer, error = %e, "TLS handshake failed");
					return;
				}
			};
			if let Err(e) = auto::Builder::new(TokioExecutor::new())
				.serve_connection(TokioIo::new(tls), service)
				.await
			{
				debug!(peer = %peer, error = %e, "Webhook connection error");
			}
		});
	}

	info!("Webhook listener stopped");
	Ok(())
}
