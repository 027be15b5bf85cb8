//! `run`: start every network function and serve the API until interrupted

use anyhow::{bail, Context, Result};
use clap::Args;
use fivegc_api::ApiState;
use fivegc_functions::{System, SystemConfig};
use fivegc_runtime::ShutdownHandle;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Flags that override the config file
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Bind address
    #[arg(long)]
    pub addr: Option<String>,

    /// Bind port
    #[arg(long)]
    pub port: Option<u16>,

    /// Serve plain HTTP without authentication
    #[arg(long)]
    pub http: bool,

    /// TLS certificate
    #[arg(long)]
    pub cert_file: Option<PathBuf>,

    /// TLS key
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Accept requests without a bearer token
    #[arg(long)]
    pub disable_authentication: bool,

    /// Hex ed25519 seed used to sign UE credentials
    #[arg(long)]
    pub signing_key: Option<PathBuf>,
}

impl RunArgs {
    /// Apply the flags on top of `config`
    pub fn overlay(&self, mut config: SystemConfig) -> SystemConfig {
        let api = &mut config.api;
        if let Some(addr) = &self.addr {
            api.address.clone_from(addr);
        }
        if let Some(port) = self.port {
            api.port = port;
        }
        api.http_mode |= self.http;
        api.disable_auth |= self.disable_authentication;
        if self.cert_file.is_some() {
            api.cert_file.clone_from(&self.cert_file);
        }
        if self.key_file.is_some() {
            api.key_file.clone_from(&self.key_file);
        }
        if self.signing_key.is_some() {
            config.udm.signing_key_file.clone_from(&self.signing_key);
        }
        config
    }
}

fn load_config(path: Option<&Path>) -> Result<SystemConfig> {
    match path {
        Some(path) => Ok(SystemConfig::from_file(path)?),
        None => Ok(SystemConfig::default()),
    }
}

/// In TLS mode the certificate and key must be readable before anything starts
fn check_tls(config: &SystemConfig) -> Result<()> {
    if config.api.http_mode {
        return Ok(());
    }
    let (Some(cert), Some(key)) = (&config.api.cert_file, &config.api.key_file) else {
        bail!("TLS mode needs --cert-file and --key-file (or --http)");
    };
    for path in [cert, key] {
        File::open(path).with_context(|| format!("cannot read {}", path.display()))?;
    }
    Ok(())
}

/// Resolve configuration and run until Ctrl-C
pub async fn run(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let config = args.overlay(load_config(config_path)?);
    check_tls(&config)?;

    let shutdown = ShutdownHandle::new();
    let mut system = System::new(config.clone())?;
    system.start(&shutdown.signal()).await?;

    let authenticate = !(config.api.http_mode || config.api.disable_auth);
    if !authenticate {
        tracing::warn!("authentication disabled");
    }
    let state = ApiState::new(
        system.store(),
        authenticate.then(|| system.verifier()),
        shutdown.signal(),
    );
    let listener = fivegc_api::bind(&config.api.address, config.api.port)
        .await
        .with_context(|| format!("binding {}:{}", config.api.address, config.api.port))?;
    let mut server = tokio::spawn(fivegc_api::serve(listener, state));

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
            shutdown.trigger();
            signal.context("listening for ctrl-c")
        }
        served = &mut server => {
            shutdown.trigger();
            served?.context("api server failed")
        }
    };
    if !server.is_finished() {
        server.await??;
    }
    system.join().await;
    outcome
}
