//! The assembled network: store, catalogues, every control loop and UDM.

use crate::catalogue::Catalogues;
use crate::config::SystemConfig;
use crate::error::SystemError;
use crate::ipam::IpPool;
use crate::smf::Addressing;
use crate::udm::UdmController;
use crate::{amf, ausf, smf, upf};
use fivegc_core::ObjectStore;
use fivegc_credential::{
    generate_signing_key, load_signing_key, Ed25519Issuer, ProfileOptions, TokenVerifier,
};
use fivegc_runtime::{Runtime, Shutdown, TaskRegistry};
use fivegc_store::MemoryStore;
use std::sync::Arc;

/// A configured, not yet started, core network
pub struct System {
    config: SystemConfig,
    store: Arc<dyn ObjectStore>,
    catalogues: Catalogues,
    runtime: Runtime,
    udm: Arc<UdmController>,
    verifier: TokenVerifier,
    registry: TaskRegistry,
}

impl System {
    /// Build over a fresh in-memory store
    pub fn new(config: SystemConfig) -> Result<Self, SystemError> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Build over an existing store. Catalogues, the address pool and the
    /// signing key are all checked here, before anything runs.
    pub fn with_store(
        config: SystemConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, SystemError> {
        let catalogues = Catalogues::load(
            config.catalogues.policies.as_deref(),
            config.catalogues.suci_to_supi.as_deref(),
        )?;
        let pool = IpPool::new(&config.smf.pool, &config.smf.gateway)
            .map_err(|e| SystemError::Config(format!("smf pool: {e}")))?;
        let addressing = Arc::new(Addressing::new(pool, config.smf.dns.clone()));

        let key = match &config.udm.signing_key_file {
            Some(path) => load_signing_key(path)?,
            None => generate_signing_key(),
        };
        let issuer = Ed25519Issuer::new(
            key,
            ProfileOptions {
                server: config.api.server_url(),
                cluster_name: config.udm.cluster_name.clone(),
                insecure: true,
            },
        );
        let verifier = issuer.verifier();

        let mut runtime = Runtime::new(Arc::clone(&store), config.runtime.clone());
        let loops = amf::control_loops()
            .into_iter()
            .chain(ausf::control_loops())
            .chain(smf::control_loops(addressing))
            .chain(upf::control_loops());
        for control_loop in loops {
            runtime.register(control_loop)?;
        }

        let udm = Arc::new(UdmController::new(
            Arc::clone(&store),
            Arc::new(issuer),
            config.udm.token_ttl,
            config.runtime.retry.clone(),
            runtime.error_sender(),
        ));

        Ok(Self {
            config,
            store,
            catalogues,
            runtime,
            udm,
            verifier,
            registry: TaskRegistry::new(),
        })
    }

    /// The shared store
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// Checks tokens minted by UDM
    pub fn verifier(&self) -> TokenVerifier {
        self.verifier.clone()
    }

    /// Configuration in use
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Names of every registered control loop
    pub fn loop_names(&self) -> Vec<&str> {
        self.runtime.loop_names()
    }

    /// Seed the catalogues and start every loop and UDM. Returns after the
    /// initial sync; work continues in the background until `shutdown`.
    pub async fn start(&mut self, shutdown: &Shutdown) -> Result<(), SystemError> {
        self.catalogues.seed(self.store.as_ref()).await?;

        if let Some(mut errors) = self.runtime.take_errors() {
            self.registry.spawn_cancellable(shutdown.clone(), async move {
                while let Some(report) = errors.recv().await {
                    tracing::error!(
                        loop_name = %report.loop_name,
                        target = %report.target,
                        error = %report.error,
                        "controller error"
                    );
                }
            });
        }

        self.runtime.start(shutdown).await?;
        Arc::clone(&self.udm).start(&self.registry, shutdown).await?;
        tracing::info!(
            loops = self.runtime.loop_names().len(),
            policies = self.catalogues.policies.len(),
            subscribers = self.catalogues.suci_to_supi.len(),
            "system started"
        );
        Ok(())
    }

    /// Wait for background work to finish after `shutdown` fired
    pub async fn join(&self) {
        self.runtime.join().await;
        self.registry.join_all().await;
    }

    /// Start, block until `shutdown` fires, then drain
    pub async fn run(mut self, mut shutdown: Shutdown) -> Result<(), SystemError> {
        self.start(&shutdown).await?;
        shutdown.cancelled().await;
        self.join().await;
        tracing::info!("system stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn registers_every_loop_once() {
        let system = System::new(SystemConfig::default()).unwrap();
        let mut names = system.loop_names();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
        for expected in [
            "register-input",
            "register-output",
            "active-registration",
            "session-input",
            "session-context-release-output",
            "supi-req-handler",
            "session-context-handler",
            "upf-notifier",
            "active-session",
            "active-config",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn bad_pool_is_a_config_error() {
        let mut config = SystemConfig::default();
        config.smf.gateway = "192.168.1.1".into();
        assert!(matches!(System::new(config), Err(SystemError::Config(_))));
    }

    #[test]
    fn malformed_catalogue_aborts_construction() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[entry]]\nsuci = \"suci-1\"\nsupi = \"imsi-1\"").unwrap();
        writeln!(file, "[[entry]]\nsuci = \"suci-1\"\nsupi = \"imsi-2\"").unwrap();
        let mut config = SystemConfig::default();
        config.catalogues.suci_to_supi = Some(file.path().to_path_buf());
        assert!(matches!(System::new(config), Err(SystemError::Catalogue(_))));
    }

    #[test]
    fn missing_signing_key_file_is_a_credential_error() {
        let mut config = SystemConfig::default();
        config.udm.signing_key_file = Some("/nonexistent/fivegc.key".into());
        assert!(matches!(System::new(config), Err(SystemError::Credential(_))));
    }
}
