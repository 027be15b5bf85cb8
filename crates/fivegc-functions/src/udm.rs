//! UDM: mints a connection credential for every Config request.
//!
//! This runs as a plain watch task rather than a declared control loop. A
//! request is answered once per spec generation, so redelivered events do not
//! mint new tokens.

use fivegc_core::conditions::set_condition;
use fivegc_core::resources::condition::READY;
use fivegc_core::resources::udm::{UdmConfigSpec, UdmConfigStatus};
use fivegc_core::{
    Condition, ConditionStatus, CoreError, EventType, Group, Kind, Object, ObjectKey, ObjectStore,
    ObjectStoreExt, RetryPolicy,
};
use fivegc_credential::{CredentialIssuer, PolicyRule};
use fivegc_runtime::{ControllerError, ReconcileError, Shutdown, TaskRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

/// Name reported on the error channel
pub const LOOP_NAME: &str = "udm-config";

/// Condition reasons
pub mod reason {
    /// Credential minted
    pub const READY: &str = "Ready";
    /// Credential could not be minted
    pub const CONFIG_UNAVAILABLE: &str = "ConfigUnavailable";
}

/// Access granted to a UE in its own namespace
pub fn rules_for() -> Vec<PolicyRule> {
    let amf = Group::Amf.as_str();
    vec![
        PolicyRule::new(&[amf], &[Kind::Registration.resource()], &["get", "list", "watch"]),
        PolicyRule::new(
            &[amf],
            &[Kind::Session.resource(), Kind::ContextRelease.resource()],
            &["*"],
        ),
    ]
}

/// Credential issuance over the store
pub struct UdmController {
    store: Arc<dyn ObjectStore>,
    issuer: Arc<dyn CredentialIssuer>,
    ttl: Duration,
    retry: RetryPolicy,
    errors: mpsc::UnboundedSender<ControllerError>,
}

impl UdmController {
    /// Controller answering with `issuer`; escalations go to `errors`
    pub fn new(
        store: Arc<dyn ObjectStore>,
        issuer: Arc<dyn CredentialIssuer>,
        ttl: Duration,
        retry: RetryPolicy,
        errors: mpsc::UnboundedSender<ControllerError>,
    ) -> Self {
        Self {
            store,
            issuer,
            ttl,
            retry,
            errors,
        }
    }

    /// The answered request, or `None` when this generation is already
    /// answered
    pub fn answer(&self, request: &Object) -> Result<Option<Object>, CoreError> {
        let mut current: UdmConfigStatus = request.status_as()?;
        let generation = request.metadata.generation;
        if current.observed_generation == Some(generation) {
            return Ok(None);
        }

        let issued = match request.spec_as::<UdmConfigSpec>() {
            Ok(wanted) => {
                let guti = if wanted.guti.is_empty() {
                    request.name().to_string()
                } else {
                    wanted.guti
                };
                self.issuer
                    .issue_credential(&guti, &[guti.clone()], &rules_for(), self.ttl)
                    .and_then(|c| Ok(serde_json::to_value(c.profile)?))
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("malformed config request: {e}")),
        };
        let ready = match issued {
            Ok(profile) => {
                current.config = Some(profile);
                Condition::new(READY, ConditionStatus::True, reason::READY)
            }
            Err(error) => {
                tracing::warn!(
                    target = %request.key(),
                    error = %error,
                    "credential issuance failed"
                );
                current.config = None;
                Condition::new(READY, ConditionStatus::False, reason::CONFIG_UNAVAILABLE)
                    .with_message(error)
            }
        };
        set_condition(&mut current.conditions, ready);
        current.observed_generation = Some(generation);

        let mut next = request.clone();
        next.set_status(&current)?;
        Ok(Some(next))
    }

    async fn handle(&self, key: &ObjectKey) -> Result<(), CoreError> {
        let Some(request) = self.store.try_get(key).await? else {
            return Ok(());
        };
        if let Some(next) = self.answer(&request)? {
            match self.store.update(next).await {
                Ok(_) => tracing::debug!(target = %key, "config answered"),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn process(&self, key: ObjectKey) {
        let outcome = self
            .retry
            .execute_if(|| self.handle(&key), |e: &CoreError| !e.is_not_found())
            .await;
        if let Err((error, attempts)) = outcome {
            let report = ControllerError {
                loop_name: LOOP_NAME.to_string(),
                target: key,
                error: ReconcileError::Store(error),
            };
            tracing::error!(error = %report, attempts, "retries exhausted");
            let _ = self.errors.send(report);
        }
    }

    async fn sync_all(&self) -> Result<(), CoreError> {
        for request in self.store.list(Kind::UdmConfig, None).await? {
            self.process(request.key()).await;
        }
        Ok(())
    }

    /// Subscribe, answer everything already pending, then follow the watch
    /// until `shutdown` fires
    pub async fn start(
        self: Arc<Self>,
        registry: &TaskRegistry,
        shutdown: &Shutdown,
    ) -> Result<(), CoreError> {
        let mut rx = self.store.watch(Kind::UdmConfig);
        self.sync_all().await?;

        let this = Arc::clone(&self);
        registry.spawn_cancellable(shutdown.clone(), async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.event_type == EventType::Deleted => {}
                    Ok(event) => this.process(event.object.key()).await,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(loop_name = LOOP_NAME, missed, "watch lagged, resyncing");
                        if let Err(error) = this.sync_all().await {
                            tracing::error!(loop_name = LOOP_NAME, error = %error, "resync failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        tracing::info!(loop_name = LOOP_NAME, "credential controller started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fivegc_core::conditions::find;
    use fivegc_credential::{
        generate_signing_key, ConnectionProfile, Credential, CredentialError, Ed25519Issuer,
        ProfileOptions,
    };
    use fivegc_store::MemoryStore;
    use serde_json::json;

    struct Unavailable;

    impl CredentialIssuer for Unavailable {
        fn issue_credential(
            &self,
            _subject: &str,
            _namespaces: &[String],
            _rules: &[PolicyRule],
            _ttl: Duration,
        ) -> Result<Credential, CredentialError> {
            Err(CredentialError::invalid_key("signing key unavailable"))
        }
    }

    fn controller(issuer: Arc<dyn CredentialIssuer>) -> UdmController {
        let (tx, _rx) = mpsc::unbounded_channel();
        UdmController::new(
            Arc::new(MemoryStore::new()),
            issuer,
            Duration::from_secs(3600),
            RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(1),
            tx,
        )
    }

    fn request(guti: &str) -> Object {
        let mut obj = Object::new(&ObjectKey::new(Kind::UdmConfig, "default", guti));
        obj.spec = json!({"guti": guti, "registration": {"name": "reg", "namespace": "default"}});
        obj.metadata.generation = 1;
        obj
    }

    #[test]
    fn answers_with_profile_for_guti() {
        let issuer = Ed25519Issuer::new(generate_signing_key(), ProfileOptions::default());
        let verifier = issuer.verifier();
        let udm = controller(Arc::new(issuer));

        let answered = udm.answer(&request("guti-1")).unwrap().unwrap();
        let current: UdmConfigStatus = answered.status_as().unwrap();
        assert_eq!(current.observed_generation, Some(1));
        let ready = find(&current.conditions, READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);

        let profile: ConnectionProfile = serde_json::from_value(current.config.unwrap()).unwrap();
        let token = profile.current_token().unwrap();
        let claims = verifier.verify(token, chrono::Utc::now().timestamp()).unwrap();
        assert_eq!(claims.sub, "guti-1");
        assert!(claims.allows("amf", "sessions", "create", "guti-1"));
        assert!(claims.allows("amf", "registrations", "get", "guti-1"));
        assert!(!claims.allows("amf", "registrations", "delete", "guti-1"));
        assert!(!claims.allows("amf", "sessions", "create", "guti-2"));
    }

    #[test]
    fn answered_generation_is_skipped() {
        let udm = controller(Arc::new(Unavailable));
        let answered = udm.answer(&request("guti-1")).unwrap().unwrap();
        assert!(udm.answer(&answered).unwrap().is_none());

        let mut changed = answered;
        changed.metadata.generation = 2;
        assert!(udm.answer(&changed).unwrap().is_some());
    }

    #[test]
    fn failure_drops_previous_config() {
        let udm = controller(Arc::new(Unavailable));
        let mut stale = request("guti-1");
        stale.status = Some(json!({"config": {"current-context": "old"}, "conditions": []}));

        let answered = udm.answer(&stale).unwrap().unwrap();
        let current: UdmConfigStatus = answered.status_as().unwrap();
        assert!(current.config.is_none());
        let ready = find(&current.conditions, READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason, reason::CONFIG_UNAVAILABLE);
        assert!(ready.message.contains("signing key unavailable"));
    }

    #[test]
    fn malformed_request_is_refused_without_a_token() {
        let issuer = Ed25519Issuer::new(generate_signing_key(), ProfileOptions::default());
        let udm = controller(Arc::new(issuer));
        let mut malformed = request("guti-1");
        malformed.spec = json!({"guti": 42});

        let answered = udm.answer(&malformed).unwrap().unwrap();
        let current: UdmConfigStatus = answered.status_as().unwrap();
        assert!(current.config.is_none());
        let ready = find(&current.conditions, READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason, reason::CONFIG_UNAVAILABLE);
        assert!(ready.message.starts_with("malformed config request"));
    }

    #[tokio::test]
    async fn started_controller_answers_new_requests() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let issuer = Ed25519Issuer::new(generate_signing_key(), ProfileOptions::default());
        let udm = Arc::new(UdmController::new(
            Arc::clone(&store),
            Arc::new(issuer),
            Duration::from_secs(60),
            RetryPolicy::default(),
            tx,
        ));
        let registry = TaskRegistry::new();
        let handle = fivegc_runtime::ShutdownHandle::new();
        udm.start(&registry, &handle.signal()).await.unwrap();

        let created = store.create(request("guti-7")).await.unwrap();
        let key = created.key();
        let mut answered = None;
        for _ in 0..200 {
            let current = store.get(&key).await.unwrap();
            if find(&current.conditions(), READY).is_some() {
                answered = Some(current);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let answered = answered.expect("config was not answered");
        let current: UdmConfigStatus = answered.status_as().unwrap();
        assert!(current.config.is_some());

        handle.trigger();
        registry.join_all().await;
    }
}
