//! Resource routes.
//!
//! `/apis/:group/:kind` lists, watches and creates; `/apis/:group/:kind/:namespace/:name`
//! reads, replaces, merge-patches and deletes one object. Cluster-scoped
//! objects use `_` as their namespace segment.

use crate::auth::{authorize, Verb};
use crate::error::ApiError;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use fivegc_core::{Kind, Object, ObjectKey, ObjectStore, WatchEvent};
use fivegc_credential::{TokenVerifier, WILDCARD};
use fivegc_runtime::Shutdown;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::trace::TraceLayer;

/// Path segment standing for the cluster scope
pub const CLUSTER_NAMESPACE: &str = "_";

/// Shared state for every handler
#[derive(Clone)]
pub struct ApiState {
    store: Arc<dyn ObjectStore>,
    verifier: Option<TokenVerifier>,
    shutdown: Shutdown,
}

impl ApiState {
    /// State over `store`; `verifier: None` disables authentication
    pub fn new(
        store: Arc<dyn ObjectStore>,
        verifier: Option<TokenVerifier>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            store,
            verifier,
            shutdown,
        }
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        kind: Kind,
        verb: Verb,
        namespace: &str,
    ) -> Result<(), ApiError> {
        authorize(self.verifier.as_ref(), headers, kind, verb, namespace).map(|_| ())
    }

    /// Shutdown signal ending watches and the server
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }
}

/// Collection query string
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Stream changes instead of listing
    #[serde(default)]
    pub watch: bool,
    /// Restrict to one namespace
    pub namespace: Option<String>,
}

/// Build the router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/apis/:group/:kind", get(list_or_watch).post(create_object))
        .route(
            "/apis/:group/:kind/:namespace/:name",
            get(get_object)
                .put(replace_object)
                .patch(patch_object)
                .delete(delete_object),
        )
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn resolve_kind(group: &str, kind: &str) -> Result<Kind, ApiError> {
    Kind::from_parts(group, kind).ok_or_else(|| ApiError::UnknownKind {
        group: group.to_string(),
        kind: kind.to_string(),
    })
}

fn check_scope(kind: Kind, namespace: &str) -> Result<(), ApiError> {
    match (kind.is_cluster_scoped(), namespace.is_empty()) {
        (true, false) => Err(ApiError::BadRequest(format!(
            "{kind} is cluster scoped, got namespace {namespace:?}"
        ))),
        (false, true) => Err(ApiError::BadRequest(format!("{kind} needs a namespace"))),
        _ => Ok(()),
    }
}

fn resolve_key(
    group: &str,
    kind: &str,
    namespace: &str,
    name: &str,
) -> Result<ObjectKey, ApiError> {
    let kind = resolve_kind(group, kind)?;
    let namespace = if namespace == CLUSTER_NAMESPACE {
        ""
    } else {
        namespace
    };
    check_scope(kind, namespace)?;
    Ok(ObjectKey::new(kind, namespace, name))
}

/// Parse a request body as an object of `kind`; `group` and `kind` may be
/// omitted from the body
fn decode_object(kind: Kind, body: &[u8]) -> Result<Object, ApiError> {
    let mut value: Value = serde_json::from_slice(body)?;
    let map = value
        .as_object_mut()
        .ok_or_else(|| ApiError::BadRequest("expected a JSON object".into()))?;
    map.entry("group")
        .or_insert_with(|| json!(kind.group().as_str()));
    map.entry("kind").or_insert_with(|| json!(kind.name()));
    let object: Object = serde_json::from_value(value)?;
    if object.kind != kind {
        return Err(ApiError::BadRequest(format!(
            "body is a {}, path names {kind}",
            object.kind
        )));
    }
    Ok(object)
}

async fn list_or_watch(
    State(state): State<ApiState>,
    Path((group, kind)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let kind = resolve_kind(&group, &kind)?;
    let scope = match (&query.namespace, kind.is_cluster_scoped()) {
        (_, true) => "",
        (Some(namespace), false) => namespace.as_str(),
        (None, false) => WILDCARD,
    };
    let verb = if query.watch { Verb::Watch } else { Verb::List };
    state.authorize(&headers, kind, verb, scope)?;

    if query.watch {
        return Ok(watch(&state, kind, query.namespace));
    }
    let items = state.store.list(kind, query.namespace.as_deref()).await?;
    Ok(Json(json!({ "items": items })).into_response())
}

fn encode_event(event: &WatchEvent) -> Option<Bytes> {
    match serde_json::to_vec(event) {
        Ok(mut line) => {
            line.push(b'\n');
            Some(Bytes::from(line))
        }
        Err(e) => {
            tracing::error!(error = %e, "cannot encode watch event");
            None
        }
    }
}

/// Newline-delimited JSON stream of watch events, ended by shutdown
fn watch(state: &ApiState, kind: Kind, namespace: Option<String>) -> Response {
    let mut shutdown = state.shutdown();
    let events = BroadcastStream::new(state.store.watch(kind))
        .filter_map(move |item| {
            let line = match item {
                Ok(event)
                    if namespace
                        .as_deref()
                        .is_some_and(|ns| event.object.namespace() != ns) =>
                {
                    None
                }
                Ok(event) => encode_event(&event),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::warn!(%kind, missed, "watch client lagged");
                    None
                }
            };
            futures::future::ready(line.map(Ok::<_, Infallible>))
        })
        .take_until(async move { shutdown.cancelled().await });

    tracing::debug!(%kind, "watch opened");
    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(events),
    )
        .into_response()
}

async fn create_object(
    State(state): State<ApiState>,
    Path((group, kind)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Object>), ApiError> {
    let kind = resolve_kind(&group, &kind)?;
    let object = decode_object(kind, &body)?;
    check_scope(kind, object.namespace())?;
    state.authorize(&headers, kind, Verb::Create, object.namespace())?;
    let created = state.store.create(object).await?;
    tracing::debug!(key = %created.key(), "created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_object(
    State(state): State<ApiState>,
    Path((group, kind, namespace, name)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<Object>, ApiError> {
    let key = resolve_key(&group, &kind, &namespace, &name)?;
    state.authorize(&headers, key.kind, Verb::Get, &key.namespace)?;
    Ok(Json(state.store.get(&key).await?))
}

async fn replace_object(
    State(state): State<ApiState>,
    Path((group, kind, namespace, name)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Object>, ApiError> {
    let key = resolve_key(&group, &kind, &namespace, &name)?;
    state.authorize(&headers, key.kind, Verb::Update, &key.namespace)?;
    let mut object = decode_object(key.kind, &body)?;
    let meta = &mut object.metadata;
    if meta.name.is_empty() {
        meta.name.clone_from(&key.name);
    }
    if meta.namespace.is_empty() {
        meta.namespace.clone_from(&key.namespace);
    }
    if object.key() != key {
        return Err(ApiError::BadRequest(format!(
            "body names {}, path names {key}",
            object.key()
        )));
    }
    Ok(Json(state.store.update(object).await?))
}

async fn patch_object(
    State(state): State<ApiState>,
    Path((group, kind, namespace, name)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Object>, ApiError> {
    let key = resolve_key(&group, &kind, &namespace, &name)?;
    state.authorize(&headers, key.kind, Verb::Patch, &key.namespace)?;
    let patch: Value = serde_json::from_slice(&body)?;
    if !patch.is_object() {
        return Err(ApiError::BadRequest("merge patch must be a JSON object".into()));
    }
    Ok(Json(state.store.patch(&key, &patch).await?))
}

async fn delete_object(
    State(state): State<ApiState>,
    Path((group, kind, namespace, name)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<Object>, ApiError> {
    let key = resolve_key(&group, &kind, &namespace, &name)?;
    state.authorize(&headers, key.kind, Verb::Delete, &key.namespace)?;
    let removed = state.store.delete(&key).await?;
    tracing::debug!(%key, "deleted");
    Ok(Json(removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_segment_maps_to_empty_namespace() {
        let key = resolve_key("pcf", "policytables", "_", "policies").unwrap();
        assert_eq!(key, ObjectKey::cluster(Kind::PolicyTable, "policies"));
        assert!(resolve_key("pcf", "policytables", "guti-1", "policies").is_err());
        assert!(resolve_key("amf", "sessions", "_", "s1").is_err());
    }

    #[test]
    fn unknown_kind_is_not_found() {
        let err = resolve_kind("amf", "widgets").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn body_may_omit_group_and_kind() {
        let object = decode_object(
            Kind::ContextRelease,
            br#"{"metadata":{"name":"r","namespace":"g"},"spec":{"guti":"g","sessionId":1}}"#,
        )
        .unwrap();
        assert_eq!(object.key(), ObjectKey::new(Kind::ContextRelease, "g", "r"));

        let mismatch = decode_object(
            Kind::Session,
            br#"{"group":"amf","kind":"Registration","metadata":{"name":"r"}}"#,
        );
        assert!(mismatch.is_err());
    }
}
