/**
 * API WORKERS NETSMOG - Serveur HTTP du kernel
 *
 * RÔLE :
 * Distribue à chaque worker la liste des cibles qu'il doit sonder et reçoit
 * les mesures qu'il renvoie.
 *
 * FONCTIONNEMENT :
 * - GET  /worker : assignation calculée pour le worker authentifié
 * - POST /worker : lot de résultats, une écriture par (groupe, cible)
 * - GET  /health : liveness, sans authentification
 *
 * SÉCURITÉ :
 * - Headers `Worker` + `Authorisation` obligatoires sur /worker
 * - Vérification bcrypt hors du runtime async (spawn_blocking)
 * - Refus = 403 sans corps, la raison n'est que loggée
 */

use crate::state::{Registry, Snapshot};
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use netsmog_contracts::{
    resolve, verify, AuthToken, ResultBatch, SampleSet, SampleStore,
    AUTHORISATION_HEADER, WORKER_HEADER, WORKER_PATH,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub registry: Snapshot<Registry>,
    pub store: Arc<dyn SampleStore>,
}

/// Identité du worker, posée dans les extensions une fois le token vérifié.
#[derive(Debug, Clone)]
pub struct WorkerId(pub String);

pub fn build_router(app_state: AppState) -> Router {
    let worker_routes = Router::new()
        .route(WORKER_PATH, get(fetch_assignment).post(submit_results))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), require_worker));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(worker_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

async fn require_worker(
    State(app): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (Some(worker), Some(token)) = (
        header_str(req.headers(), WORKER_HEADER),
        header_str(req.headers(), AUTHORISATION_HEADER),
    ) else {
        tracing::warn!("SECURITY: request without worker credentials");
        return Err(StatusCode::FORBIDDEN);
    };
    let worker = worker.to_string();
    let token = AuthToken::from(token);

    // le handler sert la génération contre laquelle le token a été vérifié
    let registry = app.registry.load();
    let checked = Arc::clone(&registry);
    let identity = worker.clone();
    let verdict = tokio::task::spawn_blocking(move || {
        verify(&identity, |id| checked.secrets.lookup(id), &token)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "authorisation task failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if let Err(e) = verdict {
        tracing::warn!(worker = %worker, reason = %e.reason, "SECURITY: authorisation refused");
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(WorkerId(worker));
    req.extensions_mut().insert(registry);
    Ok(next.run(req).await)
}

// GET /worker
async fn fetch_assignment(
    Extension(WorkerId(worker)): Extension<WorkerId>,
    Extension(registry): Extension<Arc<Registry>>,
) -> Response {
    let assignment = resolve(&registry.catalogue, &worker);
    let targets: usize = assignment.values().map(|g| g.len()).sum();

    match serde_json::to_vec(&assignment) {
        Ok(body) => {
            tracing::info!(worker = %worker, targets, "assignment served");
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(e) => {
            tracing::error!(worker = %worker, error = %e, "cannot serialise assignment");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// POST /worker
async fn submit_results(
    State(app): State<AppState>,
    Extension(WorkerId(worker)): Extension<WorkerId>,
    body: Bytes,
) -> StatusCode {
    let batch: ResultBatch = match serde_json::from_slice(&body) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::warn!(worker = %worker, error = %e, "malformed result batch");
            return StatusCode::BAD_REQUEST;
        }
    };

    for (group, target, result) in batch.entries() {
        let set = SampleSet::from_result(group, target, &worker, result);
        tracing::debug!(worker = %worker, series = %set.name, samples = result.len(), "storing");
        if let Err(e) = app.store.write(set).await {
            tracing::error!(
                worker = %worker,
                group = %group,
                target = %target,
                backend = app.store.name(),
                error = %e,
                "cannot store samples"
            );
        }
    }

    StatusCode::OK
}
