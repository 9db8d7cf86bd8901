//! Configuration portal — captive web form served in access-point mode
//!
//! Serves a minimal HTML form for entering Wi-Fi credentials. Saving them
//! persists the two-line credential file and trips the shutdown token; the
//! supervisor (systemd, or the operator) relaunches the node, which then
//! boots in station mode with the new credentials.

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::credentials::{self, WifiCredentials};

/// Shared portal state.
pub struct PortalState {
    /// Data directory holding the credential file
    pub data_dir: PathBuf,
    /// Tripped after a successful save to request a restart
    pub shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
struct SaveForm {
    ssid: String,
    password: String,
}

/// Build the portal router.
pub fn router(state: Arc<PortalState>) -> Router {
    Router::new()
        .route("/", get(config_page))
        .route("/salvar", post(save_credentials))
        .with_state(state)
}

/// Serve the portal until the shutdown token trips.
pub async fn serve(addr: SocketAddr, state: Arc<PortalState>) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Configuration portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn config_page() -> Html<&'static str> {
    Html(
        "<html><head><title>Configuracao Wi-Fi</title></head><body>\
         <h2>Configurar Wi-Fi</h2>\
         <form method='POST' action='/salvar'>\
         SSID: <input type='text' name='ssid'><br>\
         Senha: <input type='password' name='password'><br>\
         <input type='submit' value='Salvar'>\
         </form></body></html>",
    )
}

async fn save_credentials(
    State(state): State<Arc<PortalState>>,
    Form(form): Form<SaveForm>,
) -> &'static str {
    let creds = WifiCredentials {
        ssid: form.ssid.trim().to_string(),
        password: form.password,
    };
    // The password is deliberately not logged.
    info!(ssid = %creds.ssid, "Received credentials from portal");

    match credentials::save(&state.data_dir, &creds) {
        Ok(()) => {
            info!("Credentials saved, requesting restart");
            state.shutdown.cancel();
            "Configuracoes salvas. Reiniciando..."
        }
        Err(e) => {
            warn!(error = %e, "Failed to save credentials");
            "Erro ao salvar configuracoes."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(dir: &std::path::Path) -> Arc<PortalState> {
        Arc::new(PortalState {
            data_dir: dir.to_path_buf(),
            shutdown: CancellationToken::new(),
        })
    }

    #[tokio::test]
    async fn test_config_page_serves_form() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(state(tmp.path()));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("name='ssid'"));
        assert!(html.contains("action='/salvar'"));
    }

    #[tokio::test]
    async fn test_save_persists_and_requests_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let portal_state = state(tmp.path());
        let app = router(Arc::clone(&portal_state));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/salvar")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("ssid=lab-net&password=hunter2"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(portal_state.shutdown.is_cancelled());

        let saved = credentials::load(tmp.path()).unwrap().unwrap();
        assert_eq!(saved.ssid, "lab-net");
        assert_eq!(saved.password, "hunter2");
    }
}
