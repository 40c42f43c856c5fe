use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use tempfile::TempDir;

pub const CLASSIFIER_ROUTE: &str = "/api/Commit/analyze";

/// Runs git with a throwaway identity and returns its stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Commitect Tests",
            "-c",
            "user.email=tests@commitect.invalid",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Repository with one committed file, `lib.rs`.
pub fn init_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    git(dir.path(), &["init", "-q"]);
    fs::write(dir.path().join("lib.rs"), "fn answer() -> u32 {\n    41\n}\n").unwrap();
    git(dir.path(), &["add", "lib.rs"]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);
    dir
}

/// Request bodies received by a [`spawn_classifier`] server.
pub type Received = Arc<Mutex<Vec<serde_json::Value>>>;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Serves `router` over HTTPS with a fresh self-signed certificate and returns
/// its base URL.
pub async fn serve_tls(router: Router) -> String {
    // the server config is built from the process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let certified =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
            .unwrap();
    let config = RustlsConfig::from_pem(
        certified.cert.pem().into_bytes(),
        certified.key_pair.serialize_pem().into_bytes(),
    )
    .await
    .unwrap();

    let handle = Handle::new();
    let server_handle = handle.clone();
    tokio::spawn(async move {
        axum_server::bind_rustls(SocketAddr::from(([127, 0, 0, 1], 0)), config)
            .handle(server_handle)
            .serve(router.into_make_service())
            .await
            .unwrap();
    });
    let addr = handle.listening().await.unwrap();
    format!("https://{addr}")
}

/// Stand-in classifier answering every request with `status` and `body`.
pub async fn spawn_classifier(status: StatusCode, body: &'static str) -> (String, Received) {
    let received: Received = Arc::default();
    let sink = received.clone();
    let router = Router::new().route(
        CLASSIFIER_ROUTE,
        post(move |axum::Json(payload): axum::Json<serde_json::Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(payload);
                (status, body)
            }
        }),
    );
    let base = serve(router).await;
    (format!("{base}{CLASSIFIER_ROUTE}"), received)
}
