use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_PLAY: &str = "/backend/api/play";
pub const PATH_FAIL: &str = "/backend/api/fail";
pub const PATH_SLOW: &str = "/backend/api/slow";
pub const PATH_HANG: &str = "/backend/api/hang";

pub const SLOW_DELAY: Duration = Duration::from_millis(50);
pub const HANG_DELAY: Duration = Duration::from_secs(30);

pub const PLAY_BODY: &str = "played";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    post_requests_total: Arc<AtomicU64>,
    play_requests_total: Arc<AtomicU64>,
}

impl TestServerStats {
    fn record(&self, method: &Method) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if *method == Method::POST {
            self.post_requests_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn post_requests_total(&self) -> u64 {
        self.post_requests_total.load(Ordering::Relaxed)
    }

    pub fn play_requests_total(&self) -> u64 {
        self.play_requests_total.load(Ordering::Relaxed)
    }
}

async fn handle_play(State(stats): State<TestServerStats>, method: Method) -> &'static str {
    stats.record(&method);
    stats.play_requests_total.fetch_add(1, Ordering::Relaxed);
    PLAY_BODY
}

async fn handle_fail(
    State(stats): State<TestServerStats>,
    method: Method,
) -> (StatusCode, &'static str) {
    stats.record(&method);
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn handle_slow(State(stats): State<TestServerStats>, method: Method) -> &'static str {
    stats.record(&method);
    sleep(SLOW_DELAY).await;
    PLAY_BODY
}

async fn handle_hang(State(stats): State<TestServerStats>, method: Method) -> &'static str {
    stats.record(&method);
    sleep(HANG_DELAY).await;
    PLAY_BODY
}

/// Only `POST` is routed; other methods get axum's 405.
pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_PLAY, post(handle_play))
        .route(PATH_FAIL, post(handle_fail))
        .route(PATH_SLOW, post(handle_slow))
        .route(PATH_HANG, post(handle_hang))
        .with_state(stats)
}

pub struct TestServer {
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serves [`router`] on an ephemeral loopback port.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// `http://127.0.0.1:<port>`; the `PATH_*` constants are appended to it.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
