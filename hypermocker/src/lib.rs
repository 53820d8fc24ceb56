//! HTTP server for tests. It answers only requests which were anticipated with
//! [`Server::anticipate`], and only when the test decides to.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub use hyper;
pub use hyper::StatusCode;
pub use hyper::body::Bytes;

type MockResponse = Response<Full<Bytes>>;

struct Anticipation {
    request_tx: oneshot::Sender<Request<()>>,
    response_rx: oneshot::Receiver<MockResponse>,
}

#[derive(Default)]
struct State {
    /// Anticipations made with [`Server::anticipate`], by path.
    anticipated: HashMap<String, Anticipation>,

    unexpected: Vec<String>,
}

pub struct Server {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl Server {
    /// Bind to a random port of the loopback interface and start serving.
    pub async fn bind() -> Self {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));

        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(connection) => connection,
                    Err(err) => {
                        log::error!("Could not accept a connection: {err}");
                        return;
                    }
                };

                let state = Arc::clone(&server_state);
                tokio::spawn(async move {
                    let service = service_fn(move |request| handle(Arc::clone(&state), request));
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        // Clients giving up on a request end up here.
                        log::debug!("Connection closed: {err}");
                    }
                });
            }
        });

        Self { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Anticipate a request of given path. It is held until [`AnticipatedRequest`] responds, and
    /// answered with 503 if it is dropped without responding.
    pub fn anticipate(&self, path: impl Into<String>) -> AnticipatedRequest {
        let path = path.into();
        log::info!("Anticipating '{path}'.");

        let (request_tx, request_rx) = oneshot::channel();
        let (response_tx, response_rx) = oneshot::channel();
        self.state.lock().unwrap().anticipated.insert(
            path.clone(),
            Anticipation {
                request_tx,
                response_rx,
            },
        );

        AnticipatedRequest {
            path,
            request_rx,
            response_tx,
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        let state = self.state.lock().unwrap();
        assert!(
            state.unexpected.is_empty(),
            "unexpected requests: {:?}",
            state.unexpected
        );
    }
}

pub struct AnticipatedRequest {
    path: String,
    request_rx: oneshot::Receiver<Request<()>>,
    response_tx: oneshot::Sender<MockResponse>,
}

impl AnticipatedRequest {
    /// Wait for the request to come. Its body is discarded.
    pub async fn expect(&mut self) -> Request<()> {
        match (&mut self.request_rx).await {
            Ok(request) => request,
            Err(_) => panic!("'{}' will never come, server is gone", self.path),
        }
    }

    pub fn respond(self, body: impl Into<Bytes>) {
        self.respond_with(StatusCode::OK, body);
    }

    pub fn respond_with_status(self, status: StatusCode) {
        self.respond_with(status, Bytes::new());
    }

    pub fn respond_with(self, status: StatusCode, body: impl Into<Bytes>) {
        log::info!("Responding to '{}' with {status}.", self.path);

        let mut response = Response::new(Full::new(body.into()));
        *response.status_mut() = status;

        // Client might have given up already.
        let _: Result<(), _> = self.response_tx.send(response);
    }
}

async fn handle(
    state: Arc<Mutex<State>>,
    request: Request<Incoming>,
) -> Result<MockResponse, Infallible> {
    let path = request.uri().path().to_owned();
    log::info!("Incoming request '{path}'.");

    let anticipation = state.lock().unwrap().anticipated.remove(&path);
    let Some(anticipation) = anticipation else {
        log::warn!("Unexpected '{path}'.");
        state.lock().unwrap().unexpected.push(path);

        let mut response = Response::new(Full::new(Bytes::from_static(b"unexpected")));
        *response.status_mut() = StatusCode::IM_A_TEAPOT;
        return Ok(response);
    };

    let (parts, _body) = request.into_parts();
    let _: Result<(), _> = anticipation.request_tx.send(Request::from_parts(parts, ()));

    Ok(anticipation.response_rx.await.unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        response
    }))
}
