//! HTTP endpoint exposing the registry in Prometheus text format.

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::{ExporterError, Result};

pub struct PrometheusExporter {
    registry: Registry,
    port: u16,
}

impl PrometheusExporter {
    pub fn new(registry: Registry, port: u16) -> Self {
        Self { registry, port }
    }

    /// Accept connections until the task is dropped. Each connection is
    /// served on its own task so a slow scraper cannot stall the listener.
    pub async fn serve(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ExporterError::Server(format!("failed to bind {}: {}", addr, e)))?;
        info!(%addr, "metrics endpoint listening");

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| ExporterError::Server(format!("accept failed: {}", e)))?;
            let io = TokioIo::new(stream);
            let registry = self.registry.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let registry = registry.clone();
                    async move { handle_request(req, &registry) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(error = %e, "connection error");
                }
            });
        }
    }
}

fn handle_request<B>(
    req: Request<B>,
    registry: &Registry,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => match render(registry) {
            Ok(body) => Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .unwrap()),
            Err(e) => {
                error!(error = %e, "failed to render metrics");
                Ok(Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header("Content-Type", "text/plain")
                    .body(Full::new(Bytes::from("encoding failure")))
                    .unwrap())
            }
        },
        "/health" | "/healthz" => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain")
            .body(Full::new(Bytes::from("OK")))
            .unwrap()),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("Content-Type", "text/plain")
            .body(Full::new(Bytes::from("Not Found")))
            .unwrap()),
    }
}

/// Encode everything gathered from the registry as exposition text.
pub fn render(registry: &Registry) -> Result<String> {
    let mut body = String::new();
    TextEncoder::new()
        .encode_utf8(&registry.gather(), &mut body)
        .map_err(|e| ExporterError::Metrics(format!("failed to encode metrics: {}", e)))?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Gauge, Opts};

    #[test]
    fn test_render_includes_registered_samples() {
        let registry = Registry::new();
        let gauge = Gauge::with_opts(Opts::new("sample_metric", "A sample")).unwrap();
        registry.register(Box::new(gauge.clone())).unwrap();
        gauge.set(3.5);

        let body = render(&registry).unwrap();
        assert!(body.contains("# HELP sample_metric A sample"));
        assert!(body.contains("# TYPE sample_metric gauge"));
        assert!(body.contains("sample_metric 3.5"));
    }

    #[test]
    fn test_render_empty_registry() {
        let body = render(&Registry::new()).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_metrics_route() {
        let registry = Registry::new();
        let req = Request::builder().uri("/metrics").body(()).unwrap();
        let res = handle_request(req, &registry).unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get("Content-Type").unwrap(),
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }

    #[test]
    fn test_healthz_route() {
        let registry = Registry::new();
        let req = Request::builder().uri("/healthz").body(()).unwrap();
        let res = handle_request(req, &registry).unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn test_unknown_route() {
        let registry = Registry::new();
        let req = Request::builder().uri("/nope").body(()).unwrap();
        let res = handle_request(req, &registry).unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_reports_bind_conflict_as_server_error() {
        let taken = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let exporter = PrometheusExporter::new(Registry::new(), port);
        let err = exporter.serve().await.expect_err("port is taken");
        assert!(matches!(err, ExporterError::Server(_)));
    }
}
