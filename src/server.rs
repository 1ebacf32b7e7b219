//! Inbound HTTP server.
//!
//! One route serves the transformed sitemap; `/healthz` answers liveness
//! probes. Pipeline failures surface as an opaque 500 so upstream details
//! never leak to clients.

use crate::relay::SitemapRelay;
use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info};

type RespBody = Full<Bytes>;

fn build_response(status: u16, body: impl Into<Bytes>) -> Response<RespBody> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap()
}

async fn handle<B>(
    req: Request<B>,
    relay: Arc<SitemapRelay>,
) -> Result<Response<RespBody>, Infallible> {
    let serve_path = relay.config().settings.serve_path.as_str();

    match (req.method(), req.uri().path()) {
        (&Method::GET, path) if path == serve_path => match relay.serve_sitemap().await {
            Ok(xml) => {
                let mut resp = build_response(200, xml);
                resp.headers_mut()
                    .insert("content-type", "application/xml".parse().unwrap());
                resp.headers_mut()
                    .insert("cache-control", "no-store".parse().unwrap());
                Ok(resp)
            }
            Err(error) => {
                error!(error = %error, "Sitemap request failed");
                Ok(build_response(500, "Internal Server Error"))
            }
        },
        (&Method::GET, "/healthz") => Ok(build_response(200, "ok")),
        _ => Ok(build_response(404, "not found")),
    }
}

/// Serve the relay on the given address until Ctrl-C or SIGTERM, then
/// drain in-flight connections.
pub async fn serve(addr: SocketAddr, relay: Arc<SitemapRelay>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, path = %relay.config().settings.serve_path, "Sitemap relay listening");

    let mut tasks = JoinSet::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "Shutdown signal received, draining connections");
                break;
            }

            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        error!(error = %error, "Accept error");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let relay = Arc::clone(&relay);
                tasks.spawn(async move {
                    let service = service_fn(move |req| handle(req, Arc::clone(&relay)));
                    if let Err(error) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        error!(?error, "Connection error");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    info!("Sitemap relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::fetch::{FetchError, SitemapFetcher};
    use async_trait::async_trait;
    use http_body_util::BodyExt;

    struct StaticFetcher(&'static str);

    #[async_trait]
    impl SitemapFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl SitemapFetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Err(FetchError::Status { status: 502 })
        }
    }

    const SITEMAP: &str = "<urlset><url><loc>https://origin.example/home</loc></url></urlset>";

    fn make_relay(fetcher: Arc<dyn SitemapFetcher>) -> Arc<SitemapRelay> {
        std::env::set_var("ORIGIN_DOMAIN", "https://origin.example");
        Arc::new(SitemapRelay::with_fetcher(RelayConfig::default(), fetcher))
    }

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    async fn body_text(response: Response<RespBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_sitemap_route_sets_xml_headers() {
        let relay = make_relay(Arc::new(StaticFetcher(SITEMAP)));

        let response = handle(get("/sitemap.xml"), relay).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/xml"
        );
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
        let body = body_text(response).await;
        assert!(body.contains("<loc>https://origin.example/home</loc>"));
    }

    #[tokio::test]
    async fn test_pipeline_failure_returns_opaque_500() {
        let relay = make_relay(Arc::new(FailingFetcher));

        let response = handle(get("/sitemap.xml"), relay).await.unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(body_text(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_healthz() {
        let relay = make_relay(Arc::new(FailingFetcher));

        let response = handle(get("/healthz"), relay).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let relay = make_relay(Arc::new(StaticFetcher(SITEMAP)));

        let response = handle(get("/robots.txt"), relay).await.unwrap();

        assert_eq!(response.status(), 404);
        assert_eq!(body_text(response).await, "not found");
    }

    #[tokio::test]
    async fn test_non_get_method_is_not_found() {
        let relay = make_relay(Arc::new(StaticFetcher(SITEMAP)));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/sitemap.xml")
            .body(())
            .unwrap();

        let response = handle(request, relay).await.unwrap();

        assert_eq!(response.status(), 404);
    }
}
