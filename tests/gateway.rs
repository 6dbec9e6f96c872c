//! Full gateway tests: listener, request IDs, prerender middleware and the
//! origin proxy, driven over real sockets.

mod common;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use prerender_proxy::config::prerender::keys;
use prerender_proxy::{
    GatewayConfig, HandlerRegistry, HttpServer, Prerender, PrerenderConfig, Shutdown,
};

use common::{closed_addr, start_mock_server, MockResponse, MockServer};

const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

struct Gateway {
    addr: SocketAddr,
    prerender: Arc<Prerender>,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl Gateway {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn start_gateway(origin: SocketAddr, render_backend: &MockServer) -> Gateway {
    let mut config = GatewayConfig::default();
    config.origin.url = format!("http://{origin}");
    config
        .prerender
        .insert(keys::SERVICE_URL.to_string(), render_backend.url());

    let prerender = Arc::new(
        Prerender::from_config(config.prerender_config(), &HandlerRegistry::with_builtins())
            .unwrap(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config, prerender.clone()).unwrap();
    let task = tokio::spawn(server.run(listener, shutdown.wait()));

    Gateway {
        addr,
        prerender,
        shutdown,
        task,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_browser_is_proxied_to_origin() {
    let origin = start_mock_server(MockResponse::html(200, "origin page")).await;
    let render = start_mock_server(MockResponse::html(200, "rendered page")).await;
    let gateway = start_gateway(origin.addr, &render).await;

    let response = client()
        .get(gateway.url("/products?id=7"))
        .header("User-Agent", FIREFOX)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "origin page");

    assert_eq!(render.hits(), 0);
    assert_eq!(origin.hits(), 1);
    assert!(origin.request_line(0).starts_with("GET /products?id=7 "));
    assert_eq!(
        origin.header(0, "x-forwarded-for").as_deref(),
        Some("127.0.0.1")
    );
}

#[tokio::test]
async fn test_crawler_is_served_from_render_backend() {
    let origin = start_mock_server(MockResponse::html(200, "origin page")).await;
    let render = start_mock_server(MockResponse::html(200, "rendered page")).await;
    let gateway = start_gateway(origin.addr, &render).await;

    let response = client()
        .get(gateway.url("/products"))
        .header("User-Agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "rendered page");
    assert_eq!(origin.hits(), 0);
    assert!(render
        .request_line(0)
        .starts_with(&format!("GET /http://{}/products ", gateway.addr)));
}

#[tokio::test]
async fn test_render_failure_falls_back_to_origin() {
    let origin = start_mock_server(MockResponse::html(200, "origin page")).await;
    let render = start_mock_server(MockResponse::html(500, "boom")).await;
    let gateway = start_gateway(origin.addr, &render).await;

    let response = client()
        .get(gateway.url("/products"))
        .header("User-Agent", GOOGLEBOT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "origin page");
    assert_eq!(render.hits(), 1);
    assert_eq!(origin.hits(), 1);
}

#[tokio::test]
async fn test_client_request_id_is_propagated() {
    let origin = start_mock_server(MockResponse::html(200, "origin page")).await;
    let render = start_mock_server(MockResponse::html(200, "rendered page")).await;
    let gateway = start_gateway(origin.addr, &render).await;

    let response = client()
        .get(gateway.url("/"))
        .header("User-Agent", FIREFOX)
        .header("X-Request-Id", "req-42")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
    assert_eq!(origin.header(0, "x-request-id").as_deref(), Some("req-42"));
}

#[tokio::test]
async fn test_origin_down_returns_bad_gateway() {
    let origin = closed_addr().await;
    let render = start_mock_server(MockResponse::html(200, "rendered page")).await;
    let gateway = start_gateway(origin, &render).await;

    let response = client()
        .get(gateway.url("/"))
        .header("User-Agent", FIREFOX)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn test_shutdown_stops_server_and_pipeline() {
    let origin = start_mock_server(MockResponse::html(200, "origin page")).await;
    let render = start_mock_server(MockResponse::html(200, "rendered page")).await;
    let gateway = start_gateway(origin.addr, &render).await;

    assert!(gateway.shutdown.trigger());
    let result = tokio::time::timeout(Duration::from_secs(5), gateway.task)
        .await
        .expect("server should stop after shutdown")
        .unwrap();

    assert!(result.is_ok());
    assert!(gateway.prerender.is_shut_down());
}

#[tokio::test]
async fn test_invalid_origin_is_rejected() {
    let mut config = GatewayConfig::default();
    config.origin.url = "https://secure.internal".to_string();
    let prerender = Arc::new(
        Prerender::from_config(PrerenderConfig::new(HashMap::new()), &HandlerRegistry::new())
            .unwrap(),
    );

    assert!(HttpServer::new(config, prerender).is_err());
}
