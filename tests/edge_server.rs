//! End-to-end tests against real listeners.

use std::collections::BTreeMap;
use std::time::Duration;

use edge_server::config::RobotsOption;
use edge_server::proxy::PROXY_ERROR_PREFIX;
use edge_server::{EdgeServer, ServerConfig};
use reqwest::StatusCode;

mod common;

fn proxy_config(target: &str) -> ServerConfig {
    ServerConfig {
        proxy: Some(target.to_string()),
        api_prefix: Some("^/api/".to_string()),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn robots_answered_ahead_of_static_files() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("robots.txt"), "from disk").unwrap();

    let config = ServerConfig {
        root: Some(root.path().to_path_buf()),
        robots: Some(RobotsOption::Enabled(true)),
        ..ServerConfig::default()
    };
    let (addr, _server) = common::start_server(config).await;

    let res = common::client()
        .get(format!("http://{addr}/robots.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(res.text().await.unwrap(), "User-agent: *\nDisallow: /");
}

#[tokio::test]
async fn custom_robots_text_expands_newlines() {
    let config = ServerConfig {
        robots: Some(RobotsOption::Text("User-agent: *\\nAllow: /".into())),
        ..ServerConfig::default()
    };
    let (addr, _server) = common::start_server(config).await;

    let body = common::client()
        .get(format!("http://{addr}/robots.txt"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "User-agent: *\nAllow: /");
}

#[tokio::test]
async fn static_responses_carry_configured_and_cors_headers() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("app.js"), "console.log(1)").unwrap();

    let mut headers = BTreeMap::new();
    headers.insert("X-Frame-Options".to_string(), "DENY".to_string());
    let config = ServerConfig {
        root: Some(root.path().to_path_buf()),
        headers,
        cors: true,
        cors_headers: Some("X-Token".into()),
        ..ServerConfig::default()
    };
    let (addr, _server) = common::start_server(config).await;

    let res = common::client()
        .get(format!("http://{addr}/app.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert!(res.headers()["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .contains("X-Token"));
    assert_eq!(res.headers()["cache-control"], "max-age=3600");
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let config = ServerConfig {
        cors: true,
        ..ServerConfig::default()
    };
    let (addr, _server) = common::start_server(config).await;

    let res = common::client()
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/anything"))
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, HEAD, POST");
}

#[tokio::test]
async fn static_miss_falls_through_to_proxy() {
    let backend = common::start_echo_backend("base").await;
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("index.html"), "home").unwrap();

    let config = ServerConfig {
        root: Some(root.path().to_path_buf()),
        ..proxy_config(&format!("http://{backend}"))
    };
    let (addr, _server) = common::start_server(config).await;
    let client = common::client();

    let home = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(home.text().await.unwrap(), "home");

    let res = client
        .post(format!("http://{addr}/api/submit?x=1"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-backend"], "base");
    let echo = res.text().await.unwrap();
    assert!(echo.starts_with("POST /api/submit?x=1 HTTP/1.1"));
    assert!(echo.contains("payload"));
}

#[tokio::test]
async fn url_cookie_reroutes_api_paths_and_is_renamed() {
    let base = common::start_echo_backend("base").await;
    let other = common::start_echo_backend("other").await;
    let (addr, _server) = common::start_server(proxy_config(&format!("http://{base}"))).await;
    let client = common::client();
    let cookie = format!("session=1; proxy_api_url=http://{other}");

    let res = client
        .get(format!("http://{addr}/api/widgets"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-backend"], "other");
    let echo = res.text().await.unwrap().to_lowercase();
    assert!(echo.contains("proxy_api_temp_api_url="));
    assert!(!echo.contains("proxy_api_url="));
    assert!(echo.contains(&format!("host: {other}")));

    let res = client
        .get(format!("http://{addr}/static/app.js"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-backend"], "base");
}

#[tokio::test]
async fn hosts_cookie_pins_ip_and_preserves_host() {
    let other = common::start_echo_backend("pinned").await;
    let base = common::closed_port();
    let (addr, _server) = common::start_server(proxy_config(&format!("http://{base}"))).await;

    let cookie = format!(
        "proxy_api_url=http://backend.test:{}; proxy_api_hosts=127.0.0.1 backend.test",
        other.port()
    );
    let res = common::client()
        .get(format!("http://{addr}/api/ping"))
        .header("cookie", cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-backend"], "pinned");
    let echo = res.text().await.unwrap().to_lowercase();
    assert!(echo.contains("host: backend.test\r\n"));
}

#[tokio::test]
async fn proxied_responses_suppress_auth_challenge() {
    let backend = common::start_echo_backend("base").await;
    let mut headers = BTreeMap::new();
    headers.insert("X-Edge".to_string(), "1".to_string());
    let config = ServerConfig {
        headers,
        ..proxy_config(&format!("http://{backend}"))
    };
    let (addr, _server) = common::start_server(config).await;

    let res = common::client()
        .get(format!("http://{addr}/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["www-authenticate"], "None");
    assert_eq!(res.headers()["x-edge"], "1");
}

#[tokio::test]
async fn unreachable_upstream_reports_500() {
    let (addr, _server) =
        common::start_server(proxy_config(&format!("http://{}", common::closed_port()))).await;

    let res = common::client()
        .get(format!("http://{addr}/api/x"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.text().await.unwrap().starts_with(PROXY_ERROR_PREFIX));
}

#[tokio::test]
async fn websocket_upgrade_is_spliced_to_upstream() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let backend = common::start_upgrade_echo_backend().await;
    let (addr, _server) = common::start_server(proxy_config(&format!("http://{backend}"))).await;

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /socket HTTP/1.1\r\nHost: {addr}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        head.push(byte[0]);
    }
    let head = String::from_utf8(head).unwrap().to_lowercase();
    assert!(head.starts_with("http/1.1 101"));
    assert!(head.contains("www-authenticate: none"));

    stream.write_all(b"ping").await.unwrap();
    let mut echo = [0u8; 4];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut echo))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&echo, b"ping");
}

#[tokio::test]
async fn no_handler_means_404() {
    let (addr, _server) = common::start_server(ServerConfig::default()).await;
    let res = common::client()
        .get(format!("http://{addr}/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn close_stops_the_listener() {
    let server = std::sync::Arc::new(EdgeServer::create(ServerConfig::default()).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let running = server.clone();
    let task = tokio::spawn(async move { running.listen(listener).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    server.close();

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
