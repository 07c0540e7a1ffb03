//! Edge renderer integration tests: routing, injection, fallbacks, assets.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures_util::future::join_all;
use radio_edge::EdgeRendererServer;
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn get(app: &Router, path: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

fn article(title: &str) -> serde_json::Value {
    json!({
        "title": title,
        "excerpt": "<p>La banda confirma <em>fechas</em> en todo el país.</p>",
        "published": "2025-03-01T10:00:00.000Z",
        "updated_at": "2025-03-02T08:30:00.000Z",
        "featured_image": { "url": "/uploads/gira.jpg" },
        "categoria": { "name": "Música" },
        "author": { "name": "Redacción" }
    })
}

#[tokio::test]
async fn test_article_gets_head_tags() {
    let cms = common::start_mock_cms(vec![("nueva-gira", article("Nueva gira 2025"))]).await;
    let dir = common::build_dir();
    let server = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url())).unwrap();
    let app = server.router();

    let (status, headers, body) = get(&app, "/noticias/nueva-gira").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "text/html; charset=utf-8");
    assert_eq!(headers["cache-control"], "no-cache");

    let head_end = body.find("</head>").unwrap();
    let og_title = body
        .find("<meta property=\"og:title\" content=\"Nueva gira 2025\">")
        .expect("og:title missing");
    assert!(og_title < head_end);
    assert!(body.contains("<title>Nueva gira 2025 | Toca Stereo</title>"));
    assert!(body.contains("<meta name=\"description\" content=\"La banda confirma fechas en todo el país.\">"));
    assert!(body.contains("<link rel=\"canonical\" href=\"https://tocastereo.com/noticias/nueva-gira\">"));
    assert!(body.contains(&format!(
        "<meta property=\"og:image\" content=\"http://{}/uploads/gira.jpg\">",
        cms.addr
    )));
    assert!(body.contains("<meta property=\"article:published_time\" content=\"2025-03-01T10:00:00.000Z\">"));
    assert!(body.contains("<meta property=\"article:modified_time\" content=\"2025-03-02T08:30:00.000Z\">"));
    assert!(body.contains("<meta property=\"article:section\" content=\"Música\">"));
    assert!(body.contains("<meta property=\"article:author\" content=\"Redacción\">"));
    assert!(body.contains("<meta name=\"twitter:card\" content=\"summary_large_image\">"));
    assert_eq!(body.matches("application/ld+json").count(), 1);
    assert!(body.ends_with("</body></html>"));
    assert_eq!(cms.hits(), 1);

    // Trailing slash is the same article.
    let (_, _, again) = get(&app, "/noticias/nueva-gira/").await;
    assert_eq!(again, body);
}

#[tokio::test]
async fn test_hostile_title_is_escaped() {
    let cms = common::start_mock_cms(vec![(
        "xss",
        json!({ "title": "<script>alert(1)</script>", "excerpt": "\"><img src=x onerror=alert(2)>" }),
    )])
    .await;
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url()))
        .unwrap()
        .router();

    let (status, _, body) = get(&app, "/noticias/xss").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("<script>alert(1)</script>"));
    assert!(!body.contains("onerror=alert(2)>"));
    assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    let ld_start = body.find("application/ld+json").unwrap();
    assert!(!body[ld_start..body.find("</head>").unwrap()].contains("<script>alert"));
}

#[tokio::test]
async fn test_excerpt_entities_are_decoded_then_escaped_once() {
    let cms = common::start_mock_cms(vec![(
        "cancion",
        json!({ "title": "Canción", "excerpt": "<p>Canci&oacute;n &amp; m&aacute;s&nbsp;hoy</p>" }),
    )])
    .await;
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url()))
        .unwrap()
        .router();

    let (status, _, body) = get(&app, "/noticias/cancion").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<meta name=\"description\" content=\"Canción &amp; más hoy\">"));
    assert!(body.contains("<meta property=\"og:description\" content=\"Canción &amp; más hoy\">"));
    assert!(!body.contains("&amp;oacute;"));
    assert!(!body.contains("&amp;nbsp;"));
}

#[tokio::test]
async fn test_unknown_article_serves_template() {
    let cms = common::start_mock_cms(vec![("nueva-gira", article("Nueva gira"))]).await;
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url()))
        .unwrap()
        .router();

    let (status, _, body) = get(&app, "/noticias/does-not-exist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, common::TEMPLATE);
    assert!(!body.contains("article:"));
    assert_eq!(cms.hits(), 1);
}

#[tokio::test]
async fn test_non_article_paths_skip_metadata() {
    let cms = common::start_mock_cms(vec![]).await;
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url()))
        .unwrap()
        .router();

    for path in ["/", "/programas", "/noticias", "/noticias/a/b", "/en-vivo/player"] {
        let (status, headers, body) = get(&app, path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(headers["cache-control"], "no-cache", "{path}");
        assert_eq!(body, common::TEMPLATE, "{path}");
    }
    assert_eq!(cms.hits(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let slugs: Vec<&'static str> = (0..16)
        .map(|i| -> &'static str { Box::leak(format!("nota-{i}").into_boxed_str()) })
        .collect();
    let cms = common::start_mock_cms(
        slugs
            .iter()
            .map(|slug| (*slug, json!({ "title": format!("Titulo {slug}") })))
            .collect(),
    )
    .await;
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url()))
        .unwrap()
        .router();

    let bodies = join_all(slugs.iter().map(|slug| {
        let app = app.clone();
        async move { get(&app, &format!("/noticias/{slug}")).await.2 }
    }))
    .await;

    for (slug, body) in slugs.iter().zip(&bodies) {
        assert!(body.contains(&format!("<title>Titulo {slug} | Toca Stereo</title>")));
        assert_eq!(body.matches("<meta property=\"og:title\"").count(), 1);
        assert_eq!(body.matches("application/ld+json").count(), 1);
    }
}

#[tokio::test]
async fn test_content_api_down_serves_template() {
    let dir = common::build_dir();
    let down = common::closed_port().await;
    let app = EdgeRendererServer::new(common::edge_config(&dir, format!("http://{down}/api")))
        .unwrap()
        .router();

    let (status, _, body) = get(&app, "/noticias/nueva-gira").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, common::TEMPLATE);
}

#[tokio::test]
async fn test_slow_content_api_is_bounded() {
    let dir = common::build_dir();
    let silent = common::start_silent_backend().await;
    let mut config = common::edge_config(&dir, format!("http://{silent}/api"));
    config.metadata_timeout_ms = 200;
    let app = EdgeRendererServer::new(config).unwrap().router();

    let started = Instant::now();
    let (status, _, body) = get(&app, "/noticias/nueva-gira").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, common::TEMPLATE);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_template_read_failure_is_500() {
    let dir = common::build_dir();
    let mut config = common::edge_config(&dir, "http://127.0.0.1:9/api".into());
    config.cache_template = false;
    let app = EdgeRendererServer::new(config).unwrap().router();

    let (status, _, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, common::TEMPLATE);

    std::fs::remove_file(dir.path().join("index.html")).unwrap();
    let (status, headers, body) = get(&app, "/programas").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/plain"));
    assert_eq!(body, "Internal Server Error");

    // The process keeps serving once the file is back.
    std::fs::write(dir.path().join("index.html"), common::TEMPLATE).unwrap();
    let (status, _, _) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cached_template_requires_file_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::edge_config(&dir, "http://127.0.0.1:9/api".into());
    assert!(EdgeRendererServer::new(config).is_err());
}

#[tokio::test]
async fn test_gzip_when_accepted() {
    let cms = common::start_mock_cms(vec![("nueva-gira", article("Nueva gira"))]).await;
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url()))
        .unwrap()
        .router();

    let response = app
        .clone()
        .oneshot(
            Request::get("/noticias/nueva-gira")
                .header("accept-encoding", "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-encoding"], "gzip");

    let (_, headers, _) = get(&app, "/noticias/nueva-gira").await;
    assert!(headers.get("content-encoding").is_none());
}

#[tokio::test]
async fn test_static_assets_and_cache_headers() {
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, "http://127.0.0.1:9/api".into()))
        .unwrap()
        .router();

    let (status, headers, body) = get(&app, "/static/js/main.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "console.log('toca');");
    assert_eq!(headers["cache-control"], "public, max-age=31536000, immutable");

    let (status, headers, body) = get(&app, "/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "User-agent: *\n");
    assert_eq!(headers["cache-control"], "public, max-age=3600");

    let (status, headers, body) = get(&app, "/static/js/missing.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(body, common::TEMPLATE);

    let (status, _, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_metadata_cache_ttl() {
    let cms = common::start_mock_cms(vec![("nueva-gira", article("Nueva gira"))]).await;
    let dir = common::build_dir();

    let mut config = common::edge_config(&dir, cms.api_url());
    config.metadata_cache_ttl_secs = 60;
    let app = EdgeRendererServer::new(config).unwrap().router();
    let (_, _, first) = get(&app, "/noticias/nueva-gira").await;
    let (_, _, second) = get(&app, "/noticias/nueva-gira").await;
    assert_eq!(first, second);
    assert_eq!(cms.hits(), 1);

    // Misses are never cached.
    get(&app, "/noticias/otra").await;
    get(&app, "/noticias/otra").await;
    assert_eq!(cms.hits(), 3);
}

#[tokio::test]
async fn test_metadata_cache_disabled_by_default() {
    let cms = common::start_mock_cms(vec![("nueva-gira", article("Nueva gira"))]).await;
    let dir = common::build_dir();
    let app = EdgeRendererServer::new(common::edge_config(&dir, cms.api_url()))
        .unwrap()
        .router();

    get(&app, "/noticias/nueva-gira").await;
    get(&app, "/noticias/nueva-gira").await;
    assert_eq!(cms.hits(), 2);
}
