use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use newsdex_core::persist::{open_index, save_index, save_meta, IndexPaths, MetaFile, FORMAT_VERSION};
use newsdex_core::{IndexBuilder, IndexConfig, JsonLoader, Searcher};
use parking_lot::RwLock;
use serde_json::Value;
use server::{router, AppState};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir.join("2015/03")).unwrap();
    fs::write(
        dir.join("2015/03/04.json"),
        r#"[
            {"title": "La bolsa cae", "date": "2015-03-04", "keywords": "economía, bolsa",
             "article": "El IBEX 35 cayó un 2% en una jornada marcada por la crisis griega."},
            {"title": "El Madrid gana", "date": "2015-03-04", "keywords": "fútbol",
             "article": "El Real Madrid ganó al Schalke en la Liga de Campeones."}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("2015/03/05.json"),
        r#"[{"title": "Grecia negocia", "date": "2015-03-05", "keywords": "economía, grecia",
             "article": "La crisis griega centra la reunión del Eurogrupo; la bolsa sube."}]"#,
    )
    .unwrap();
}

fn build_tiny_index(corpus: &Path, out: &Path) {
    let config = IndexConfig { multifield: true, positional: true, permuterm: true, ..Default::default() };
    let mut builder = IndexBuilder::new(config);
    builder.index_dir(corpus, &JsonLoader).unwrap();
    let index = builder.finish();
    let paths = IndexPaths::new(out);
    save_index(&paths, &index).unwrap();
    write_meta(out, index.news_count(), FORMAT_VERSION);
}

fn write_meta(out: &Path, num_news: u32, version: u32) {
    let meta = MetaFile { num_news, num_docs: 2, created_at: "2024-01-01T00:00:00Z".into(), version };
    save_meta(&IndexPaths::new(out), &meta).unwrap();
}

fn app_with_token(index_dir: &Path, token: Option<&str>) -> Router {
    let searcher = open_index(&IndexPaths::new(index_dir)).map(Searcher::new).unwrap();
    router(AppState {
        index_dir: index_dir.to_path_buf(),
        searcher: Arc::new(RwLock::new(Arc::new(searcher))),
        admin_token: token.map(str::to_string),
    })
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_matching_news() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("corpus"));
    build_tiny_index(&dir.path().join("corpus"), &dir.path().join("index"));
    let app = server::build_app(dir.path().join("index")).unwrap();

    let (status, json) = get(app.clone(), "/search?q=crisis+and+bolsa").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["news_id"], 2);
    assert_eq!(json["results"][0]["title"], "Grecia negocia");
    assert!(json["results"][0].get("snippet").is_none());

    let (_, json) = get(app.clone(), "/search?q=crisis+or+madrid&limit=1").await;
    assert_eq!(json["total_hits"], 3);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let (_, json) = get(app, "/search?q=%22real+madrid%22&snippet=true").await;
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["snippet"], "... el real madrid ganó al schalke en la liga ...");
}

#[tokio::test]
async fn bad_queries_are_client_errors() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("corpus"));
    build_tiny_index(&dir.path().join("corpus"), &dir.path().join("index"));
    let app = app_with_token(&dir.path().join("index"), None);

    let (status, json) = get(app.clone(), "/search?q=crisis+and+(bolsa").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "query_syntax_error");

    let (status, json) = get(app, "/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn news_and_stats_endpoints() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("corpus"));
    build_tiny_index(&dir.path().join("corpus"), &dir.path().join("index"));
    let app = app_with_token(&dir.path().join("index"), None);

    let (status, json) = get(app.clone(), "/news/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "El Madrid gana");

    let (status, json) = get(app.clone(), "/news/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "unknown_news");

    let (status, json) = get(app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["news"], 3);
    assert_eq!(json["days"], 2);
    assert_eq!(json["positional"], true);
}

#[tokio::test]
async fn reload_requires_the_admin_token() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    let index = dir.path().join("index");
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let app = app_with_token(&index, Some("secret"));

    let reload = |token: &str| Request::post("/index/reload").header("X-ADMIN-TOKEN", token).body(Body::empty()).unwrap();

    let (status, json) = call(app.clone(), reload("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");

    fs::write(
        corpus.join("2015/03/06.json"),
        r#"[{"title": "Más crisis", "date": "2015-03-06", "article": "La crisis continúa."}]"#,
    )
    .unwrap();
    build_tiny_index(&corpus, &index);

    let (_, json) = get(app.clone(), "/search?q=crisis").await;
    assert_eq!(json["total_hits"], 2);

    let (status, json) = call(app.clone(), reload("secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["news"], 4);

    let (_, json) = get(app, "/search?q=crisis").await;
    assert_eq!(json["total_hits"], 3);
}

#[tokio::test]
async fn health_is_plain_text() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("corpus"));
    build_tiny_index(&dir.path().join("corpus"), &dir.path().join("index"));
    let app = app_with_token(&dir.path().join("index"), None);

    let resp = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn stale_index_versions_ask_for_a_rebuild() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    let index = dir.path().join("index");
    write_corpus(&corpus);
    build_tiny_index(&corpus, &index);
    let app = app_with_token(&index, Some("secret"));

    write_meta(&index, 3, FORMAT_VERSION + 1);
    let Err(err) = server::build_app(index.clone()) else { panic!("a stale index must not be served") };
    assert!(format!("{err:#}").contains("rebuild it"));

    let req = Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "reload_failed");
    assert!(json["error"].as_str().unwrap().contains("rebuild it"));

    let (_, json) = get(app, "/search?q=crisis").await;
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn long_and_deeply_nested_queries_do_not_take_the_server_down() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("corpus"));
    build_tiny_index(&dir.path().join("corpus"), &dir.path().join("index"));
    let app = app_with_token(&dir.path().join("index"), None);

    let chain = format!("/search?q={}madrid", "crisis+or+".repeat(3_000));
    let (status, json) = get(app.clone(), &chain).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 3);

    let nested = format!("/search?q={}crisis", "not+".repeat(1_000));
    let (status, json) = get(app.clone(), &nested).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "query_syntax_error");

    let (_, json) = get(app, "/health").await;
    assert_eq!(json, Value::Null);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_searches_share_a_snapshot() {
    let dir = tempdir().unwrap();
    write_corpus(&dir.path().join("corpus"));
    build_tiny_index(&dir.path().join("corpus"), &dir.path().join("index"));
    let app = app_with_token(&dir.path().join("index"), None);

    let (a, b, c) = tokio::join!(
        get(app.clone(), "/search?q=crisis&all=true&snippet=true"),
        get(app.clone(), "/search?q=madrid"),
        get(app.clone(), "/news/2"),
    );
    assert_eq!(a.1["total_hits"], 2);
    assert_eq!(b.1["results"][0]["news_id"], 1);
    assert_eq!(c.1["title"], "Grecia negocia");
}
