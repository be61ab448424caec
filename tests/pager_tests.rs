use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};

use dupweb::pager::{ClusterPager, FetchError};
use dupweb::transport::HttpTransport;

fn file_json(path: &str, size: u64) -> Value {
    json!({
        "abspath": path,
        "size": size,
        "_links": {"self": {"href": format!("/files{path}")}}
    })
}

fn cluster_json(hash: &str, paths: &[&str]) -> Value {
    let files: Vec<Value> = paths.iter().map(|path| file_json(path, 2048)).collect();
    json!({
        "hash": hash,
        "size": 2048,
        "_embedded": {"files": files}
    })
}

fn page_json(clusters: Vec<Value>, next: Option<&str>) -> Value {
    let mut page = json!({"_embedded": {"clusters": clusters}});
    if let Some(href) = next {
        page["_links"] = json!({"next": {"href": href}});
    }
    page
}

fn pager_for(server: &MockServer) -> ClusterPager {
    let transport = HttpTransport::new(&server.base_url(), Duration::from_secs(2))
        .expect("failed to build transport");
    ClusterPager::new(Arc::new(transport))
}

fn held_hashes(pager: &ClusterPager) -> Vec<String> {
    pager
        .clusters()
        .iter()
        .map(|cluster| {
            cluster
                .lock()
                .unwrap()
                .hash()
                .expect("cluster without hash")
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_pages_accumulate_over_http() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "1");
        then.status(200).json_body(page_json(
            vec![
                cluster_json("aaaa", &["/pics/a.jpg", "/backup/a.jpg"]),
                cluster_json("bbbb", &["/pics/b.jpg", "/backup/b.jpg"]),
            ],
            Some("/clusters/duplicates?page=2"),
        ));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "2");
        then.status(200).json_body(page_json(
            vec![cluster_json("cccc", &["/pics/c.jpg", "/backup/c.jpg"])],
            None,
        ));
    });

    let mut pager = pager_for(&server);
    assert!(pager.has_more_pages());

    let appended = pager.load_next_page().await.unwrap();
    assert_eq!(appended, 2);
    assert!(pager.has_more_pages());

    let appended = pager.load_next_page().await.unwrap();
    assert_eq!(appended, 1);
    assert!(!pager.has_more_pages());

    assert_eq!(held_hashes(&pager), ["aaaa", "bbbb", "cccc"]);
}

#[tokio::test]
async fn test_cursor_and_page_size_reach_the_server() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "1")
            .query_param("page_size", "5");
        then.status(200).json_body(page_json(vec![], None));
    });

    let transport = HttpTransport::new(&server.base_url(), Duration::from_secs(2)).unwrap();
    let mut pager = ClusterPager::with_page_size(Arc::new(transport), 5);
    pager.load_next_page().await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_fetching_past_the_end_is_free() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/clusters/duplicates");
        then.status(200).json_body(page_json(
            vec![cluster_json("aaaa", &["/pics/a.jpg", "/backup/a.jpg"])],
            None,
        ));
    });

    let mut pager = pager_for(&server);
    assert_eq!(pager.load_next_page().await.unwrap(), 1);

    // The server stopped advertising "next", so these never leave the client.
    assert_eq!(pager.load_next_page().await.unwrap(), 0);
    assert_eq!(pager.load_next_page().await.unwrap(), 0);
    assert_eq!(mock.hits(), 1);
    assert_eq!(pager.cluster_count(), 1);
}

#[tokio::test]
async fn test_failed_fetch_advances_the_cursor() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "1");
        then.status(500).body("boom");
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "2");
        then.status(200).json_body(page_json(
            vec![cluster_json("dddd", &["/pics/d.jpg", "/backup/d.jpg"])],
            None,
        ));
    });

    let mut pager = pager_for(&server);
    let err = pager.load_next_page().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
    assert_eq!(err.page(), 1);
    assert_eq!(pager.cluster_count(), 0);
    assert!(pager.has_more_pages());

    // The retry goes to page 2; page 1's clusters are lost, not re-requested.
    assert_eq!(pager.load_next_page().await.unwrap(), 1);
    assert_eq!(held_hashes(&pager), ["dddd"]);
}

#[tokio::test]
async fn test_unparseable_page_leaves_working_set_intact() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "1");
        then.status(200).json_body(page_json(
            vec![cluster_json("aaaa", &["/pics/a.jpg", "/backup/a.jpg"])],
            Some("/clusters/duplicates?page=2"),
        ));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "2");
        then.status(200).json_body(json!([1, 2, 3]));
    });

    let mut pager = pager_for(&server);
    pager.load_next_page().await.unwrap();

    let err = pager.load_next_page().await.unwrap_err();
    assert!(matches!(err, FetchError::Parse { .. }));
    assert_eq!(err.page(), 2);

    assert_eq!(held_hashes(&pager), ["aaaa"]);
    assert!(pager.has_more_pages());
    assert_eq!(pager.next_page(), 3);
}

#[tokio::test]
async fn test_empty_first_page_ends_the_stream() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/clusters/duplicates");
        then.status(200).json_body(json!({"_embedded": {"clusters": []}}));
    });

    let mut pager = pager_for(&server);
    assert_eq!(pager.load_next_page().await.unwrap(), 0);
    assert!(!pager.has_more_pages());
    assert!(pager.clusters().is_empty());
}

#[tokio::test]
async fn test_reset_refetches_from_the_first_page() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/clusters/duplicates")
            .query_param("page", "1");
        then.status(200).json_body(page_json(
            vec![cluster_json("aaaa", &["/pics/a.jpg", "/backup/a.jpg"])],
            None,
        ));
    });

    let mut pager = pager_for(&server);
    pager.load_next_page().await.unwrap();
    assert_eq!(pager.cluster_count(), 1);

    pager.reset();
    assert_eq!(pager.cluster_count(), 0);
    assert_eq!(pager.next_page(), 1);
    assert!(pager.has_more_pages());

    pager.load_next_page().await.unwrap();
    assert_eq!(mock.hits(), 2);
    assert_eq!(held_hashes(&pager), ["aaaa"]);
}
