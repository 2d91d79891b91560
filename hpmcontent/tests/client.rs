//! Integration tests for hpmcontent::ContentClient

use hpmcontent::{ContentClient, Error};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ContentClient {
    ContentClient::builder()
        .base_url(server.uri())
        .build()
        .unwrap()
}

fn mock_streams_json() -> serde_json::Value {
    json!({
        "audio": [
            {
                "id": 0,
                "name": "News 88.7",
                "type": "audio",
                "artwork": "https://cdn.houstonpublicmedia.org/assets/images/ListenLive_News.png.webp",
                "aacSource": "https://stream.houstonpublicmedia.org/news-aac",
                "hlsSource": "https://hls.houstonpublicmedia.org/hpmnews/playlist.m3u8",
                "mp3Source": "https://stream.houstonpublicmedia.org/news-mp3"
            },
            {
                "id": 1,
                "name": "Classical",
                "type": "audio",
                "artwork": "",
                "aacSource": "https://stream.houstonpublicmedia.org/classical-aac",
                "hlsSource": "",
                "mp3Source": ""
            }
        ]
    })
}

#[tokio::test]
async fn test_streams() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/assets/streams.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_streams_json()))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let streams = client.streams().await.unwrap();

    assert_eq!(streams.audio.len(), 2);
    assert_eq!(streams.audio[0].name, "News 88.7");
    assert_eq!(streams.audio[1].hls_source(), None);
    assert_eq!(streams.audio[1].artwork(), None);
}

#[tokio::test]
async fn test_now_playing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/assets/nowplay/all.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "radio": [
                {"id": 0, "name": "News 88.7", "artist": "Houston Public Media News", "title": "Houston Matters", "album": ""},
                {"id": 1, "name": "Classical", "artist": "Gustav Mahler", "title": "Symphony No. 5", "album": "Live at Jones Hall"}
            ],
            "tv": []
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let now = client.now_playing().await.unwrap();

    assert_eq!(now.radio_station(0).unwrap().display_line(), "Houston Matters");
    assert_eq!(
        now.radio_station(1).unwrap().display_line(),
        "Gustav Mahler - Symphony No. 5"
    );
    assert!(now.radio_station(9).is_none());
}

#[tokio::test]
async fn test_podcasts_and_episodes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/hpm-podcast/v1/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "rest_api_success",
            "message": "Podcast list",
            "data": {
                "list": [{
                    "id": 58,
                    "name": "Houston Matters",
                    "slug": "houston-matters",
                    "description": "Daily talk",
                    "feed": "https://example.org/feed",
                    "archive": "https://example.org/archive",
                    "feed_json": format!("{}/podcasts/houston-matters/feed.json", mock_server.uri()),
                    "image": {
                        "full": {"url": "https://img/full.jpg", "width": 1400, "height": 1400},
                        "medium": {"url": "https://img/medium.jpg", "width": 600, "height": 600},
                        "thumbnail": {"url": "https://img/thumb.jpg", "width": 150, "height": 150}
                    },
                    "external_links": {"itunes": "https://itunes", "npr": ""}
                }]
            }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/podcasts/houston-matters/feed.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "rest_api_success",
            "message": "Feed",
            "data": {
                "feed": {
                    "items": [{
                        "id": 501,
                        "title": "Episode one",
                        "permalink": "https://example.org/ep1",
                        "content_html": "<p>Hi</p>",
                        "excerpt": "Hi",
                        "date": "2024-05-01T07:00:00",
                        "date_gmt": "2024-05-01T12:00:00",
                        "author": "Staff",
                        "thumbnail": "https://img/ep1.jpg",
                        "season": "1",
                        "episode": "1",
                        "episodeType": "full",
                        "attachments": {"url": "https://audio/ep1.mp3", "duration_in_seconds": "2931"}
                    }]
                }
            }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let podcasts = client.podcasts().await.unwrap();
    assert_eq!(podcasts.list.len(), 1);
    let podcast = &podcasts.list[0];
    assert_eq!(podcast.artwork(), Some("https://img/medium.jpg"));
    assert_eq!(podcast.external_links.itunes.as_deref(), Some("https://itunes"));

    let detail = client.podcast_episodes(podcast).await.unwrap();
    let episode = &detail.feed.items[0];
    assert_eq!(episode.episode_type, "full");
    assert_eq!(episode.attachments.duration_in_seconds, "2931");
    assert!(episode.published_at().is_some());
}

#[tokio::test]
async fn test_category_articles_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts/"))
        .and(query_param("categories", "2113"))
        .and(query_param("per_page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 9001,
                "status": "publish",
                "date": "2024-05-01T07:00:00",
                "date_gmt": "2024-05-01T12:00:00",
                "modified_gmt": "2024-05-01T12:05:00",
                "link": "https://www.houstonpublicmedia.org/articles/news/9001",
                "title": {"rendered": "Flooding update"},
                "excerpt": {"rendered": "<p>Roads closed</p>"},
                "featured_media_url": "https://img/9001.jpg"
            }
        ])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let articles = client.category_articles(2113, 5).await.unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title.rendered, "Flooding update");
}

#[tokio::test]
async fn test_priority_and_promos() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/assets/promos-test.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "ok",
            "message": "",
            "data": {
                "articles": [{
                    "id": 1,
                    "title": "Top story",
                    "excerpt": "",
                    "picture": "",
                    "permalink": "https://example.org/1",
                    "date": "2024-05-01T07:00:00",
                    "date_gmt": "2024-05-01T12:00:00",
                    "primary_category": {"id": 2113, "name": "Local News", "slug": "local-news"}
                }],
                "breaking": {"id": 3, "title": "Storm warning", "type": "breaking", "link": "https://example.org/3"},
                "talkshow": "houston-matters",
                "weather": {"icon": "sun", "description": "Sunny", "temperature": "91"}
            }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/hpm-promos/v1/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "ok",
            "message": "",
            "data": {"promos": [{"type": "lightbox", "location": "homepage", "content": "<div/>"}]}
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let priority = client.priority_data().await.unwrap();
    assert_eq!(priority.category_ids(), vec![2113]);
    assert_eq!(priority.breaking.unwrap().kind, "breaking");

    let promos = client.promos().await.unwrap();
    assert_eq!(promos.promos[0].location, "homepage");
}

#[tokio::test]
async fn test_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/assets/streams.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.streams().await.unwrap_err();
    assert!(matches!(err, Error::ApiError(_)));
}

#[tokio::test]
async fn test_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/assets/nowplay/all.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.now_playing().await.unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

// ============================================================================
// Live tests (require network access)
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_live_streams() {
    let client = ContentClient::new().unwrap();
    let streams = client.streams().await.unwrap();
    assert!(!streams.audio.is_empty());
}
