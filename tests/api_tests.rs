mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Request, StatusCode,
    },
};
use axum_test::TestServer;
use bson::oid::ObjectId;
use chrono::{SubsecRound, Utc};
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{bearer, create_test_server, register, test_state};
use reelhouse_api::{db::CommentRepository, models::Comment, routes::create_router};

fn auth(token: &str) -> HeaderValue {
    HeaderValue::from_str(&bearer(token)).unwrap()
}

async fn rate(server: &TestServer, token: &str, tmdb_id: u64, rating: i64) -> axum_test::TestResponse {
    server
        .put(&format!("/api/me/ratings/{}", tmdb_id))
        .add_header(AUTHORIZATION, auth(token))
        .json(&json!({ "rating": rating }))
        .await
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let incoming = "6f1c1c8e-3d9a-4f6b-9a57-0d6b2f1e4c11";
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(incoming),
        )
        .await;
    assert_eq!(response.header("x-request-id"), incoming);

    let generated = server.get("/health").await;
    let id = generated.header("x-request-id");
    assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_non_uuid_request_id_is_replaced() {
    let server = create_test_server();
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("not-a-uuid"),
        )
        .await;

    let id = response.header("x-request-id");
    assert_ne!(id, "not-a-uuid");
    assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = create_test_server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "trinity",
            "email": "Trinity@Example.com",
            "password": "hunter22"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let registered: Value = response.json();
    assert_eq!(registered["user"]["email"], "trinity@example.com");
    assert!(registered["user"].get("password_hash").is_none());

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "trinity@example.com", "password": "hunter22" }))
        .await;
    response.assert_status_ok();
    let login: Value = response.json();
    let token = login["token"].as_str().unwrap();

    let response = server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, auth(token))
        .await;
    response.assert_status_ok();
    let me: Value = response.json();
    assert_eq!(me["username"], "trinity");
    assert_eq!(me["id"], registered["user"]["id"]);
}

#[tokio::test]
async fn test_register_conflicts_and_validation() {
    let server = create_test_server();
    register(&server, "trinity").await;

    let duplicate = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "trinity",
            "email": "other@example.com",
            "password": "hunter22"
        }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);

    let short_password = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "morpheus",
            "email": "morpheus@example.com",
            "password": "123"
        }))
        .await;
    short_password.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = short_password.json();
    assert!(body["error"].as_str().unwrap().contains("Password"));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let server = create_test_server();
    register(&server, "trinity").await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "trinity@example.com", "password": "wrong-one" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = create_test_server();

    server.get("/api/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);
    server.get("/api/me/ratings").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/api/movies/603/comments")
        .json(&json!({ "body": "hi" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_movie_routes() {
    let server = create_test_server();

    let list = server.get("/api/movies/lists/popular").await;
    list.assert_status_ok();
    let page: Value = list.json();
    assert_eq!(page["results"].as_array().unwrap().len(), 3);

    server
        .get("/api/movies/lists/latest")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let search = server
        .get("/api/movies/search")
        .add_query_param("q", "matrix")
        .await;
    search.assert_status_ok();
    let page: Value = search.json();
    assert_eq!(page["total_results"], 2);

    let details = server.get("/api/movies/603").await;
    details.assert_status_ok();
    let movie: Value = details.json();
    assert_eq!(movie["title"], "The Matrix");
    assert_eq!(movie["genres"][0]["name"], "Action");

    server.get("/api/movies/1").await.assert_status(StatusCode::NOT_FOUND);

    let discover = server
        .get("/api/movies/discover")
        .add_query_param("genre", 28)
        .await;
    let page: Value = discover.json();
    assert_eq!(page["results"].as_array().unwrap().len(), 2);

    let similar = server.get("/api/movies/603/similar").await;
    let page: Value = similar.json();
    assert!(page["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|m| m["id"] != 603));

    let genres: Value = server.get("/api/movies/genres").await.json();
    assert_eq!(genres.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rating_flow() {
    let server = create_test_server();
    let token = register(&server, "neo").await;

    rate(&server, &token, 603, 8).await.assert_status_ok();
    rate(&server, &token, 603, 10).await.assert_status_ok();
    rate(&server, &token, 603, 11)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    rate(&server, &token, 1, 5)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let ratings: Value = server
        .get("/api/me/ratings")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .json();
    let ratings = ratings.as_array().unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["rating"], 10);
    assert_eq!(ratings[0]["movie"]["title"], "The Matrix");

    let state: Value = server
        .get("/api/me/movies/603")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .json();
    assert_eq!(state["rating"], 10);
    assert_eq!(state["favorite"], false);

    server
        .delete("/api/me/ratings/603")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete("/api/me/ratings/603")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorites_and_watchlist() {
    let server = create_test_server();
    let token = register(&server, "neo").await;

    let first = server
        .put("/api/me/favorites/603")
        .add_header(AUTHORIZATION, auth(&token))
        .await;
    first.assert_status(StatusCode::CREATED);

    let again = server
        .put("/api/me/favorites/603")
        .add_header(AUTHORIZATION, auth(&token))
        .await;
    again.assert_status_ok();
    let change: Value = again.json();
    assert_eq!(change["added"], false);

    server
        .put("/api/me/watchlist/27205")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .assert_status(StatusCode::CREATED);

    server
        .put("/api/me/seen/603")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let favorites: Value = server
        .get("/api/me/favorites")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .json();
    assert_eq!(favorites.as_array().unwrap().len(), 1);
    assert_eq!(favorites[0]["movie"]["title"], "The Matrix");

    server
        .delete("/api/me/watchlist/27205")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let watchlist: Value = server
        .get("/api/me/watchlist")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .json();
    assert!(watchlist.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_comments_post_list_delete() {
    let server = create_test_server();
    let author = register(&server, "neo").await;
    let stranger = register(&server, "smith").await;

    let response = server
        .post("/api/movies/603/comments")
        .add_header(AUTHORIZATION, auth(&author))
        .json(&json!({ "body": "  There is no spoon  " }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let comment: Value = response.json();
    assert_eq!(comment["body"], "There is no spoon");
    assert_eq!(comment["username"], "neo");
    let comment_id = comment["id"].as_str().unwrap().to_string();

    server
        .post("/api/movies/603/comments")
        .add_header(AUTHORIZATION, auth(&author))
        .json(&json!({ "body": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let listing: Value = server.get("/api/movies/603/comments").await.json();
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["items"][0]["id"], comment_id.as_str());

    server
        .delete(&format!("/api/comments/{}", comment_id))
        .add_header(AUTHORIZATION, auth(&stranger))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .delete(&format!("/api/comments/{}", comment_id))
        .add_header(AUTHORIZATION, auth(&author))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .delete(&format!("/api/comments/{}", comment_id))
        .add_header(AUTHORIZATION, auth(&author))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .delete("/api/comments/not-an-id")
        .add_header(AUTHORIZATION, auth(&author))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feed_pages_newest_first() {
    let server = create_test_server();
    let token = register(&server, "neo").await;

    for (tmdb_id, body) in [(603, "first"), (27205, "second"), (604, "third")] {
        server
            .post(&format!("/api/movies/{}/comments", tmdb_id))
            .add_header(AUTHORIZATION, auth(&token))
            .json(&json!({ "body": body }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server.get("/api/feed").add_query_param("limit", 2).await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["items"][0]["body"], "third");
    assert_eq!(page["items"][0]["movie"]["title"], "The Matrix Reloaded");
    assert_eq!(page["items"][1]["body"], "second");

    let before = page["next_before"].as_str().unwrap().to_string();
    let next: Value = server
        .get("/api/feed")
        .add_query_param("before", &before)
        .await
        .json();
    assert_eq!(next["items"].as_array().unwrap().len(), 1);
    assert_eq!(next["items"][0]["body"], "first");
    assert!(next["next_before"].is_null());

    server
        .get("/api/feed")
        .add_query_param("before", "last tuesday")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feed_pages_through_same_millisecond_comments() {
    let state = test_state();
    let created_at = Utc::now().trunc_subsecs(3);
    for body in ["a", "b", "c"] {
        let mut comment = Comment::new(603, ObjectId::new(), "neo".into(), body.into());
        comment.created_at = created_at;
        state.comments.insert(&comment).await.unwrap();
    }
    let server = TestServer::new(create_router(state)).unwrap();

    let mut seen = Vec::new();
    let mut before: Option<String> = None;
    for _ in 0..10 {
        let mut request = server.get("/api/feed").add_query_param("limit", 1);
        if let Some(before) = &before {
            request = request.add_query_param("before", before);
        }
        let page: Value = request.await.json();
        for item in page["items"].as_array().unwrap() {
            seen.push(item["body"].as_str().unwrap().to_string());
        }
        match page["next_before"].as_str() {
            Some(next) => before = Some(next.to_string()),
            None => break,
        }
    }

    assert_eq!(seen, ["c", "b", "a"]);
}

#[tokio::test]
async fn test_feed_stream_delivers_new_comments() {
    let state = test_state();
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/feed/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");

    let comment = Comment::new(603, ObjectId::new(), "neo".into(), "There is no spoon".into());
    state.comments.insert(&comment).await.unwrap();

    let mut body = response.into_body().into_data_stream();
    let mut text = String::new();
    let read = async {
        while let Some(chunk) = body.next().await {
            text.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
            if text.contains("data:") && text.ends_with("\n\n") {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), read).await.unwrap();

    let field = |name: &str| {
        text.lines()
            .find_map(|line| line.strip_prefix(name))
            .map(|value| value.trim().to_string())
            .unwrap()
    };
    assert_eq!(field("event:"), "comment");
    assert_eq!(field("id:"), comment.id.to_hex());

    let data: Value = serde_json::from_str(&field("data:")).unwrap();
    assert_eq!(data["body"], "There is no spoon");
    assert_eq!(data["username"], "neo");
    assert_eq!(data["movie"]["title"], "The Matrix");
}

#[tokio::test]
async fn test_public_profile() {
    let server = create_test_server();
    let token = register(&server, "neo").await;

    rate(&server, &token, 603, 9).await.assert_status_ok();
    rate(&server, &token, 604, 6).await.assert_status_ok();
    rate(&server, &token, 27205, 10).await.assert_status_ok();
    server
        .put("/api/me/favorites/27205")
        .add_header(AUTHORIZATION, auth(&token))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .get("/api/users/neo/profile")
        .add_query_param("sort", "highest")
        .add_query_param("min_rating", 7)
        .await;
    response.assert_status_ok();
    let profile: Value = response.json();

    assert_eq!(profile["user"]["username"], "neo");
    assert!(profile["user"].get("email").is_none());
    assert_eq!(profile["counts"]["ratings"], 3);
    assert_eq!(profile["counts"]["favorites"], 1);
    assert_eq!(profile["stats"]["average_rating"], 8.3);
    assert_eq!(profile["stats"]["top_genres"][0]["name"], "Science Fiction");
    assert_eq!(profile["stats"]["top_genres"][0]["count"], 3);

    let items = profile["ratings"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["tmdb_id"], 27205);
    assert_eq!(items[1]["tmdb_id"], 603);

    server
        .get("/api/users/ghost/profile")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_return_json_errors() {
    let server = create_test_server();
    let token = register(&server, "neo").await;

    let fractional = server
        .put("/api/me/ratings/603")
        .add_header(AUTHORIZATION, auth(&token))
        .json(&json!({ "rating": 7.5 }))
        .await;
    fractional.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = fractional.json();
    assert!(body["error"].is_string());

    let bad_id = server.get("/api/movies/abc").await;
    bad_id.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = bad_id.json();
    assert!(body["error"].as_str().unwrap().contains("abc"));

    let missing_query = server.get("/api/movies/search").await;
    missing_query.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = missing_query.json();
    assert!(body["error"].as_str().unwrap().contains("q"));

    let bad_sort = server
        .get("/api/users/neo/profile")
        .add_query_param("sort", "loudest")
        .await;
    bad_sort.assert_status(StatusCode::BAD_REQUEST);
    assert!(bad_sort.json::<Value>()["error"].is_string());
}
