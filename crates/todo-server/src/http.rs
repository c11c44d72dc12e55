//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use todo_core::{parse_tags_body, NewTodo, Todo, TodoId, TodoPatch};

use crate::error::ApiResult;
use crate::AppState;

/// A todo as returned to clients, with its derived resource URL
#[derive(Debug, Serialize)]
pub struct TodoView {
    #[serde(flatten)]
    pub todo: Todo,
    pub url: String,
}

/// Tag listing of a single todo
#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// Response for the health endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub persistent: bool,
}

/// Base URL for todo links: the request's `Host`, else the configured base
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|host| format!("http://{}", host))
        .unwrap_or_else(|| state.server.fallback_base_url())
}

fn view(todo: Todo, base: &str) -> TodoView {
    let url = todo.url(base);
    TodoView { todo, url }
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    let Json(value) = payload?;
    Ok(value)
}

// ============================================================================
// Todo Endpoints
// ============================================================================

/// List all todos
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<Vec<TodoView>> {
    let base = base_url(&state, &headers);
    let todos = state.repository.list().await;
    Json(todos.into_iter().map(|t| view(t, &base)).collect())
}

/// Create a todo and redirect to it
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Redirect> {
    let new_todo = NewTodo::from_value(body(payload)?)?;
    let todo = state.repository.add(new_todo).await?;
    let url = todo.url(&base_url(&state, &headers));
    tracing::info!("Created todo {}", todo.id);
    Ok(Redirect::to(&url))
}

/// Get a single todo
pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<TodoView>> {
    let todo = state.repository.get(&TodoId::parse(&id)).await?;
    Ok(Json(view(todo, &base_url(&state, &headers))))
}

/// Merge fields into a todo
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<TodoView>> {
    let patch = TodoPatch::from_value(body(payload)?)?;
    let todo = state.repository.update(&TodoId::parse(&id), patch).await?;
    Ok(Json(view(todo, &base_url(&state, &headers))))
}

/// Delete a todo
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.repository.remove(&TodoId::parse(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete all todos
pub async fn clear_todos(State(state): State<Arc<AppState>>) -> StatusCode {
    state.repository.clear().await;
    StatusCode::NO_CONTENT
}

// ============================================================================
// Tag Endpoints
// ============================================================================

/// List the tags of a todo
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TagsResponse>> {
    let tags = state.repository.list_tags(&TodoId::parse(&id)).await?;
    Ok(Json(TagsResponse { tags }))
}

/// Add one tag (`{"tag": "work"}`) to a todo
pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let value = body(payload)?;
    state
        .repository
        .add_tag_value(&TodoId::parse(&id), value.get("tag"))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the tag set of a todo (`{"tags": [...]}` or a bare array)
pub async fn update_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<TagsResponse>> {
    let value = body(payload)?;
    let tags = parse_tags_body(&value)?;
    let tags = state
        .repository
        .replace_tags(&TodoId::parse(&id), tags)
        .await?;
    Ok(Json(TagsResponse { tags }))
}

/// Remove every tag from one todo (the todo is kept)
pub async fn clear_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .repository
        .clear_tags_for_todo(&TodoId::parse(&id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a single tag from a todo
pub async fn remove_tag(
    State(state): State<Arc<AppState>>,
    Path((id, tag)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .repository
        .remove_tag(&TodoId::parse(&id), &tag)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove tags from every todo
pub async fn clear_all_tags(State(state): State<Arc<AppState>>) -> StatusCode {
    state.repository.clear_all_tags().await;
    StatusCode::NO_CONTENT
}

/// Todos carrying a tag
pub async fn todos_by_tag(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(tag): Path<String>,
) -> Json<Vec<TodoView>> {
    let base = base_url(&state, &headers);
    let todos = state.repository.todos_by_tag(&tag).await;
    Json(todos.into_iter().map(|t| view(t, &base)).collect())
}

// ============================================================================
// System Endpoints
// ============================================================================

/// Liveness and storage mode
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        persistent: state.repository.is_persistent(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use axum::Router;
    use serde_json::json;
    use todo_core::{ServerConfig, TodoRepository};
    use tower::ServiceExt;

    use crate::create_router;

    fn app() -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(
            TodoRepository::in_memory(),
            ServerConfig::default(),
        ));
        (create_router(state.clone()), state)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "todo.test");
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    #[tokio::test]
    async fn test_create_redirects_to_new_todo() {
        let (app, _) = app();
        let (status, headers, _) =
            send(&app, Method::POST, "/todos", Some(json!({"title": "build an API"}))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "http://todo.test/todos/0");

        let (status, _, todo) = send(&app, Method::GET, "/todos/0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(todo["id"], json!(0));
        assert_eq!(todo["title"], json!("build an API"));
        assert_eq!(todo["completed"], json!(false));
        assert_eq!(todo["tags"], json!([]));
        assert_eq!(todo["url"], json!("http://todo.test/todos/0"));
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let (app, state) = app();
        let (status, _, body) = send(&app, Method::POST, "/todos", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("\"title\" is a required field"));

        let (status, _, _) = send(&app, Method::POST, "/todos", Some(json!({"title": 3}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(&app, Method::POST, "/todos", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(state.repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_update_delete() {
        let (app, _) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a"}))).await;
        send(&app, Method::POST, "/todos", Some(json!({"title": "b", "order": 2}))).await;

        let (status, _, list) = send(&app, Method::GET, "/todos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 2);
        assert_eq!(list[1]["order"], json!(2));

        let (status, _, todo) =
            send(&app, Method::PATCH, "/todos/0", Some(json!({"completed": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(todo["completed"], json!(true));
        assert_eq!(todo["title"], json!("a"));

        let (status, _, _) = send(&app, Method::DELETE, "/todos/0", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, body) = send(&app, Method::GET, "/todos/0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Todo not found"));

        let (status, _, _) = send(&app, Method::DELETE, "/todos/0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) =
            send(&app, Method::PATCH, "/todos/0", Some(json!({"completed": true}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_order_is_echoed_unchanged() {
        let (app, _) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a", "order": 2}))).await;
        send(&app, Method::POST, "/todos", Some(json!({"title": "b", "order": 2.5}))).await;

        let (_, _, todo) = send(&app, Method::GET, "/todos/0", None).await;
        assert_eq!(todo["order"].to_string(), "2");
        let (_, _, todo) = send(&app, Method::GET, "/todos/1", None).await;
        assert_eq!(todo["order"].to_string(), "2.5");

        let (_, _, todo) =
            send(&app, Method::PATCH, "/todos/0", Some(json!({"order": -7}))).await;
        assert_eq!(todo["order"].to_string(), "-7");
        let (_, _, todo) =
            send(&app, Method::PATCH, "/todos/0", Some(json!({"order": null}))).await;
        assert!(todo.get("order").is_none());
    }

    #[tokio::test]
    async fn test_clear_todos() {
        let (app, state) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a"}))).await;
        let (status, _, _) = send(&app, Method::DELETE, "/todos", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_tag_lifecycle() {
        let (app, _) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "build an API"}))).await;

        let (status, _, _) =
            send(&app, Method::POST, "/todos/0/tags", Some(json!({"tag": "work"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) =
            send(&app, Method::POST, "/todos/0/tags", Some(json!({"tag": "work"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, _, tags) = send(&app, Method::GET, "/todos/0/tags", None).await;
        assert_eq!(tags, json!({"tags": ["work"]}));

        let (status, _, todos) = send(&app, Method::GET, "/tags/work/todos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(todos.as_array().unwrap().len(), 1);
        assert_eq!(todos[0]["id"], json!(0));

        let (status, _, _) = send(&app, Method::DELETE, "/todos/0/tags/work", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, _, tags) = send(&app, Method::GET, "/todos/0/tags", None).await;
        assert_eq!(tags, json!({"tags": []}));

        let (_, _, todos) = send(&app, Method::GET, "/tags/work/todos", None).await;
        assert_eq!(todos, json!([]));
    }

    #[tokio::test]
    async fn test_add_tag_validation_and_not_found() {
        let (app, _) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a"}))).await;

        for bad in [json!({}), json!({"tag": ""}), json!({"tag": 5})] {
            let (status, _, _) = send(&app, Method::POST, "/todos/0/tags", Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        let (_, _, tags) = send(&app, Method::GET, "/todos/0/tags", None).await;
        assert_eq!(tags, json!({"tags": []}));

        for body in [json!({"tag": "x"}), json!({"tag": ""}), json!({})] {
            let (status, _, _) = send(&app, Method::POST, "/todos/9/tags", Some(body)).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        let (status, _, _) = send(&app, Method::GET, "/todos/9/tags", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_tags_replaces_set() {
        let (app, _) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a", "tags": ["old"]}))).await;

        let (status, _, tags) = send(
            &app,
            Method::PATCH,
            "/todos/0/tags",
            Some(json!({"tags": ["x", "y", "x"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags, json!({"tags": ["x", "y"]}));

        let (status, _, tags) =
            send(&app, Method::PATCH, "/todos/0/tags", Some(json!(["z"]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags, json!({"tags": ["z"]}));
    }

    #[tokio::test]
    async fn test_update_tags_requires_tags_field() {
        let (app, _) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a", "tags": ["keep"]}))).await;

        for bad in [json!({"tagz": ["x"]}), json!({})] {
            let (status, _, body) = send(&app, Method::PATCH, "/todos/0/tags", Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], json!("\"tags\" is a required field"));
        }
        let (_, _, tags) = send(&app, Method::GET, "/todos/0/tags", None).await;
        assert_eq!(tags, json!({"tags": ["keep"]}));

        let (status, _, tags) =
            send(&app, Method::PATCH, "/todos/0/tags", Some(json!({"tags": null}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags, json!({"tags": []}));
    }

    #[tokio::test]
    async fn test_clear_tags_for_todo_keeps_todo() {
        let (app, _) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a", "tags": ["x", "y"]}))).await;

        let (status, _, _) = send(&app, Method::DELETE, "/todos/0/tags", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, todo) = send(&app, Method::GET, "/todos/0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(todo["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_clear_all_tags_keeps_todos() {
        let (app, state) = app();
        send(&app, Method::POST, "/todos", Some(json!({"title": "a", "tags": ["x"]}))).await;
        send(&app, Method::POST, "/todos", Some(json!({"title": "b", "tags": ["y"]}))).await;

        let (status, _, _) = send(&app, Method::DELETE, "/todos/tags", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.repository.len().await, 2);
        assert!(state.repository.todos_by_tag("x").await.is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, _, health) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], json!("ok"));
        assert_eq!(health["persistent"], json!(false));
    }
}
