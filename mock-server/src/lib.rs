use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    pub location: String,
}

/// Every `/users` and `/status` reply, and the 404 fallback, is wrapped in
/// this envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub status_code: u16,
    pub status_text: String,
    pub content: T,
}

impl Envelope<Value> {
    fn new(status: StatusCode, content: Value) -> Self {
        Self {
            success: status == StatusCode::OK,
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            content,
        }
    }
}

/// Form fields arrive as strings; `id` is parsed by the handler.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserForm {
    id: Option<String>,
    user_name: Option<String>,
    location: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<i64, User>>>;

type Reply = (StatusCode, Json<Envelope<Value>>);

fn reply(status: StatusCode, content: Value) -> Reply {
    (status, Json(Envelope::new(status, content)))
}

fn ok<T: Serialize>(content: &T) -> Reply {
    reply(StatusCode::OK, serde_json::to_value(content).unwrap_or(Value::Null))
}

fn bad_request(reason: impl Into<String>) -> Reply {
    reply(StatusCode::BAD_REQUEST, Value::String(reason.into()))
}

fn not_found() -> Reply {
    reply(StatusCode::NOT_FOUND, Value::Null)
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route(
            "/users",
            get(get_user).post(create_user).put(replace_user).patch(update_user),
        )
        .route("/users/{id}", delete(delete_user))
        .route("/status", put(echo_status))
        .route("/echo", any(echo))
        .route("/malformed", get(malformed))
        .fallback(fallback)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Parse a user from a JSON or form body. Form bodies need every field.
fn parse_user(headers: &HeaderMap, body: &[u8]) -> Result<User, Reply> {
    if is_json(headers) {
        return serde_json::from_slice(body).map_err(|e| bad_request(e.to_string()));
    }
    let form: UserForm =
        serde_urlencoded::from_bytes(body).map_err(|e| bad_request(e.to_string()))?;
    match (form.id.as_deref().map(str::parse::<i64>), form.user_name, form.location) {
        (Some(Ok(id)), Some(user_name), Some(location))
            if !user_name.is_empty() && !location.is_empty() =>
        {
            Ok(User {
                id,
                user_name,
                location,
            })
        }
        _ => Err(bad_request("id, user_name and location are required")),
    }
}

async fn get_user(State(db): State<Db>, Query(params): Query<HashMap<String, String>>) -> Reply {
    let Some(Ok(id)) = params.get("id").map(|id| id.parse::<i64>()) else {
        return bad_request("numeric id is required");
    };
    match db.read().await.get(&id) {
        Some(user) => ok(user),
        None => not_found(),
    }
}

async fn create_user(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> Reply {
    let user = match parse_user(&headers, &body) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    db.write().await.insert(user.id, user.clone());
    ok(&user)
}

async fn replace_user(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> Reply {
    create_user(State(db), headers, body).await
}

/// Partial update of an existing user. JSON bodies may omit fields too.
async fn update_user(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> Reply {
    let form: UserForm = if is_json(&headers) {
        let value: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => return bad_request(e.to_string()),
        };
        UserForm {
            id: value.get("id").map(|id| id.to_string()),
            user_name: value.get("user_name").and_then(Value::as_str).map(str::to_string),
            location: value.get("location").and_then(Value::as_str).map(str::to_string),
        }
    } else {
        match serde_urlencoded::from_bytes(&body) {
            Ok(form) => form,
            Err(e) => return bad_request(e.to_string()),
        }
    };

    let Some(Ok(id)) = form.id.as_deref().map(str::parse::<i64>) else {
        return bad_request("numeric id is required");
    };
    if form.user_name.is_none() && form.location.is_none() {
        return bad_request("nothing to update");
    }

    let mut users = db.write().await;
    let Some(user) = users.get_mut(&id) else {
        return not_found();
    };
    if let Some(user_name) = form.user_name {
        user.user_name = user_name;
    }
    if let Some(location) = form.location {
        user.location = location;
    }
    ok(user)
}

async fn delete_user(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    let Ok(id) = id.parse::<i64>() else {
        return bad_request("numeric id is required");
    };
    match db.write().await.remove(&id) {
        Some(user) => ok(&user),
        None => not_found(),
    }
}

async fn echo_status(body: Bytes) -> Reply {
    ok(&String::from_utf8_lossy(&body))
}

/// Mirrors the request back so clients can inspect exactly what was sent.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        seen.entry(name.as_str().to_string())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert(value);
    }
    Json(json!({
        "method": method.as_str(),
        "query": uri.query().unwrap_or(""),
        "headers": seen,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn malformed() -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "{\"success\": tru",
    )
}

async fn fallback() -> Reply {
    not_found()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        headers
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        headers
    }

    #[test]
    fn envelope_success_tracks_status() {
        let env = Envelope::new(StatusCode::OK, Value::Null);
        assert!(env.success);
        assert_eq!(env.status_text, "OK");

        let env = Envelope::new(StatusCode::NOT_FOUND, Value::Null);
        assert!(!env.success);
        assert_eq!(env.status_code, 404);
        assert_eq!(env.status_text, "Not Found");
    }

    #[test]
    fn parse_user_from_form() {
        let user = parse_user(&form_headers(), b"id=1&user_name=Tony%20Stark&location=Malibu%2C+CA").unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                user_name: "Tony Stark".to_string(),
                location: "Malibu, CA".to_string(),
            }
        );
    }

    #[test]
    fn parse_user_from_form_requires_every_field() {
        assert!(parse_user(&form_headers(), b"id=1&user_name=Tony").is_err());
        assert!(parse_user(&form_headers(), b"id=x&user_name=Tony&location=Malibu").is_err());
        assert!(parse_user(&HeaderMap::new(), b"").is_err());
    }

    #[test]
    fn parse_user_from_json() {
        let user = parse_user(
            &json_headers(),
            br#"{"id":98,"user_name":"Steve Rogers","location":"New York, NY"}"#,
        )
        .unwrap();
        assert_eq!(user.id, 98);
        assert_eq!(user.location, "New York, NY");
    }

    #[test]
    fn parse_user_rejects_malformed_json() {
        let (status, Json(env)) = parse_user(&json_headers(), b"{").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(env.content.is_string());
    }
}
