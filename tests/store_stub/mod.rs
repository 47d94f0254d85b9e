use std::collections::{HashMap, HashSet};
use std::io::Read as _;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const TOKEN: &str = "test-token";
pub const SPACE_ID: &str = "1";
pub const FOLDER_ID: u64 = 42;
pub const SLOT_ID: u64 = 555;

static PIXEL_PNG: &[u8] = &[137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];

/// What the stub serves and what it has been sent.
#[derive(Debug, Default)]
pub struct StubState {
    pub posts: Vec<Value>,
    pub media: HashMap<u64, Value>,
    /// Slugs (bare or folder-qualified) that `by_slugs` reports as taken.
    pub taken_slugs: HashSet<String>,
    /// Every `by_slugs` value queried, in order.
    pub slug_probes: Vec<String>,
    /// Stories listed under the articles folder.
    pub stories: Vec<Value>,
    pub contents: HashMap<u64, Value>,
    pub created: Vec<Value>,
    pub updated: Vec<(u64, Value)>,
    pub published: Vec<u64>,
    pub uploads: Vec<Vec<u8>>,
    pub finalized: Vec<u64>,
}

pub struct StoreStub {
    pub base_url: String,
    pub state: Arc<Mutex<StubState>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StoreStub {
    pub fn spawn(build: impl FnOnce(&str, &mut StubState)) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start store stub server");
        let base_url = format!("http://{}", server.server_addr());

        let mut initial = StubState::default();
        build(&base_url, &mut initial);
        let state = Arc::new(Mutex::new(initial));

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_state = Arc::clone(&state);
        let thread_base = base_url.clone();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let mut body = Vec::new();
                if request.as_reader().read_to_end(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let method = request.method().clone();
                let url = request.url().to_string();
                let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
                let query: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect();
                let authorized = request
                    .headers()
                    .iter()
                    .any(|h| h.field.equiv("Authorization") && h.value.as_str() == TOKEN);

                let mut state = thread_state.lock().expect("lock stub state");
                let reply = route(
                    &mut state,
                    &thread_base,
                    &method,
                    path,
                    &query,
                    &body,
                    authorized,
                );
                drop(state);
                let _ = request.respond(reply.into_response());
            }
        });

        Self {
            base_url,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn wp_api(&self) -> String {
        format!("{}/wp-json/wp/v2", self.base_url)
    }

    pub fn storyblok_base(&self) -> String {
        format!("{}/v1", self.base_url)
    }
}

impl Drop for StoreStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

enum Reply {
    Json(u16, Value, Vec<(&'static str, String)>),
    Bytes(&'static [u8]),
    Status(u16, &'static str),
}

impl Reply {
    fn json(value: Value) -> Self {
        Self::Json(200, value, Vec::new())
    }

    fn into_response(self) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
        match self {
            Reply::Json(status, value, headers) => {
                let mut response = tiny_http::Response::from_string(value.to_string())
                    .with_status_code(status)
                    .with_header(header("Content-Type", "application/json"));
                for (name, value) in headers {
                    response = response.with_header(header(name, &value));
                }
                response
            }
            Reply::Bytes(bytes) => tiny_http::Response::from_data(bytes.to_vec())
                .with_header(header("Content-Type", "image/png")),
            Reply::Status(status, text) => {
                tiny_http::Response::from_string(text).with_status_code(status)
            }
        }
    }
}

fn header(name: &str, value: &str) -> tiny_http::Header {
    tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("build header")
}

fn route(
    state: &mut StubState,
    base_url: &str,
    method: &tiny_http::Method,
    path: &str,
    query: &HashMap<String, String>,
    body: &[u8],
    authorized: bool,
) -> Reply {
    use tiny_http::Method::{Get, Post, Put};

    if let Some(rest) = path.strip_prefix("/wp-json/wp/v2/") {
        return wordpress(state, method, rest, query);
    }
    if path == "/uploads/pixel.png" {
        return Reply::Bytes(PIXEL_PNG);
    }
    if path == "/signed-upload" && *method == Post {
        let has_file = body.windows(13).any(|w| w == b"name=\"file\"; ");
        let has_policy = body.windows(8).any(|w| w == b"policy-x");
        if !has_file || !has_policy {
            return Reply::Status(400, "missing multipart fields");
        }
        state.uploads.push(body.to_vec());
        return Reply::Status(204, "");
    }

    let Some(rest) = path.strip_prefix(&format!("/v1/spaces/{SPACE_ID}/")) else {
        return Reply::Status(404, "not found");
    };
    if !authorized {
        return Reply::Status(401, "unauthorized");
    }
    let segments: Vec<&str> = rest.split('/').collect();
    let json_body: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

    match (method, segments.as_slice()) {
        (Get, ["stories"]) => {
            if let Some(slug) = query.get("by_slugs") {
                state.slug_probes.push(slug.clone());
                let taken = state.taken_slugs.contains(slug)
                    || state
                        .created
                        .iter()
                        .any(|story| story["slug"].as_str() == Some(slug.as_str()));
                let stories = if taken {
                    vec![json!({ "id": 1, "name": slug, "slug": slug })]
                } else {
                    Vec::new()
                };
                Reply::json(json!({ "stories": stories }))
            } else if query.get("folder_only").map(String::as_str) == Some("1") {
                Reply::json(json!({ "stories": [
                    { "id": 7, "name": "Brands", "slug": "brands", "is_folder": true },
                    { "id": FOLDER_ID, "name": "Articles", "slug": "articles", "is_folder": true }
                ]}))
            } else if query.contains_key("starts_with") {
                let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
                let stories = if page == 1 { state.stories.clone() } else { Vec::new() };
                Reply::json(json!({ "stories": stories }))
            } else {
                Reply::Status(400, "unsupported stories query")
            }
        }
        (Get, ["stories", id]) => {
            let Some(id) = id.parse::<u64>().ok() else {
                return Reply::Status(400, "bad id");
            };
            match state.contents.get(&id) {
                Some(content) => Reply::json(json!({
                    "story": { "id": id, "name": "Story", "slug": "story", "content": content }
                })),
                None => Reply::Status(404, "story not found"),
            }
        }
        (Post, ["stories"]) => {
            let story = json_body["story"].clone();
            if story["slug"].as_str().is_none_or(str::is_empty) {
                return Reply::Status(422, "slug required");
            }
            state.created.push(story.clone());
            let id = 100 + state.created.len() as u64;
            Reply::Json(
                201,
                json!({ "story": {
                    "id": id,
                    "name": story["name"],
                    "slug": story["slug"],
                    "full_slug": story["slug"],
                }}),
                Vec::new(),
            )
        }
        (Put, ["stories", id]) => {
            let Some(id) = id.parse::<u64>().ok() else {
                return Reply::Status(400, "bad id");
            };
            state.updated.push((id, json_body["story"].clone()));
            Reply::json(json!({ "story": json_body["story"] }))
        }
        (Put, ["stories", id, "publish"]) => {
            if let Ok(id) = id.parse::<u64>() {
                state.published.push(id);
            }
            Reply::json(json!({}))
        }
        (Get, ["asset_folders"]) => Reply::json(json!({ "asset_folders": [
            { "id": 9, "name": "Articles" }
        ]})),
        (Post, ["assets"]) => {
            if json_body["validate_upload"] != 1 || json_body["filename"].as_str().is_none() {
                return Reply::Status(422, "bad asset request");
            }
            Reply::json(json!({
                "id": SLOT_ID,
                "post_url": format!("{base_url}/signed-upload"),
                "fields": { "key": "f/1/image.png", "policy": "policy-x", "x-amz-date": 20250101 }
            }))
        }
        (Get, ["assets", id, "finish_upload"]) => {
            let Some(id) = id.parse::<u64>().ok() else {
                return Reply::Status(400, "bad id");
            };
            state.finalized.push(id);
            Reply::json(json!({
                "id": id,
                "filename": format!("https://a.storyblok.test/f/1/{id}/image.png")
            }))
        }
        _ => Reply::Status(404, "not found"),
    }
}

fn wordpress(
    state: &StubState,
    method: &tiny_http::Method,
    rest: &str,
    query: &HashMap<String, String>,
) -> Reply {
    if *method != tiny_http::Method::Get {
        return Reply::Status(405, "method not allowed");
    }
    if rest == "posts" {
        let per_page: usize = query.get("per_page").and_then(|v| v.parse().ok()).unwrap_or(10);
        let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let page: Vec<Value> = state.posts.iter().skip(offset).take(per_page).cloned().collect();
        return Reply::Json(
            200,
            Value::Array(page),
            vec![("X-WP-Total", state.posts.len().to_string())],
        );
    }
    if let Some(id) = rest.strip_prefix("media/") {
        return match id.parse::<u64>().ok().and_then(|id| state.media.get(&id)) {
            Some(media) => Reply::json(media.clone()),
            None => Reply::Status(404, "media not found"),
        };
    }
    Reply::Status(404, "not found")
}

pub fn wp_post(id: u64, title: &str, slug: &str, featured_media: u64) -> Value {
    json!({
        "id": id,
        "title": { "rendered": title },
        "content": { "rendered": format!("<h2>Section {id}</h2><p>Body of {slug} &amp; more.</p><ul><li>a</li></ul>") },
        "featured_media": featured_media,
        "date": "2024-03-01T09:15:00",
        "modified": "2024-04-02T10:30:45",
        "slug": slug
    })
}

pub fn wp_media(base_url: &str, id: u64) -> Value {
    json!({
        "id": id,
        "source_url": format!("{base_url}/uploads/pixel.png"),
        "title": { "rendered": "Pixel" },
        "alt_text": "A pixel",
        "mime_type": "image/png",
        "media_details": { "width": 1, "height": 1 }
    })
}
