//! In-memory imitation of the ssh.cx v1 API.
//!
//! Records are owned by the token that created them. Unknown tokens get
//! `401`, missing records `404`, both with an `{"error": ...}` body.
//! Delete-all answers `204` with an empty body.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Token accepted by `app()`.
pub const DEFAULT_TOKEN: &str = "SECRET";

/// Prefix of the short links handed out.
pub const SHORT_LINK_BASE: &str = "https://ssh.cx/";

/// Multipart field holding the uploaded file.
pub const FILE_FIELD: &str = "sfile";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub id: u64,
    pub short: String,
    pub url: String,
    pub link: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: u64,
    pub short: String,
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub link: String,
}

/// Every parameter any endpoint reads, from either the query or a form body.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    pub token: Option<String>,
    pub id: Option<String>,
    pub short: Option<String>,
    pub all: Option<String>,
    pub url: Option<String>,
    pub demo_token: Option<String>,
}

struct Owned<T> {
    owner: String,
    entry: T,
}

trait Keyed {
    fn id(&self) -> u64;
    fn short(&self) -> &str;
}

impl Keyed for UrlEntry {
    fn id(&self) -> u64 {
        self.id
    }
    fn short(&self) -> &str {
        &self.short
    }
}

impl Keyed for FileEntry {
    fn id(&self) -> u64 {
        self.id
    }
    fn short(&self) -> &str {
        &self.short
    }
}

#[derive(Default)]
pub struct Store {
    tokens: HashSet<String>,
    demo_tokens: HashSet<String>,
    urls: BTreeMap<u64, Owned<UrlEntry>>,
    files: BTreeMap<u64, Owned<FileEntry>>,
    next_id: u64,
}

impl Store {
    fn allocate(&mut self) -> (u64, String) {
        self.next_id += 1;
        let short = loop {
            let candidate = Uuid::new_v4().simple().to_string()[..6].to_string();
            let taken = self.urls.values().any(|o| o.entry.short == candidate)
                || self.files.values().any(|o| o.entry.short == candidate);
            if !taken {
                break candidate;
            }
        };
        (self.next_id, short)
    }

    fn insert_url(&mut self, owner: &str, url: &str) -> UrlEntry {
        let (id, short) = self.allocate();
        let entry = UrlEntry {
            id,
            link: format!("{SHORT_LINK_BASE}{short}"),
            short,
            url: url.to_string(),
        };
        self.urls.insert(
            id,
            Owned {
                owner: owner.to_string(),
                entry: entry.clone(),
            },
        );
        entry
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Router accepting only `DEFAULT_TOKEN`.
pub fn app() -> Router {
    app_with_tokens([DEFAULT_TOKEN])
}

pub fn app_with_tokens<I, S>(tokens: I) -> Router
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let store = Store {
        tokens: tokens.into_iter().map(Into::into).collect(),
        ..Store::default()
    };
    let db: Db = Arc::new(RwLock::new(store));

    let v1 = Router::new()
        .route("/url", get(read_urls).post(create_url).delete(delete_urls))
        .route("/file", get(read_files).post(upload_file).delete(delete_files))
        .route("/demo/new", post(demo_new))
        .route("/demo/reassign", post(demo_reassign));

    Router::new().nest("/v1", v1).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn authorize(store: &Store, token: Option<&str>) -> Result<String, Response> {
    match token {
        Some(token) if store.tokens.contains(token) => Ok(token.to_string()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "invalid token")),
    }
}

enum Selector {
    Id(u64),
    Short(String),
}

impl Selector {
    fn from_params(params: &Params) -> Result<Option<Self>, Response> {
        if let Some(raw) = &params.id {
            return raw
                .parse()
                .map(|id| Some(Selector::Id(id)))
                .map_err(|_| error(StatusCode::BAD_REQUEST, "id must be numeric"));
        }
        Ok(params.short.clone().map(Selector::Short))
    }

    fn matches(&self, entry: &impl Keyed) -> bool {
        match self {
            Selector::Id(id) => entry.id() == *id,
            Selector::Short(short) => entry.short() == short,
        }
    }
}

fn read_entries<T: Keyed + Serialize>(
    map: &BTreeMap<u64, Owned<T>>,
    owner: &str,
    params: &Params,
) -> Response {
    match Selector::from_params(params) {
        Err(response) => response,
        Ok(None) => {
            let entries: Vec<&T> = map
                .values()
                .filter(|o| o.owner == owner)
                .map(|o| &o.entry)
                .collect();
            Json(entries).into_response()
        }
        Ok(Some(selector)) => map
            .values()
            .find(|o| o.owner == owner && selector.matches(&o.entry))
            .map(|o| Json(&o.entry).into_response())
            .unwrap_or_else(|| error(StatusCode::NOT_FOUND, "not found")),
    }
}

fn remove_entries<T: Keyed + Serialize>(
    map: &mut BTreeMap<u64, Owned<T>>,
    owner: &str,
    params: &Params,
) -> Response {
    if params.all.as_deref() == Some("1") {
        map.retain(|_, o| o.owner != owner);
        return StatusCode::NO_CONTENT.into_response();
    }
    let selector = match Selector::from_params(params) {
        Err(response) => return response,
        Ok(None) => return error(StatusCode::BAD_REQUEST, "id, short or all=1 required"),
        Ok(Some(selector)) => selector,
    };
    let key = map
        .iter()
        .find(|(_, o)| o.owner == owner && selector.matches(&o.entry))
        .map(|(key, _)| *key);
    match key.and_then(|key| map.remove(&key)) {
        Some(removed) => Json(removed.entry).into_response(),
        None => error(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn read_urls(State(db): State<Db>, Query(params): Query<Params>) -> Response {
    let store = db.read().await;
    match authorize(&store, params.token.as_deref()) {
        Ok(owner) => read_entries(&store.urls, &owner, &params),
        Err(response) => response,
    }
}

async fn create_url(State(db): State<Db>, Form(params): Form<Params>) -> Response {
    let mut store = db.write().await;
    let owner = match authorize(&store, params.token.as_deref()) {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    let Some(url) = params.url.as_deref().filter(|u| !u.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "url is required");
    };
    let entry = store.insert_url(&owner, url);
    tracing::debug!(id = entry.id, short = %entry.short, "created url");
    Json(entry).into_response()
}

async fn delete_urls(State(db): State<Db>, Form(params): Form<Params>) -> Response {
    let mut store = db.write().await;
    let owner = match authorize(&store, params.token.as_deref()) {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    remove_entries(&mut store.urls, &owner, &params)
}

async fn read_files(State(db): State<Db>, Query(params): Query<Params>) -> Response {
    let store = db.read().await;
    match authorize(&store, params.token.as_deref()) {
        Ok(owner) => read_entries(&store.files, &owner, &params),
        Err(response) => response,
    }
}

async fn upload_file(
    State(db): State<Db>,
    Query(params): Query<Params>,
    mut multipart: Multipart,
) -> Response {
    let owner = match authorize(&*db.read().await, params.token.as_deref()) {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error(StatusCode::BAD_REQUEST, &e.body_text()),
        };
        if field.name() != Some(FILE_FIELD) || upload.is_some() {
            return error(StatusCode::BAD_REQUEST, "expected exactly one sfile part");
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return error(StatusCode::BAD_REQUEST, &e.body_text()),
        };
        upload = Some((name, mime, bytes.len() as u64));
    }
    let Some((name, mime, size)) = upload else {
        return error(StatusCode::BAD_REQUEST, "expected exactly one sfile part");
    };

    let mut store = db.write().await;
    let (id, short) = store.allocate();
    let entry = FileEntry {
        id,
        link: format!("{SHORT_LINK_BASE}{short}"),
        short,
        name,
        size,
        mime,
    };
    store.files.insert(
        id,
        Owned {
            owner,
            entry: entry.clone(),
        },
    );
    tracing::debug!(id, size, "stored file");
    Json(entry).into_response()
}

async fn delete_files(State(db): State<Db>, Form(params): Form<Params>) -> Response {
    let mut store = db.write().await;
    let owner = match authorize(&store, params.token.as_deref()) {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    remove_entries(&mut store.files, &owner, &params)
}

async fn demo_new(State(db): State<Db>, Form(params): Form<Params>) -> Response {
    let Some(url) = params.url.as_deref().filter(|u| !u.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "url is required");
    };
    let token = format!("demo{}", Uuid::new_v4().simple());
    let mut store = db.write().await;
    store.tokens.insert(token.clone());
    store.demo_tokens.insert(token.clone());
    let entry = store.insert_url(&token, url);
    Json(json!({
        "token": token,
        "id": entry.id,
        "short": entry.short,
        "url": entry.url,
        "link": entry.link,
    }))
    .into_response()
}

async fn demo_reassign(State(db): State<Db>, Form(params): Form<Params>) -> Response {
    let (Some(prod), Some(demo)) = (
        params.token.filter(|t| !t.is_empty()),
        params.demo_token.filter(|t| !t.is_empty()),
    ) else {
        return error(StatusCode::BAD_REQUEST, "token and demo_token are required");
    };

    let mut store = db.write().await;
    if !store.demo_tokens.remove(&demo) {
        return error(StatusCode::NOT_FOUND, "unknown demo token");
    }
    store.tokens.remove(&demo);
    store.tokens.insert(prod.clone());

    let mut moved = 0u64;
    for owned in store.urls.values_mut() {
        if owned.owner == demo {
            owned.owner = prod.clone();
            moved += 1;
        }
    }
    for owned in store.files.values_mut() {
        if owned.owner == demo {
            owned.owner = prod.clone();
            moved += 1;
        }
    }
    tracing::info!(moved, "reassigned demo records");
    Json(json!({ "token": prod, "moved": moved })).into_response()
}
