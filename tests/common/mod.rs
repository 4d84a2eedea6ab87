//! In-memory Gaia hub served by wiremock

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const APP_DOMAIN: &str = "https://app.example.com";
pub const APP_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
pub const APP_ADDRESS: &str = "1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U";
pub const SEED: &str = "000102030405060708090a0b0c0d0e0f";

/// Entries per `list-files` page
pub const PAGE_SIZE: usize = 2;

type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

fn key_after(request: &Request, prefix: &str) -> String {
    request
        .url
        .path()
        .trim_start_matches(prefix)
        .to_string()
}

struct StoreFile {
    files: Files,
    read_prefix: String,
}

impl Respond for StoreFile {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let key = key_after(request, "/store/");
        self.files
            .lock()
            .unwrap()
            .insert(key.clone(), request.body.clone());
        ResponseTemplate::new(202)
            .set_body_json(json!({ "publicURL": format!("{}{}", self.read_prefix, key) }))
    }
}

struct ReadFile {
    files: Files,
}

impl Respond for ReadFile {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let key = key_after(request, "/read/");
        match self.files.lock().unwrap().get(&key) {
            Some(body) => {
                let mime = if std::str::from_utf8(body).is_ok() {
                    "text/plain; charset=utf-8"
                } else {
                    "application/octet-stream"
                };
                ResponseTemplate::new(200).set_body_raw(body.clone(), mime)
            }
            None => ResponseTemplate::new(404),
        }
    }
}

struct DeleteFile {
    files: Files,
}

impl Respond for DeleteFile {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let key = key_after(request, "/delete/");
        match self.files.lock().unwrap().remove(&key) {
            Some(_) => ResponseTemplate::new(202),
            None => ResponseTemplate::new(404),
        }
    }
}

struct ListFiles {
    files: Files,
}

impl Respond for ListFiles {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let address = key_after(request, "/list-files/");
        let prefix = format!("{}/", address);
        let mut names: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(String::from))
            .collect();
        names.sort();

        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let start: usize = body
            .get("page")
            .and_then(Value::as_str)
            .and_then(|page| page.parse().ok())
            .unwrap_or(0);
        let end = (start + PAGE_SIZE).min(names.len());
        let page = if end < names.len() {
            Value::String(end.to_string())
        } else {
            Value::Null
        };

        ResponseTemplate::new(200).set_body_json(json!({
            "entries": names[start.min(end)..end],
            "page": page,
        }))
    }
}

/// Gaia hub whose buckets live in memory, readable under `/read/`
pub struct MockHub {
    pub server: MockServer,
    files: Files,
}

impl MockHub {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let files: Files = Arc::new(Mutex::new(HashMap::new()));
        let read_prefix = format!("{}/read/", server.uri());

        Mock::given(method("GET"))
            .and(path("/hub_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "read_url_prefix": read_prefix,
                "challenge_text": "[\"gaiahub\",\"0\",\"mock-hub\",\"blockstack_storage_please_sign\"]",
                "latest_auth_version": "v1",
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex("^/store/"))
            .respond_with(StoreFile {
                files: files.clone(),
                read_prefix: read_prefix.clone(),
            })
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/read/"))
            .respond_with(ReadFile {
                files: files.clone(),
            })
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path_regex("^/delete/"))
            .respond_with(DeleteFile {
                files: files.clone(),
            })
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex("^/list-files/"))
            .respond_with(ListFiles {
                files: files.clone(),
            })
            .mount(&server)
            .await;

        MockHub { server, files }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    pub fn read_prefix(&self) -> String {
        format!("{}/read/", self.server.uri())
    }

    /// Raw content stored under `address/path`
    pub fn stored(&self, address: &str, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&format!("{}/{}", address, path))
            .cloned()
    }

    /// Place a file directly in a bucket, returning its read URL
    pub fn insert(&self, address: &str, path: &str, content: Vec<u8>) -> String {
        let key = format!("{}/{}", address, path);
        self.files.lock().unwrap().insert(key.clone(), content);
        format!("{}{}", self.read_prefix(), key)
    }
}
