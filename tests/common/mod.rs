//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ask the OS for a port nobody is listening on.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn inline_binding(path: &str, code: u16, body: &str) -> String {
    format!(
        "      - bindingpath: {path}\n        responsecode: {code}\n        responsebody: \"{body}\"\n        responsebodytype: inline\n"
    )
}

pub fn file_binding(path: &str, code: u16, file: &Path) -> String {
    format!(
        "      - bindingpath: {path}\n        responsecode: {code}\n        responsebody: \"{}\"\n        responsebodytype: file\n",
        file.display()
    )
}

pub fn listener(name: &str, port: u16, bindings: &[String]) -> String {
    format!(
        "  - listenername: {name}\n    listenerport: {port}\n    listeneraddress: 127.0.0.1\n    contentbindings:\n{}",
        bindings.concat()
    )
}

pub fn settings(listeners: &[String]) -> String {
    format!(
        "id: integration\nschema: v1\ndescription: integration test settings\nweblisteners:\n{}",
        listeners.concat()
    )
}

/// Write `content` to `settings.yaml` inside `dir`.
pub fn write_settings(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("settings.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// GET `path` on the local port; `None` when nothing answers.
pub async fn get(client: &reqwest::Client, port: u16, path: &str) -> Option<(u16, String)> {
    let res = client
        .get(format!("http://127.0.0.1:{port}{path}"))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .ok()?;
    let status = res.status().as_u16();
    let body = res.text().await.ok()?;
    Some((status, body))
}

/// Poll `check` until it returns true or `limit` elapses.
pub async fn eventually<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
