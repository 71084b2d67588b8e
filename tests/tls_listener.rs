//! A TLS listener serves its bindings over HTTPS and releases its port.

use std::sync::Arc;
use std::time::Duration;

use mockapi::config::{BindingSpec, ListenerSpec};
use mockapi::lifecycle::ListenerRegistry;

mod common;
use common::free_port;

#[tokio::test]
async fn tls_listener_serves_https() {
    let dir = tempfile::tempdir().unwrap();
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()]).unwrap();
    let cert_path = dir.path().join("cert.pem");
    let key_path = dir.path().join("key.pem");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    let port = free_port();
    let spec = ListenerSpec::new("secure", port)
        .with_address([127, 0, 0, 1].into())
        .with_tls(&cert_path, &key_path)
        .with_binding(BindingSpec::inline("/ping", 200, "pong"));

    let registry = ListenerRegistry::default();
    let info = registry.establish(Arc::new(spec)).await.unwrap();
    assert!(info.tls);
    assert_eq!(info.port, port);

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();
    let res = client
        .get(format!("https://127.0.0.1:{port}/ping"))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("TLS listener unreachable");
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.text().await.unwrap(), "pong");

    // Plain HTTP on a TLS port gets no valid response.
    assert!(common::get(&common::client(), port, "/ping").await.map_or(true, |(status, _)| status != 200));

    assert_eq!(registry.stop_all().await, 1);
    std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
}
