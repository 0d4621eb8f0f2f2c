//! Every descriptor shape must reach the origin, over both transports.

mod support;

use http::{StatusCode, Version};
use support::{ProxyMode, TestOrigin, TestProxy, init_tracing, start_proxy, start_tls_origin};
use viaduct_client::client::ClientBuilder;
use viaduct_client::protocols::{Http1Transport, Http2Transport, Transport};
use viaduct_client::proxy::{Proxy, ProxyAddress, ProxySelector, ProxyType};
use viaduct_client::tls::TlsConfig;

async fn fixtures() -> (TestOrigin, TestProxy) {
    init_tracing();
    (start_tls_origin().await, start_proxy(ProxyMode::Forward).await)
}

async fn assert_hello<T: Transport>(
    origin: &TestOrigin,
    proxy: Proxy,
    selector: Option<ProxySelector>,
    version: Version,
) {
    let mut builder = ClientBuilder::<T>::new()
        .base_uri(origin.base_uri())
        .tls(TlsConfig::new().with_trust_all(true))
        .proxy(proxy);
    if let Some(selector) = selector {
        builder = builder.system_proxy_source(selector);
    }
    let client = builder.build().expect("client should build");

    let response = client
        .get("/get")
        .request()
        .await
        .expect("request should succeed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.version(), version);
    assert_eq!(response.text().expect("body should be utf-8"), "Hello");
}

fn unset_kind(proxy: &TestProxy) -> Proxy {
    Proxy::builder()
        .host("127.0.0.1")
        .port(proxy.port())
        .build()
        .expect("descriptor should build")
}

fn none_kind_with_host(proxy: &TestProxy) -> Proxy {
    Proxy::builder()
        .kind(ProxyType::None)
        .host("127.0.0.1")
        .port(proxy.port())
        .build()
        .expect("descriptor should build")
}

fn explicit_http(proxy: &TestProxy) -> Proxy {
    Proxy::builder()
        .kind(ProxyType::Http)
        .host("127.0.0.1")
        .port(proxy.port())
        .build()
        .expect("descriptor should build")
}

fn system_selector(proxy: &TestProxy) -> ProxySelector {
    ProxySelector::of(ProxyAddress::new("127.0.0.1", proxy.port()))
}

#[tokio::test]
async fn test_http1_no_proxy() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http1Transport>(&origin, Proxy::no_proxy(), None, Version::HTTP_11).await;
    assert_eq!(proxy.connects(), 0);
}

#[tokio::test]
async fn test_http2_no_proxy() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http2Transport>(&origin, Proxy::no_proxy(), None, Version::HTTP_2).await;
    assert_eq!(proxy.connects(), 0);
}

#[tokio::test]
async fn test_http1_unset_kind_with_host() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http1Transport>(&origin, unset_kind(&proxy), None, Version::HTTP_11).await;
    assert_eq!(proxy.connects(), 1);
}

#[tokio::test]
async fn test_http2_unset_kind_with_host() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http2Transport>(&origin, unset_kind(&proxy), None, Version::HTTP_2).await;
    assert_eq!(proxy.connects(), 1);
}

#[tokio::test]
async fn test_http1_none_kind_with_host() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http1Transport>(&origin, none_kind_with_host(&proxy), None, Version::HTTP_11)
        .await;
    assert_eq!(proxy.connects(), 1);
}

#[tokio::test]
async fn test_http2_none_kind_with_host() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http2Transport>(&origin, none_kind_with_host(&proxy), None, Version::HTTP_2)
        .await;
    assert_eq!(proxy.connects(), 1);
}

#[tokio::test]
async fn test_http1_explicit_http_proxy() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http1Transport>(&origin, explicit_http(&proxy), None, Version::HTTP_11).await;
    assert_eq!(proxy.connects(), 1);
}

#[tokio::test]
async fn test_http2_explicit_http_proxy() {
    let (origin, proxy) = fixtures().await;
    assert_hello::<Http2Transport>(&origin, explicit_http(&proxy), None, Version::HTTP_2).await;
    assert_eq!(proxy.connects(), 1);
}

#[tokio::test]
async fn test_http1_system_proxy() {
    let (origin, proxy) = fixtures().await;
    let selector = system_selector(&proxy);
    assert_hello::<Http1Transport>(&origin, Proxy::system(), Some(selector.clone()), Version::HTTP_11)
        .await;
    selector.clear();
    assert_eq!(proxy.connects(), 1);
}

#[tokio::test]
async fn test_http2_system_proxy() {
    let (origin, proxy) = fixtures().await;
    let selector = system_selector(&proxy);
    assert_hello::<Http2Transport>(&origin, Proxy::system(), Some(selector.clone()), Version::HTTP_2)
        .await;
    selector.clear();
    assert_eq!(proxy.connects(), 1);
}
