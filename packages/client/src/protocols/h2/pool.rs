//! Shared HTTP/2 connections keyed by route, origin and proxy credentials

use std::sync::{Arc, Weak};

use bytes::Bytes;
use dashmap::DashMap;
use h2::client::SendRequest;
use tokio::sync::OnceCell;

use crate::connect::Connector;
use crate::error::{self, Error};
use crate::http::Origin;
use crate::proxy::{EffectiveRoute, Extra};
use crate::tls::ALPN_H2;

type Established = Result<SendRequest<Bytes>, Arc<Error>>;
type Slot = Arc<OnceCell<Established>>;
type Slots = DashMap<PoolKey, Slot>;

/// Identity of a shareable connection.
///
/// Tunnels opened with different CONNECT headers are never shared, so one
/// caller's `Proxy-Authorization` cannot carry another caller's requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    route: EffectiveRoute,
    origin: Origin,
    credentials: Vec<u8>,
}

impl PoolKey {
    fn new(route: &EffectiveRoute, origin: &Origin, extra: &Extra) -> Self {
        let credentials = if route.is_proxied() {
            extra.fingerprint()
        } else {
            Vec::new()
        };
        PoolKey {
            route: route.clone(),
            origin: origin.clone(),
            credentials,
        }
    }
}

/// HTTP/2 connections shared across concurrent requests.
///
/// Each key is established at most once at a time: a request arriving while
/// a connection is being set up waits for that attempt instead of opening a
/// second tunnel. Establishment runs in its own task, so cancelling the
/// request that started it does not abandon it. A failed attempt is shared
/// with everyone waiting on it and evicted by the task that ran it.
/// A connection that closes is evicted so the next request reconnects.
#[derive(Debug, Clone)]
pub struct H2Pool {
    connector: Connector,
    slots: Arc<Slots>,
}

impl H2Pool {
    #[must_use]
    pub fn new(connector: Connector) -> Self {
        H2Pool {
            connector,
            slots: Arc::new(DashMap::new()),
        }
    }

    pub(crate) fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Number of connections held or being established.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// A sender for `origin` over `route` that is ready for a new stream.
    ///
    /// A pooled connection that turns out to be closed is evicted and
    /// replaced once.
    pub(crate) async fn sender(
        &self,
        route: &EffectiveRoute,
        origin: &Origin,
        extra: &Extra,
    ) -> Result<SendRequest<Bytes>, Error> {
        let key = PoolKey::new(route, origin, extra);
        let mut retried = false;

        loop {
            let slot = self
                .slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();

            let sender = self.establish(key.clone(), slot.clone(), extra.clone()).await;
            let sender = match sender {
                Ok(sender) => sender,
                Err(e) => {
                    evict(&self.slots, &key, &slot);
                    return Err(Error::new(e.kind().clone()).with(e));
                }
            };

            match sender.ready().await {
                Ok(ready) => return Ok(ready),
                Err(e) if !retried => {
                    tracing::debug!(target: "viaduct::h2", origin = %origin, error = %e, "pooled connection closed, reconnecting");
                    evict(&self.slots, &key, &slot);
                    retried = true;
                }
                Err(e) => {
                    evict(&self.slots, &key, &slot);
                    return Err(error::request(e));
                }
            }
        }
    }

    async fn establish(&self, key: PoolKey, slot: Slot, extra: Extra) -> Established {
        if let Some(done) = slot.get() {
            return done.clone();
        }

        let connector = self.connector.clone();
        let slots = Arc::downgrade(&self.slots);
        let task = tokio::spawn(async move {
            let done = slot
                .get_or_init(|| {
                    connect(connector, slots.clone(), key.clone(), Arc::downgrade(&slot), extra)
                })
                .await
                .clone();

            // Nobody may be left waiting to evict a failure.
            if done.is_err()
                && let Some(slots) = slots.upgrade()
            {
                evict(&slots, &key, &slot);
            }
            done
        });

        match task.await {
            Ok(done) => done,
            Err(join) => Err(Arc::new(error::connect(join))),
        }
    }
}

async fn connect(
    connector: Connector,
    slots: Weak<Slots>,
    key: PoolKey,
    slot: Weak<OnceCell<Established>>,
    extra: Extra,
) -> Established {
    let PoolKey { route, origin, .. } = &key;
    let conn = connector
        .open_connection(route, origin, &extra)
        .await
        .map_err(Arc::new)?;

    if origin.is_secure() && conn.negotiated_alpn() != Some(ALPN_H2) {
        return Err(Arc::new(error::protocol_violation(format!(
            "{origin} did not negotiate h2"
        ))));
    }

    let settings = connector.config().http2;
    let (sender, connection) = h2::client::Builder::new()
        .initial_window_size(settings.initial_stream_window_size)
        .initial_connection_window_size(settings.initial_connection_window_size)
        .max_frame_size(settings.max_frame_size)
        .max_concurrent_streams(u32::try_from(settings.max_concurrent_streams).unwrap_or(u32::MAX))
        .handshake::<_, Bytes>(conn)
        .await
        .map_err(|e| Arc::new(error::connect(e)))?;

    tracing::debug!(target: "viaduct::h2", origin = %origin, route = %route, "h2 connection ready");

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(target: "viaduct::h2", origin = %key.origin, error = %e, "connection error");
        }
        if let (Some(slots), Some(slot)) = (slots.upgrade(), slot.upgrade()) {
            evict(&slots, &key, &slot);
        }
        tracing::trace!(target: "viaduct::h2", origin = %key.origin, "connection closed");
    });

    Ok(sender)
}

fn evict(slots: &Slots, key: &PoolKey, slot: &Slot) {
    slots.remove_if(key, |_, current| Arc::ptr_eq(current, slot));
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use http::HeaderValue;
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::HttpConfig;
    use crate::http::Scheme;
    use crate::proxy::Proxy;
    use crate::tls::TlsConfig;

    fn pool(config: HttpConfig) -> H2Pool {
        H2Pool::new(Connector::new(config, &TlsConfig::default(), ALPN_H2).unwrap())
    }

    fn via(port: u16) -> EffectiveRoute {
        EffectiveRoute::ViaProxy {
            host: "127.0.0.1".to_owned(),
            port,
        }
    }

    fn extra_with_auth(value: &'static str) -> Extra {
        Proxy::http("127.0.0.1", 3128)
            .unwrap()
            .custom_http_auth(HeaderValue::from_static(value))
            .extra()
            .clone()
    }

    /// Proxy that accepts and never answers. Returns its port and accept count.
    async fn silent_proxy() -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicUsize::new(0));
        let counter = accepts.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(sock);
            }
        });
        (port, accepts)
    }

    #[test]
    fn key_separates_credentials_on_proxied_routes() {
        let origin = Origin::new(Scheme::Https, "example.com", 443);
        let alice = extra_with_auth("Basic YWxpY2U6cHc=");
        let bob = extra_with_auth("Basic Ym9iOnB3");

        assert_ne!(
            PoolKey::new(&via(3128), &origin, &alice),
            PoolKey::new(&via(3128), &origin, &bob)
        );
        assert_eq!(
            PoolKey::new(&via(3128), &origin, &alice),
            PoolKey::new(&via(3128), &origin, &alice.clone())
        );
        assert_eq!(
            PoolKey::new(&EffectiveRoute::Direct, &origin, &alice),
            PoolKey::new(&EffectiveRoute::Direct, &origin, &bob)
        );
    }

    #[tokio::test]
    async fn refused_connection_leaves_pool_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let pool = pool(HttpConfig::default());
        let origin = Origin::new(Scheme::Http, "127.0.0.1", port);
        let err = pool
            .sender(&EffectiveRoute::Direct, &origin, &Extra::default())
            .await
            .unwrap_err();
        assert!(err.is_connect(), "unexpected error: {err:?}");
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn failure_after_cancelled_caller_is_not_cached() {
        let (port, accepts) = silent_proxy().await;
        let config = HttpConfig::default().with_tunnel_timeout(Duration::from_millis(300));
        let pool = pool(config);
        let origin = Origin::new(Scheme::Https, "localhost", 443);
        let route = via(port);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            pool.sender(&route, &origin, &Extra::default()),
        )
        .await;
        assert!(cancelled.is_err(), "caller should have been cancelled");
        assert_eq!(pool.len(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(pool.is_empty(), "failed slot should be evicted by its own task");

        let err = pool
            .sender(&route, &origin, &Extra::default())
            .await
            .unwrap_err();
        assert!(err.is_protocol_violation(), "unexpected error: {err:?}");
        assert_eq!(accepts.load(Ordering::SeqCst), 2);
        assert!(pool.is_empty());
    }
}
