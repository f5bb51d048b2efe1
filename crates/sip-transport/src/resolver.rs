use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Maps a URI's host/port to an ordered list of candidate socket
/// addresses. Spec.md §1 keeps concrete DNS resolution wire details out
/// of this core's scope: "the core only requires that a resolver maps a
/// URI to an ordered list of candidate transports." Anything beyond
/// plain system resolution (SRV/NAPTR-driven SIP DNS procedures) is a
/// caller's concern; it can supply its own [`Resolver`].
#[async_trait]
pub trait Resolver: Send + Sync + std::fmt::Debug {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>>;
}

/// The default resolver: a literal IP is used as-is, anything else goes
/// through the system's `getaddrinfo` via [`tokio::net::lookup_host`].
#[derive(Debug, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|_| Error::NoRoute)?
            .collect();
        if addrs.is_empty() {
            return Err(Error::NoRoute);
        }
        Ok(addrs)
    }
}
