//! Target authorities, proxies and routes.

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::{Error, Result};

/// How a connection reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    /// No proxy.
    Direct,
    /// An HTTP proxy.
    Http,
    /// A SOCKS proxy.
    Socks,
}

/// A proxy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Proxy {
    /// Connect to the origin server directly.
    #[default]
    Direct,
    /// Tunnel or forward through an HTTP proxy.
    Http {
        /// Proxy host.
        host: String,
        /// Proxy port.
        port: u16,
    },
    /// Connect through a SOCKS proxy.
    Socks {
        /// Proxy host.
        host: String,
        /// Proxy port.
        port: u16,
    },
}

impl Proxy {
    /// An HTTP proxy at `host:port`.
    #[must_use]
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self::Http {
            host: host.into(),
            port,
        }
    }

    /// A SOCKS proxy at `host:port`.
    #[must_use]
    pub fn socks(host: impl Into<String>, port: u16) -> Self {
        Self::Socks {
            host: host.into(),
            port,
        }
    }

    /// The kind of proxy.
    #[must_use]
    pub const fn kind(&self) -> ProxyKind {
        match self {
            Self::Direct => ProxyKind::Direct,
            Self::Http { .. } => ProxyKind::Http,
            Self::Socks { .. } => ProxyKind::Socks,
        }
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "DIRECT"),
            Self::Http { host, port } => write!(f, "HTTP @ {host}:{port}"),
            Self::Socks { host, port } => write!(f, "SOCKS @ {host}:{port}"),
        }
    }
}

/// The authority a connection allocation is bound to.
///
/// Two requests can share an allocation only when their addresses are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    scheme: String,
    host: String,
    port: u16,
    proxy: Proxy,
}

impl Address {
    /// Derives the address of `url`, reached through `proxy`.
    pub fn from_url(url: &Url, proxy: &Proxy) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_request(format!("URL has no host: {url}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::invalid_request(format!("URL has no known port: {url}")))?;
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port,
            proxy: proxy.clone(),
        })
    }

    /// URL scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Target host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Configured proxy.
    #[must_use]
    pub const fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    /// Returns `true` if the address uses TLS.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Returns `true` if `url` has the same host, port and scheme.
    #[must_use]
    pub fn same_authority(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host.as_str())
            && url.port_or_known_default() == Some(self.port)
            && url.scheme() == self.scheme
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// One concrete network path to an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    address: Address,
    proxy: Proxy,
    socket_addr: SocketAddr,
}

impl Route {
    /// Creates a route.
    #[must_use]
    pub const fn new(address: Address, proxy: Proxy, socket_addr: SocketAddr) -> Self {
        Self {
            address,
            proxy,
            socket_addr,
        }
    }

    /// The address this route reaches.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// The proxy this route goes through.
    #[must_use]
    pub const fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    /// The resolved socket address connected to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        self.socket_addr
    }
}

/// The `Host` header value for `url`, omitting the port when it is the
/// scheme's default.
#[must_use]
pub fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
