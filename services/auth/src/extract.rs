//! Request helpers: session token lookup, session cookies and client address

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_token";

/// Session cookie attributes
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Add the `Secure` attribute (HTTPS deployments)
    pub secure: bool,
    /// Cookie lifetime in seconds
    pub max_age: u64,
}

impl CookieSettings {
    /// Whether cookies get the `Secure` attribute
    ///
    /// # Environment Variables
    /// - `COOKIE_SECURE`: "true" or "1" to enable (default: disabled)
    pub fn secure_from_env() -> bool {
        std::env::var("COOKIE_SECURE")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
            .unwrap_or(false)
    }

    /// `Set-Cookie` value carrying a new session token
    pub fn session_cookie(&self, token: &str) -> HeaderValue {
        self.build(token, self.max_age)
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_cookie(&self) -> HeaderValue {
        self.build("", 0)
    }

    fn build(&self, value: &str, max_age: u64) -> HeaderValue {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        // Token characters are base64url and dots, always a valid header value.
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

/// Session token from `Authorization: Bearer …`, falling back to the cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Reverse proxies whose forwarding headers are believed
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<Vec<IpAddr>>);

impl TrustedProxies {
    pub fn new(proxies: Vec<IpAddr>) -> Self {
        Self(Arc::new(proxies))
    }

    /// Load the proxy list from the environment
    ///
    /// # Environment Variables
    /// - `TRUSTED_PROXIES`: comma-separated proxy addresses (default: none)
    pub fn from_env() -> Self {
        let raw = std::env::var("TRUSTED_PROXIES").unwrap_or_default();
        let proxies = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match entry.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    warn!("Ignoring invalid TRUSTED_PROXIES entry {:?}", entry);
                    None
                }
            })
            .collect();
        Self::new(proxies)
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }
}

/// Client address of a request.
///
/// The peer address is used unless the peer is a trusted proxy. Behind one,
/// the nearest `X-Forwarded-For` hop that is not itself a trusted proxy is
/// the client, with `X-Real-IP` as the fallback.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted: &TrustedProxies,
) -> Option<String> {
    let peer_ip = peer.map(|addr| addr.ip());
    if !peer_ip.is_some_and(|ip| trusted.contains(&ip)) {
        return peer_ip.map(|ip| ip.to_string());
    }

    let hops: Vec<IpAddr> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|hop| hop.trim().parse().ok())
        .collect();
    if let Some(ip) = hops.iter().rev().find(|ip| !trusted.contains(ip)).or(hops.first()) {
        return Some(ip.to_string());
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<IpAddr>().ok());

    real_ip.or(peer_ip).map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let h = headers(&[
            ("authorization", "Bearer abc.def.ghi"),
            ("cookie", "session_token=from-cookie"),
        ]);
        assert_eq!(session_token(&h).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_is_used_without_bearer() {
        let h = headers(&[("cookie", "theme=dark; session_token=tok123")]);
        assert_eq!(session_token(&h).as_deref(), Some("tok123"));

        let h = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(session_token(&h), None);

        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn forwarding_headers_are_ignored_from_untrusted_peers() {
        let peer: SocketAddr = "198.51.100.20:5000".parse().unwrap();
        let trusted = TrustedProxies::new(vec!["10.0.0.2".parse().unwrap()]);

        let h = headers(&[("x-forwarded-for", "203.0.113.7"), ("x-real-ip", "203.0.113.8")]);
        assert_eq!(client_ip(&h, Some(peer), &trusted).as_deref(), Some("198.51.100.20"));
        assert_eq!(
            client_ip(&h, Some(peer), &TrustedProxies::default()).as_deref(),
            Some("198.51.100.20")
        );
        assert_eq!(client_ip(&h, None, &trusted), None);
    }

    #[test]
    fn trusted_proxy_forwards_the_nearest_untrusted_hop() {
        let proxy: SocketAddr = "10.0.0.2:443".parse().unwrap();
        let trusted = TrustedProxies::new(vec![
            "10.0.0.2".parse().unwrap(),
            "10.0.0.3".parse().unwrap(),
        ]);

        // The leftmost hop is whatever the client claimed.
        let h = headers(&[("x-forwarded-for", "1.1.1.1, 203.0.113.7, 10.0.0.3")]);
        assert_eq!(client_ip(&h, Some(proxy), &trusted).as_deref(), Some("203.0.113.7"));

        let h = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&h, Some(proxy), &trusted).as_deref(), Some("198.51.100.2"));

        assert_eq!(
            client_ip(&HeaderMap::new(), Some(proxy), &trusted).as_deref(),
            Some("10.0.0.2")
        );
    }

    #[test]
    #[serial_test::serial]
    fn trusted_proxies_from_env_skip_bad_entries() {
        unsafe {
            std::env::set_var("TRUSTED_PROXIES", "10.0.0.2, nonsense, ::1");
        }
        let trusted = TrustedProxies::from_env();
        unsafe {
            std::env::remove_var("TRUSTED_PROXIES");
        }
        assert!(trusted.contains(&"10.0.0.2".parse().unwrap()));
        assert!(trusted.contains(&"::1".parse().unwrap()));
        assert!(!TrustedProxies::from_env().contains(&"10.0.0.2".parse().unwrap()));
    }

    #[test]
    fn cookie_attributes() {
        let settings = CookieSettings {
            secure: true,
            max_age: 60,
        };
        assert_eq!(
            settings.session_cookie("t.o.k").to_str().unwrap(),
            "session_token=t.o.k; Path=/; HttpOnly; SameSite=Lax; Max-Age=60; Secure"
        );

        let insecure = CookieSettings {
            secure: false,
            max_age: 60,
        };
        assert_eq!(
            insecure.clear_cookie().to_str().unwrap(),
            "session_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }
}
