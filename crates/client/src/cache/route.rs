//! Request classification.
//!
//! An ordered table of (matcher, policy) routes. The first matching route
//! decides how a request is served; a request no route matches goes straight
//! to the network.

use regex::Regex;
use reqwest::Url;
use showbell_core::{AppConfig, Error, ResourceClass};

use crate::fetch::ResourceRequest;

/// How a request is served. Cached policies name the resource class whose
/// generation holds the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Straight to the network, never cached.
    Bypass,
    StaleWhileRevalidate(ResourceClass),
    NetworkFirst(ResourceClass),
    /// Cache first; scripts are refreshed in the background on a hit.
    CacheFirst(ResourceClass),
}

impl Policy {
    pub fn class(&self) -> Option<ResourceClass> {
        match self {
            Policy::Bypass => None,
            Policy::StaleWhileRevalidate(c) | Policy::NetworkFirst(c) | Policy::CacheFirst(c) => Some(*c),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Navigation,
    NonGet,
    /// Host equals one of these or is a subdomain of one.
    Hosts(Vec<String>),
    SameOrigin(url::Origin),
    PathPrefix(String),
    PathRegex(Regex),
    All(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, request: &ResourceRequest) -> bool {
        match self {
            Matcher::Navigation => request.is_navigation(),
            Matcher::NonGet => !request.is_get(),
            Matcher::Hosts(hosts) => request.url.host_str().is_some_and(|host| {
                let host = host.to_ascii_lowercase();
                hosts
                    .iter()
                    .any(|h| host == *h || host.strip_suffix(h.as_str()).is_some_and(|rest| rest.ends_with('.')))
            }),
            Matcher::SameOrigin(origin) => request.url.origin() == *origin,
            Matcher::PathPrefix(prefix) => request.url.path().starts_with(prefix.as_str()),
            Matcher::PathRegex(re) => re.is_match(request.url.path()),
            Matcher::All(matchers) => matchers.iter().all(|m| m.matches(request)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub name: &'static str,
    pub matcher: Matcher,
    pub policy: Policy,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The standard table:
    ///
    /// | route | matches | policy |
    /// |-------|---------|--------|
    /// | navigation | top-level navigation | bypass |
    /// | non-get | any method but GET | bypass |
    /// | image-origin | `image_hosts` | stale-while-revalidate (image) |
    /// | api-origin | `api_hosts` | network-first (api) |
    /// | same-origin-api | app origin + `api_path_prefix` | network-first (api) |
    /// | static-asset | app origin | cache-first (static) |
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.app_origin)
            .map_err(|e| Error::InvalidUrl(format!("app_origin {}: {}", config.app_origin, e)))?
            .origin();
        let lower = |hosts: &[String]| hosts.iter().map(|h| h.trim().to_ascii_lowercase()).collect::<Vec<_>>();

        Ok(Self::new(vec![
            Route { name: "navigation", matcher: Matcher::Navigation, policy: Policy::Bypass },
            Route { name: "non-get", matcher: Matcher::NonGet, policy: Policy::Bypass },
            Route {
                name: "image-origin",
                matcher: Matcher::Hosts(lower(&config.image_hosts)),
                policy: Policy::StaleWhileRevalidate(ResourceClass::Image),
            },
            Route {
                name: "api-origin",
                matcher: Matcher::Hosts(lower(&config.api_hosts)),
                policy: Policy::NetworkFirst(ResourceClass::Api),
            },
            Route {
                name: "same-origin-api",
                matcher: Matcher::All(vec![
                    Matcher::SameOrigin(origin.clone()),
                    Matcher::PathPrefix(config.api_path_prefix.clone()),
                ]),
                policy: Policy::NetworkFirst(ResourceClass::Api),
            },
            Route {
                name: "static-asset",
                matcher: Matcher::SameOrigin(origin),
                policy: Policy::CacheFirst(ResourceClass::Static),
            },
        ]))
    }

    /// First route matching `request`.
    pub fn classify(&self, request: &ResourceRequest) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(request))
    }

    /// Policy for `request`; unmatched requests bypass the cache.
    pub fn policy_for(&self, request: &ResourceRequest) -> Policy {
        self.classify(request).map_or(Policy::Bypass, |r| r.policy)
    }
}
