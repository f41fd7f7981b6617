//! Intercepted resource requests.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use showbell_core::Error;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "navigate" => Ok(Self::Navigate),
            "cors" => Ok(Self::Cors),
            "no-cors" => Ok(Self::NoCors),
            "same-origin" => Ok(Self::SameOrigin),
            other => Err(Error::InvalidInput(format!("unknown request mode: {}", other))),
        }
    }
}

/// What the response will be used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    #[default]
    Empty,
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "script" => Ok(Self::Script),
            "style" => Ok(Self::Style),
            "image" => Ok(Self::Image),
            "font" => Ok(Self::Font),
            "manifest" => Ok(Self::Manifest),
            "" | "empty" => Ok(Self::Empty),
            other => Err(Error::InvalidInput(format!("unknown request destination: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: Url,
    /// Always upper case.
    pub method: String,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl ResourceRequest {
    pub fn get(url: Url) -> Self {
        Self { url, method: "GET".into(), mode: RequestMode::default(), destination: Destination::default() }
    }

    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, destination: Destination::Document, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.trim().to_ascii_uppercase();
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Scripts are revalidated in the background even on a cache hit.
    pub fn is_script(&self) -> bool {
        if self.destination == Destination::Script {
            return true;
        }
        let path = self.url.path().to_ascii_lowercase();
        path.ends_with(".js") || path.ends_with(".mjs")
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_navigate_sets_mode_and_destination() {
        let req = ResourceRequest::navigate(url("http://localhost:3000/show/42"));
        assert!(req.is_navigation());
        assert_eq!(req.destination, Destination::Document);
        assert!(req.is_get());
    }

    #[test]
    fn test_method_normalized() {
        let req = ResourceRequest::get(url("http://localhost:3000/api/x")).with_method(" post ");
        assert_eq!(req.method, "POST");
        assert!(!req.is_get());
    }

    #[test]
    fn test_is_script_by_destination_or_extension() {
        assert!(ResourceRequest::get(url("http://localhost:3000/_next/app.js")).is_script());
        assert!(ResourceRequest::get(url("http://localhost:3000/chunk.MJS")).is_script());
        assert!(
            ResourceRequest::get(url("http://localhost:3000/bundle"))
                .with_destination(Destination::Script)
                .is_script()
        );
        assert!(!ResourceRequest::get(url("http://localhost:3000/style.css")).is_script());
    }

    #[test]
    fn test_parse_mode_and_destination() {
        assert_eq!("no-cors".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert_eq!("Navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert!("sideways".parse::<RequestMode>().is_err());
        assert_eq!("image".parse::<Destination>().unwrap(), Destination::Image);
        assert_eq!("".parse::<Destination>().unwrap(), Destination::Empty);
    }
}
