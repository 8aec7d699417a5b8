//! CORS policy built from the configured origin list.

use std::sync::Arc;

use axum::http::{header, request::Parts, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// Does `origin` match one of `patterns`?
///
/// `*` alone allows any origin. `scheme://*.suffix` allows any non-empty
/// subdomain label chain under `suffix` over that scheme.
pub fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|pattern| {
        if pattern == "*" {
            return true;
        }
        match pattern.split_once("://*.") {
            Some((scheme, suffix)) => origin
                .strip_prefix(scheme)
                .and_then(|rest| rest.strip_prefix("://"))
                .and_then(|host| host.strip_suffix(suffix))
                .and_then(|sub| sub.strip_suffix('.'))
                .is_some_and(|sub| {
                    !sub.is_empty() && sub.split('.').all(|label| !label.is_empty())
                        && !sub.contains(['/', ':'])
                }),
            None => pattern == origin,
        }
    })
}

pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let patterns: Arc<[String]> = config.origins.clone().into();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origin_allowed(&patterns, origin))
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        CorsConfig::default().origins
    }

    #[test]
    fn test_exact_and_wildcard_origins() {
        let p = defaults();
        assert!(origin_allowed(&p, "http://localhost:5173"));
        assert!(origin_allowed(&p, "https://my-app.vercel.app"));
        assert!(origin_allowed(&p, "https://preview.my-app.vercel.app"));
        assert!(origin_allowed(&p, "https://api.onrender.com"));

        assert!(!origin_allowed(&p, "http://localhost:3000"));
        assert!(!origin_allowed(&p, "https://vercel.app"));
        assert!(!origin_allowed(&p, "http://my-app.vercel.app"));
        assert!(!origin_allowed(&p, "https://evil.com/.vercel.app"));
        assert!(!origin_allowed(&p, "https://myvercel.app"));
    }

    #[test]
    fn test_star_allows_all() {
        assert!(origin_allowed(&["*".to_string()], "https://anything.test"));
        assert!(!origin_allowed(&[], "https://anything.test"));
    }
}
