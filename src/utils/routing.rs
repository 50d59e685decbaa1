//! Endpoint routing for catalog models
//!
//! Catalog endpoints are paths such as `/integrations/google-gemini-1-5/`.
//! Paths under the integration prefix are forwarded to the backend base URL
//! and always carry the two project identifying headers; absolute URLs pass
//! through untouched.

use crate::core::config::RoutingConfig;

pub const DEFAULT_BASE_URL: &str = "https://www.create.xyz";
pub const DEFAULT_PATH_PREFIX: &str = "/integrations/";
pub const PROJECT_ID_HEADER: &str = "x-createxyz-project-id";
pub const PROJECT_GROUP_ID_HEADER: &str = "x-createxyz-project-group-id";
pub const DEFAULT_PROJECT_ID: &str = "d2744a0b-bdaa-457b-bdcc-0781fe0544cf";
pub const DEFAULT_PROJECT_GROUP_ID: &str = "708f314c-dfc8-45a4-8127-925484986cd1";

/// Remove trailing slashes so endpoint joins never produce `//`
///
/// ```
/// use aihub::utils::routing::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/"), "https://api.example.com");
/// assert_eq!(normalize_base_url("https://api.example.com///"), "https://api.example.com");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them
///
/// ```
/// use aihub::utils::routing::join_url;
///
/// assert_eq!(
///     join_url("https://backend.example/", "/integrations/chat"),
///     "https://backend.example/integrations/chat"
/// );
/// ```
pub fn join_url(base_url: &str, path: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let path = path.trim_start_matches('/');
    format!("{}/{}", normalized_base, path)
}

fn is_absolute(endpoint: &str) -> bool {
    endpoint.starts_with("http://") || endpoint.starts_with("https://")
}

/// A resolved request target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

impl Route {
    /// Add the route's identifying headers to an HTTP request
    pub fn apply_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.headers
            .iter()
            .fold(request, |request, (name, value)| request.header(*name, value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    base_url: String,
    path_prefix: String,
    identifying_headers: Vec<(&'static str, String)>,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

impl Gateway {
    pub fn from_config(routing: &RoutingConfig) -> Self {
        let project_id = routing.project_id.as_deref().unwrap_or(DEFAULT_PROJECT_ID);
        let group_id = routing
            .project_group_id
            .as_deref()
            .unwrap_or(DEFAULT_PROJECT_GROUP_ID);
        let identifying_headers = vec![
            (PROJECT_ID_HEADER, project_id.to_string()),
            (PROJECT_GROUP_ID_HEADER, group_id.to_string()),
        ];

        Self {
            base_url: normalize_base_url(routing.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)),
            path_prefix: routing
                .path_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_PATH_PREFIX.to_string()),
            identifying_headers,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a catalog endpoint into a URL plus the headers it needs
    pub fn route(&self, endpoint: &str) -> Route {
        if is_absolute(endpoint) {
            return Route {
                url: endpoint.to_string(),
                headers: Vec::new(),
            };
        }

        let path = format!("/{}", endpoint.trim_start_matches('/'));
        let headers = if path.starts_with(&self.path_prefix) {
            self.identifying_headers.clone()
        } else {
            Vec::new()
        };

        Route {
            url: join_url(&self.base_url, &path),
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routing(base_url: &str) -> RoutingConfig {
        RoutingConfig {
            base_url: Some(base_url.to_string()),
            path_prefix: None,
            project_id: Some("project-1".to_string()),
            project_group_id: Some("group-1".to_string()),
        }
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.example.com/v1"),
            "https://api.example.com/v1"
        );
        assert_eq!(
            normalize_base_url("https://api.example.com/v1///"),
            "https://api.example.com/v1"
        );
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://127.0.0.1:8080", "integrations/x/"),
            "http://127.0.0.1:8080/integrations/x/"
        );
        assert_eq!(
            join_url("http://127.0.0.1:8080//", "///integrations/x"),
            "http://127.0.0.1:8080/integrations/x"
        );
    }

    #[test]
    fn test_prefixed_paths_get_identifying_headers() {
        let gateway = Gateway::from_config(&routing("http://backend.test/"));
        let route = gateway.route("/integrations/google-gemini-1-5/");

        assert_eq!(route.url, "http://backend.test/integrations/google-gemini-1-5/");
        assert_eq!(
            route.headers,
            vec![
                (PROJECT_ID_HEADER, "project-1".to_string()),
                (PROJECT_GROUP_ID_HEADER, "group-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_other_paths_are_joined_without_headers() {
        let gateway = Gateway::from_config(&routing("http://backend.test"));
        let route = gateway.route("/api/chat");

        assert_eq!(route.url, "http://backend.test/api/chat");
        assert!(route.headers.is_empty());
    }

    #[test]
    fn test_absolute_endpoints_pass_through() {
        let gateway = Gateway::from_config(&routing("http://backend.test"));
        let route = gateway.route("https://models.example/v1/chat");

        assert_eq!(route.url, "https://models.example/v1/chat");
        assert!(route.headers.is_empty());
    }

    #[test]
    fn test_defaults_send_builtin_identifiers() {
        let gateway = Gateway::default();
        assert_eq!(gateway.base_url(), DEFAULT_BASE_URL);

        let route = gateway.route("/integrations/chat-gpt/conversationgpt4");
        assert_eq!(
            route.url,
            "https://www.create.xyz/integrations/chat-gpt/conversationgpt4"
        );
        assert_eq!(
            route.headers,
            vec![
                ("x-createxyz-project-id", DEFAULT_PROJECT_ID.to_string()),
                ("x-createxyz-project-group-id", DEFAULT_PROJECT_GROUP_ID.to_string()),
            ]
        );
    }

    #[test]
    fn test_partial_override_keeps_other_default() {
        let config = RoutingConfig {
            project_group_id: None,
            ..routing("http://backend.test")
        };
        let route = Gateway::from_config(&config).route("/integrations/a");

        assert_eq!(
            route.headers,
            vec![
                (PROJECT_ID_HEADER, "project-1".to_string()),
                (PROJECT_GROUP_ID_HEADER, DEFAULT_PROJECT_GROUP_ID.to_string()),
            ]
        );
    }

    #[test]
    fn test_custom_prefix() {
        let config = RoutingConfig {
            path_prefix: Some("/proxy/".to_string()),
            ..routing("http://backend.test")
        };
        let gateway = Gateway::from_config(&config);

        assert!(gateway.route("/integrations/a").headers.is_empty());
        assert_eq!(gateway.route("/proxy/a").headers.len(), 2);
    }

    #[test]
    fn test_apply_headers_sets_request_headers() {
        let gateway = Gateway::from_config(&routing("http://backend.test"));
        let route = gateway.route("/integrations/a");

        let client = reqwest::Client::new();
        let request = route
            .apply_headers(client.post(&route.url))
            .build()
            .expect("request builds");

        assert_eq!(request.headers()[PROJECT_ID_HEADER], "project-1");
        assert_eq!(request.headers()[PROJECT_GROUP_ID_HEADER], "group-1");
    }
}
