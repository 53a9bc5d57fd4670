//! Static path-prefix routing.

use gatehouse_core::config::gateway::RouteConfig;

/// A prefix → service mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Normalized prefix (no trailing `/` except for the root).
    pub prefix: String,
    /// Target service name.
    pub service: String,
    /// Remove the prefix before forwarding.
    pub strip_prefix: bool,
}

impl Route {
    /// Whether `path` falls under this route (segment boundary aware).
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The upstream path for `path`. An empty remainder becomes `/`.
    pub fn rewrite(&self, path: &str) -> String {
        if !self.strip_prefix || self.prefix == "/" {
            return path.to_string();
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") | None => "/".to_string(),
            Some(rest) => rest.to_string(),
        }
    }
}

/// Routes ordered so the longest prefix wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Builds a table from configuration.
    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let mut routes: Vec<Route> = routes
            .iter()
            .map(|r| {
                let trimmed = r.prefix.trim_end_matches('/');
                Route {
                    prefix: if trimmed.is_empty() {
                        "/".to_string()
                    } else {
                        trimmed.to_string()
                    },
                    service: r.service.clone(),
                    strip_prefix: r.strip_prefix,
                }
            })
            .collect();
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { routes }
    }

    /// The route with the longest prefix matching `path`.
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path))
    }

    /// All routes, longest prefix first.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str, service: &str) -> RouteConfig {
        RouteConfig {
            prefix: prefix.to_string(),
            service: service.to_string(),
            strip_prefix: true,
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::from_config(&[
            route("/v1", "catch-all"),
            route("/v1/user", "user-service"),
        ]);
        assert_eq!(table.find("/v1/user/42").unwrap().service, "user-service");
        assert_eq!(table.find("/v1/student").unwrap().service, "catch-all");
    }

    #[test]
    fn test_segment_boundary() {
        let table = RouteTable::from_config(&[route("/v1/user", "user-service")]);
        assert!(table.find("/v1/user").is_some());
        assert!(table.find("/v1/users").is_none());
        assert!(table.find("/v2/user").is_none());
    }

    #[test]
    fn test_rewrite() {
        let table = RouteTable::from_config(&[route("/v1/user/", "user-service")]);
        let route = table.find("/v1/user/profile").unwrap();
        assert_eq!(route.rewrite("/v1/user/profile"), "/profile");
        assert_eq!(route.rewrite("/v1/user"), "/");
        assert_eq!(route.rewrite("/v1/user/"), "/");
    }

    #[test]
    fn test_no_strip() {
        let mut config = route("/v1/user", "user-service");
        config.strip_prefix = false;
        let table = RouteTable::from_config(&[config]);
        let route = table.find("/v1/user/profile").unwrap();
        assert_eq!(route.rewrite("/v1/user/profile"), "/v1/user/profile");
    }

    #[test]
    fn test_root_route() {
        let table = RouteTable::from_config(&[route("/", "web")]);
        let route = table.find("/anything").unwrap();
        assert_eq!(route.rewrite("/anything"), "/anything");
    }
}
