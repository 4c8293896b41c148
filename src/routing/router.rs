//! Route lookup.
//!
//! # Responsibilities
//! - Compile route specs into path templates at startup
//! - Look up the route for (method, path)
//! - Render the upstream path for a match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order; first match wins
//! - Explicit no-match rather than silent default

use crate::bridge::Method;
use crate::routing::matcher::{PathParams, PathTemplate};
use crate::routing::table::{RouteSpec, ROUTES};

/// A route spec with its templates parsed.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub spec: &'static RouteSpec,
    gateway: PathTemplate,
    upstream: PathTemplate,
}

impl CompiledRoute {
    fn compile(spec: &'static RouteSpec) -> Self {
        Self {
            spec,
            gateway: PathTemplate::parse(spec.gateway),
            upstream: PathTemplate::parse(spec.upstream),
        }
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a CompiledRoute,
    pub params: PathParams,
    /// Upstream path with parameters substituted, without query string.
    pub upstream_path: String,
}

impl RouteMatch<'_> {
    pub fn spec(&self) -> &'static RouteSpec {
        self.route.spec
    }

    /// Upstream path, with `query` appended when the route forwards queries.
    pub fn upstream_target(&self, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(query) if self.route.spec.forwards_query => {
                format!("{}?{}", self.upstream_path, query)
            }
            _ => self.upstream_path.clone(),
        }
    }
}

/// Compiled gateway route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::compile(ROUTES)
    }
}

impl RouteTable {
    pub fn compile(specs: &'static [RouteSpec]) -> Self {
        let routes = specs.iter().map(CompiledRoute::compile).collect::<Vec<_>>();
        tracing::debug!(routes = routes.len(), "Route table compiled");
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn specs(&self) -> impl Iterator<Item = &'static RouteSpec> + '_ {
        self.routes.iter().map(|route| route.spec)
    }

    /// Find the first route matching `method` and `path`.
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.spec.method == method)
            .find_map(|route| {
                let params = route.gateway.matches(path)?;
                let upstream_path = route.upstream.render(&params)?;
                Some(RouteMatch {
                    route,
                    params,
                    upstream_path,
                })
            })
    }
}
