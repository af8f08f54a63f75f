//! Static route table and first-match dispatch.

use glob::{MatchOptions, Pattern};
use tiny_http::Method;
use tracing::debug;

use super::handlers;
use super::{ApiContext, ApiRequest, ApiResponse};
use crate::error::{ApiError, ServerError};

pub type Handler = fn(&ApiContext, &ApiRequest) -> Result<ApiResponse, ApiError>;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Literal paths or glob patterns; `*` stays within one path segment.
const API_ROUTES: &[(&str, Method, Handler)] = &[
    ("/", Method::Get, handlers::status),
    ("/projects", Method::Get, handlers::list_projects),
    ("/projects", Method::Post, handlers::create_project),
    ("/projects/files", Method::Get, handlers::project_files),
    ("/projects/files/delete", Method::Post, handlers::delete_project_file),
    ("/files", Method::Get, handlers::get_file),
    ("/files", Method::Post, handlers::create_file),
    ("/files/update", Method::Post, handlers::update_file),
    ("/folders", Method::Post, handlers::create_folder),
];

pub struct Route {
    pattern: Pattern,
    method: Method,
    handler: Handler,
}

impl Route {
    pub fn new(pattern: &str, method: Method, handler: Handler) -> Result<Self, ServerError> {
        let pattern = Pattern::new(pattern).map_err(|err| {
            ServerError::InvalidConfig(format!("route pattern '{pattern}': {err}").into())
        })?;
        Ok(Self {
            pattern,
            method,
            handler,
        })
    }

    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.pattern.matches_with(path, MATCH_OPTIONS)
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Routes are scanned in declaration order and the first match wins, so a
/// pattern must come after any narrower route it would also match.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(table: &[(&str, Method, Handler)]) -> Result<Self, ServerError> {
        let routes = table
            .iter()
            .map(|(pattern, method, handler)| Route::new(pattern, method.clone(), *handler))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    pub fn api() -> Result<Self, ServerError> {
        Self::new(API_ROUTES)
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn dispatch(&self, context: &ApiContext, request: &ApiRequest) -> ApiResponse {
        if request.method == Method::Options {
            return ApiResponse::preflight();
        }
        let Some(route) = self
            .routes
            .iter()
            .find(|route| route.matches(&request.method, &request.path))
        else {
            debug!(path = %request.path, method = request.method.as_str(), "no route");
            return ApiResponse::error(&ApiError::not_found("Not found"));
        };
        debug!(pattern = route.pattern(), method = request.method.as_str(), "matched route");
        (route.handler)(context, request).unwrap_or_else(|err| ApiResponse::error(&err))
    }
}
