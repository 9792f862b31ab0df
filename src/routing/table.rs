//! Route table module
//!
//! Declarative list of every endpoint the service exposes, matched by exact
//! path or by path prefix. No patterns, no wildcards.

use hyper::Method;

use super::params::PathParams;
use crate::error::ApiError;

/// What a matched route does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ListEmployees,
    ListBySalary,
    ListByAge,
    TopBySalary,
    MostPaidCity,
    AverageSalary,
    CountPerCity,
    AgeBetween,
    CitySalaryPercentage,
    CreateEmployee,
    UpdateEmployee,
    Upload,
}

/// How a route's pattern is compared with the request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch {
    /// Whole path equals the pattern
    Exact,
    /// Path starts with the pattern; the rest are path parameters
    Prefix,
}

#[derive(Debug)]
pub struct Route {
    pub pattern: &'static str,
    pub path_match: PathMatch,
    pub method: Method,
    pub endpoint: Endpoint,
    /// Number of `/`-separated segments after a prefix pattern
    pub params: usize,
}

const fn exact(pattern: &'static str, method: Method, endpoint: Endpoint) -> Route {
    Route {
        pattern,
        path_match: PathMatch::Exact,
        method,
        endpoint,
        params: 0,
    }
}

const fn prefix(pattern: &'static str, method: Method, endpoint: Endpoint, params: usize) -> Route {
    Route {
        pattern,
        path_match: PathMatch::Prefix,
        method,
        endpoint,
        params,
    }
}

pub static ROUTES: [Route; 12] = [
    exact("/employee", Method::GET, Endpoint::ListEmployees),
    exact("/employee-by-salary", Method::GET, Endpoint::ListBySalary),
    exact("/employee-by-age", Method::GET, Endpoint::ListByAge),
    prefix("/employee-top/", Method::GET, Endpoint::TopBySalary, 1),
    exact("/most-payed-city", Method::GET, Endpoint::MostPaidCity),
    prefix("/avg-salary/", Method::GET, Endpoint::AverageSalary, 1),
    exact("/employee-count-per-city", Method::GET, Endpoint::CountPerCity),
    prefix("/employee-age-between/", Method::GET, Endpoint::AgeBetween, 2),
    exact("/city-salary-percentage", Method::GET, Endpoint::CitySalaryPercentage),
    exact("/employee-create", Method::POST, Endpoint::CreateEmployee),
    prefix("/employee-update/", Method::POST, Endpoint::UpdateEmployee, 1),
    exact("/upload", Method::POST, Endpoint::Upload),
];

/// A route selected for a request, with its decoded path parameters
#[derive(Debug)]
pub struct ResolvedRoute {
    pub endpoint: Endpoint,
    pub params: PathParams,
}

/// Find the route registered for `path`, exact patterns first
fn find_route(path: &str) -> Option<&'static Route> {
    ROUTES
        .iter()
        .find(|r| r.path_match == PathMatch::Exact && r.pattern == path)
        .or_else(|| {
            ROUTES
                .iter()
                .find(|r| r.path_match == PathMatch::Prefix && path.starts_with(r.pattern))
        })
}

/// Select the endpoint for `method` + `path`.
///
/// The method is checked before any path parameter is parsed.
pub fn resolve(method: &Method, path: &str) -> Result<ResolvedRoute, ApiError> {
    let route =
        find_route(path).ok_or_else(|| ApiError::NotFound("404 page not found".to_string()))?;

    if route.method != *method {
        return Err(ApiError::MethodNotAllowed {
            allowed: route.method.clone(),
        });
    }

    let params = match route.path_match {
        PathMatch::Exact => PathParams::default(),
        PathMatch::Prefix => PathParams::extract(&path[route.pattern.len()..], route.params)?,
    };

    Ok(ResolvedRoute {
        endpoint: route.endpoint,
        params,
    })
}
