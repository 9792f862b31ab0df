//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: CORS preflight, route
//! resolution, body limits, dispatch to a handler and access logging.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE, REFERER, USER_AGENT};
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{employees, upload};
use crate::config::AppState;
use crate::error::ApiError;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, Endpoint};
use crate::store::EmployeeOrder;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Main entry point for HTTP request handling
///
/// Every response, errors included, carries the CORS headers.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let access_entry = state
        .access_log()
        .then(|| access_log_entry(&req, peer_addr));

    let mut response = if req.method() == Method::OPTIONS {
        http::build_options_response()
    } else {
        match dispatch(req, &state).await {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    logger::log_error(&err.to_string());
                }
                http::build_error_response(&err)
            }
        }
    };
    http::apply_common_headers(&mut response, &state.config.http.server_name);

    if let Some(mut entry) = access_entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Resolve the route and run its handler
async fn dispatch<B>(req: Request<B>, state: &AppState) -> employees::HandlerResult
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let resolved = routing::resolve(req.method(), req.uri().path())?;
    let max_body_size = state.config.http.max_body_size;
    check_body_size(req.headers(), max_body_size)?;

    let store = &state.store;
    let params = &resolved.params;
    match resolved.endpoint {
        Endpoint::ListEmployees => employees::list(store, EmployeeOrder::CreatedAt).await,
        Endpoint::ListBySalary => employees::list(store, EmployeeOrder::SalaryDesc).await,
        Endpoint::ListByAge => employees::list(store, EmployeeOrder::AgeThenName).await,
        Endpoint::TopBySalary => employees::top_by_salary(store, params).await,
        Endpoint::MostPaidCity => employees::most_paid_city(store).await,
        Endpoint::AverageSalary => employees::average_salary(store, params).await,
        Endpoint::CountPerCity => employees::count_per_city(store).await,
        Endpoint::AgeBetween => employees::age_between(store, params).await,
        Endpoint::CitySalaryPercentage => employees::city_salary_percentage(store).await,
        Endpoint::CreateEmployee => {
            let body = read_body(req, max_body_size).await?;
            employees::create(store, &body).await
        }
        Endpoint::UpdateEmployee => {
            let body = read_body(req, max_body_size).await?;
            employees::update(store, params, &body).await
        }
        Endpoint::Upload => {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            let body = read_body(req, max_body_size).await?;
            upload::handle_upload(content_type.as_deref(), body, &state.config.upload).await
        }
    }
}

/// Reject a declared Content-Length above the limit before reading anything
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Result<(), ApiError> {
    let Some(content_length) = headers.get(CONTENT_LENGTH) else {
        return Ok(());
    };
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return Ok(());
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => Err(ApiError::PayloadTooLarge(format!(
            "Request body too large: {size} bytes (max: {max_body_size})"
        ))),
        Ok(_) => Ok(()),
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            Ok(())
        }
    }
}

/// Collect the body, enforcing the limit on bodies without a Content-Length
async fn read_body<B>(req: Request<B>, max_body_size: u64) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ApiError::PayloadTooLarge(format!(
            "Request body too large (max: {max_body_size} bytes)"
        ))),
        Err(e) => Err(ApiError::bad_request(format!(
            "Failed to read request body: {e}"
        ))),
    }
}

fn access_log_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::Employee;
    use crate::store::test_support::{memory_store, unprovisioned_store};
    use crate::store::EmployeeStore;
    use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_ALLOW_METHODS};
    use hyper::StatusCode;
    use serde_json::{json, Value};

    fn state_with(store: EmployeeStore) -> Arc<AppState> {
        let mut config = Config::load_from("/nonexistent/employee-service-config").unwrap();
        config.logging.access_log = false;
        Arc::new(AppState::new(config, store))
    }

    async fn provisioned() -> Arc<AppState> {
        state_with(memory_store().await)
    }

    /// State whose store fails every statement, to prove no storage access
    async fn unprovisioned() -> Arc<AppState> {
        state_with(unprovisioned_store().await)
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        body: &str,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let response = handle_request(req, Arc::clone(state), peer).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (parts.status, parts.headers, bytes)
    }

    async fn get_json(state: &Arc<AppState>, uri: &str) -> Value {
        let (status, _, body) = send(state, Method::GET, uri, "").await;
        assert_eq!(status, StatusCode::OK, "GET {uri}: {body:?}");
        serde_json::from_slice(&body).unwrap()
    }

    async fn create(state: &Arc<AppState>, name: &str, age: i32, salary: f64, city: &str) -> Employee {
        let body = json!({"name": name, "age": age, "salary": salary, "city": city}).to_string();
        let (status, _, bytes) = send(state, Method::POST, "/employee-create", &body).await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed(state: &Arc<AppState>) {
        create(state, "Carla", 41, 4000.0, "Porto").await;
        create(state, "Ana", 30, 5000.0, "Porto").await;
        create(state, "Bruno", 30, 7000.0, "Lisbon").await;
        create(state, "Duarte", 25, 2000.0, "Braga").await;
    }

    #[tokio::test]
    async fn test_options_short_circuits() {
        let state = unprovisioned().await;
        let (status, headers, body) = send(&state, Method::OPTIONS, "/employee-top/abc", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert!(headers.contains_key("Access-Control-Allow-Headers"));
    }

    #[tokio::test]
    async fn test_non_numeric_top_is_client_error() {
        let state = unprovisioned().await;
        let (status, headers, body) = send(&state, Method::GET, "/employee-top/abc", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).starts_with("Invalid number"));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_client_errors_skip_storage() {
        let state = unprovisioned().await;
        let cases = [
            (Method::GET, "/employee-top/5/6", ""),
            (Method::GET, "/employee-age-between/20/x", ""),
            (Method::GET, "/employee-age-between/x/20", ""),
            (Method::POST, "/employee-create", "{not json"),
            (Method::POST, "/employee-create", r#"{"name":"Ana"}"#),
            (Method::POST, "/employee-update/abc", r#"{"salary":"high"}"#),
        ];
        for (method, uri, body) in cases {
            let (status, _, text) = send(&state, method.clone(), uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}: {text:?}");
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_server_error() {
        let state = unprovisioned().await;
        let (status, _, body) = send(&state, Method::GET, "/employee", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method_and_unknown_route() {
        let state = unprovisioned().await;

        let (status, headers, body) = send(&state, Method::GET, "/employee-create", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "Method not allowed");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[hyper::header::ALLOW], "POST, OPTIONS");

        let (_, headers, _) = send(&state, Method::POST, "/employee", "").await;
        assert_eq!(headers[hyper::header::ALLOW], "GET, OPTIONS");

        let (status, _, _) = send(&state, Method::DELETE, "/employee", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _, _) = send(&state, Method::GET, "/nowhere", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_then_average() {
        let state = provisioned().await;
        let created = create(&state, "Ana", 30, 5000.0, "Porto").await;
        assert!(!created.emp_id.is_empty());
        assert_eq!(created.created_at, created.updated_at);

        let avg = get_json(&state, "/avg-salary/Porto").await;
        assert_eq!(avg, json!({"city": "Porto", "avgSalary": 5000.0}));
    }

    #[tokio::test]
    async fn test_created_timestamps_fit_microsecond_columns() {
        use chrono::Timelike;

        let state = provisioned().await;
        for i in 0..20 {
            let created = create(&state, &format!("E{i}"), 30, 1000.0, "Porto").await;
            assert_eq!(created.created_at.nanosecond() % 1000, 0);
            assert_eq!(created.updated_at.nanosecond() % 1000, 0);
        }
    }

    #[tokio::test]
    async fn test_average_for_unknown_city() {
        let state = provisioned().await;
        let (status, _, _) = send(&state, Method::GET, "/avg-salary/Nowhere", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_created_ids_are_unique() {
        let state = provisioned().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(create(&state, &format!("E{i}"), 20 + i, 1000.0, "Porto").await.emp_id);
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_update_changes_only_salary_and_city() {
        let state = provisioned().await;
        let created = create(&state, "Ana", 30, 5000.0, "Porto").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let body = json!({
            "salary": 6500.0,
            "city": "Lisbon",
            "name": "Someone Else",
            "age": 99
        })
        .to_string();
        let uri = format!("/employee-update/{}", created.emp_id);
        let (status, _, bytes) = send(&state, Method::POST, &uri, &body).await;
        assert_eq!(status, StatusCode::OK);
        let echoed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(echoed["empId"], created.emp_id.as_str());
        assert_eq!(echoed["city"], "Lisbon");

        let all: Vec<Employee> =
            serde_json::from_value(get_json(&state, "/employee").await).unwrap();
        let after = all.iter().find(|e| e.emp_id == created.emp_id).unwrap();
        assert!((after.salary - 6500.0).abs() < 1e-9);
        assert_eq!(after.city, "Lisbon");
        assert_eq!(after.name, "Ana");
        assert_eq!(after.age, 30);
        assert_eq!(after.created_at, created.created_at);
        assert!(after.updated_at > after.created_at);
        let echoed_at: chrono::DateTime<chrono::Utc> =
            serde_json::from_value(echoed["updatedAt"].clone()).unwrap();
        assert_eq!(echoed_at, after.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let state = provisioned().await;
        let (status, _, _) = send(
            &state,
            Method::POST,
            "/employee-update/missing",
            r#"{"salary":1,"city":"Porto"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listings() {
        let state = provisioned().await;
        let empty = get_json(&state, "/employee").await;
        assert_eq!(empty, json!([]));

        seed(&state).await;

        let by_salary: Vec<Employee> =
            serde_json::from_value(get_json(&state, "/employee-by-salary").await).unwrap();
        assert_eq!(by_salary.len(), 4);
        assert!(by_salary.windows(2).all(|w| w[0].salary >= w[1].salary));

        let by_age: Vec<Employee> =
            serde_json::from_value(get_json(&state, "/employee-by-age").await).unwrap();
        let names: Vec<&str> = by_age.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Duarte", "Ana", "Bruno", "Carla"]);

        let by_creation: Vec<Employee> =
            serde_json::from_value(get_json(&state, "/employee").await).unwrap();
        assert!(by_creation.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_top_returns_min_of_n_and_total() {
        let state = provisioned().await;
        seed(&state).await;

        let top = get_json(&state, "/employee-top/2").await;
        let top = top.as_array().unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0]["name"], "Bruno");
        assert_eq!(top[1]["name"], "Ana");
        assert_eq!(top[0].as_object().unwrap().len(), 2);

        let all = get_json(&state, "/employee-top/50").await;
        assert_eq!(all.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_age_range_inclusive() {
        let state = provisioned().await;
        seed(&state).await;

        let rows: Vec<Employee> =
            serde_json::from_value(get_json(&state, "/employee-age-between/25/30").await).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|e| (25..=30).contains(&e.age)));
    }

    #[tokio::test]
    async fn test_city_aggregates() {
        let state = provisioned().await;
        let (status, _, _) = send(&state, Method::GET, "/most-payed-city", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(get_json(&state, "/city-salary-percentage").await, json!([]));

        seed(&state).await;

        assert_eq!(
            get_json(&state, "/most-payed-city").await,
            json!({"city": "Porto", "totalSalary": 9000.0})
        );

        let counts = get_json(&state, "/employee-count-per-city").await;
        let porto = counts
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["city"] == "Porto")
            .unwrap();
        assert_eq!(porto["count"], 2);

        let shares = get_json(&state, "/city-salary-percentage").await;
        let total: f64 = shares
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["percentage"].as_f64().unwrap())
            .sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_declared_body_over_limit() {
        let mut config = Config::load_from("/nonexistent/employee-service-config").unwrap();
        config.logging.access_log = false;
        config.http.max_body_size = 8;
        let state = Arc::new(AppState::new(config, unprovisioned_store().await));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/employee-create")
            .header(CONTENT_LENGTH, "1024")
            .body(Full::new(Bytes::from("{}")))
            .unwrap();
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let response = handle_request(req, state, peer).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_undeclared_body_over_limit() {
        let mut config = Config::load_from("/nonexistent/employee-service-config").unwrap();
        config.logging.access_log = false;
        config.http.max_body_size = 8;
        let state = Arc::new(AppState::new(config, unprovisioned_store().await));

        let (status, _, _) = send(
            &state,
            Method::POST,
            "/employee-create",
            r#"{"name":"A long enough body"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_check_body_size() {
        let mut headers = HeaderMap::new();
        assert!(check_body_size(&headers, 10).is_ok());

        headers.insert(CONTENT_LENGTH, "10".parse().unwrap());
        assert!(check_body_size(&headers, 10).is_ok());

        headers.insert(CONTENT_LENGTH, "11".parse().unwrap());
        assert!(matches!(
            check_body_size(&headers, 10),
            Err(ApiError::PayloadTooLarge(_))
        ));

        headers.insert(CONTENT_LENGTH, "abc".parse().unwrap());
        assert!(check_body_size(&headers, 10).is_ok());
    }
}
