//! Employee query handlers
//!
//! One function per endpoint. Each parses its parameters first, so a
//! malformed request never reaches the store, then runs a single statement
//! and encodes the result.

use chrono::{DateTime, SubsecRound, Utc};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::build_json_response;
use crate::model::{CityAverageSalary, Employee, EmployeeUpdate, NewEmployee, UpdatedEmployee};
use crate::routing::PathParams;
use crate::store::{EmployeeOrder, EmployeeStore};

pub type HandlerResult = Result<Response<Full<Bytes>>, ApiError>;

/// `GET /employee`, `/employee-by-salary`, `/employee-by-age`
pub async fn list(store: &EmployeeStore, order: EmployeeOrder) -> HandlerResult {
    let employees = store.list_employees(order).await?;
    build_json_response(StatusCode::OK, &employees)
}

/// `GET /employee-top/{n}`
pub async fn top_by_salary(store: &EmployeeStore, params: &PathParams) -> HandlerResult {
    let limit: u32 = params.number(0, "number")?;
    let earners = store.top_earners(limit).await?;
    build_json_response(StatusCode::OK, &earners)
}

/// `GET /most-payed-city`
pub async fn most_paid_city(store: &EmployeeStore) -> HandlerResult {
    let city = store.most_paid_city().await?;
    build_json_response(StatusCode::OK, &city)
}

/// `GET /avg-salary/{city}`
pub async fn average_salary(store: &EmployeeStore, params: &PathParams) -> HandlerResult {
    let city = params.text(0);
    let avg_salary = store.average_salary(city).await?;
    build_json_response(
        StatusCode::OK,
        &CityAverageSalary {
            city: city.to_string(),
            avg_salary,
        },
    )
}

/// `GET /employee-count-per-city`
pub async fn count_per_city(store: &EmployeeStore) -> HandlerResult {
    let counts = store.count_per_city().await?;
    build_json_response(StatusCode::OK, &counts)
}

/// `GET /employee-age-between/{from}/{to}`
pub async fn age_between(store: &EmployeeStore, params: &PathParams) -> HandlerResult {
    let from: i32 = params.number(0, "from_age")?;
    let to: i32 = params.number(1, "to_age")?;
    let employees = store.employees_aged_between(from, to).await?;
    build_json_response(StatusCode::OK, &employees)
}

/// `GET /city-salary-percentage`
pub async fn city_salary_percentage(store: &EmployeeStore) -> HandlerResult {
    let shares = store.city_salary_shares().await?;
    build_json_response(StatusCode::OK, &shares)
}

/// `POST /employee-create`
pub async fn create(store: &EmployeeStore, body: &[u8]) -> HandlerResult {
    let new: NewEmployee = parse_json(body)?;
    let employee = Employee::from_new(Uuid::new_v4().to_string(), new, now());
    store.insert_employee(&employee).await?;
    build_json_response(StatusCode::CREATED, &employee)
}

/// `POST /employee-update/{id}`
///
/// Changes salary and city only, whatever else the body carries.
pub async fn update(store: &EmployeeStore, params: &PathParams, body: &[u8]) -> HandlerResult {
    let emp_id = params.text(0);
    let update: EmployeeUpdate = parse_json(body)?;
    let updated_at = now();
    store
        .update_salary_and_city(emp_id, &update, updated_at)
        .await?;
    build_json_response(
        StatusCode::OK,
        &UpdatedEmployee {
            emp_id: emp_id.to_string(),
            salary: update.salary,
            city: update.city,
            updated_at,
        },
    )
}

/// Current time at the microsecond precision a `DATETIME(6)` column keeps,
/// so echoed timestamps match what a later read returns
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_now_has_microsecond_precision() {
        for _ in 0..20 {
            assert_eq!(now().nanosecond() % 1000, 0);
        }
    }
}
