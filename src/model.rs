//! Employee record and per-query result types
//!
//! Every type here is both a row mapping (`sqlx::FromRow`) and a wire shape
//! (`serde`), using camelCase names on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `employees` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[sqlx(rename = "empId")]
    pub emp_id: String,
    pub name: String,
    pub age: i32,
    pub salary: f64,
    pub city: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Build a fresh record from a create request.
    ///
    /// Both timestamps are set to the same instant.
    pub fn from_new(emp_id: String, new: NewEmployee, now: DateTime<Utc>) -> Self {
        Self {
            emp_id,
            name: new.name,
            age: new.age,
            salary: new.salary,
            city: new.city,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `POST /employee-create`
#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub age: i32,
    pub salary: f64,
    pub city: String,
}

/// Body of `POST /employee-update/{id}`
///
/// Only salary and city are read; any other field in the body is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeUpdate {
    pub salary: f64,
    pub city: String,
}

/// Response of `POST /employee-update/{id}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedEmployee {
    pub emp_id: String,
    pub salary: f64,
    pub city: String,
    pub updated_at: DateTime<Utc>,
}

/// One entry of `GET /employee-top/{n}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopEarner {
    #[sqlx(rename = "empId")]
    pub emp_id: String,
    pub name: String,
}

/// Result of `GET /most-payed-city`
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CitySalaryTotal {
    pub city: String,
    pub total_salary: f64,
}

/// Result of `GET /avg-salary/{city}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAverageSalary {
    pub city: String,
    pub avg_salary: f64,
}

/// One entry of `GET /employee-count-per-city`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CityHeadcount {
    pub city: String,
    pub count: i64,
}

/// One entry of `GET /city-salary-percentage`
///
/// `percentage` is `None` when the grand total is zero: the backend
/// evaluates the division to NULL.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CitySalaryShare {
    pub city: String,
    pub total_salary: f64,
    pub percentage: Option<f64>,
}
