//! Record store module
//!
//! Adapter between the query handlers and the relational backend.
//! Holds one shared connection pool; every method runs exactly one
//! parameterized statement and returns the pooled connection when done.

mod error;
mod statements;

pub use error::StoreError;

use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::logger;
use crate::model::{
    CityHeadcount, CitySalaryShare, CitySalaryTotal, Employee, EmployeeUpdate, TopEarner,
};

/// Ordering applied by the full-table listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeOrder {
    /// Oldest record first
    CreatedAt,
    /// Highest salary first
    SalaryDesc,
    /// Youngest first, ties broken by name
    AgeThenName,
}

impl EmployeeOrder {
    const fn statement(self) -> &'static str {
        match self {
            Self::CreatedAt => statements::LIST_BY_CREATION,
            Self::SalaryDesc => statements::LIST_BY_SALARY,
            Self::AgeThenName => statements::LIST_BY_AGE,
        }
    }
}

#[derive(Debug, Clone)]
enum Backend {
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

/// Run the same statement body against whichever pool is configured
macro_rules! on_pool {
    ($backend:expr, $pool:ident => $body:expr) => {
        match $backend {
            Backend::MySql($pool) => $body,
            Backend::Sqlite($pool) => $body,
        }
    };
}

/// Handle to the `employees` table
///
/// Cloning is cheap: clones share the same pool.
#[derive(Debug, Clone)]
pub struct EmployeeStore {
    backend: Backend,
}

impl From<MySqlPool> for EmployeeStore {
    fn from(pool: MySqlPool) -> Self {
        Self {
            backend: Backend::MySql(pool),
        }
    }
}

impl From<SqlitePool> for EmployeeStore {
    fn from(pool: SqlitePool) -> Self {
        Self {
            backend: Backend::Sqlite(pool),
        }
    }
}

impl EmployeeStore {
    /// Open the pool described by `config`.
    ///
    /// The backend is chosen by URL scheme. At least one connection is
    /// established before this returns, so an unreachable database fails here.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_str();
        let acquire_timeout = Duration::from_secs(config.acquire_timeout_secs);

        if url.starts_with("mysql:") {
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect(url)
                .await?;
            Ok(Self::from(pool))
        } else if url.starts_with("sqlite:") {
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect(url)
                .await?;
            Ok(Self::from(pool))
        } else {
            Err(StoreError::UnsupportedUrl(redact_url(url)))
        }
    }

    pub const fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::MySql(_) => "mysql",
            Backend::Sqlite(_) => "sqlite",
        }
    }

    pub async fn close(&self) {
        on_pool!(&self.backend, pool => pool.close().await);
    }

    pub async fn list_employees(&self, order: EmployeeOrder) -> Result<Vec<Employee>, StoreError> {
        let sql = order.statement();
        log_statement(sql);
        let rows = on_pool!(&self.backend, pool => {
            sqlx::query_as::<_, Employee>(sql).fetch_all(pool).await?
        });
        Ok(rows)
    }

    /// Highest-paid employees, at most `limit` of them
    pub async fn top_earners(&self, limit: u32) -> Result<Vec<TopEarner>, StoreError> {
        let sql = statements::TOP_BY_SALARY;
        log_statement(sql);
        let rows = on_pool!(&self.backend, pool => {
            sqlx::query_as::<_, TopEarner>(sql)
                .bind(i64::from(limit))
                .fetch_all(pool)
                .await?
        });
        Ok(rows)
    }

    /// City whose salaries add up to the largest total
    pub async fn most_paid_city(&self) -> Result<CitySalaryTotal, StoreError> {
        let sql = statements::MOST_PAID_CITY;
        log_statement(sql);
        let row = on_pool!(&self.backend, pool => {
            sqlx::query_as::<_, CitySalaryTotal>(sql)
                .fetch_optional(pool)
                .await?
        });
        row.ok_or_else(|| StoreError::no_rows("No employees on record"))
    }

    pub async fn average_salary(&self, city: &str) -> Result<f64, StoreError> {
        let sql = statements::AVG_SALARY_FOR_CITY;
        log_statement(sql);
        // AVG over zero rows is NULL
        let average = on_pool!(&self.backend, pool => {
            sqlx::query_scalar::<_, Option<f64>>(sql)
                .bind(city)
                .fetch_one(pool)
                .await?
        });
        average.ok_or_else(|| StoreError::no_rows(format!("No employees in city '{city}'")))
    }

    pub async fn count_per_city(&self) -> Result<Vec<CityHeadcount>, StoreError> {
        let sql = statements::COUNT_PER_CITY;
        log_statement(sql);
        let rows = on_pool!(&self.backend, pool => {
            sqlx::query_as::<_, CityHeadcount>(sql).fetch_all(pool).await?
        });
        Ok(rows)
    }

    /// Employees with `from <= age <= to`
    pub async fn employees_aged_between(
        &self,
        from: i32,
        to: i32,
    ) -> Result<Vec<Employee>, StoreError> {
        let sql = statements::AGE_BETWEEN;
        log_statement(sql);
        let rows = on_pool!(&self.backend, pool => {
            sqlx::query_as::<_, Employee>(sql)
                .bind(from)
                .bind(to)
                .fetch_all(pool)
                .await?
        });
        Ok(rows)
    }

    /// Per-city salary totals and their share of the grand total
    pub async fn city_salary_shares(&self) -> Result<Vec<CitySalaryShare>, StoreError> {
        let sql = statements::CITY_SALARY_SHARE;
        log_statement(sql);
        let rows = on_pool!(&self.backend, pool => {
            sqlx::query_as::<_, CitySalaryShare>(sql).fetch_all(pool).await?
        });
        Ok(rows)
    }

    pub async fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        let sql = statements::INSERT_EMPLOYEE;
        log_statement(sql);
        on_pool!(&self.backend, pool => {
            sqlx::query(sql)
                .bind(employee.emp_id.as_str())
                .bind(employee.name.as_str())
                .bind(employee.age)
                .bind(employee.salary)
                .bind(employee.city.as_str())
                .bind(employee.created_at)
                .bind(employee.updated_at)
                .execute(pool)
                .await?;
        });
        Ok(())
    }

    /// Set salary, city and `updated_at` of one record.
    ///
    /// No other column is touched.
    pub async fn update_salary_and_city(
        &self,
        emp_id: &str,
        update: &EmployeeUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let sql = statements::UPDATE_SALARY_AND_CITY;
        log_statement(sql);
        let affected = on_pool!(&self.backend, pool => {
            sqlx::query(sql)
                .bind(update.salary)
                .bind(update.city.as_str())
                .bind(updated_at)
                .bind(emp_id)
                .execute(pool)
                .await?
                .rows_affected()
        });
        if affected == 0 {
            return Err(StoreError::no_rows(format!("No employee with id '{emp_id}'")));
        }
        Ok(())
    }
}

fn log_statement(sql: &str) {
    logger::log_debug(&format!("[STORE] {sql}"));
}

/// Drop credentials before a URL ends up in an error message
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
