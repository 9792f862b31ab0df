// SQL statements issued by the store
//
// Every user-supplied value is bound through a `?` placeholder; none of these
// strings is ever formatted with request data.

pub const LIST_BY_CREATION: &str = "SELECT * FROM employees ORDER BY created_at";

pub const LIST_BY_SALARY: &str = "SELECT * FROM employees ORDER BY salary DESC";

pub const LIST_BY_AGE: &str = "SELECT * FROM employees ORDER BY age, name";

pub const TOP_BY_SALARY: &str = "SELECT empId, name FROM employees ORDER BY salary DESC LIMIT ?";

pub const MOST_PAID_CITY: &str = "SELECT city, SUM(salary) AS total_salary FROM employees \
     GROUP BY city ORDER BY total_salary DESC LIMIT 1";

pub const AVG_SALARY_FOR_CITY: &str = "SELECT AVG(salary) FROM employees WHERE city = ?";

pub const COUNT_PER_CITY: &str = "SELECT city, COUNT(*) AS count FROM employees GROUP BY city";

pub const AGE_BETWEEN: &str = "SELECT * FROM employees WHERE age BETWEEN ? AND ?";

pub const CITY_SALARY_SHARE: &str = "SELECT city, SUM(salary) AS total_salary, \
     (SUM(salary) / (SELECT SUM(salary) FROM employees)) * 100 AS percentage \
     FROM employees GROUP BY city";

pub const INSERT_EMPLOYEE: &str = "INSERT INTO employees \
     (empId, name, age, salary, city, created_at, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?)";

pub const UPDATE_SALARY_AND_CITY: &str =
    "UPDATE employees SET salary = ?, city = ?, updated_at = ? WHERE empId = ?";
