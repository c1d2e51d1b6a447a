use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "7cf8a2e0-5f30-4f3e-9d3b-0c6f9a4b1c22",
        "employee_code": "E001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "department": "Engineering",
        "position": "Backend Engineer",
        "hire_date": "2024-01-01",
        "status": "ACTIVE",
        "shift_id": "b1a7f7b4-8a3e-4c36-9a7e-2f4f2df0a111"
    })
)]
pub struct Employee {
    pub id: Uuid,

    #[schema(example = "E001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com", nullable = true)]
    pub email: Option<String>,

    #[schema(nullable = true)]
    pub department: Option<String>,

    #[schema(nullable = true)]
    pub position: Option<String>,

    #[schema(example = "2024-01-01", value_type = String, format = "date", nullable = true)]
    pub hire_date: Option<NaiveDate>,

    pub status: EmployeeStatus,

    /// Current shift assignment; policy resolution starts here.
    #[schema(nullable = true)]
    pub shift_id: Option<Uuid>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn name_and_status_helpers() {
        let now = Utc::now();
        let mut employee = Employee {
            id: Uuid::new_v4(),
            employee_code: "E001".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: None,
            department: None,
            position: None,
            hire_date: None,
            status: EmployeeStatus::Active,
            shift_id: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(employee.full_name(), "John Doe");
        assert!(employee.is_active());
        employee.status = EmployeeStatus::Suspended;
        assert!(!employee.is_active());
    }
}
