//! # Student Repository
//!
//! Database operations for registered students.
//!
//! ## Lookup Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Student Lookups                                    │
//! │                                                                         │
//! │  Kiosk card scan  ──► find_by_card_uid("04A1B2C3")                     │
//! │  Manual entry     ──► find_by_index("UE2020001")                       │
//! │  Admin roster     ──► list_all()                                       │
//! │                                                                         │
//! │  index_number is the business key loans reference; card_uid is an      │
//! │  optional, unique convenience key.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use biblio_core::Student;

/// Repository for student database operations.
#[derive(Debug, Clone)]
pub struct StudentRepository {
    pool: SqlitePool,
}

impl StudentRepository {
    /// Creates a new StudentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StudentRepository { pool }
    }

    /// Inserts a new student.
    ///
    /// Duplicate index numbers or card UIDs surface as
    /// [`crate::DbError::UniqueViolation`] via the schema's unique indexes.
    pub async fn insert(&self, student: &Student) -> DbResult<()> {
        debug!(index_number = %student.index_number, "Inserting student");

        sqlx::query(
            r#"
            INSERT INTO students (
                id, index_number, full_name, program, level, phone,
                card_uid, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&student.id)
        .bind(&student.index_number)
        .bind(&student.full_name)
        .bind(&student.program)
        .bind(&student.level)
        .bind(&student.phone)
        .bind(&student.card_uid)
        .bind(student.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finds a student by index number.
    pub async fn find_by_index(&self, index_number: &str) -> DbResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, index_number, full_name, program, level, phone,
                   card_uid, created_at
            FROM students
            WHERE index_number = ?1
            "#,
        )
        .bind(index_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    /// Finds a student by linked card UID.
    pub async fn find_by_card_uid(&self, card_uid: &str) -> DbResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, index_number, full_name, program, level, phone,
                   card_uid, created_at
            FROM students
            WHERE card_uid = ?1
            "#,
        )
        .bind(card_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    /// Lists all students, newest registration first.
    pub async fn list_all(&self) -> DbResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, index_number, full_name, program, level, phone,
                   card_uid, created_at
            FROM students
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    /// Counts registered students.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::DbError;
    use biblio_core::Student;
    use chrono::Utc;

    fn student(index: &str, card: Option<&str>) -> Student {
        Student {
            id: uuid::Uuid::new_v4().to_string(),
            index_number: index.to_string(),
            full_name: "Alice Mensah".to_string(),
            program: "BSc Computer Science".to_string(),
            level: "300".to_string(),
            phone: "+233241234567".to_string(),
            card_uid: card.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.students();

        repo.insert(&student("UE2020001", Some("CARD-ALICE")))
            .await
            .unwrap();

        let by_index = repo.find_by_index("UE2020001").await.unwrap().unwrap();
        assert_eq!(by_index.full_name, "Alice Mensah");

        let by_card = repo.find_by_card_uid("CARD-ALICE").await.unwrap().unwrap();
        assert_eq!(by_card.index_number, "UE2020001");

        assert!(repo.find_by_index("UE9999999").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_index_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.students();

        repo.insert(&student("UE2020001", None)).await.unwrap();
        let err = repo.insert(&student("UE2020001", None)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_card_uid_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.students();

        repo.insert(&student("UE2020001", Some("CARD-1"))).await.unwrap();
        let err = repo
            .insert(&student("UE2020002", Some("CARD-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Two students without cards are fine
        repo.insert(&student("UE2020003", None)).await.unwrap();
        repo.insert(&student("UE2020004", None)).await.unwrap();
    }
}
