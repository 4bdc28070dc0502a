//! SQLite storage for accounts and complaints

use crate::auth::types::User;
use crate::complaints::types::{Complaint, ComplaintStatus, IssueType};
use crate::error::{Error, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

// Rows written by older deployments may carry NULLs in the text columns
const COMPLAINT_COLUMNS: &str = "id, username, COALESCE(student_name, ''), \
     COALESCE(issue_type, 'Other'), COALESCE(description, ''), COALESCE(status, 'pending'), \
     COALESCE(admin_response, ''), created_at";

/// Helpdesk database
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // WAL is best effort; some filesystems refuse it
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        tracing::info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Internal(format!("database lock poisoned: {}", e)))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('student', 'admin'))
            );

            CREATE TABLE IF NOT EXISTS complaints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                student_name TEXT NOT NULL DEFAULT '',
                issue_type TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                admin_response TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );
            ",
        )?;

        // Older databases predate per-account complaint tracking
        let columns = column_names(&conn, "complaints")?;
        if !columns.iter().any(|c| c == "username") {
            conn.execute_batch(
                "ALTER TABLE complaints ADD COLUMN username TEXT NOT NULL DEFAULT '';
                 UPDATE complaints SET username = COALESCE(student_name, '');",
            )?;
            tracing::info!("Migrated complaints table: added username");
        }
        if !columns.iter().any(|c| c == "created_at") {
            conn.execute_batch(
                "ALTER TABLE complaints ADD COLUMN created_at INTEGER NOT NULL DEFAULT 0;",
            )?;
            tracing::info!("Migrated complaints table: added created_at");
        }

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_complaints_username ON complaints(username);",
        )?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a user. Returns false when the username or email is taken.
    pub fn register_user(&self, user: &User) -> Result<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO users (username, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.username,
                user.email,
                user.password_hash,
                user.role.as_str()
            ],
        );
        match inserted {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT username, email, password_hash, role FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(username, email, password_hash, role)| {
            Ok(User {
                username,
                email,
                password_hash,
                role: role.parse().map_err(Error::Internal)?,
            })
        })
        .transpose()
    }

    // =========================================================================
    // Complaints
    // =========================================================================

    /// Store a new pending complaint and return it
    pub fn save_complaint(
        &self,
        username: &str,
        student_name: &str,
        issue_type: IssueType,
        description: &str,
    ) -> Result<Complaint> {
        let created_at = chrono::Utc::now().timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO complaints (username, student_name, issue_type, description, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            params![
                username,
                student_name,
                issue_type.as_str(),
                description,
                created_at
            ],
        )?;

        Ok(Complaint {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            student_name: student_name.to_string(),
            issue_type,
            description: description.to_string(),
            status: ComplaintStatus::Pending,
            admin_response: String::new(),
            created_at,
        })
    }

    /// All complaints, newest first
    pub fn list_complaints(&self) -> Result<Vec<Complaint>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM complaints ORDER BY id DESC",
            COMPLAINT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], read_complaint_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ComplaintRow::into_complaint).collect()
    }

    /// Complaints filed by `username`, newest first, optionally by status
    pub fn list_user_complaints(
        &self,
        username: &str,
        status: Option<ComplaintStatus>,
    ) -> Result<Vec<Complaint>> {
        let conn = self.lock()?;
        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM complaints WHERE username = ?1 AND status = ?2 ORDER BY id DESC",
                    COMPLAINT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![username, status.as_str()], read_complaint_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM complaints WHERE username = ?1 ORDER BY id DESC",
                    COMPLAINT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![username], read_complaint_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        rows.into_iter().map(ComplaintRow::into_complaint).collect()
    }

    pub fn get_complaint(&self, id: i64) -> Result<Option<Complaint>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM complaints WHERE id = ?1", COMPLAINT_COLUMNS),
                params![id],
                read_complaint_row,
            )
            .optional()?;
        row.map(ComplaintRow::into_complaint).transpose()
    }

    /// Set status and admin response. Returns false when no such complaint exists.
    pub fn update_complaint(
        &self,
        id: i64,
        status: ComplaintStatus,
        admin_response: &str,
    ) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE complaints SET status = ?1, admin_response = ?2 WHERE id = ?3",
            params![status.as_str(), admin_response, id],
        )?;
        Ok(changed > 0)
    }

    /// Cheap liveness probe used by `doctor`
    pub fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Raw column values; enum columns are parsed after the row is read
struct ComplaintRow {
    id: i64,
    username: String,
    student_name: String,
    issue_type: String,
    description: String,
    status: String,
    admin_response: String,
    created_at: i64,
}

fn read_complaint_row(row: &Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        username: row.get(1)?,
        student_name: row.get(2)?,
        issue_type: row.get(3)?,
        description: row.get(4)?,
        status: row.get(5)?,
        admin_response: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl ComplaintRow {
    fn into_complaint(self) -> Result<Complaint> {
        Ok(Complaint {
            id: self.id,
            username: self.username,
            student_name: self.student_name,
            issue_type: self.issue_type.parse().map_err(Error::Internal)?,
            description: self.description,
            status: self.status.parse().map_err(Error::Internal)?,
            admin_response: self.admin_response,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::Role;
    use tempfile::TempDir;

    fn user(username: &str, email: &str, role: Role) -> User {
        User {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role,
        }
    }

    #[test]
    fn test_register_and_get_user() {
        let db = Database::open_in_memory().unwrap();
        let ravi = user("ravi", "ravi@pvpsit.ac.in", Role::Student);
        assert!(db.register_user(&ravi).unwrap());

        assert_eq!(db.get_user("ravi").unwrap(), Some(ravi));
        assert!(db.get_user("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_or_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db
            .register_user(&user("ravi", "ravi@pvpsit.ac.in", Role::Student))
            .unwrap());
        assert!(!db
            .register_user(&user("ravi", "other@pvpsit.ac.in", Role::Student))
            .unwrap());
        assert!(!db
            .register_user(&user("ravi2", "ravi@pvpsit.ac.in", Role::Student))
            .unwrap());
    }

    #[test]
    fn test_complaints_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .save_complaint("ravi", "Ravi", IssueType::Infrastructure, "Fan broken")
            .unwrap();
        let second = db
            .save_complaint("sita", "", IssueType::Academics, "Timetable clash")
            .unwrap();

        assert_eq!(first.status, ComplaintStatus::Pending);
        let all = db.list_complaints().unwrap();
        assert_eq!(
            all.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert_eq!(all[0].student_name, "");
    }

    #[test]
    fn test_user_complaints_filtered_by_status() {
        let db = Database::open_in_memory().unwrap();
        let a = db
            .save_complaint("ravi", "Ravi", IssueType::Ragging, "Hostel")
            .unwrap();
        db.save_complaint("ravi", "Ravi", IssueType::Other, "Canteen")
            .unwrap();
        db.save_complaint("sita", "Sita", IssueType::Other, "Library")
            .unwrap();

        assert!(db
            .update_complaint(a.id, ComplaintStatus::Resolved, "Warden informed")
            .unwrap());

        assert_eq!(db.list_user_complaints("ravi", None).unwrap().len(), 2);
        let resolved = db
            .list_user_complaints("ravi", Some(ComplaintStatus::Resolved))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].admin_response, "Warden informed");
    }

    #[test]
    fn test_update_missing_complaint() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db
            .update_complaint(99, ComplaintStatus::InProgress, "")
            .unwrap());
        assert!(db.get_complaint(99).unwrap().is_none());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("helpdesk.db");
        {
            let db = Database::open(&path).unwrap();
            db.register_user(&user("admin1", "a@pvpsiddhartha.ac.in", Role::Admin))
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_user("admin1").unwrap().unwrap().role, Role::Admin);
        db.ping().unwrap();
    }

    #[test]
    fn test_open_migrates_legacy_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("helpdesk.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "
                CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT UNIQUE,
                    email TEXT UNIQUE,
                    password_hash TEXT,
                    role TEXT CHECK(role IN ('student', 'admin'))
                );
                CREATE TABLE complaints (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    student_name TEXT,
                    issue_type TEXT,
                    description TEXT,
                    status TEXT DEFAULT 'pending',
                    admin_response TEXT DEFAULT ''
                );
                INSERT INTO complaints (student_name, issue_type, description, status)
                    VALUES ('ravi', 'Infrastructure', 'Fan broken', 'in progress');
                INSERT INTO complaints (student_name, issue_type, description)
                    VALUES (NULL, 'Other', 'Anonymous note');
                ",
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let legacy = db.list_user_complaints("ravi", None).unwrap();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].status, ComplaintStatus::InProgress);
        assert_eq!(legacy[0].created_at, 0);
        assert_eq!(db.list_complaints().unwrap()[0].student_name, "");

        let fresh = db
            .save_complaint("ravi", "Ravi", IssueType::Academics, "Timetable clash")
            .unwrap();
        assert!(fresh.created_at > 0);
        assert_eq!(db.list_user_complaints("ravi", None).unwrap().len(), 2);

        // Reopening an already migrated file is a no-op
        drop(db);
        assert_eq!(Database::open(&path).unwrap().list_complaints().unwrap().len(), 3);
    }
}
