use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;
use uuid::Uuid;

use idream_types::models::{Role, User};

use super::{enum_col, is_unique_violation, ts_col, uuid_col};
use crate::models::{NewUser, RoleCounts, UserRow};
use crate::{Database, Result, StoreError, time};

const USER_COLUMNS: &str = "id, username, role, subscribed, approved, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_col(row, 0)?,
        username: row.get(1)?,
        role: enum_col(row, 2)?,
        subscribed: row.get(3)?,
        approved: row.get(4)?,
        created_at: ts_col(row, 5)?,
    })
}

pub(crate) fn load_user(conn: &Connection, id: Uuid) -> Result<User> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [id.to_string()],
        map_user,
    )
    .optional()?
    .ok_or(StoreError::NotFound("user"))
}

impl Database {
    pub fn create_user(&self, new: &NewUser<'_>) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: new.username.to_string(),
            role: new.role,
            subscribed: false,
            approved: false,
            created_at: Utc::now(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.to_string(),
                    user.username,
                    new.password_hash,
                    user.role.as_str(),
                    time::to_db(&user.created_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("username '{}' is taken", new.username))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })?;

        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {}, password FROM users WHERE username = ?1",
                        USER_COLUMNS
                    ),
                    [username],
                    |row| {
                        Ok(UserRow {
                            user: map_user(row)?,
                            password: row.get(6)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| match load_user(conn, id) {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY created_at",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], map_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    pub fn set_subscribed(&self, id: Uuid, subscribed: bool) -> Result<User> {
        self.with_tx(|tx| {
            let user = load_user(tx, id)?;
            if user.role != Role::Dreamer {
                return Err(StoreError::Forbidden("only dreamers hold subscriptions"));
            }
            tx.execute(
                "UPDATE users SET subscribed = ?2 WHERE id = ?1",
                params![id.to_string(), subscribed],
            )?;
            Ok(User { subscribed, ..user })
        })
    }

    pub fn approve_investor(&self, id: Uuid) -> Result<User> {
        self.with_tx(|tx| {
            let user = load_user(tx, id)?;
            if user.role != Role::Investor {
                return Err(StoreError::Conflict(format!(
                    "user '{}' is not an investor",
                    user.username
                )));
            }
            tx.execute("UPDATE users SET approved = 1 WHERE id = ?1", [id.to_string()])?;
            info!("Investor {} approved", user.username);
            Ok(User {
                approved: true,
                ..user
            })
        })
    }

    /// Out-of-band role change, used by the admin CLI.
    pub fn set_role(&self, username: &str, role: Role) -> Result<User> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE users SET role = ?2 WHERE username = ?1",
                params![username, role.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            let user = tx.query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                [username],
                map_user,
            )?;
            Ok(user)
        })
    }

    pub fn pending_investors(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users WHERE role = 'investor' AND approved = 0 ORDER BY created_at",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], map_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    pub fn role_counts(&self) -> Result<RoleCounts> {
        self.with_conn(|conn| {
            let mut counts = RoleCounts {
                dreamers: 0,
                investors: 0,
                admins: 0,
            };
            let mut stmt = conn.prepare("SELECT role, COUNT(*) FROM users GROUP BY role")?;
            let rows = stmt.query_map([], |row| Ok((enum_col::<Role>(row, 0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                let (role, n) = row?;
                match role {
                    Role::Dreamer => counts.dreamers = n,
                    Role::Investor => counts.investors = n,
                    Role::Admin => counts.admins = n,
                }
            }
            Ok(counts)
        })
    }
}
