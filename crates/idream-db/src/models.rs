//! Database row types that never leave the storage/auth layer.
//! Everything else is mapped straight into idream-types models.

use idream_types::models::{Role, User};

pub struct UserRow {
    pub user: User,
    /// Argon2 PHC string.
    pub password: String,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

pub struct RoleCounts {
    pub dreamers: i64,
    pub investors: i64,
    pub admins: i64,
}
