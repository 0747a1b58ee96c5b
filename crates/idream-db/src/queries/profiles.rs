use rusqlite::{OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use idream_types::models::{Profile, normalize_skills};

use super::opt_ts_col;
use super::users::load_user;
use crate::{Database, Result, StoreError, time};

impl Database {
    /// The user's profile, empty if they never saved one.
    pub fn get_profile(&self, user_id: Uuid) -> Result<Profile> {
        self.with_conn(|conn| {
            load_user(conn, user_id)?;
            let row = conn
                .query_row(
                    "SELECT description, skills, image_url, updated_at
                     FROM profiles WHERE user_id = ?1",
                    [user_id.to_string()],
                    |r| {
                        Ok((
                            r.get::<_, Option<String>>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, Option<String>>(2)?,
                            opt_ts_col(r, 3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((description, skills, image_url, updated_at)) = row else {
                return Ok(Profile {
                    user_id,
                    ..Profile::default()
                });
            };
            let skills = serde_json::from_str(&skills)
                .map_err(|e| StoreError::Corrupt(format!("skills of user {}: {}", user_id, e)))?;
            Ok(Profile {
                user_id,
                description,
                skills,
                image_url,
                updated_at,
            })
        })
    }

    /// Replaces the user's profile. Skills are stored normalized.
    pub fn upsert_profile(
        &self,
        user_id: Uuid,
        description: Option<&str>,
        skills: &[String],
        image_url: Option<&str>,
    ) -> Result<Profile> {
        let profile = Profile {
            user_id,
            description: description.map(str::to_string),
            skills: normalize_skills(skills),
            image_url: image_url.map(str::to_string),
            updated_at: Some(time::now()),
        };
        let skills = serde_json::to_string(&profile.skills)
            .map_err(|e| StoreError::Corrupt(format!("skills of user {}: {}", user_id, e)))?;

        self.with_tx(|tx| {
            load_user(tx, user_id)?;
            tx.execute(
                "INSERT INTO profiles (user_id, description, skills, image_url, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    description = excluded.description,
                    skills = excluded.skills,
                    image_url = excluded.image_url,
                    updated_at = excluded.updated_at",
                params![
                    user_id.to_string(),
                    profile.description,
                    skills,
                    profile.image_url,
                    profile.updated_at.as_ref().map(time::to_db),
                ],
            )?;
            info!("Profile saved for user {}", user_id);
            Ok(profile)
        })
    }
}
