use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use spdlog::debug;

use crate::error::{StoreError, StoreResult};
use crate::post::{BlogPost, PostFields, PostId};
use crate::text_utils::format_post_date;

pub type DbPool = Pool<SqliteConnectionManager>;

// AUTOINCREMENT keeps SQLite from handing out the id of a deleted last row again
const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS blog_post (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    title VARCHAR(250) NOT NULL,
    subtitle VARCHAR(250) NOT NULL,
    date VARCHAR(250) NOT NULL,
    body TEXT NOT NULL,
    author VARCHAR(250) NOT NULL,
    img_url VARCHAR(250) NOT NULL
)";

const SELECT_POST: &str = "SELECT id, title, subtitle, date, body, author, img_url FROM blog_post";

/// Owner of the `blog_post` table.
///
/// Every operation checks a connection out of the pool and hands it back
/// when it returns. Values are stored as given: validation happens in
/// [`crate::form`] before anything reaches the store.
pub struct PostStore {
    pool: DbPool,
}

impl PostStore {
    pub fn open(location: &Path, pool_size: u32) -> StoreResult<PostStore> {
        if let Some(parent) = location.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StoreError::StorageUnavailable(
                    format!("Error creating database directory {}: {}", parent.display(), e)))?;
            }
        }

        let manager = SqliteConnectionManager::file(location);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        let store = PostStore { pool };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(CREATE_TABLE)?;
        Ok(())
    }

    /// Inserts a new post dated today and returns its id.
    pub fn create(&self, fields: &PostFields) -> StoreResult<PostId> {
        self.create_dated(fields, Local::now().date_naive())
    }

    fn create_dated(&self, fields: &PostFields, date: NaiveDate) -> StoreResult<PostId> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO blog_post (title, subtitle, date, body, author, img_url) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                fields.title,
                fields.subtitle,
                format_post_date(&date),
                fields.body,
                fields.author,
                fields.img_url,
            ],
        )?;
        let id = PostId(conn.last_insert_rowid());
        debug!("Inserted post {}", id);
        Ok(id)
    }

    pub fn get_by_id(&self, id: PostId) -> StoreResult<BlogPost> {
        let conn = self.pool.get()?;
        let sql = format!("{} WHERE id = ?1", SELECT_POST);
        let post = conn.query_row(&sql, params![id.0], row_to_post).optional()?;
        post.ok_or(StoreError::NotFound(id))
    }

    /// All posts in the order SQLite returns them.
    pub fn get_all(&self) -> StoreResult<Vec<BlogPost>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(SELECT_POST)?;
        let posts = stmt.query_map([], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Overwrites the editable fields. `id` and `date` are never touched.
    pub fn update(&self, id: PostId, fields: &PostFields) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE blog_post SET title = ?1, subtitle = ?2, author = ?3, img_url = ?4, body = ?5 WHERE id = ?6",
            params![
                fields.title,
                fields.subtitle,
                fields.author,
                fields.img_url,
                fields.body,
                id.0,
            ],
        )?;

        match changed {
            0 => Err(StoreError::NotFound(id)),
            _ => Ok(()),
        }
    }

    pub fn delete(&self, id: PostId) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM blog_post WHERE id = ?1", params![id.0])?;
        match changed {
            0 => Err(StoreError::NotFound(id)),
            _ => Ok(()),
        }
    }

    pub fn count(&self) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM blog_post", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_post(row: &Row) -> rusqlite::Result<BlogPost> {
    Ok(BlogPost {
        id: PostId(row.get(0)?),
        title: row.get(1)?,
        subtitle: row.get(2)?,
        date: row.get(3)?,
        body: row.get(4)?,
        author: row.get(5)?,
        img_url: row.get(6)?,
    })
}
