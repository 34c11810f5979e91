//! SQLite-backed [`ToolStore`] implementation.
//!
//! Identity is enforced by the schema: `categories.name` and `tools.url`
//! are `UNIQUE`, and both upserts are single `INSERT .. ON CONFLICT`
//! statements, so overlapping runs never create duplicates.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use tool_harvest_core::models::{ParsedTool, Tool, ToolStats};
use tool_harvest_core::store::{now_millis, ToolPage, ToolQuery, ToolStore, ToolView};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`ToolStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const TOOL_COLUMNS: &str = "t.id, t.name, t.description, t.url, t.tags_json, t.category_id, \
     t.pricing, t.favorite_count, t.source, t.created_at, t.updated_at";

fn row_to_tool(row: &SqliteRow) -> Result<Tool> {
    let tags_json: String = row.get("tags_json");
    let pricing: String = row.get("pricing");
    Ok(Tool {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        url: row.get("url"),
        tags: serde_json::from_str(&tags_json).context("Corrupt tags_json column")?,
        category_id: row.get("category_id"),
        pricing: pricing.parse()?,
        favorite_count: row.get("favorite_count"),
        source: row.get("source"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_view(row: &SqliteRow) -> Result<ToolView> {
    Ok(ToolView {
        tool: row_to_tool(row)?,
        category: row.get("category"),
    })
}

/// Lower-cased name and description, matched by `ToolQuery::search`.
///
/// SQLite's `LOWER()` only folds ASCII, so folding happens here with the
/// same rules `ToolQuery::matches` uses.
fn search_text(tool: &ParsedTool) -> String {
    format!("{}\n{}", tool.name.to_lowercase(), tool.description.to_lowercase())
}

/// `LIKE` pattern for a case-insensitive substring match.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, query: &'a ToolQuery) {
    qb.push(" WHERE 1 = 1");

    if let Some(ref search) = query.search {
        let pattern = like_pattern(search);
        qb.push(" AND t.search_text LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
    }
    if let Some(ref category) = query.category {
        qb.push(" AND c.name = ").push_bind(category.as_str());
    }
    if let Some(pricing) = query.pricing {
        qb.push(" AND t.pricing = ").push_bind(pricing.as_str());
    }
    if !query.tags.is_empty() {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(t.tags_json) WHERE json_each.value IN (");
        let mut separated = qb.separated(", ");
        for tag in &query.tags {
            separated.push_bind(tag.as_str());
        }
        separated.push_unseparated("))");
    }
}

#[async_trait]
impl ToolStore for SqliteStore {
    async fn upsert_category(&self, name: &str) -> Result<String> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id: String = sqlx::query_scalar("SELECT id FROM categories WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn upsert_tool(&self, tool: &ParsedTool, category_id: &str) -> Result<Tool> {
        let now = now_millis();
        let tags_json = serde_json::to_string(&tool.tags)?;

        let row = sqlx::query(
            r#"
            INSERT INTO tools (id, name, description, url, tags_json, category_id,
                               pricing, favorite_count, source, search_text,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                tags_json = excluded.tags_json,
                category_id = excluded.category_id,
                pricing = excluded.pricing,
                favorite_count = excluded.favorite_count,
                source = excluded.source,
                search_text = excluded.search_text,
                updated_at = MAX(excluded.updated_at, tools.created_at + 1)
            RETURNING id, name, description, url, tags_json, category_id,
                      pricing, favorite_count, source, created_at, updated_at
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&tool.name)
        .bind(&tool.description)
        .bind(&tool.url)
        .bind(&tags_json)
        .bind(category_id)
        .bind(tool.pricing.as_str())
        .bind(tool.favorite_count)
        .bind(&tool.source)
        .bind(search_text(tool))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row_to_tool(&row)
    }

    async fn get_tool(&self, id: &str) -> Result<Option<ToolView>> {
        let sql = format!(
            "SELECT {}, c.name AS category FROM tools t \
             JOIN categories c ON c.id = t.category_id WHERE t.id = ?",
            TOOL_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_view).transpose()
    }

    async fn list_tools(&self, query: &ToolQuery) -> Result<ToolPage> {
        let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM tools t JOIN categories c ON c.id = t.category_id",
        );
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {}, c.name AS category FROM tools t JOIN categories c ON c.id = t.category_id",
            TOOL_COLUMNS
        ));
        push_filters(&mut qb, query);
        qb.push(" ORDER BY t.created_at DESC, t.url ASC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(row_to_view).collect::<Result<Vec<_>>>()?;

        Ok(ToolPage {
            items,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn stats(&self) -> Result<ToolStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tools")
            .fetch_one(&self.pool)
            .await?;

        let by_category: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT c.name, COUNT(t.id)
            FROM tools t JOIN categories c ON c.id = t.category_id
            GROUP BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let by_pricing: Vec<(String, i64)> =
            sqlx::query_as("SELECT pricing, COUNT(*) FROM tools GROUP BY pricing")
                .fetch_all(&self.pool)
                .await?;

        Ok(ToolStats {
            total,
            by_category: by_category.into_iter().collect(),
            by_pricing: by_pricing.into_iter().collect(),
        })
    }

    async fn clear(&self) -> Result<(u64, u64)> {
        let mut tx = self.pool.begin().await?;
        let tools = sqlx::query("DELETE FROM tools")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let categories = sqlx::query("DELETE FROM categories")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok((tools, categories))
    }
}
