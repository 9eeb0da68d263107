//! Persistence layer
//!
//! A PostgreSQL store with one hash-gated upsert per entity. Content
//! fields on a page are overwritten only when the incoming content hash
//! is present and differs from the stored one, so re-crawling an
//! unchanged page is a metadata-only update. Aliases, runs, and domain
//! overrides get straightforward upserts. Conflict resolution relies on
//! database-level uniqueness; there is no application-level page lock.

mod models;

pub use models::*;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Row};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::fetch::FetchMode;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// PostgreSQL-backed page store shared by all workers
pub struct PageStore {
    pool: PgPool,
}

impl PageStore {
    /// Connect to the store and run migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.url())
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the schema when absent.
    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                final_url TEXT PRIMARY KEY,
                requested_url_original TEXT NOT NULL,
                status_code INTEGER,
                crawl_status TEXT NOT NULL,
                redirect_chain JSONB NOT NULL DEFAULT '[]',
                fetch_mode TEXT NOT NULL,
                run_id UUID NOT NULL,
                sitemap_type_hint TEXT,
                html_content TEXT,
                clean_html TEXT,
                markdown TEXT,
                markdown_enhanced TEXT,
                content_hash TEXT,
                title TEXT,
                h1 TEXT,
                meta_description TEXT,
                word_count INTEGER,
                nav_structure JSONB,
                structural_stats JSONB,
                extraction_method TEXT,
                junk_score DOUBLE PRECISION,
                last_crawled_at TIMESTAMPTZ NOT NULL,
                last_error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_run_id ON pages(run_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS url_aliases (
                requested_url TEXT PRIMARY KEY,
                final_url TEXT NOT NULL,
                status_code INTEGER,
                redirect_chain JSONB NOT NULL DEFAULT '[]',
                first_seen_at TIMESTAMPTZ NOT NULL,
                last_seen_at TIMESTAMPTZ NOT NULL,
                run_id UUID NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_url_aliases_final_url ON url_aliases(final_url)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crawl_runs (
                run_id UUID PRIMARY KEY,
                seed_sitemaps JSONB NOT NULL DEFAULT '[]',
                max_pages INTEGER NOT NULL,
                fetch_mode TEXT NOT NULL,
                started_at TIMESTAMPTZ NOT NULL,
                finished_at TIMESTAMPTZ,
                discovered BIGINT NOT NULL DEFAULT 0,
                crawled BIGINT NOT NULL DEFAULT 0,
                skipped BIGINT NOT NULL DEFAULT 0,
                redirects BIGINT NOT NULL DEFAULT 0,
                errors BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS domain_overrides (
                domain TEXT PRIMARY KEY,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                main_content_selectors JSONB NOT NULL DEFAULT '[]',
                remove_selectors JSONB NOT NULL DEFAULT '[]',
                force_fetch_mode TEXT,
                notes TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Hash-gated page upsert keyed by `final_url`.
    ///
    /// Always-updated: status, crawl status, redirect chain, fetch mode,
    /// run id, error, crawl time. Content bodies update only when the new
    /// content hash is present and differs from the stored one. Markdown
    /// updates whenever a new value is provided (the conversion improves
    /// independently of content). Everything else keeps the old value
    /// when the new one is null.
    pub async fn upsert_page(&self, page: &Page) -> Result<(), StoreError> {
        let redirect_chain = serde_json::to_value(&page.redirect_chain)?;
        let nav_structure = page
            .nav_structure
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let structural_stats = page
            .structural_stats
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO pages (
                final_url, requested_url_original, status_code, crawl_status,
                redirect_chain, fetch_mode, run_id, sitemap_type_hint,
                html_content, clean_html, markdown, markdown_enhanced,
                content_hash, title, h1, meta_description, word_count,
                nav_structure, structural_stats, extraction_method,
                junk_score, last_crawled_at, last_error
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            ON CONFLICT (final_url) DO UPDATE SET
                requested_url_original = EXCLUDED.requested_url_original,
                status_code = EXCLUDED.status_code,
                crawl_status = EXCLUDED.crawl_status,
                redirect_chain = EXCLUDED.redirect_chain,
                fetch_mode = EXCLUDED.fetch_mode,
                run_id = EXCLUDED.run_id,
                last_crawled_at = EXCLUDED.last_crawled_at,
                last_error = EXCLUDED.last_error,
                html_content = CASE
                    WHEN EXCLUDED.content_hash IS NOT NULL
                     AND EXCLUDED.content_hash IS DISTINCT FROM pages.content_hash
                    THEN EXCLUDED.html_content
                    ELSE pages.html_content
                END,
                clean_html = CASE
                    WHEN EXCLUDED.content_hash IS NOT NULL
                     AND EXCLUDED.content_hash IS DISTINCT FROM pages.content_hash
                    THEN EXCLUDED.clean_html
                    ELSE pages.clean_html
                END,
                markdown = COALESCE(EXCLUDED.markdown, pages.markdown),
                markdown_enhanced = COALESCE(EXCLUDED.markdown_enhanced, pages.markdown_enhanced),
                title = COALESCE(EXCLUDED.title, pages.title),
                h1 = COALESCE(EXCLUDED.h1, pages.h1),
                meta_description = COALESCE(EXCLUDED.meta_description, pages.meta_description),
                word_count = COALESCE(EXCLUDED.word_count, pages.word_count),
                extraction_method = COALESCE(EXCLUDED.extraction_method, pages.extraction_method),
                junk_score = COALESCE(EXCLUDED.junk_score, pages.junk_score),
                content_hash = COALESCE(EXCLUDED.content_hash, pages.content_hash),
                sitemap_type_hint = COALESCE(EXCLUDED.sitemap_type_hint, pages.sitemap_type_hint),
                nav_structure = COALESCE(EXCLUDED.nav_structure, pages.nav_structure),
                structural_stats = COALESCE(EXCLUDED.structural_stats, pages.structural_stats)
            "#,
        )
        .bind(&page.final_url)
        .bind(&page.requested_url_original)
        .bind(page.status_code)
        .bind(page.crawl_status.as_str())
        .bind(&redirect_chain)
        .bind(page.fetch_mode.as_str())
        .bind(page.run_id)
        .bind(&page.sitemap_type_hint)
        .bind(&page.html_content)
        .bind(&page.clean_html)
        .bind(&page.markdown)
        .bind(&page.markdown_enhanced)
        .bind(&page.content_hash)
        .bind(&page.title)
        .bind(&page.h1)
        .bind(&page.meta_description)
        .bind(page.word_count)
        .bind(&nav_structure)
        .bind(&structural_stats)
        .bind(page.extraction_method.map(|m| m.as_str()))
        .bind(page.junk_score)
        .bind(page.last_crawled_at)
        .bind(&page.last_error)
        .execute(&self.pool)
        .await?;

        debug!(final_url = %page.final_url, crawl_status = page.crawl_status.as_str(), "Upserted page");
        Ok(())
    }

    /// Whether a page row exists for the canonical URL.
    pub async fn page_exists(&self, final_url: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM pages WHERE final_url = $1")
            .bind(final_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Alias upsert keyed by `requested_url`; `first_seen_at` is
    /// preserved across updates.
    pub async fn upsert_alias(&self, alias: &UrlAlias) -> Result<(), StoreError> {
        let redirect_chain = serde_json::to_value(&alias.redirect_chain)?;

        sqlx::query(
            r#"
            INSERT INTO url_aliases (
                requested_url, final_url, status_code, redirect_chain,
                first_seen_at, last_seen_at, run_id
            )
            VALUES ($1, $2, $3, $4, now(), now(), $5)
            ON CONFLICT (requested_url) DO UPDATE SET
                final_url = EXCLUDED.final_url,
                status_code = COALESCE(EXCLUDED.status_code, url_aliases.status_code),
                redirect_chain = COALESCE(EXCLUDED.redirect_chain, url_aliases.redirect_chain),
                last_seen_at = now(),
                run_id = EXCLUDED.run_id
            "#,
        )
        .bind(&alias.requested_url)
        .bind(&alias.final_url)
        .bind(alias.status_code)
        .bind(&redirect_chain)
        .bind(alias.run_id)
        .execute(&self.pool)
        .await?;

        debug!(requested_url = %alias.requested_url, final_url = %alias.final_url, "Upserted alias");
        Ok(())
    }

    /// Write the run record at startup.
    pub async fn create_run(&self, run: &CrawlRun) -> Result<(), StoreError> {
        let seeds = serde_json::to_value(&run.seed_sitemaps)?;

        sqlx::query(
            r#"
            INSERT INTO crawl_runs (run_id, seed_sitemaps, max_pages, fetch_mode, started_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(run.run_id)
        .bind(&seeds)
        .bind(run.max_pages)
        .bind(run.fetch_mode.as_str())
        .bind(run.started_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write aggregate counters onto the run record.
    pub async fn update_run_stats(
        &self,
        run_id: Uuid,
        counters: &RunCounters,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE crawl_runs
            SET discovered = $2, crawled = $3, skipped = $4, redirects = $5, errors = $6
            WHERE run_id = $1
            "#,
        )
        .bind(run_id)
        .bind(counters.discovered as i64)
        .bind(counters.crawled as i64)
        .bind(counters.skipped as i64)
        .bind(counters.redirects as i64)
        .bind(counters.errors as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the run record.
    pub async fn finish_run(&self, run_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE crawl_runs SET finished_at = now() WHERE run_id = $1")
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Per-host override configuration, or `None` when unconfigured.
    pub async fn get_override(&self, domain: &str) -> Result<Option<DomainOverride>, StoreError> {
        let row: Option<OverrideRow> = sqlx::query_as(
            r#"
            SELECT domain, enabled, main_content_selectors, remove_selectors,
                   force_fetch_mode, notes
            FROM domain_overrides
            WHERE domain = $1
            "#,
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OverrideRow::into_override))
    }

    /// Overwrite override configuration for a domain.
    pub async fn upsert_override(&self, value: &DomainOverride) -> Result<(), StoreError> {
        let main_selectors = serde_json::to_value(&value.main_content_selectors)?;
        let remove_selectors = serde_json::to_value(&value.remove_selectors)?;

        sqlx::query(
            r#"
            INSERT INTO domain_overrides (
                domain, enabled, main_content_selectors, remove_selectors,
                force_fetch_mode, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (domain) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                main_content_selectors = EXCLUDED.main_content_selectors,
                remove_selectors = EXCLUDED.remove_selectors,
                force_fetch_mode = EXCLUDED.force_fetch_mode,
                notes = EXCLUDED.notes
            "#,
        )
        .bind(&value.domain)
        .bind(value.enabled)
        .bind(&main_selectors)
        .bind(&remove_selectors)
        .bind(value.force_fetch_mode.map(|m| m.as_str()))
        .bind(&value.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Failed pages of a run, for post-mortem queries.
    pub async fn errors_for_run(
        &self,
        run_id: Uuid,
    ) -> Result<Vec<(String, Option<String>)>, StoreError> {
        let rows = sqlx::query(
            "SELECT final_url, last_error FROM pages WHERE run_id = $1 AND crawl_status = 'ERROR'",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("final_url"), row.get("last_error")))
            .collect())
    }
}

#[derive(FromRow)]
struct OverrideRow {
    domain: String,
    enabled: bool,
    main_content_selectors: serde_json::Value,
    remove_selectors: serde_json::Value,
    force_fetch_mode: Option<String>,
    notes: Option<String>,
}

impl OverrideRow {
    fn into_override(self) -> DomainOverride {
        DomainOverride {
            domain: self.domain,
            enabled: self.enabled,
            main_content_selectors: string_list(self.main_content_selectors),
            remove_selectors: string_list(self.remove_selectors),
            force_fetch_mode: self
                .force_fetch_mode
                .as_deref()
                .and_then(|s| s.parse::<FetchMode>().ok()),
            notes: self.notes,
        }
    }
}

fn string_list(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}
