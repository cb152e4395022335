use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres};
use tracing::{instrument, warn};

use super::Db;
use crate::domain::aggregates::{Background, BlockKind, LandingBlock, LandingPage, NewLandingPage, TickerItem, TickerLink};
use crate::domain::value_objects::Slug;
use crate::Result;

#[derive(FromRow)]
struct PageRow {
    id: i64,
    title: String,
    slug: String,
    background: Json<Background>,
    meta_title: String,
    meta_description: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct BlockRow {
    id: i64,
    content: Json<BlockKind>,
    position_top: i32,
    position_left: i32,
    sort_order: i32,
}

#[derive(FromRow)]
struct TickerRow {
    id: i64,
    image: String,
    link_type: String,
    link_url: String,
    landing_slug: Option<String>,
    sort_order: i32,
    is_active: bool,
}

impl PageRow {
    fn into_page(self, blocks: Vec<LandingBlock>) -> LandingPage {
        LandingPage {
            id: self.id,
            title: self.title,
            slug: self.slug,
            background: self.background.0,
            meta_title: self.meta_title,
            meta_description: self.meta_description,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            blocks,
        }
    }
}

impl From<BlockRow> for LandingBlock {
    fn from(r: BlockRow) -> Self {
        LandingBlock { id: r.id, kind: r.content.0, position_top: r.position_top, position_left: r.position_left, order: r.sort_order }
    }
}

impl Db {
    /// The page with its blocks in stored order (ascending id); callers filter on `is_active`.
    #[instrument(skip(self))]
    pub async fn landing_page(&self, slug: &str) -> Result<Option<LandingPage>> {
        let page = sqlx::query_as::<Postgres, PageRow>(
            "SELECT id, title, slug, background, meta_title, meta_description, is_active, created_at, updated_at FROM landing_pages WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        let Some(page) = page else { return Ok(None) };

        let blocks = sqlx::query_as::<Postgres, BlockRow>(
            "SELECT id, content, position_top, position_left, sort_order FROM landing_blocks WHERE page_id = $1 ORDER BY id",
        )
        .bind(page.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(page.into_page(blocks.into_iter().map(LandingBlock::from).collect())))
    }

    /// Creates or replaces the page at `slug`; its blocks are replaced wholesale.
    #[instrument(skip(self, input), fields(blocks = input.blocks.len()))]
    pub async fn upsert_landing_page(&self, slug: &Slug, input: &NewLandingPage) -> Result<LandingPage> {
        let mut tx = self.pool.begin().await?;
        let page_id: i64 = sqlx::query_scalar(
            "INSERT INTO landing_pages (title, slug, background, meta_title, meta_description, is_active) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (slug) DO UPDATE SET title = EXCLUDED.title, background = EXCLUDED.background, meta_title = EXCLUDED.meta_title, \
             meta_description = EXCLUDED.meta_description, is_active = EXCLUDED.is_active, updated_at = NOW() \
             RETURNING id",
        )
        .bind(&input.title)
        .bind(slug.as_str())
        .bind(Json(&input.background))
        .bind(&input.meta_title)
        .bind(&input.meta_description)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM landing_blocks WHERE page_id = $1").bind(page_id).execute(&mut *tx).await?;
        for block in &input.blocks {
            sqlx::query("INSERT INTO landing_blocks (page_id, content, position_top, position_left, sort_order) VALUES ($1, $2, $3, $4, $5)")
                .bind(page_id)
                .bind(Json(&block.kind))
                .bind(block.position_top)
                .bind(block.position_left)
                .bind(block.order)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.landing_page(slug.as_str()).await?.ok_or(crate::ShopError::PageNotFound)
    }

    /// Active ticker banners in display order.
    #[instrument(skip(self))]
    pub async fn ticker_items(&self) -> Result<Vec<TickerItem>> {
        let rows = sqlx::query_as::<Postgres, TickerRow>(
            "SELECT t.id, t.image, t.link_type, t.link_url, l.slug AS landing_slug, t.sort_order, t.is_active \
             FROM ticker_items t LEFT JOIN landing_pages l ON l.id = t.link_landing_id \
             WHERE t.is_active ORDER BY t.sort_order, t.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| {
            let link = match r.link_type.as_str() {
                "landing" => TickerLink::Landing { slug: r.landing_slug },
                "url" => TickerLink::Url { url: r.link_url },
                other => {
                    warn!(ticker_id = r.id, link_type = other, "unknown ticker link type");
                    TickerLink::Url { url: r.link_url }
                }
            };
            TickerItem { id: r.id, image: r.image, link, order: r.sort_order, is_active: r.is_active }
        }).collect())
    }
}
