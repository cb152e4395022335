use sqlx::types::Json;
use tracing::instrument;

use super::Db;
use crate::settings::SiteSettings;
use crate::Result;

impl Db {
    /// The settings row, or defaults when none has been saved yet.
    #[instrument(skip(self))]
    pub async fn site_settings(&self) -> Result<SiteSettings> {
        let row: Option<Json<SiteSettings>> = sqlx::query_scalar("SELECT data FROM site_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(settings)| settings).unwrap_or_default())
    }

    #[instrument(skip(self, settings))]
    pub async fn save_site_settings(&self, settings: &SiteSettings) -> Result<()> {
        sqlx::query("INSERT INTO site_settings (id, data) VALUES (1, $1) ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data")
            .bind(Json(settings))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
