use std::sync::Arc;

use config::{Config, StorageMode};
use db::DBService;
use storage::{FileStore, LocalFileStore, S3FileStore};

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub mod test_support;

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    files: Arc<dyn FileStore>,
    config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, db::DbErr> {
        let db = DBService::new().await?;
        let files: Arc<dyn FileStore> = match config.storage {
            StorageMode::Local => Arc::new(LocalFileStore::new(
                utils::assets::asset_dir(),
                "/files".to_string(),
            )),
            StorageMode::S3 => Arc::new(
                S3FileStore::new(
                    config.s3.bucket.clone(),
                    config.s3.region.clone(),
                    config.s3.endpoint_url.clone(),
                    config.s3.public_base_url.clone(),
                )
                .await,
            ),
        };
        Ok(Self {
            db,
            files,
            config: Arc::new(config),
        })
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn files(&self) -> &Arc<dyn FileStore> {
        &self.files
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
