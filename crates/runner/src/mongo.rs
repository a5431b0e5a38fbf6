//! MongoDB connector.
//!
//! Connects by address, pings the server up front so unreachable hosts fail
//! before any timing starts, and runs lowered plans with the cursor drained
//! to completion.

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, Credential};
use mongodb::Client;
use tracing::{debug, info};

use docbench_core::StoreConfig;

use crate::store::{DocumentStore, ResultSet, StoreError, Submission};

pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Driver options for a config. Credentials bypass the URI.
    pub async fn options(config: &StoreConfig) -> Result<ClientOptions, StoreError> {
        let mut options = ClientOptions::parse(config.connection_string())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        options.app_name = Some(config.app_name.clone());
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.server_selection_timeout());

        if config.username.is_some() {
            let mut credential = Credential::default();
            credential.username = config.username.clone();
            credential.password = config.password.clone();
            options.credential = Some(credential);
        }
        Ok(options)
    }

    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = Self::options(config).await?;
        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Connected to document store at {}:{}", config.host, config.port);
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn aggregate(
        &self,
        database: &str,
        submission: Submission,
        allow_disk_use: bool,
    ) -> Result<ResultSet, StoreError> {
        let entry = submission.pipeline.entry;
        if submission.stages.is_empty() {
            return Err(StoreError::Lowering(format!("plan on {} has no stages", entry)));
        }
        debug!(
            "Submitting {} stages to {}.{}",
            submission.stages.len(),
            database,
            entry
        );

        let collection = self
            .client
            .database(database)
            .collection::<Document>(entry.name());
        let mut cursor = collection
            .aggregate(submission.stages)
            .allow_disk_use(allow_disk_use)
            .await
            .map_err(|e| StoreError::Execution(e.to_string()))?;

        let mut rows = Vec::new();
        while let Some(row) = cursor
            .try_next()
            .await
            .map_err(|e| StoreError::Execution(e.to_string()))?
        {
            rows.push(row);
        }
        Ok(ResultSet::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            host: "db.internal".into(),
            port: 27018,
            app_name: "docbench".into(),
            username: None,
            password: None,
            connect_timeout_ms: 2_000,
            server_selection_timeout_ms: 3_000,
            allow_disk_use: true,
        }
    }

    #[tokio::test]
    async fn reserved_characters_in_password_survive() {
        let cfg = StoreConfig {
            username: Some("bench".into()),
            password: Some("p@ss:w/rd".into()),
            ..config()
        };
        let options = MongoStore::options(&cfg).await.unwrap();
        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("bench"));
        assert_eq!(credential.password.as_deref(), Some("p@ss:w/rd"));
        assert_eq!(options.app_name.as_deref(), Some("docbench"));
        assert_eq!(options.connect_timeout, Some(cfg.connect_timeout()));
    }

    #[tokio::test]
    async fn anonymous_config_has_no_credential() {
        let options = MongoStore::options(&config()).await.unwrap();
        assert!(options.credential.is_none());
        assert_eq!(options.hosts.len(), 1);
    }
}
