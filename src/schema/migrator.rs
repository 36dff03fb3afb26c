use opensearch::indices::{
    IndicesCloseParts, IndicesCreateParts, IndicesExistsParts, IndicesOpenParts,
    IndicesPutMappingParts, IndicesPutSettingsParts,
};
use opensearch::{OpenSearch, PutScriptParts};
use serde_json::{Value, json};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::client::{expect_acknowledged, success_json};
use crate::error::{AppError, AppResult};
use crate::schema::bundle::SchemaBundle;
use crate::schema::reconcile::{
    creation_settings, reconcile_settings, render_template, strip_phonetic_fields,
};

/// Steps applied to each index, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Create,
    UpdateSettings,
    UpdateMappings,
    UpdateScripts,
    UpdateTemplates,
    Open,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Create,
        Step::UpdateSettings,
        Step::UpdateMappings,
        Step::UpdateScripts,
        Step::UpdateTemplates,
        Step::Open,
    ];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::UpdateSettings => write!(f, "update settings"),
            Self::UpdateMappings => write!(f, "update mappings"),
            Self::UpdateScripts => write!(f, "update scripts"),
            Self::UpdateTemplates => write!(f, "update templates"),
            Self::Open => write!(f, "open"),
        }
    }
}

pub struct Migrator {
    es: Arc<OpenSearch>,
    base_dir: PathBuf,
}

impl Migrator {
    pub fn new(es: Arc<OpenSearch>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            es,
            base_dir: base_dir.into(),
        }
    }

    /// Brings `index_name` in line with its on-disk schema. Stops at the
    /// first failing step; nothing is rolled back.
    pub async fn migrate(&self, index_name: &str) -> AppResult<()> {
        let bundle = SchemaBundle::load(&self.base_dir, index_name)?;
        tracing::info!(
            "Loaded schema for {index_name}: {} synonyms, {} stopwords, {} scripts, {} templates",
            bundle.synonyms.len(),
            bundle.stopwords.len(),
            bundle.scripts.len(),
            bundle.templates.len()
        );

        for step in Step::ALL {
            tracing::info!("[{index_name}] {step} started");
            self.apply(step, index_name, &bundle).await?;
            tracing::info!("[{index_name}] {step} ended");
        }
        Ok(())
    }

    async fn apply(&self, step: Step, index_name: &str, bundle: &SchemaBundle) -> AppResult<()> {
        match step {
            Step::Create => self.create_index(index_name, bundle).await,
            Step::UpdateSettings => {
                let result = self.update_settings(index_name, bundle).await;
                // Never leave the index closed, even when the update failed.
                self.open_index(index_name).await;
                result
            }
            Step::UpdateMappings => self.update_mappings(index_name, bundle).await,
            Step::UpdateScripts => self.update_scripts(index_name, bundle).await,
            Step::UpdateTemplates => self.update_templates(index_name, bundle).await,
            Step::Open => {
                self.open_index(index_name).await;
                Ok(())
            }
        }
    }

    /// Creates the index when absent, then closes it for the settings update.
    async fn create_index(&self, index_name: &str, bundle: &SchemaBundle) -> AppResult<()> {
        let exists = self
            .es
            .indices()
            .exists(IndicesExistsParts::Index(&[index_name]))
            .send()
            .await?;
        let exists = exists.status_code().is_success();
        tracing::info!("Index {index_name} exists: {exists}");

        if !exists {
            let indices = self.es.indices();
            let create = indices.create(IndicesCreateParts::Index(index_name));
            let response = match &bundle.settings {
                Some(settings) => {
                    let body = json!({ "settings": creation_settings(settings) });
                    create.body(body).send().await?
                }
                None => create.send().await?,
            };
            let body = success_json(response, "Create index").await?;
            tracing::info!("Created index {index_name}: {body}");
        }

        tracing::info!("Closing the {index_name} index");
        let response = self
            .es
            .indices()
            .close(IndicesCloseParts::Index(&[index_name]))
            .send()
            .await?;
        log_response(response, "Close index").await;
        Ok(())
    }

    async fn update_settings(&self, index_name: &str, bundle: &SchemaBundle) -> AppResult<()> {
        let settings = bundle.settings.as_ref().ok_or_else(|| {
            AppError::Config(format!("No settings.json found for index {index_name}"))
        })?;
        let body = reconcile_settings(settings, &bundle.synonyms, &bundle.stopwords);

        let response = self
            .es
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[index_name]))
            .body(Value::Object(body))
            .send()
            .await?;
        expect_acknowledged(response, "Update settings").await?;
        Ok(())
    }

    async fn update_mappings(&self, index_name: &str, bundle: &SchemaBundle) -> AppResult<()> {
        let mapping = strip_phonetic_fields(&bundle.mappings);
        tracing::info!("Removed phonetic sub-fields from {index_name} mappings");

        let response = self
            .es
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index_name]))
            .body(mapping)
            .send()
            .await?;
        expect_acknowledged(response, "Update mappings").await?;
        Ok(())
    }

    async fn update_scripts(&self, index_name: &str, bundle: &SchemaBundle) -> AppResult<()> {
        for (name, script) in &bundle.scripts {
            tracing::info!("Storing script {name} for {index_name}");
            let response = self
                .es
                .put_script(PutScriptParts::Id(name))
                .body(script)
                .send()
                .await?;
            expect_acknowledged(response, &format!("Store script {name}")).await?;
        }
        Ok(())
    }

    async fn update_templates(&self, index_name: &str, bundle: &SchemaBundle) -> AppResult<()> {
        for (name, template) in &bundle.templates {
            tracing::info!("Storing template {name} for {index_name}");
            let body = render_template(index_name, template)?;
            let response = self
                .es
                .put_script(PutScriptParts::Id(name))
                .body(body)
                .send()
                .await?;
            expect_acknowledged(response, &format!("Store template {name}")).await?;
        }
        Ok(())
    }

    /// Opens the index. The outcome is logged, not returned.
    async fn open_index(&self, index_name: &str) {
        tracing::info!("Opening the {index_name} index");
        match self
            .es
            .indices()
            .open(IndicesOpenParts::Index(&[index_name]))
            .send()
            .await
        {
            Ok(response) => log_response(response, "Open index").await,
            Err(e) => tracing::warn!("Open index {index_name} failed: {e}"),
        }
    }
}

async fn log_response(response: opensearch::http::response::Response, operation: &str) {
    let status = response.status_code();
    let body = response.text().await.unwrap_or_default();
    if status.is_success() {
        tracing::info!("{operation}: {body}");
    } else {
        tracing::warn!("{operation} returned status {status}: {body}");
    }
}
