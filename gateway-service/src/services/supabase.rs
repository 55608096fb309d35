//! Supabase PostgREST client.
//!
//! Wraps the REST surface of a hosted Supabase project: filtered selects
//! and conflict-merging upserts against arbitrary tables. The API key is
//! sent as both the `apikey` header and a bearer token, as the Supabase
//! REST API expects.

use crate::config::SupabaseConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;

/// Client for interacting with the Supabase REST API.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    /// Select rows from `table` where `filter_column` equals `filter_value`.
    ///
    /// `select` is the PostgREST column projection (e.g. `"time"` or
    /// `"user_id,username"`). Returns the matching rows as JSON objects.
    pub async fn select_eq(
        &self,
        table: &str,
        select: &str,
        filter_column: &str,
        filter_value: &str,
    ) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.rest_url(table))
            .header("apikey", self.config.key.expose_secret())
            .bearer_auth(self.config.key.expose_secret())
            .query(&[
                ("select", select),
                (filter_column, &format!("eq.{}", filter_value)),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, table, "Supabase select response");

        if status.is_success() {
            let rows: Vec<Value> = serde_json::from_str(&body)?;
            Ok(rows)
        } else {
            tracing::error!(
                status = %status,
                table,
                body = %body,
                "Supabase select failed"
            );
            Err(anyhow!("Supabase returned {} selecting from {}", status, table))
        }
    }

    /// Upsert `rows` into `table`.
    ///
    /// Rows that conflict on the table's primary key are merged in place
    /// rather than duplicated, so repeating an identical call leaves the
    /// same final row.
    pub async fn upsert(&self, table: &str, rows: &[Value]) -> Result<()> {
        let response = self
            .client
            .post(self.rest_url(table))
            .header("apikey", self.config.key.expose_secret())
            .bearer_auth(self.config.key.expose_secret())
            .header("Prefer", "resolution=merge-duplicates")
            .json(rows)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            tracing::info!(table, rows = rows.len(), "Supabase upsert succeeded");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                table,
                body = %body,
                "Supabase upsert failed"
            );
            Err(anyhow!("Supabase returned {} upserting into {}", status, table))
        }
    }
}
