use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use issue_etl_config::shared::SourceConfig;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::source::Source;
use crate::source::filter::{build_jql, lower_bound};
use crate::source::pagination::{SearchCursor, SearchPage, collect_pages};
use crate::types::RawRecord;

const SEARCH_PATH: &str = "rest/api/2/search";
const MYSELF_PATH: &str = "rest/api/2/myself";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    time_zone: Option<String>,
}

/// [`Source`] reading issues from the Jira REST API (v2) with basic authentication.
#[derive(Debug, Clone)]
pub struct JiraSource {
    client: Client,
    base_url: Url,
    username: String,
    password: SecretString,
    page_size: u64,
}

impl JiraSource {
    pub fn new(
        base_url: &str,
        username: String,
        password: SecretString,
        page_size: u64,
    ) -> EtlResult<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Relative paths are resolved against the last segment otherwise.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|err| {
                etl_error!(
                    ErrorKind::SourceConnectionFailed,
                    "Failed to build the source HTTP client",
                    err
                )
            })?;

        Ok(Self {
            client,
            base_url,
            username,
            password,
            page_size,
        })
    }

    pub fn from_config(config: &SourceConfig) -> EtlResult<Self> {
        Self::new(
            &config.url,
            config.username.clone(),
            (*config.password).clone(),
            u64::from(config.page_size),
        )
    }

    /// Returns the timezone the tracker uses to interpret JQL timestamps for this user.
    pub async fn user_timezone(&self) -> EtlResult<Tz> {
        let url = self.base_url.join(MYSELF_PATH)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await
            .map_err(|err| {
                etl_error!(
                    ErrorKind::TimezoneResolutionFailed,
                    "Failed to request the current user",
                    err
                )
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(etl_error!(
                ErrorKind::TimezoneResolutionFailed,
                "Failed to request the current user",
                format!("status {status}")
            ));
        }

        let myself: Myself = response.json().await.map_err(|err| {
            etl_error!(
                ErrorKind::TimezoneResolutionFailed,
                "Current user response could not be decoded",
                err
            )
        })?;

        let Some(time_zone) = myself.time_zone else {
            return Err(etl_error!(
                ErrorKind::TimezoneResolutionFailed,
                "Current user has no timezone"
            ));
        };

        time_zone.parse::<Tz>().map_err(|err| {
            etl_error!(
                ErrorKind::TimezoneResolutionFailed,
                "Current user timezone is unknown",
                format!("{time_zone}: {err}")
            )
        })
    }

    fn search_url(&self, jql: &str, cursor: SearchCursor) -> EtlResult<Url> {
        let mut url = self.base_url.join(SEARCH_PATH)?;
        url.query_pairs_mut()
            .append_pair("jql", jql)
            .append_pair("maxResults", &cursor.page_size.to_string())
            .append_pair("startAt", &cursor.start_at.to_string());

        Ok(url)
    }

    async fn search_page(&self, jql: &str, cursor: SearchCursor) -> EtlResult<SearchPage> {
        let url = self.search_url(jql, cursor)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(etl_error!(
                ErrorKind::SourceQueryFailed,
                "Searching issues failed",
                format!("status {status}: {body}")
            ));
        }

        let page: SearchPage = response.json().await?;
        debug!(
            start_at = page.start_at,
            received = page.issues.len(),
            total = page.total,
            "received search page"
        );

        Ok(page)
    }
}

impl Source for JiraSource {
    async fn fetch_since(
        &self,
        project: &str,
        watermark: Option<DateTime<Utc>>,
    ) -> EtlResult<Vec<RawRecord>> {
        let lower_bound = match watermark {
            Some(watermark) => {
                let timezone = self.user_timezone().await?;
                Some(lower_bound(watermark, timezone))
            }
            None => None,
        };

        let jql = build_jql(project, lower_bound.as_ref());
        info!(%jql, "searching issues");

        let jql = jql.as_str();
        let issues = collect_pages(self.page_size, move |cursor| self.search_page(jql, cursor))
            .await?;

        info!(count = issues.len(), "fetched issues");

        Ok(issues)
    }
}
