use anyhow::Result;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serenity::async_trait;

use std::time::Duration;

use crate::error::{StatsError, StatsResult};
use crate::lcapi::{ProblemCatalogSource, ProfileSource};
use crate::models::{CatalogProblem, Difficulty, Profile, RawSubmission};

const PROFILE_QUERY: &str = include_str!("profile.graphql");
const PROFILE_OPERATION: &str = "userCompetitionProfile";

// LeetCode won't return more than 20 recent submissions anyway.
const RECENT_SUBMISSION_LIMIT: u32 = 20;

#[derive(Serialize)]
struct ProfileVariables<'a> {
    username: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    matched_user: Option<serde_json::Value>,
    user_contest_ranking: Option<ContestRanking>,
    recent_submission_list: Option<Vec<WireSubmission>>,
}

#[derive(Deserialize)]
struct ContestRanking {
    rating: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSubmission {
    title_slug: String,
    timestamp: String,
    status_display: String,
}

#[derive(Deserialize)]
struct ProblemList {
    stat_status_pairs: Vec<StatStatusPair>,
}

#[derive(Deserialize)]
struct StatStatusPair {
    stat: ProblemStat,
    difficulty: ProblemLevel,
}

#[derive(Deserialize)]
struct ProblemStat {
    #[serde(rename = "question__title_slug")]
    title_slug: Option<String>,
}

#[derive(Deserialize)]
struct ProblemLevel {
    level: u64,
}

/// HTTP client for leetcode.com (or anything that speaks its API).
pub struct LeetCodeClient {
    http: Client,
    base_url: String,
}

impl LeetCodeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let headers = HeaderMap::from_iter([
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (HeaderName::from_static("referer"), HeaderValue::from_str(base_url)?),
        ]);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl ProfileSource for LeetCodeClient {
    async fn fetch_profile(&self, username: &str) -> StatsResult<Profile> {
        log::trace!("[fetch_profile] Querying LeetCode for {username}...");
        let body = graphql_client::QueryBody {
            variables: ProfileVariables { username, limit: RECENT_SUBMISSION_LIMIT },
            query: PROFILE_QUERY,
            operation_name: PROFILE_OPERATION,
        };

        let response = self.http
            .post(format!("{}/graphql", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<graphql_client::Response<ProfileData>>()
            .await?;

        profile_from_response(username, response)
    }
}

#[async_trait]
impl ProblemCatalogSource for LeetCodeClient {
    async fn fetch_all_problems(&self) -> StatsResult<Vec<CatalogProblem>> {
        log::info!("[fetch_all_problems] Fetching the LeetCode problem catalog...");
        let list = self.http
            .get(format!("{}/api/problems/all/", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<ProblemList>()
            .await?;

        Ok(catalog_from_list(list))
    }
}

fn profile_from_response(
    username: &str,
    response: graphql_client::Response<ProfileData>,
) -> StatsResult<Profile> {
    let errors = response.errors.unwrap_or_default();

    let Some(data) = response.data else {
        if errors.iter().any(|err| err.message.contains("does not exist")) {
            return Err(StatsError::UserNotFound(username.to_string()));
        }
        let messages = errors.iter().map(|err| err.message.as_str()).collect::<Vec<_>>();
        return Err(StatsError::SourceUnavailable(format!(
            "No data found in the response: {}", messages.join("; ")
        )));
    };

    if data.matched_user.is_none() {
        return Err(StatsError::UserNotFound(username.to_string()));
    }

    let recent_submissions = data.recent_submission_list
        .unwrap_or_default()
        .into_iter()
        .map(|sub| {
            let timestamp_seconds = sub.timestamp.parse::<i64>().map_err(|_| {
                StatsError::SourceUnavailable(format!(
                    "Malformed submission timestamp for {username}: {}", sub.timestamp
                ))
            })?;

            Ok(RawSubmission {
                title_slug: sub.title_slug,
                timestamp_seconds,
                status_display: sub.status_display,
            })
        })
        .collect::<StatsResult<Vec<_>>>()?;

    let contest_rating = data.user_contest_ranking
        .and_then(|ranking| ranking.rating)
        .map(|rating| rating.round() as i64);

    Ok(Profile { contest_rating, recent_submissions })
}

/// Drops entries without a slug or with a level we don't know.
fn catalog_from_list(list: ProblemList) -> Vec<CatalogProblem> {
    list.stat_status_pairs
        .into_iter()
        .filter_map(|pair| {
            Some(CatalogProblem {
                slug: pair.stat.title_slug?,
                difficulty: Difficulty::from_level(pair.difficulty.level)?,
            })
        })
        .collect()
}
