use std::time::Duration;

use nrql::Query;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{Account, Error, Row};

/// The analytics query service the explorer runs its queries against.
pub trait QueryService {
    fn query(
        &self,
        account: i64,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Row>, Error>> + Send;

    fn accounts(&self) -> impl Future<Output = Result<Vec<Account>, Error>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn endpoint(self) -> &'static str {
        match self {
            Region::Us => "https://api.newrelic.com/graphql",
            Region::Eu => "https://api.eu.newrelic.com/graphql",
        }
    }
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

const NRQL_QUERY: &str = "query($accountId: Int!, $nrql: Nrql!, $timeout: Seconds) { \
    actor { account(id: $accountId) { nrql(query: $nrql, timeout: $timeout) { results } } } }";

const ACCOUNTS_QUERY: &str = "{ actor { accounts { id name } } }";

/// NerdGraph over HTTPS.
#[derive(Clone)]
pub struct NerdGraphClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for NerdGraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NerdGraphClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl NerdGraphClient {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        // the HTTP timeout outlasts the server side query timeout
        let http = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    async fn post(&self, query: &str, variables: Value) -> Result<Value, Error> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("API-Key", &self.api_key)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }
        let response: GraphQlResponse = serde_json::from_slice(&response.bytes().await?)?;
        if !response.errors.is_empty() {
            return Err(Error::Query(
                response.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        response.data.ok_or(Error::MissingResults)
    }
}

impl QueryService for NerdGraphClient {
    async fn query(&self, account: i64, query: &Query) -> Result<Vec<Row>, Error> {
        let nrql = query.to_string();
        debug!(account, %nrql, "running query");
        let data = self
            .post(
                NRQL_QUERY,
                json!({
                    "accountId": account,
                    "nrql": nrql,
                    "timeout": self.timeout.as_secs(),
                }),
            )
            .await?;
        results(data)
    }

    async fn accounts(&self) -> Result<Vec<Account>, Error> {
        let data = self.post(ACCOUNTS_QUERY, json!({})).await?;
        let accounts = data
            .pointer("/actor/accounts")
            .cloned()
            .ok_or(Error::MissingResults)?;
        Ok(serde_json::from_value(accounts)?)
    }
}

fn results(data: Value) -> Result<Vec<Row>, Error> {
    let Some(Value::Array(results)) = data.pointer("/actor/account/nrql/results") else {
        return Err(Error::MissingResults);
    };
    Ok(results
        .iter()
        .filter_map(|row| row.as_object().cloned())
        .collect())
}
