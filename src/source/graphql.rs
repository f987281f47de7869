//! GraphQL client for the budget proposal API.

use crate::models::{BudgetYear, Person, Proposal};
use crate::source::{ProposalSource, RetryPolicy, SourceError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const PROPOSALS_QUERY: &str = r#"
query FetchProposals($where: ProposalWhereInput!) {
  proposals(where: $where) {
    id
    proposalTypes
    reductionAmount
    freezeAmount
    year {
      id
      year
    }
    government {
      id
      name
    }
    proposers {
      id
      name
    }
    coSigners {
      id
      name
    }
  }
}
"#;

const PEOPLE_QUERY: &str = r#"
query FetchPeople {
  peopleList {
    id
    name
    type
  }
}
"#;

const BUDGET_YEARS_QUERY: &str = r#"
query FetchBudgetYears {
  budgetYears {
    id
    year
  }
}
"#;

/// Credentials sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuth {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `X-API-Key: <key>`
    ApiKey(String),
}

impl ApiAuth {
    /// Pick credentials from configuration; a bearer token wins over an API key.
    pub fn from_parts(bearer_token: Option<&str>, api_key: Option<&str>) -> Option<Self> {
        match (bearer_token, api_key) {
            (Some(token), _) if !token.is_empty() => Some(Self::Bearer(token.to_string())),
            (_, Some(key)) if !key.is_empty() => Some(Self::ApiKey(key.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ProposalsData {
    #[serde(default)]
    proposals: Option<Vec<Proposal>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeopleData {
    #[serde(default)]
    people_list: Option<Vec<Person>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BudgetYearsData {
    #[serde(default)]
    budget_years: Option<Vec<BudgetYear>>,
}

/// [`ProposalSource`] backed by the Keystone GraphQL API.
pub struct GraphQlSource {
    endpoint: String,
    http_client: reqwest::Client,
    auth: Option<ApiAuth>,
    retry: RetryPolicy,
    timeout_seconds: u64,
}

impl GraphQlSource {
    /// Create a client for the given endpoint.
    pub fn new(
        endpoint: impl Into<String>,
        auth: Option<ApiAuth>,
        timeout_seconds: u64,
        retry: RetryPolicy,
    ) -> Result<Self, SourceError> {
        let endpoint = endpoint.into();
        info!("Using GraphQL endpoint: {}", endpoint);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            endpoint,
            http_client,
            auth,
            retry,
            timeout_seconds,
        })
    }

    /// Execute a query, retrying transient failures.
    async fn execute<T: DeserializeOwned + Default>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, SourceError> {
        let request = GraphQlRequest { query, variables };
        self.retry.run(|| self.send(&request)).await
    }

    async fn send<T: DeserializeOwned + Default>(
        &self,
        request: &GraphQlRequest<'_>,
    ) -> Result<T, SourceError> {
        let mut builder = self.http_client.post(&self.endpoint).json(request);
        builder = match &self.auth {
            Some(ApiAuth::Bearer(token)) => builder.bearer_auth(token),
            Some(ApiAuth::ApiKey(key)) => builder.header("X-API-Key", key),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.timeout_seconds)
            } else if e.is_connect() {
                SourceError::Connect(self.endpoint.clone())
            } else {
                SourceError::Network(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http { status, body });
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        if !body.errors.is_empty() {
            return Err(SourceError::GraphQl(Value::Array(body.errors).to_string()));
        }

        Ok(body.data.unwrap_or_default())
    }
}

/// Filter for published, passed proposals that are not merged or historical children.
fn proposal_filter(year_id: Option<&str>) -> Value {
    let mut filter = json!({
        "publishStatus": { "equals": "published" },
        "result": { "equals": "passed" },
        "mergedParentProposals": null,
        "historicalParentProposals": null,
    });

    if let Some(id) = year_id {
        filter["year"] = json!({ "id": { "equals": id } });
    }

    filter
}

#[async_trait]
impl ProposalSource for GraphQlSource {
    async fn fetch_proposals(&self, year_id: Option<&str>) -> Result<Vec<Proposal>, SourceError> {
        let data: ProposalsData = self
            .execute(PROPOSALS_QUERY, json!({ "where": proposal_filter(year_id) }))
            .await?;
        let proposals = data.proposals.unwrap_or_default();
        debug!("Fetched {} proposals (year filter: {:?})", proposals.len(), year_id);
        Ok(proposals)
    }

    async fn fetch_people(&self) -> Result<Vec<Person>, SourceError> {
        let data: PeopleData = self.execute(PEOPLE_QUERY, json!({})).await?;
        Ok(data.people_list.unwrap_or_default())
    }

    async fn fetch_budget_years(&self) -> Result<Vec<BudgetYear>, SourceError> {
        let data: BudgetYearsData = self.execute(BUDGET_YEARS_QUERY, json!({})).await?;
        Ok(data.budget_years.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeApi {
        calls: AtomicU32,
        fail_first: u32,
        last_request: Mutex<Option<(HeaderMap, Value)>>,
    }

    async fn handle(
        State(api): State<Arc<FakeApi>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let call = api.calls.fetch_add(1, Ordering::SeqCst);
        *api.last_request.lock().unwrap() = Some((headers, body.clone()));

        if call < api.fail_first {
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
        }

        let query = body["query"].as_str().unwrap_or_default();
        let data = if query.contains("FetchProposals") {
            json!({ "proposals": [{
                "id": "p1",
                "proposalTypes": ["reduce"],
                "reductionAmount": 10,
                "year": { "id": "y1", "year": 2024 },
                "proposers": [{ "id": "a", "name": "Alice" }],
                "coSigners": null
            }] })
        } else if query.contains("FetchPeople") {
            json!({ "peopleList": [{ "id": "a", "name": "Alice", "type": "legislator" }] })
        } else if query.contains("FetchBudgetYears") {
            json!({ "budgetYears": [{ "id": "y1", "year": 2024 }] })
        } else {
            return (
                StatusCode::OK,
                Json(json!({ "errors": [{ "message": "unknown query" }] })),
            );
        };

        (StatusCode::OK, Json(json!({ "data": data })))
    }

    async fn spawn_fake_api(api: Arc<FakeApi>) -> String {
        let app = Router::new().route("/api/graphql", post(handle)).with_state(api);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/graphql", addr)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[test]
    fn test_auth_precedence() {
        assert_eq!(
            ApiAuth::from_parts(Some("tok"), Some("key")),
            Some(ApiAuth::Bearer("tok".to_string()))
        );
        assert_eq!(
            ApiAuth::from_parts(None, Some("key")),
            Some(ApiAuth::ApiKey("key".to_string()))
        );
        assert_eq!(
            ApiAuth::from_parts(Some(""), Some("key")),
            Some(ApiAuth::ApiKey("key".to_string()))
        );
        assert_eq!(ApiAuth::from_parts(None, None), None);
    }

    #[test]
    fn test_proposal_filter() {
        let unscoped = proposal_filter(None);
        assert_eq!(unscoped["publishStatus"]["equals"], "published");
        assert_eq!(unscoped["result"]["equals"], "passed");
        assert!(unscoped["mergedParentProposals"].is_null());
        assert!(unscoped.get("year").is_none());

        let scoped = proposal_filter(Some("y1"));
        assert_eq!(scoped["year"]["id"]["equals"], "y1");
    }

    #[tokio::test]
    async fn test_fetch_all_collections() {
        let api = Arc::new(FakeApi::default());
        let endpoint = spawn_fake_api(api.clone()).await;
        let source = GraphQlSource::new(
            endpoint,
            Some(ApiAuth::Bearer("secret".to_string())),
            5,
            fast_retry(),
        )
        .unwrap();

        let proposals = source.fetch_proposals(Some("y1")).await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert!(proposals[0].co_signers.is_empty());

        {
            let guard = api.last_request.lock().unwrap();
            let (headers, body) = guard.as_ref().unwrap();
            assert_eq!(headers["authorization"], "Bearer secret");
            assert_eq!(body["variables"]["where"]["year"]["id"]["equals"], "y1");
        }

        let people = source.fetch_people().await.unwrap();
        assert_eq!(people[0].name, "Alice");

        let years = source.fetch_budget_years().await.unwrap();
        assert_eq!(years[0].year, 2024);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let api = Arc::new(FakeApi {
            fail_first: 2,
            ..FakeApi::default()
        });
        let endpoint = spawn_fake_api(api.clone()).await;
        let source = GraphQlSource::new(
            endpoint,
            Some(ApiAuth::ApiKey("k".to_string())),
            5,
            fast_retry(),
        )
        .unwrap();

        let years = source.fetch_budget_years().await.unwrap();
        assert_eq!(years.len(), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);

        let guard = api.last_request.lock().unwrap();
        let (headers, _) = guard.as_ref().unwrap();
        assert_eq!(headers["x-api-key"], "k");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let api = Arc::new(FakeApi {
            fail_first: 10,
            ..FakeApi::default()
        });
        let endpoint = spawn_fake_api(api.clone()).await;
        let source = GraphQlSource::new(endpoint, None, 5, fast_retry()).unwrap();

        let err = source.fetch_people().await.unwrap_err();
        assert!(matches!(err, SourceError::Exhausted { attempts: 3, .. }));
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let source =
            GraphQlSource::new("http://127.0.0.1:1/api/graphql", None, 5, fast_retry()).unwrap();

        let err = source.fetch_budget_years().await.unwrap_err();
        assert!(matches!(err, SourceError::Exhausted { .. }));
    }
}
