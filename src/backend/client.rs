use std::time::Duration;

use serde_json::Value;

use super::query::Query;
use super::Backend;
use crate::config::BackendConfig;
use crate::error::MecalError;

/// REST client for the managed backend.
///
/// Table access goes through `{url}/rest/v1/{table}`, token checks through
/// `{url}/auth/v1/user`. Every request carries the service-role key.
pub struct RestBackend {
    agent: ureq::Agent,
    base_url: String,
    service_key: String,
}

impl RestBackend {
    #[must_use]
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `MecalError::Misconfigured` if the url or key is missing.
    pub fn from_config(config: &BackendConfig) -> Result<Self, MecalError> {
        let (url, key) = config.credentials()?;
        Ok(Self::new(url, key, Duration::from_secs(config.timeout_secs)))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, method: &str, table: &str, query: &Query, mutation: bool) -> ureq::Request {
        let url = self.table_url(table);
        log::debug!("{method} {url} {:?}", query.to_pairs());

        let mut req = self
            .agent
            .request(method, &url)
            .set("apikey", &self.service_key)
            .set("Authorization", &format!("Bearer {}", self.service_key))
            .set("Accept", "application/json");
        if mutation {
            req = req.set("Prefer", "return=representation");
        }
        for (key, value) in query.to_pairs() {
            req = req.query(&key, &value);
        }
        req
    }
}

impl Backend for RestBackend {
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, MecalError> {
        rows(self.request("GET", table, query, false).call())
    }

    fn insert(&self, table: &str, row: &Value) -> Result<Value, MecalError> {
        let inserted = rows(
            self.request("POST", table, &Query::new(), true)
                .send_json(row),
        )?;
        inserted.into_iter().next().ok_or_else(|| MecalError::Backend {
            status: 500,
            message: format!("insert into {table} returned no row"),
        })
    }

    fn update(&self, table: &str, query: &Query, patch: &Value) -> Result<Vec<Value>, MecalError> {
        rows(self.request("PATCH", table, query, true).send_json(patch))
    }

    fn delete(&self, table: &str, query: &Query) -> Result<Vec<Value>, MecalError> {
        rows(self.request("DELETE", table, query, true).call())
    }

    fn user_for_token(&self, token: &str) -> Result<Option<String>, MecalError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let result = self
            .agent
            .get(&url)
            .set("apikey", &self.service_key)
            .set("Authorization", &format!("Bearer {token}"))
            .call();

        match result {
            Ok(resp) => {
                let body: Value = resp.into_json()?;
                Ok(body.get("id").and_then(Value::as_str).map(String::from))
            },
            Err(ureq::Error::Status(401 | 403, _)) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }
}

fn rows(result: Result<ureq::Response, ureq::Error>) -> Result<Vec<Value>, MecalError> {
    let text = result.map_err(map_error)?.into_string()?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str(&text)? {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![single]),
    }
}

fn map_error(err: ureq::Error) -> MecalError {
    match err {
        ureq::Error::Status(status, resp) => {
            let text = resp.into_string().unwrap_or_default();
            MecalError::Backend {
                status,
                message: error_message(&text),
            }
        },
        ureq::Error::Transport(t) => MecalError::Network(t.to_string()),
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error", "msg"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| body.trim().to_string())
}
