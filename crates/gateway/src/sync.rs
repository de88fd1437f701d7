//! Command sync against the remote command registry.
//!
//! Every scope is cleared and then replaced, one scope after another. The
//! registry's bulk overwrite only covers what is sent, so clearing first
//! drops commands that were removed locally.

use std::fmt;

use {
    async_trait::async_trait,
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use accord_metrics::{counter, labels, sync as sync_metrics};

use crate::error::{Error, Result};

/// Where a command set is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncScope {
    Global,
    Guild(String),
}

impl SyncScope {
    /// Metric label value.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Guild(_) => "guild",
        }
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Guild(id) => write!(f, "guild {id}"),
        }
    }
}

/// Bulk overwrite of one scope's command set.
#[async_trait]
pub trait CommandApi: Send + Sync {
    /// Replace the commands registered for `scope` with `commands`.
    /// Returns how many commands the registry now holds.
    async fn put_commands(&self, scope: &SyncScope, commands: &[Value]) -> Result<usize>;
}

/// Discord REST implementation of [`CommandApi`].
pub struct RestCommandApi {
    client: Client,
    base_url: String,
    client_id: String,
    token: Secret<String>,
}

impl fmt::Debug for RestCommandApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestCommandApi")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl RestCommandApi {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            token: Secret::new(token.into()),
        }
    }

    /// Build from a loaded config. Needs both `token` and `client_id`.
    pub fn from_config(config: &accord_config::AccordConfig) -> Result<Self> {
        let token = config
            .token()
            .ok_or_else(|| Error::config("no bot token configured"))?;
        let client_id = config
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::config("no client_id configured"))?;
        Ok(Self::new(&config.api.base_url, client_id, token))
    }

    pub fn endpoint(&self, scope: &SyncScope) -> String {
        match scope {
            SyncScope::Global => {
                format!("{}/applications/{}/commands", self.base_url, self.client_id)
            },
            SyncScope::Guild(guild) => format!(
                "{}/applications/{}/guilds/{guild}/commands",
                self.base_url, self.client_id
            ),
        }
    }
}

#[async_trait]
impl CommandApi for RestCommandApi {
    async fn put_commands(&self, scope: &SyncScope, commands: &[Value]) -> Result<usize> {
        let url = self.endpoint(scope);
        debug!(%scope, url = %url, count = commands.len(), "PUT commands");

        let resp = self
            .client
            .put(&url)
            .header(
                "Authorization",
                format!("Bot {}", self.token.expose_secret()),
            )
            .json(commands)
            .send()
            .await
            .map_err(|source| Error::Http {
                scope: scope.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                scope: scope.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let registered: Vec<Value> = resp.json().await.map_err(|source| Error::Http {
            scope: scope.clone(),
            source,
        })?;
        Ok(registered.len())
    }
}

/// Result of syncing one scope.
#[derive(Debug)]
pub struct ScopeOutcome {
    pub scope: SyncScope,
    /// Commands registered after the replace step.
    pub result: Result<usize>,
}

impl ScopeOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub scopes: Vec<ScopeOutcome>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.scopes.iter().all(ScopeOutcome::is_ok)
    }

    pub fn failed_scopes(&self) -> Vec<&SyncScope> {
        self.scopes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| &o.scope)
            .collect()
    }

    /// `Err(Error::Sync)` naming every failed scope, if any failed.
    pub fn into_result(self) -> Result<()> {
        let scopes: Vec<String> = self
            .failed_scopes()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        if scopes.is_empty() {
            Ok(())
        } else {
            Err(Error::Sync { scopes })
        }
    }
}

/// Clear then replace one scope.
async fn sync_scope(api: &dyn CommandApi, scope: &SyncScope, commands: &[Value]) -> Result<usize> {
    put(api, scope, &[]).await?;
    put(api, scope, commands).await
}

async fn put(api: &dyn CommandApi, scope: &SyncScope, commands: &[Value]) -> Result<usize> {
    let result = api.put_commands(scope, commands).await;
    #[cfg(feature = "metrics")]
    record_put(scope, result.is_err());
    result
}

#[cfg(feature = "metrics")]
fn record_put(scope: &SyncScope, failed: bool) {
    counter!(sync_metrics::REQUESTS_TOTAL, labels::SCOPE => scope.label()).increment(1);
    if failed {
        counter!(sync_metrics::FAILURES_TOTAL, labels::SCOPE => scope.label()).increment(1);
    }
}

/// Push `commands` to every guild in `guild_ids`, or globally when `None`.
///
/// Scopes run sequentially. A failing scope is logged and recorded in the
/// report; the remaining scopes still run.
pub async fn sync_commands(
    api: &dyn CommandApi,
    commands: &[Value],
    guild_ids: Option<&[String]>,
) -> SyncReport {
    let scopes: Vec<SyncScope> = match guild_ids {
        Some(ids) => ids.iter().cloned().map(SyncScope::Guild).collect(),
        None => vec![SyncScope::Global],
    };

    info!(
        commands = commands.len(),
        scopes = scopes.len(),
        "started refreshing application commands"
    );

    let mut report = SyncReport::default();
    for scope in scopes {
        let result = sync_scope(api, &scope, commands).await;
        match &result {
            Ok(count) => info!(%scope, count, "reloaded application commands"),
            Err(e) => warn!(%scope, error = %e, "failed to reload application commands"),
        }
        report.scopes.push(ScopeOutcome { scope, result });
    }
    report
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::testing::FakeCommandApi, serde_json::json};

    fn commands() -> Vec<Value> {
        vec![
            json!({"name": "ping", "description": "Replies with pong"}),
            json!({"name": "echo", "description": "Echoes"}),
            json!({"name": "roll", "description": "Rolls a die"}),
        ]
    }

    #[tokio::test]
    async fn guilds_are_cleared_then_replaced_in_order() {
        let api = FakeCommandApi::new();
        let guilds = vec!["G1".to_string(), "G2".to_string()];

        let report = sync_commands(&api, &commands(), Some(guilds.as_slice())).await;
        assert!(report.is_success());

        let calls: Vec<_> = api
            .calls()
            .into_iter()
            .map(|c| (c.scope, c.commands.len()))
            .collect();
        assert_eq!(calls, vec![
            (SyncScope::Guild("G1".into()), 0),
            (SyncScope::Guild("G1".into()), 3),
            (SyncScope::Guild("G2".into()), 0),
            (SyncScope::Guild("G2".into()), 3),
        ]);
    }

    #[tokio::test]
    async fn without_guilds_the_global_scope_is_used() {
        let api = FakeCommandApi::new();
        let report = sync_commands(&api, &commands(), None).await;

        assert_eq!(report.scopes.len(), 1);
        assert_eq!(report.scopes[0].scope, SyncScope::Global);
        assert_eq!(api.calls().len(), 2);
        assert_eq!(api.remote(&SyncScope::Global), commands());
    }

    #[tokio::test]
    async fn one_failing_guild_does_not_block_the_rest() {
        let api = FakeCommandApi::new().failing_for(SyncScope::Guild("G1".into()));
        let guilds = vec!["G1".to_string(), "G2".to_string()];

        let report = sync_commands(&api, &commands(), Some(guilds.as_slice())).await;
        assert!(!report.is_success());
        assert_eq!(report.failed_scopes(), vec![&SyncScope::Guild("G1".into())]);
        assert_eq!(api.remote(&SyncScope::Guild("G2".into())).len(), 3);

        let err = report.into_result().unwrap_err();
        assert!(matches!(&err, Error::Sync { scopes } if scopes == &["guild G1"]));
    }

    #[tokio::test]
    async fn syncing_twice_is_idempotent() {
        let api = FakeCommandApi::new();
        sync_commands(&api, &commands(), None).await;
        let first = api.remote(&SyncScope::Global);
        sync_commands(&api, &commands(), None).await;
        assert_eq!(api.remote(&SyncScope::Global), first);
        assert_eq!(first, commands());
    }

    #[tokio::test]
    async fn shrinking_the_set_removes_stale_commands() {
        let api = FakeCommandApi::new();
        sync_commands(&api, &commands(), None).await;
        sync_commands(&api, &commands()[..1], None).await;
        assert_eq!(api.remote(&SyncScope::Global), vec![commands()[0].clone()]);
    }

    #[test]
    fn endpoints_follow_the_rest_layout() {
        let api = RestCommandApi::new("https://discord.test/api/v10/", "42", "t");
        assert_eq!(
            api.endpoint(&SyncScope::Global),
            "https://discord.test/api/v10/applications/42/commands"
        );
        assert_eq!(
            api.endpoint(&SyncScope::Guild("7".into())),
            "https://discord.test/api/v10/applications/42/guilds/7/commands"
        );
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let api = RestCommandApi::new("https://discord.test", "42", "s3cret");
        assert!(!format!("{api:?}").contains("s3cret"));
    }

    // ── HTTP (mockito) ─────────────────────────────────────────────────

    #[tokio::test]
    async fn rest_api_puts_json_with_bot_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/applications/42/guilds/7/commands")
            .match_header("authorization", "Bot s3cret")
            .match_body(mockito::Matcher::Json(json!([{"name": "ping"}])))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"id": "1", "name": "ping"}]).to_string())
            .create_async()
            .await;

        let api = RestCommandApi::new(server.url(), "42", "s3cret");
        let count = api
            .put_commands(&SyncScope::Guild("7".into()), &[json!({"name": "ping"})])
            .await
            .unwrap();

        assert_eq!(count, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rest_api_surfaces_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", "/applications/42/commands")
            .with_status(401)
            .with_body(r#"{"message": "401: Unauthorized"}"#)
            .create_async()
            .await;

        let api = RestCommandApi::new(server.url(), "42", "bad");
        let err = api
            .put_commands(&SyncScope::Global, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api { status: 401, .. }), "{err}");
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn rest_sync_clears_before_replacing() {
        let mut server = mockito::Server::new_async().await;
        let clear = server
            .mock("PUT", "/applications/42/commands")
            .match_body(mockito::Matcher::Json(json!([])))
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;
        let replace = server
            .mock("PUT", "/applications/42/commands")
            .match_body(mockito::Matcher::Json(json!([{"name": "ping"}])))
            .with_status(200)
            .with_body(r#"[{"id": "1", "name": "ping"}]"#)
            .expect(1)
            .create_async()
            .await;

        let api = RestCommandApi::new(server.url(), "42", "t");
        let report = sync_commands(&api, &[json!({"name": "ping"})], None).await;

        assert!(report.is_success());
        assert!(matches!(report.scopes[0].result, Ok(1)));
        clear.assert_async().await;
        replace.assert_async().await;
    }
}
