//! In-memory doubles for the gateway seams.
//!
//! Used by this crate's tests and by embedders that want to drive a bot
//! without a network connection.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    accord_common::{Interaction, InteractionKind, Reply},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    serde_json::{Value, json},
};

use crate::{
    error::{Error, Result},
    sync::{CommandApi, SyncScope},
};

/// A scripted interaction that records every response sent to it.
#[derive(Debug)]
pub struct FakeInteraction {
    kind: InteractionKind,
    command: String,
    user_id: String,
    user_name: String,
    guild_id: Option<String>,
    created_at: DateTime<Utc>,
    fail_responses: bool,
    replied: AtomicBool,
    deferred: AtomicBool,
    replies: Mutex<Vec<Reply>>,
    follow_ups: Mutex<Vec<Reply>>,
}

impl FakeInteraction {
    /// A chat-input invocation of `/name` by user `u0`, created now.
    pub fn command(name: impl Into<String>) -> Self {
        Self {
            kind: InteractionKind::ChatInputCommand,
            command: name.into(),
            user_id: "u0".into(),
            user_name: "tester".into(),
            guild_id: None,
            created_at: Utc::now(),
            fail_responses: false,
            replied: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
            replies: Mutex::default(),
            follow_ups: Mutex::default(),
        }
    }

    #[must_use]
    pub fn user(mut self, id: impl Into<String>) -> Self {
        self.user_id = id.into();
        self
    }

    #[must_use]
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: InteractionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn guild(mut self, id: impl Into<String>) -> Self {
        self.guild_id = Some(id.into());
        self
    }

    /// Make every reply, follow-up and defer return an error.
    #[must_use]
    pub fn failing_replies(mut self) -> Self {
        self.fail_responses = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn follow_ups(&self) -> Vec<Reply> {
        self.follow_ups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check_deliverable(&self) -> accord_common::Result<()> {
        if self.fail_responses {
            return Err(accord_common::Error::message("interaction response rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl Interaction for FakeInteraction {
    fn kind(&self) -> InteractionKind {
        self.kind
    }

    fn command_name(&self) -> &str {
        &self.command
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn user_name(&self) -> &str {
        &self.user_name
    }

    fn guild_id(&self) -> Option<&str> {
        self.guild_id.as_deref()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn replied(&self) -> bool {
        self.replied.load(Ordering::Acquire)
    }

    fn deferred(&self) -> bool {
        self.deferred.load(Ordering::Acquire)
    }

    fn to_value(&self) -> Value {
        json!({
            "commandName": self.command,
            "user": { "id": self.user_id, "username": self.user_name },
            "guildId": self.guild_id,
            "createdAt": self.created_at.to_rfc3339(),
        })
    }

    async fn reply(&self, reply: Reply) -> accord_common::Result<()> {
        self.check_deliverable()?;
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reply);
        self.replied.store(true, Ordering::Release);
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> accord_common::Result<()> {
        self.check_deliverable()?;
        self.follow_ups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reply);
        Ok(())
    }

    async fn defer(&self, _ephemeral: bool) -> accord_common::Result<()> {
        self.check_deliverable()?;
        self.deferred.store(true, Ordering::Release);
        Ok(())
    }
}

/// One `put_commands` call seen by [`FakeCommandApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    pub scope: SyncScope,
    pub commands: Vec<Value>,
}

/// Remote command registry kept in memory.
#[derive(Debug, Default)]
pub struct FakeCommandApi {
    calls: Mutex<Vec<RecordedPut>>,
    remote: Mutex<HashMap<SyncScope, Vec<Value>>>,
    failing: Vec<SyncScope>,
}

impl FakeCommandApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request for `scope`.
    #[must_use]
    pub fn failing_for(mut self, scope: SyncScope) -> Self {
        self.failing.push(scope);
        self
    }

    pub fn calls(&self) -> Vec<RecordedPut> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// What the registry currently holds for `scope`.
    pub fn remote(&self, scope: &SyncScope) -> Vec<Value> {
        self.remote
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CommandApi for FakeCommandApi {
    async fn put_commands(&self, scope: &SyncScope, commands: &[Value]) -> Result<usize> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedPut {
                scope: scope.clone(),
                commands: commands.to_vec(),
            });
        if self.failing.contains(scope) {
            return Err(Error::Api {
                scope: scope.clone(),
                status: 403,
                body: "Missing Access".into(),
            });
        }
        self.remote
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(scope.clone(), commands.to_vec());
        Ok(commands.len())
    }
}
