//! Test helpers for runtime integration tests.
//!
//! Provides a line-based toy template engine driven by the real builtin
//! table, plus recording collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ccrt::collab::{ChannelId, GuildId, MessageId, RoleId, UserId};
use ccrt::value::Timestamp;
use ccrt::{
    BuiltinTable, ChannelHandle, Collaborators, Delivery, ExecutedFrom, ExecutionContext, Frame,
    GuildSnapshot, LimitsConfig, LoggingConfig, MacroEngine, MacroHandle, MacroResolver, MemberSnapshot, Result,
    RoleSnapshot, RuntimeError, Scheduler, StateProvider, Trigger, Value,
};

pub const GUILD: GuildId = 1;
pub const CHANNEL: ChannelId = 10;
pub const USER: UserId = 20;
pub const TRIGGER_MESSAGE: MessageId = 30;

/// Parse one script token: integers, `nil`, `true`/`false`, otherwise a string.
fn token(raw: &str) -> Value {
    match raw {
        "nil" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::from(raw)),
    }
}

/// Runs templates made of lines like `toInt 42`. Each line calls one
/// builtin and appends its printed result; lines starting with `>` are
/// emitted verbatim.
pub struct LineEngine {
    builtins: BuiltinTable,
    templates: Mutex<HashMap<String, String>>,
}

impl LineEngine {
    pub fn new() -> Self {
        Self {
            builtins: BuiltinTable::standard(),
            templates: Mutex::new(HashMap::new()),
        }
    }

    pub fn add(&self, name: &str, source: &str) {
        self.templates
            .lock()
            .unwrap()
            .insert(name.to_string(), source.to_string());
    }
}

impl MacroResolver for LineEngine {
    fn resolve(&self, name: &str) -> Option<MacroHandle> {
        let templates = self.templates.lock().unwrap();
        templates.get(name).map(|src| MacroHandle::new(name, src.as_str()))
    }
}

impl MacroEngine for LineEngine {
    fn execute(&self, ctx: &mut ExecutionContext, handle: &MacroHandle) -> Result<String> {
        let mut out = String::new();
        for line in handle.source.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(text) = line.strip_prefix('>') {
                out.push_str(text.trim_start());
                continue;
            }
            let mut parts = line.split_whitespace();
            let name = parts.next().unwrap_or_default();
            let args: Vec<Value> = parts.map(token).collect();
            let result = self.builtins.call(ctx, name, &args)?;
            out.push_str(&result.to_string());
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message(ChannelId, String),
    Response(ChannelId, String, Vec<String>),
    Reaction(MessageId, String),
    Dm(UserId),
    Role(UserId, RoleId, bool),
    Scheduled(String),
}

/// Records every platform call as an [`Event`].
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<Event>>,
    next_id: Mutex<MessageId>,
}

impl Recorder {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn next(&self) -> MessageId {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        1000 + *id
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl StateProvider for Recorder {
    fn channel(&self, _guild: &GuildSnapshot, query: &Value) -> Option<ChannelHandle> {
        let id = ccrt::value::to_int(query);
        (id == CHANNEL as i64 || id == 11).then(|| ChannelHandle {
            id: id as u64,
            name: format!("chan{id}"),
            is_dm: false,
            is_thread: false,
        })
    }

    fn member(&self, _guild: &GuildSnapshot, user: UserId) -> Option<MemberSnapshot> {
        (user == USER).then(member)
    }

    fn role(&self, _guild: &GuildSnapshot, _query: &Value) -> Option<RoleSnapshot> {
        None
    }

    fn member_permissions(
        &self,
        _guild: &GuildSnapshot,
        _channel: ChannelId,
        _member: &MemberSnapshot,
    ) -> Result<u64> {
        Ok(0)
    }
}

impl Delivery for Recorder {
    fn send_message(&self, channel: ChannelId, content: &str) -> Result<MessageId> {
        self.push(Event::Message(channel, content.to_string()));
        Ok(self.next())
    }

    fn edit_message(&self, _channel: ChannelId, _message: MessageId, _content: &str) -> Result<()> {
        Ok(())
    }

    fn delete_message(&self, _channel: ChannelId, _message: MessageId) -> Result<()> {
        Ok(())
    }

    fn add_reaction(&self, _channel: ChannelId, message: MessageId, emoji: &str) -> Result<()> {
        self.push(Event::Reaction(message, emoji.to_string()));
        Ok(())
    }

    fn remove_reaction(
        &self,
        _channel: ChannelId,
        _message: MessageId,
        _user: UserId,
        _emoji: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn open_dm(&self, user: UserId) -> Result<ChannelHandle> {
        self.push(Event::Dm(user));
        Ok(ChannelHandle {
            id: 99,
            name: "dm".to_string(),
            is_dm: true,
            is_thread: false,
        })
    }

    fn send_response(&self, frame: &Frame, content: &str) -> Result<Option<MessageId>> {
        let channel = frame
            .channel
            .as_ref()
            .map(|c| c.id)
            .ok_or_else(|| RuntimeError::Collaborator("no channel".to_string()))?;
        self.push(Event::Response(
            channel,
            content.to_string(),
            frame.response_reactions.clone(),
        ));
        Ok(Some(self.next()))
    }

    fn add_role(&self, _guild: GuildId, user: UserId, role: RoleId) -> Result<()> {
        self.push(Event::Role(user, role, true));
        Ok(())
    }

    fn remove_role(&self, _guild: GuildId, user: UserId, role: RoleId) -> Result<()> {
        self.push(Event::Role(user, role, false));
        Ok(())
    }
}

impl Scheduler for Recorder {
    fn schedule_add_role(&self, _guild: GuildId, user: UserId, role: RoleId, _at: Timestamp) -> Result<()> {
        self.push(Event::Scheduled(format!("add {user} {role}")));
        Ok(())
    }

    fn schedule_remove_role(
        &self,
        _guild: GuildId,
        user: UserId,
        role: RoleId,
        _at: Timestamp,
    ) -> Result<()> {
        self.push(Event::Scheduled(format!("remove {user} {role}")));
        Ok(())
    }

    fn schedule_delete_message(
        &self,
        _guild: GuildId,
        _channel: ChannelId,
        message: MessageId,
        _at: Timestamp,
    ) -> Result<()> {
        self.push(Event::Scheduled(format!("delete {message}")));
        Ok(())
    }
}

pub fn member() -> MemberSnapshot {
    MemberSnapshot {
        user_id: USER,
        username: "bob".to_string(),
        nick: None,
        roles: vec![5],
        is_bot: false,
    }
}

/// A recorder and engine wired together.
pub struct TestHost {
    pub recorder: Arc<Recorder>,
    pub engine: Arc<LineEngine>,
}

impl TestHost {
    pub fn new() -> Self {
        let logging = LoggingConfig {
            level: "warn".to_string(),
            file: String::new(),
        };
        ccrt::logging::init(&logging).unwrap();
        Self {
            recorder: Arc::new(Recorder::default()),
            engine: Arc::new(LineEngine::new()),
        }
    }

    pub fn trigger(&self, premium: bool) -> Trigger {
        Trigger {
            guild: GuildSnapshot {
                id: GUILD,
                name: "guild".to_string(),
                owner_id: USER,
            },
            channel: Some(ChannelHandle {
                id: CHANNEL,
                name: "chan10".to_string(),
                is_dm: false,
                is_thread: false,
            }),
            member: Some(member()),
            message_id: Some(TRIGGER_MESSAGE),
            executed_from: ExecutedFrom::Command,
            premium,
        }
    }

    pub fn context(&self, premium: bool) -> ExecutionContext {
        self.context_with_limits(premium, &LimitsConfig::default())
    }

    pub fn context_with_limits(&self, premium: bool, limits: &LimitsConfig) -> ExecutionContext {
        let collab = Collaborators {
            state: self.recorder.clone(),
            delivery: self.recorder.clone(),
            scheduler: self.recorder.clone(),
            resolver: self.engine.clone(),
            engine: self.engine.clone(),
        };
        ExecutionContext::new(self.trigger(premium), collab, limits).with_sleeper(Box::new(|_| {}))
    }

    /// Run `name` as the root template and deliver its output like a host would.
    pub fn run(&self, ctx: &mut ExecutionContext, name: &str) -> Result<String> {
        let handle = self
            .engine
            .resolve(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        let out = ctx.run(&handle)?;
        ctx.respond(&out)?;
        Ok(out)
    }
}
