//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::collab::{
    ChannelHandle, ChannelId, Delivery, GuildId, GuildSnapshot, MacroEngine, MacroHandle,
    MacroResolver, MemberSnapshot, MessageId, RoleId, RoleSnapshot, Scheduler, StateProvider,
    UserId,
};
use crate::config::LimitsConfig;
use crate::context::{Collaborators, ExecutedFrom, ExecutionContext, Trigger};
use crate::frame::Frame;
use crate::value::{self, Timestamp, Value};
use crate::{Result, RuntimeError};

pub const GUILD_ID: GuildId = 100;
pub const CHANNEL_ID: ChannelId = 200;
pub const OTHER_CHANNEL_ID: ChannelId = 201;
pub const DM_CHANNEL_ID: ChannelId = 900;
pub const USER_ID: UserId = 300;
pub const ROLE_ID: RoleId = 400;
pub const OTHER_ROLE_ID: RoleId = 401;
pub const MESSAGE_ID: MessageId = 500;

pub fn channel(id: ChannelId, name: &str) -> ChannelHandle {
    ChannelHandle {
        id,
        name: name.to_string(),
        is_dm: false,
        is_thread: false,
    }
}

pub fn member() -> MemberSnapshot {
    MemberSnapshot {
        user_id: USER_ID,
        username: "alice".to_string(),
        nick: None,
        roles: vec![ROLE_ID],
        is_bot: false,
    }
}

#[derive(Default)]
pub struct FakeState {
    pub permissions: AtomicU64,
}

impl StateProvider for FakeState {
    fn channel(&self, _guild: &GuildSnapshot, query: &Value) -> Option<ChannelHandle> {
        let known = [channel(CHANNEL_ID, "general"), channel(OTHER_CHANNEL_ID, "other")];
        let id = value::to_int(query) as u64;
        let name = value::to_string(query);
        known.into_iter().find(|c| c.id == id || c.name == name)
    }

    fn member(&self, _guild: &GuildSnapshot, user: UserId) -> Option<MemberSnapshot> {
        (user == USER_ID).then(member)
    }

    fn role(&self, _guild: &GuildSnapshot, query: &Value) -> Option<RoleSnapshot> {
        let id = value::to_int(query) as u64;
        [ROLE_ID, OTHER_ROLE_ID]
            .into_iter()
            .find(|r| *r == id)
            .map(|id| RoleSnapshot {
                id,
                name: format!("role{id}"),
                position: 1,
                permissions: 0,
            })
    }

    fn member_permissions(
        &self,
        _guild: &GuildSnapshot,
        _channel: ChannelId,
        _member: &MemberSnapshot,
    ) -> Result<u64> {
        Ok(self.permissions.load(Ordering::SeqCst))
    }
}

/// Everything the fake delivery was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    Message(ChannelId, String),
    Edit(ChannelId, MessageId, String),
    Delete(ChannelId, MessageId),
    Reaction(ChannelId, MessageId, String),
    Unreaction(ChannelId, MessageId, UserId, String),
    Dm(UserId),
    Response(Frame, String),
    AddRole(UserId, RoleId),
    RemoveRole(UserId, RoleId),
}

pub struct FakeDelivery {
    next_id: AtomicU64,
    pub log: Mutex<Vec<Delivered>>,
}

impl Default for FakeDelivery {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            log: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDelivery {
    fn push(&self, entry: Delivered) {
        self.log.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<Delivered> {
        self.log.lock().unwrap().clone()
    }

    /// `(channel id, content)` of every delivered response.
    pub fn responses(&self) -> Vec<(ChannelId, String)> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Delivered::Response(frame, content) => {
                    Some((frame.channel.map(|c| c.id).unwrap_or(0), content))
                }
                _ => None,
            })
            .collect()
    }

    pub fn opened_dms(&self) -> Vec<UserId> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Delivered::Dm(user) => Some(user),
                _ => None,
            })
            .collect()
    }
}

impl Delivery for FakeDelivery {
    fn send_message(&self, channel: ChannelId, content: &str) -> Result<MessageId> {
        self.push(Delivered::Message(channel, content.to_string()));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn edit_message(&self, channel: ChannelId, message: MessageId, content: &str) -> Result<()> {
        self.push(Delivered::Edit(channel, message, content.to_string()));
        Ok(())
    }

    fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        self.push(Delivered::Delete(channel, message));
        Ok(())
    }

    fn add_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()> {
        if emoji.is_empty() {
            return Err(RuntimeError::Collaborator("unknown emoji".to_string()));
        }
        self.push(Delivered::Reaction(channel, message, emoji.to_string()));
        Ok(())
    }

    fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &str,
    ) -> Result<()> {
        self.push(Delivered::Unreaction(channel, message, user, emoji.to_string()));
        Ok(())
    }

    fn open_dm(&self, user: UserId) -> Result<ChannelHandle> {
        self.push(Delivered::Dm(user));
        Ok(ChannelHandle {
            id: DM_CHANNEL_ID,
            name: format!("dm-{user}"),
            is_dm: true,
            is_thread: false,
        })
    }

    fn send_response(&self, frame: &Frame, content: &str) -> Result<Option<MessageId>> {
        self.push(Delivered::Response(frame.clone(), content.to_string()));
        Ok(Some(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn add_role(&self, _guild: GuildId, user: UserId, role: RoleId) -> Result<()> {
        self.push(Delivered::AddRole(user, role));
        Ok(())
    }

    fn remove_role(&self, _guild: GuildId, user: UserId, role: RoleId) -> Result<()> {
        self.push(Delivered::RemoveRole(user, role));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scheduled {
    AddRole(UserId, RoleId, Timestamp),
    RemoveRole(UserId, RoleId, Timestamp),
    DeleteMessage(ChannelId, MessageId, Timestamp),
}

#[derive(Default)]
pub struct FakeScheduler {
    pub log: Mutex<Vec<Scheduled>>,
}

impl FakeScheduler {
    pub fn entries(&self) -> Vec<Scheduled> {
        self.log.lock().unwrap().clone()
    }
}

impl Scheduler for FakeScheduler {
    fn schedule_add_role(&self, _guild: GuildId, user: UserId, role: RoleId, at: Timestamp) -> Result<()> {
        self.log.lock().unwrap().push(Scheduled::AddRole(user, role, at));
        Ok(())
    }

    fn schedule_remove_role(
        &self,
        _guild: GuildId,
        user: UserId,
        role: RoleId,
        at: Timestamp,
    ) -> Result<()> {
        self.log.lock().unwrap().push(Scheduled::RemoveRole(user, role, at));
        Ok(())
    }

    fn schedule_delete_message(
        &self,
        _guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        at: Timestamp,
    ) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(Scheduled::DeleteMessage(channel, message, at));
        Ok(())
    }
}

type TemplateFn = Arc<dyn Fn(&mut ExecutionContext) -> Result<String> + Send + Sync>;

/// Templates backed by Rust closures.
#[derive(Default)]
pub struct FakeTemplates {
    templates: Mutex<HashMap<String, TemplateFn>>,
}

impl MacroResolver for FakeTemplates {
    fn resolve(&self, name: &str) -> Option<MacroHandle> {
        self.templates
            .lock()
            .unwrap()
            .contains_key(name)
            .then(|| MacroHandle::new(name, ""))
    }
}

impl MacroEngine for FakeTemplates {
    fn execute(&self, ctx: &mut ExecutionContext, handle: &MacroHandle) -> Result<String> {
        // Release the lock before running; templates may call each other.
        let template = self.templates.lock().unwrap().get(&handle.name).cloned();
        match template {
            Some(f) => f(ctx),
            None => Err(RuntimeError::NotFound(format!("template {:?}", handle.name))),
        }
    }
}

/// A full set of fakes plus helpers to build contexts over them.
pub struct Harness {
    pub state: Arc<FakeState>,
    pub delivery: Arc<FakeDelivery>,
    pub scheduler: Arc<FakeScheduler>,
    pub templates: Arc<FakeTemplates>,
    pub slept: Arc<Mutex<Vec<std::time::Duration>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            state: Arc::new(FakeState::default()),
            delivery: Arc::new(FakeDelivery::default()),
            scheduler: Arc::new(FakeScheduler::default()),
            templates: Arc::new(FakeTemplates::default()),
            slept: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_template<F>(&self, name: &str, f: F)
    where
        F: Fn(&mut ExecutionContext) -> Result<String> + Send + Sync + 'static,
    {
        self.templates
            .templates
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(f));
    }

    pub fn resolve(&self, name: &str) -> MacroHandle {
        self.templates.resolve(name).unwrap()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            state: self.state.clone(),
            delivery: self.delivery.clone(),
            scheduler: self.scheduler.clone(),
            resolver: self.templates.clone(),
            engine: self.templates.clone(),
        }
    }

    pub fn trigger(&self) -> Trigger {
        Trigger {
            guild: GuildSnapshot {
                id: GUILD_ID,
                name: "test guild".to_string(),
                owner_id: 1,
            },
            channel: Some(channel(CHANNEL_ID, "general")),
            member: Some(member()),
            message_id: Some(MESSAGE_ID),
            executed_from: ExecutedFrom::Command,
            premium: false,
        }
    }

    pub fn context(&self) -> ExecutionContext {
        self.context_with(|_| {})
    }

    pub fn context_with(&self, edit: impl FnOnce(&mut Trigger)) -> ExecutionContext {
        let mut trigger = self.trigger();
        edit(&mut trigger);
        let slept = Arc::clone(&self.slept);
        ExecutionContext::new(trigger, self.collaborators(), &LimitsConfig::default())
            .with_sleeper(Box::new(move |d| slept.lock().unwrap().push(d)))
    }
}
