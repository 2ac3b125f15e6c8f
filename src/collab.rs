//! Interfaces to the world outside the runtime.
//!
//! The runtime never talks to the chat platform directly. State lookups,
//! message delivery, deferred mutations and template execution all go
//! through these traits, which the host implements.

use crate::context::ExecutionContext;
use crate::frame::Frame;
use crate::value::{Timestamp, Value};
use crate::Result;

pub type GuildId = u64;
pub type ChannelId = u64;
pub type UserId = u64;
pub type RoleId = u64;
pub type MessageId = u64;

/// Immutable view of the guild an execution belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSnapshot {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
}

/// A channel or thread messages can be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: ChannelId,
    pub name: String,
    /// Direct-message channel.
    pub is_dm: bool,
    /// Thread inside a parent channel.
    pub is_thread: bool,
}

/// Immutable view of a guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub user_id: UserId,
    pub username: String,
    pub nick: Option<String>,
    pub roles: Vec<RoleId>,
    pub is_bot: bool,
}

/// Immutable view of a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSnapshot {
    pub id: RoleId,
    pub name: String,
    pub position: i32,
    pub permissions: u64,
}

/// Opaque reference to a template body, produced by a [`MacroResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroHandle {
    pub name: String,
    pub source: String,
}

impl MacroHandle {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Read-only lookups against cached guild state.
///
/// Queries take script values so each implementation decides how to match
/// ids, names and mentions.
pub trait StateProvider: Send + Sync {
    /// Find a channel by id, name or mention.
    fn channel(&self, guild: &GuildSnapshot, query: &Value) -> Option<ChannelHandle>;

    /// Find a member by user id.
    fn member(&self, guild: &GuildSnapshot, user: UserId) -> Option<MemberSnapshot>;

    /// Find a role by id or name.
    fn role(&self, guild: &GuildSnapshot, query: &Value) -> Option<RoleSnapshot>;

    /// Effective permission bits of a member in a channel.
    fn member_permissions(
        &self,
        guild: &GuildSnapshot,
        channel: ChannelId,
        member: &MemberSnapshot,
    ) -> Result<u64>;
}

/// Side effects on the chat platform.
pub trait Delivery: Send + Sync {
    fn send_message(&self, channel: ChannelId, content: &str) -> Result<MessageId>;

    fn edit_message(&self, channel: ChannelId, message: MessageId, content: &str) -> Result<()>;

    fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;

    fn add_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()>;

    fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &str,
    ) -> Result<()>;

    /// Open (or reuse) a direct-message channel with a user.
    fn open_dm(&self, user: UserId) -> Result<ChannelHandle>;

    /// Deliver rendered output according to the frame's response intents.
    ///
    /// Returns the id of the sent message, or `None` if nothing was sent.
    fn send_response(&self, frame: &Frame, content: &str) -> Result<Option<MessageId>>;

    fn add_role(&self, guild: GuildId, user: UserId, role: RoleId) -> Result<()>;

    fn remove_role(&self, guild: GuildId, user: UserId, role: RoleId) -> Result<()>;
}

/// Deferred mutations, executed by the host at a later instant.
pub trait Scheduler: Send + Sync {
    fn schedule_add_role(&self, guild: GuildId, user: UserId, role: RoleId, at: Timestamp) -> Result<()>;

    fn schedule_remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        at: Timestamp,
    ) -> Result<()>;

    fn schedule_delete_message(
        &self,
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        at: Timestamp,
    ) -> Result<()>;
}

/// Looks up template bodies by name.
pub trait MacroResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<MacroHandle>;
}

/// The template engine that renders a body, calling builtins as it goes.
pub trait MacroEngine: Send + Sync {
    fn execute(&self, ctx: &mut ExecutionContext, handle: &MacroHandle) -> Result<String>;
}
