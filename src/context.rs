//! Per-execution state.
//!
//! An [`ExecutionContext`] is built for one triggering event, runs one
//! template (plus any nested calls it makes) and is dropped afterwards. It
//! owns every budget, cache and counter of that execution; nothing in it is
//! shared with other executions.

use std::sync::Arc;

use tracing::{debug, info};

use crate::collab::{
    ChannelHandle, Delivery, GuildSnapshot, MacroEngine, MacroHandle, MacroResolver, MemberSnapshot,
    MessageId, Scheduler, StateProvider,
};
use crate::config::LimitsConfig;
use crate::frame::{Frame, FrameGuard, TEMPLATE_ARGS_KEY};
use crate::quota::{QuotaGovernor, Sleeper};
use crate::regex_cache::RegexCache;
use crate::safety;
use crate::value::{build_string_map, dereference, SDict, Value};
use crate::{Result, RuntimeError};

/// Ledger key counting nested template calls.
pub const NESTED_CALL_KEY: &str = "exec_child";

/// What kind of event started the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutedFrom {
    Command,
    Reaction,
    Join,
    Leave,
    Timed,
    Interaction,
}

/// Where a nested template's response goes.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedTarget {
    /// Direct message to the triggering member.
    Dm,
    /// The given channel, or the current one when `None`.
    Channel(Option<Value>),
}

/// Host services an execution can reach.
#[derive(Clone)]
pub struct Collaborators {
    pub state: Arc<dyn StateProvider>,
    pub delivery: Arc<dyn Delivery>,
    pub scheduler: Arc<dyn Scheduler>,
    pub resolver: Arc<dyn MacroResolver>,
    pub engine: Arc<dyn MacroEngine>,
}

/// The event an execution runs for.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub guild: GuildSnapshot,
    pub channel: Option<ChannelHandle>,
    pub member: Option<MemberSnapshot>,
    /// Message that triggered the execution, if any.
    pub message_id: Option<MessageId>,
    pub executed_from: ExecutedFrom,
    /// Tenant has the premium tier.
    pub premium: bool,
}

/// State of one script execution.
pub struct ExecutionContext {
    trigger: Trigger,
    collab: Collaborators,
    limits: LimitsConfig,
    data: SDict,
    quota: QuotaGovernor,
    regex_cache: RegexCache,
    frame: Frame,
}

impl ExecutionContext {
    /// Create a context in its root frame.
    pub fn new(trigger: Trigger, collab: Collaborators, limits: &LimitsConfig) -> Self {
        let frame = Frame::root(trigger.channel.clone());
        Self {
            quota: QuotaGovernor::new(limits, trigger.premium),
            regex_cache: RegexCache::new(limits.regex_cache_capacity),
            limits: limits.clone(),
            data: SDict::new(),
            trigger,
            collab,
            frame,
        }
    }

    /// Replace the blocking primitive used by `sleep`.
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.quota = self.quota.with_sleeper(sleeper);
        self
    }

    pub fn guild(&self) -> &GuildSnapshot {
        &self.trigger.guild
    }

    /// Channel the triggering event happened in.
    pub fn trigger_channel(&self) -> Option<&ChannelHandle> {
        self.trigger.channel.as_ref()
    }

    pub fn member(&self) -> Option<&MemberSnapshot> {
        self.trigger.member.as_ref()
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.trigger.message_id
    }

    pub fn executed_from(&self) -> ExecutedFrom {
        self.trigger.executed_from
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }

    /// The script-visible data bag.
    pub fn data(&self) -> &SDict {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SDict {
        &mut self.data
    }

    pub fn quota(&self) -> &QuotaGovernor {
        &self.quota
    }

    pub fn quota_mut(&mut self) -> &mut QuotaGovernor {
        &mut self.quota
    }

    pub fn regex_cache_mut(&mut self) -> &mut RegexCache {
        &mut self.regex_cache
    }

    /// The current frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }

    /// Channel the current frame responds in, if any.
    pub fn current_channel(&self) -> Option<&ChannelHandle> {
        self.frame.channel.as_ref()
    }

    /// Run the root template and return its rendered output.
    pub fn run(&mut self, handle: &MacroHandle) -> Result<String> {
        info!(
            guild = self.trigger.guild.id,
            template = %handle.name,
            "executing template"
        );
        self.frame.macro_handle = Some(handle.clone());
        let engine = Arc::clone(&self.collab.engine);
        engine.execute(self, handle)
    }

    /// Deliver output from the current frame.
    pub fn respond(&mut self, content: &str) -> Result<Option<MessageId>> {
        if content.trim().is_empty() && self.frame.response_reactions.is_empty() {
            return Ok(None);
        }
        self.collab.delivery.send_response(&self.frame, content)
    }

    /// Run another template from inside this execution and deliver its output.
    ///
    /// Returns the delivered message id as a string, or `""` if nothing was
    /// sent.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Quota`] after the per-execution nested call limit
    /// - [`RuntimeError::NestingLimit`] when called from a nested template
    /// - [`RuntimeError::NotFound`] for an unknown template or channel
    /// - [`RuntimeError::UnsafeArgs`] if the arguments embed the data bag
    /// - any error raised while the nested template runs
    pub fn execute_nested(&mut self, name: &str, target: NestedTarget, args: &[Value]) -> Result<Value> {
        let max = self.limits.max_nested_calls;
        self.quota.ensure(NESTED_CALL_KEY, max)?;

        if name.is_empty() {
            return Err(RuntimeError::Validation("no template name passed".to_string()));
        }
        if self.frame.is_nested {
            return Err(RuntimeError::NestingLimit(
                "can't call this in a nested template".to_string(),
            ));
        }
        let handle = self
            .collab
            .resolver
            .resolve(name)
            .ok_or_else(|| RuntimeError::NotFound(format!("template {name:?}")))?;

        let (channel, send_in_dm) = self.resolve_nested_channel(&target)?;
        let frame = Frame::nested(Some(channel), handle.clone(), send_in_dm);

        let mut guard = FrameGuard::enter(self, frame);
        let template_args = guard.template_args(args)?;
        guard.data_mut().set(TEMPLATE_ARGS_KEY, template_args);

        debug!(template = name, "running nested template");
        let engine = Arc::clone(&guard.collab.engine);
        let output = engine.execute(&mut guard, &handle)?;
        let sent = guard.respond(&output)?;
        drop(guard);

        debug!(template = name, ?sent, "nested template finished");
        Ok(Value::Str(sent.map(|id| id.to_string()).unwrap_or_default()))
    }

    fn resolve_nested_channel(&self, target: &NestedTarget) -> Result<(ChannelHandle, bool)> {
        let inherited = self.frame.send_in_dm;
        match target {
            NestedTarget::Dm => {
                if self.trigger.executed_from == ExecutedFrom::Leave {
                    return Err(RuntimeError::Validation(
                        "can't send a DM from a leave trigger".to_string(),
                    ));
                }
                if inherited {
                    if let Some(channel) = &self.frame.channel {
                        return Ok((channel.clone(), inherited));
                    }
                }
                let member = self
                    .trigger
                    .member
                    .as_ref()
                    .ok_or_else(|| RuntimeError::NotFound("member to DM".to_string()))?;
                let channel = self.collab.delivery.open_dm(member.user_id)?;
                Ok((channel, inherited))
            }
            NestedTarget::Channel(None) => {
                let channel = self
                    .frame
                    .channel
                    .clone()
                    .ok_or_else(|| RuntimeError::NotFound("channel".to_string()))?;
                Ok((channel, inherited))
            }
            NestedTarget::Channel(Some(query)) => {
                let channel = self
                    .collab
                    .state
                    .channel(&self.trigger.guild, query)
                    .ok_or_else(|| RuntimeError::NotFound(format!("channel {query}")))?;
                Ok((channel, false))
            }
        }
    }

    /// Turn nested call arguments into the `TemplateArgs` value.
    fn template_args(&self, args: &[Value]) -> Result<Value> {
        match args {
            [] => Ok(Value::Null),
            [single] => {
                if matches!(dereference(single), Some(Value::SMap(map)) if *map == self.data) {
                    return Err(RuntimeError::UnsafeArgs(
                        "the whole data bag can't be passed as template arguments".to_string(),
                    ));
                }
                Ok(single.clone())
            }
            many => {
                let map = Value::SMap(build_string_map(many)?);
                if !safety::is_safe(&map, 0, &self.data, self.limits.max_recursion_depth) {
                    return Err(RuntimeError::UnsafeArgs(
                        "arguments are too deeply nested or contain the data bag".to_string(),
                    ));
                }
                Ok(map)
            }
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("trigger", &self.trigger)
            .field("frame", &self.frame)
            .field("quota", &self.quota)
            .field("regex_cache", &self.regex_cache.len())
            .finish_non_exhaustive()
    }
}
