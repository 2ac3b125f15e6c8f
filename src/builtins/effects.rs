//! Builtins that touch the current frame or the chat platform.
//!
//! Every builtin here that reaches the platform is counted against a quota
//! first; a refused call performs no side effect.

use chrono::Utc;

use super::{arg, id_arg, opt_arg, require_args, BuiltinTable};
use crate::collab::ChannelId;
use crate::context::{ExecutionContext, NestedTarget};
use crate::value::{self, Duration, SDict, Timestamp, Value};
use crate::variadic;
use crate::{Result, RuntimeError};

/// Per-execution reaction ceiling for each reaction builtin.
const MAX_REACTIONS: u32 = 20;

pub(super) fn register(table: &mut BuiltinTable) {
    table.register("sleep", sleep);
    table.register("execCounters", exec_counters);

    table.register("sendTemplate", send_template);
    table.register("sendTemplateDM", send_template_dm);

    table.register("deleteResponse", delete_response);
    table.register("deleteTrigger", delete_trigger);
    table.register("mentionEveryone", mention_everyone);
    table.register("mentionHere", mention_here);
    table.register("mentionRoleID", mention_role_id);

    table.register("addReactions", add_reactions);
    table.register("addResponseReactions", add_response_reactions);
    table.register("addMessageReactions", add_message_reactions);
    table.register("deleteMessageReaction", delete_message_reaction);

    table.register("sendMessage", send_message);
    table.register("editMessage", edit_message);
    table.register("deleteMessage", delete_message);

    table.register("giveRoleID", give_role_id);
    table.register("takeRoleID", take_role_id);
    table.register("setRoles", set_roles);
    table.register("hasRoleID", has_role_id);
    table.register("hasPermissions", has_permissions);
}

/// Resolve a channel argument; nil means the current frame's channel.
fn channel_arg(ctx: &ExecutionContext, query: &Value) -> Result<ChannelId> {
    if query.is_nil() {
        return ctx
            .current_channel()
            .map(|c| c.id)
            .ok_or_else(|| RuntimeError::NotFound("channel".to_string()));
    }
    ctx.collaborators()
        .state
        .channel(ctx.guild(), query)
        .map(|c| c.id)
        .ok_or_else(|| RuntimeError::NotFound(format!("channel {query}")))
}

/// Delay in seconds, defaulting to `default` and capped at the configured maximum.
fn delete_delay(ctx: &ExecutionContext, delay: Option<&Value>, default: u64) -> u64 {
    let delay = delay
        .map(|v| value::to_int(v).max(0) as u64)
        .unwrap_or(default);
    delay.min(ctx.limits().max_delete_delay_secs)
}

/// Delay for role changes: numbers are seconds, anything else a duration.
fn role_delay(delay: Option<&Value>) -> Duration {
    match delay.and_then(value::dereference) {
        None => Duration::zero(),
        Some(v) if matches!(v, Value::Int(_) | Value::Float(_)) => {
            Duration::try_seconds(value::to_int(v)).unwrap_or(Duration::zero())
        }
        Some(v) => value::to_duration(v),
    }
}

/// Instant `delay` from now.
fn after(delay: Duration) -> Result<Timestamp> {
    Utc::now()
        .checked_add_signed(delay)
        .ok_or_else(|| RuntimeError::Validation("delay out of range".to_string()))
}

/// Instant `secs` seconds from now.
fn after_secs(secs: u64) -> Result<Timestamp> {
    let delay = i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| RuntimeError::Validation(format!("delay of {secs}s out of range")))?;
    after(delay)
}

/// `sleep seconds`
fn sleep(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    ctx.quota_mut().ensure_sleep(value::to_int(arg(args, 0)))?;
    Ok(Value::from(""))
}

/// Snapshot of the quota ledger.
fn exec_counters(ctx: &mut ExecutionContext, _args: &[Value]) -> Result<Value> {
    let mut counters = SDict::new();
    for (key, count) in ctx.quota().counters() {
        counters.set(key, Value::from(count));
    }
    Ok(Value::SMap(counters))
}

/// `sendTemplate channel name [args...]`
fn send_template(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("sendTemplate", args, 2)?;
    let target = NestedTarget::Channel(opt_arg(args, 0).cloned());
    let name = value::to_string(&args[1]);
    ctx.execute_nested(&name, target, &args[2..])
}

/// `sendTemplateDM name [args...]`
fn send_template_dm(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("sendTemplateDM", args, 1)?;
    let name = value::to_string(&args[0]);
    ctx.execute_nested(&name, NestedTarget::Dm, &args[1..])
}

/// `deleteResponse [seconds]`
fn delete_response(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let delay = delete_delay(ctx, opt_arg(args, 0), crate::frame::DEFAULT_DELETE_DELAY_SECS);
    let frame = ctx.frame_mut();
    frame.delete_response = true;
    frame.delete_response_delay = delay;
    Ok(Value::from(""))
}

/// `deleteTrigger [seconds]`
fn delete_trigger(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let (Some(channel), Some(message)) = (ctx.trigger_channel().map(|c| c.id), ctx.message_id())
    else {
        return Err(RuntimeError::NotFound("trigger message".to_string()));
    };
    let delay = delete_delay(ctx, opt_arg(args, 0), crate::frame::DEFAULT_DELETE_DELAY_SECS);
    let at = after_secs(delay)?;
    ctx.collaborators()
        .scheduler
        .schedule_delete_message(ctx.guild().id, channel, message, at)?;
    Ok(Value::from(""))
}

fn mention_everyone(ctx: &mut ExecutionContext, _args: &[Value]) -> Result<Value> {
    ctx.frame_mut().mention_everyone = true;
    Ok(Value::from("@everyone"))
}

fn mention_here(ctx: &mut ExecutionContext, _args: &[Value]) -> Result<Value> {
    ctx.frame_mut().mention_here = true;
    Ok(Value::from("@here"))
}

/// `mentionRoleID id`
fn mention_role_id(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let role = id_arg("mentionRoleID", arg(args, 0))?;
    let roles = &mut ctx.frame_mut().mention_roles;
    if !roles.contains(&role) {
        roles.push(role);
    }
    Ok(Value::from(format!("<@&{role}>")))
}

/// `addReactions emoji...` on the triggering message.
fn add_reactions(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let (Some(channel), Some(message)) = (ctx.trigger_channel().map(|c| c.id), ctx.message_id())
    else {
        return Err(RuntimeError::NotFound("trigger message".to_string()));
    };
    for emoji in variadic::flatten_strings(args) {
        ctx.quota_mut().ensure("add_reaction_trigger", MAX_REACTIONS)?;
        ctx.collaborators()
            .delivery
            .add_reaction(channel, message, &emoji)?;
    }
    Ok(Value::from(""))
}

/// `addResponseReactions emoji...`, applied once the response is sent.
fn add_response_reactions(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    for emoji in variadic::flatten_strings(args) {
        ctx.quota_mut().ensure("add_reaction_response", MAX_REACTIONS)?;
        ctx.frame_mut().response_reactions.push(emoji);
    }
    Ok(Value::from(""))
}

/// `addMessageReactions channel messageID emoji...`
fn add_message_reactions(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("addMessageReactions", args, 2)?;
    let channel = channel_arg(ctx, &args[0])?;
    let message = id_arg("addMessageReactions", &args[1])?;
    for emoji in variadic::flatten_strings(&args[2..]) {
        ctx.quota_mut().ensure("add_reaction_message", MAX_REACTIONS)?;
        ctx.collaborators()
            .delivery
            .add_reaction(channel, message, &emoji)?;
    }
    Ok(Value::from(""))
}

/// `deleteMessageReaction channel messageID userID emoji...`
fn delete_message_reaction(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("deleteMessageReaction", args, 3)?;
    let channel = channel_arg(ctx, &args[0])?;
    let message = id_arg("deleteMessageReaction", &args[1])?;
    let user = id_arg("deleteMessageReaction", &args[2])?;
    for emoji in variadic::flatten_strings(&args[3..]) {
        ctx.quota_mut().ensure("del_reaction_message", MAX_REACTIONS)?;
        ctx.collaborators()
            .delivery
            .remove_reaction(channel, message, user, &emoji)?;
    }
    Ok(Value::from(""))
}

/// `sendMessage channel content`
fn send_message(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    ctx.quota_mut().ensure_generic_api()?;
    let channel = channel_arg(ctx, arg(args, 0))?;
    let content = value::to_string(arg(args, 1));
    if content.trim().is_empty() {
        return Ok(Value::from(""));
    }
    let id = ctx.collaborators().delivery.send_message(channel, &content)?;
    Ok(Value::from(id.to_string()))
}

/// `editMessage channel messageID content`
fn edit_message(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("editMessage", args, 3)?;
    ctx.quota_mut().ensure_generic_api()?;
    let channel = channel_arg(ctx, &args[0])?;
    let message = id_arg("editMessage", &args[1])?;
    let content = value::to_string(&args[2]);
    ctx.collaborators()
        .delivery
        .edit_message(channel, message, &content)?;
    Ok(Value::from(""))
}

/// `deleteMessage channel messageID [seconds]`
///
/// Without a delay the message goes after the default delay; an explicit
/// `0` deletes it right away.
fn delete_message(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("deleteMessage", args, 2)?;
    ctx.quota_mut().ensure_generic_api()?;
    let channel = channel_arg(ctx, &args[0])?;
    let message = id_arg("deleteMessage", &args[1])?;
    let delay = delete_delay(ctx, opt_arg(args, 2), crate::frame::DEFAULT_DELETE_DELAY_SECS);

    let collab = ctx.collaborators();
    if delay == 0 {
        collab.delivery.delete_message(channel, message)?;
    } else {
        let at = after_secs(delay)?;
        collab
            .scheduler
            .schedule_delete_message(ctx.guild().id, channel, message, at)?;
    }
    Ok(Value::from(""))
}

/// `giveRoleID userID roleID [delay]`
fn give_role_id(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    change_role(ctx, args, "giveRoleID", true)
}

/// `takeRoleID userID roleID [delay]`
fn take_role_id(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    change_role(ctx, args, "takeRoleID", false)
}

/// Add or remove a role, through the scheduler when delayed by more than a second.
fn change_role(ctx: &mut ExecutionContext, args: &[Value], name: &str, add: bool) -> Result<Value> {
    require_args(name, args, 2)?;
    ctx.quota_mut().ensure_generic_api()?;
    let user = id_arg(name, &args[0])?;
    let role = id_arg(name, &args[1])?;
    let delay = role_delay(opt_arg(args, 2));
    let guild = ctx.guild().id;
    let collab = ctx.collaborators();

    if delay > Duration::seconds(1) {
        let at = after(delay)?;
        if add {
            collab.scheduler.schedule_add_role(guild, user, role, at)?;
        } else {
            collab.scheduler.schedule_remove_role(guild, user, role, at)?;
        }
    } else if add {
        collab.delivery.add_role(guild, user, role)?;
    } else {
        collab.delivery.remove_role(guild, user, role)?;
    }
    Ok(Value::from(""))
}

/// `setRoles userID roleIDs...` replaces a member's roles. Once per target.
fn set_roles(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("setRoles", args, 1)?;
    let user = id_arg("setRoles", &args[0])?;
    ctx.quota_mut().ensure(&format!("set_roles{user}"), 1)?;
    ctx.quota_mut().ensure_generic_api()?;

    let wanted = variadic::flatten(&args[1..], true)
        .iter()
        .map(|v| id_arg("setRoles", v))
        .collect::<Result<Vec<_>>>()?;
    let collab = ctx.collaborators();
    let guild = ctx.guild();
    let member = collab
        .state
        .member(guild, user)
        .ok_or_else(|| RuntimeError::NotFound(format!("member {user}")))?;

    for role in wanted.iter().filter(|r| !member.roles.contains(r)) {
        collab.delivery.add_role(guild.id, user, *role)?;
    }
    for role in member.roles.iter().filter(|r| !wanted.contains(r)) {
        collab.delivery.remove_role(guild.id, user, *role)?;
    }
    Ok(Value::from(""))
}

/// `hasRoleID roleID` for the triggering member.
fn has_role_id(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let role = value::to_int(arg(args, 0));
    let has = ctx
        .member()
        .is_some_and(|m| m.roles.iter().any(|r| i64::try_from(*r).ok() == Some(role)));
    Ok(Value::Bool(has))
}

/// `hasPermissions bits` for the triggering member in the current channel.
fn has_permissions(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let wanted = value::to_int(arg(args, 0));
    let Ok(wanted) = u64::try_from(wanted) else {
        return Ok(Value::Bool(false));
    };
    let (Some(member), Some(channel)) = (ctx.member(), ctx.current_channel()) else {
        return Ok(Value::Bool(false));
    };
    let perms = ctx
        .collaborators()
        .state
        .member_permissions(ctx.guild(), channel.id, member)?;
    Ok(Value::Bool(perms & wanted == wanted))
}
