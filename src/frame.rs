//! Execution frames.
//!
//! A frame is the scope a template body runs in: where its output goes and
//! what should happen to that output once sent. The root frame lives for the
//! whole execution; a nested template call swaps in a new frame through
//! [`FrameGuard`], which puts the caller's frame back when dropped.

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::collab::{ChannelHandle, MacroHandle, RoleId};
use crate::context::ExecutionContext;
use crate::value::Value;

/// Data bag key under which nested calls receive their arguments.
pub const TEMPLATE_ARGS_KEY: &str = "TemplateArgs";

/// Default auto-delete delay for `deleteResponse` without arguments.
pub const DEFAULT_DELETE_DELAY_SECS: u64 = 10;

/// One execution scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Where the response is delivered.
    pub channel: Option<ChannelHandle>,
    /// The body being executed.
    pub macro_handle: Option<MacroHandle>,
    pub is_nested: bool,

    /// Deliver the response as a direct message.
    pub send_in_dm: bool,
    /// Delete the response after `delete_response_delay` seconds.
    pub delete_response: bool,
    pub delete_response_delay: u64,
    pub mention_everyone: bool,
    pub mention_here: bool,
    pub mention_roles: Vec<RoleId>,
    /// Reactions to add to the response once sent.
    pub response_reactions: Vec<String>,
}

impl Frame {
    /// The frame an execution starts in.
    pub fn root(channel: Option<ChannelHandle>) -> Self {
        Self {
            channel,
            macro_handle: None,
            is_nested: false,
            send_in_dm: false,
            delete_response: false,
            delete_response_delay: DEFAULT_DELETE_DELAY_SECS,
            mention_everyone: false,
            mention_here: false,
            mention_roles: Vec::new(),
            response_reactions: Vec::new(),
        }
    }

    /// A frame for a nested template call. Response intents start empty.
    pub fn nested(channel: Option<ChannelHandle>, handle: MacroHandle, send_in_dm: bool) -> Self {
        Self {
            macro_handle: Some(handle),
            is_nested: true,
            send_in_dm,
            ..Self::root(channel)
        }
    }
}

/// Scoped replacement of the current frame.
///
/// While the guard lives, the context runs in the new frame. Dropping it,
/// on success, error or unwinding alike, restores the caller's frame and
/// the caller's `TemplateArgs` entry.
pub struct FrameGuard<'a> {
    ctx: &'a mut ExecutionContext,
    saved_frame: Option<Frame>,
    saved_args: Option<Value>,
}

impl<'a> FrameGuard<'a> {
    /// Make `frame` current, remembering what it replaces.
    pub fn enter(ctx: &'a mut ExecutionContext, frame: Frame) -> Self {
        let saved_frame = std::mem::replace(ctx.frame_mut(), frame);
        let saved_args = ctx.data().get(TEMPLATE_ARGS_KEY).cloned();
        debug!(nested = ctx.frame().is_nested, "entered frame");
        Self {
            ctx,
            saved_frame: Some(saved_frame),
            saved_args,
        }
    }
}

impl Deref for FrameGuard<'_> {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        &*self.ctx
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.ctx
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Some(frame) = self.saved_frame.take() {
            *self.ctx.frame_mut() = frame;
        }
        match self.saved_args.take() {
            Some(args) => {
                self.ctx.data_mut().set(TEMPLATE_ARGS_KEY, args);
            }
            None => {
                self.ctx.data_mut().del(TEMPLATE_ARGS_KEY);
            }
        }
        debug!("restored caller frame");
    }
}
