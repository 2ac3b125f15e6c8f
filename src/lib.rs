//! CCRT - Custom Command RunTime
//!
//! Resource-governed execution core for per-tenant chat-bot scripts. A
//! host builds an [`ExecutionContext`] for each triggering event, hands it
//! to its template engine, and the engine calls the builtins in
//! [`BuiltinTable`]. Every budget lives in the context and dies with it.

pub mod builtins;
pub mod collab;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod logging;
pub mod quota;
pub mod regex_cache;
pub mod safety;
pub mod sort;
pub mod value;
pub mod variadic;

#[cfg(test)]
pub(crate) mod test_support;

pub use builtins::{BuiltinFn, BuiltinTable};
pub use collab::{
    ChannelHandle, Delivery, GuildSnapshot, MacroEngine, MacroHandle, MacroResolver,
    MemberSnapshot, RoleSnapshot, Scheduler, StateProvider,
};
pub use config::{Config, LimitsConfig, LoggingConfig};
pub use context::{Collaborators, ExecutedFrom, ExecutionContext, NestedTarget, Trigger};
pub use error::{Result, RuntimeError};
pub use frame::{Frame, FrameGuard};
pub use quota::QuotaGovernor;
pub use regex_cache::RegexCache;
pub use sort::SortOptions;
pub use value::{Dict, SDict, Slice, Value};
