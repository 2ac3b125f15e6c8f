//! Regular expression builtins backed by the per-execution regex cache.

use regex::Regex;

use super::{arg, opt_arg, require_args, BuiltinTable};
use crate::context::ExecutionContext;
use crate::regex_cache;
use crate::value::{self, Value};
use crate::Result;

pub(super) fn register(table: &mut BuiltinTable) {
    table.register("reFind", re_find);
    table.register("reFindAll", re_find_all);
    table.register("reFindAllSubmatches", re_find_all_submatches);
    table.register("reReplace", re_replace);
    table.register("reSplit", re_split);
    table.register("reQuoteMeta", re_quote_meta);
}

/// Compile the pattern in argument 0 through the cache.
fn pattern(name: &str, ctx: &mut ExecutionContext, args: &[Value]) -> Result<Regex> {
    require_args(name, args, 2)?;
    ctx.regex_cache_mut().compile(&value::to_string(&args[0]))
}

fn count(args: &[Value], i: usize) -> Option<i64> {
    opt_arg(args, i).map(value::to_int)
}

/// `reFind pattern text`
fn re_find(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let re = pattern("reFind", ctx, args)?;
    Ok(Value::Str(regex_cache::find(&re, &value::to_string(&args[1]))))
}

/// `reFindAll pattern text [n]`
fn re_find_all(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let re = pattern("reFindAll", ctx, args)?;
    let text = value::to_string(&args[1]);
    Ok(Value::from(regex_cache::find_all(&re, &text, count(args, 2))))
}

/// `reFindAllSubmatches pattern text [n]`
fn re_find_all_submatches(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let re = pattern("reFindAllSubmatches", ctx, args)?;
    let text = value::to_string(&args[1]);
    Ok(Value::from(regex_cache::find_all_submatches(
        &re,
        &text,
        count(args, 2),
    )))
}

/// `reReplace pattern text replacement`
fn re_replace(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("reReplace", args, 3)?;
    let re = pattern("reReplace", ctx, args)?;
    let text = value::to_string(&args[1]);
    let replacement = value::to_string(&args[2]);
    Ok(Value::Str(regex_cache::replace(&re, &text, &replacement)))
}

/// `reSplit pattern text [n]`
fn re_split(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let re = pattern("reSplit", ctx, args)?;
    let text = value::to_string(&args[1]);
    Ok(Value::from(regex_cache::split(&re, &text, count(args, 2))))
}

fn re_quote_meta(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Str(regex::escape(&value::to_string(arg(args, 0)))))
}
