//! Pure builtins: containers, conversions and helpers with no side effects.

use rand::Rng;

use super::{arg, require_args, BuiltinTable};
use crate::context::ExecutionContext;
use crate::sort::{self, SortOptions};
use crate::value::{self, dereference, Value};
use crate::{Result, RuntimeError};

pub(super) fn register(table: &mut BuiltinTable) {
    table.register("dict", dict);
    table.register("sdict", sdict);
    table.register("cslice", cslice);

    table.register("toInt", to_int);
    table.register("toInt64", to_int);
    table.register("toFloat", to_float);
    table.register("toString", to_string);
    table.register("toDuration", to_duration);
    table.register("toRune", to_rune);
    table.register("toByte", to_byte);
    table.register("toHexInt", to_hex_int);
    table.register("sha256", sha256);
    table.register("hexToDecimal", hex_to_decimal);

    table.register("kindOf", kind_of);
    table.register("in", in_list);
    table.register("inFold", in_fold);
    table.register("json", json);
    table.register("randInt", rand_int);
    table.register("sort", sort_values);
}

fn dict(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Map(value::build_map(args)?))
}

fn sdict(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::SMap(value::build_string_map(args)?))
}

fn cslice(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::List(value::build_list(args)))
}

fn to_int(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Int(value::to_int(arg(args, 0))))
}

fn to_float(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Float(value::to_float(arg(args, 0))))
}

fn to_string(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Str(value::to_string(arg(args, 0))))
}

fn to_duration(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Duration(value::to_duration(arg(args, 0))))
}

fn to_rune(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let runes = value::to_rune(arg(args, 0));
    Ok(runes.into_iter().map(|c| Value::Int(i64::from(u32::from(c)))).collect::<Vec<_>>().into())
}

fn to_byte(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let bytes = value::to_byte(arg(args, 0));
    Ok(bytes.into_iter().map(|b| Value::Int(i64::from(b))).collect::<Vec<_>>().into())
}

fn to_hex_int(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Int(value::to_hex_int(arg(args, 0))))
}

fn sha256(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Str(value::to_sha256(arg(args, 0))))
}

fn hex_to_decimal(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    Ok(Value::Int(value::hex_to_decimal(arg(args, 0))?))
}

fn kind_of(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let indirect = arg(args, 1).is_truthy();
    Ok(Value::from(value::kind_of(arg(args, 0), indirect)))
}

fn in_list(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("in", args, 2)?;
    Ok(Value::Bool(value::in_list(&args[0], &args[1])))
}

fn in_fold(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    require_args("inFold", args, 2)?;
    Ok(Value::Bool(value::in_fold(&args[0], &args[1])))
}

/// `json value [indent]`
fn json(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    let encoded = if arg(args, 1).is_truthy() {
        serde_json::to_string_pretty(target)
    } else {
        serde_json::to_string(target)
    };
    encoded
        .map(Value::Str)
        .map_err(|e| RuntimeError::Validation(format!("json: {e}")))
}

/// `randInt stop` or `randInt start stop`, half-open.
fn rand_int(_ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    let (start, stop) = match args {
        [] => return Err(RuntimeError::Validation("randInt: no arguments passed".to_string())),
        [stop] => (0, value::to_int(stop)),
        [start, stop, ..] => (value::to_int(start), value::to_int(stop)),
    };
    if stop <= start {
        return Err(RuntimeError::Validation(
            "randInt: stop must be larger than start".to_string(),
        ));
    }
    Ok(Value::Int(rand::rng().random_range(start..stop)))
}

/// `sort list [options...]`
fn sort_values(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Value> {
    ctx.quota_mut().ensure_tiered("sort", 1, 3)?;
    let items = match dereference(arg(args, 0)) {
        Some(Value::List(items)) => items,
        Some(other) => {
            return Err(RuntimeError::Validation(format!(
                "sort: expected a list, got {}",
                other.kind()
            )))
        }
        None => return Ok(Value::from(Vec::<Value>::new())),
    };
    let opts = SortOptions::parse(args.get(1..).unwrap_or_default())?;
    Ok(Value::from(sort::sort(items.as_slice(), &opts)?))
}
