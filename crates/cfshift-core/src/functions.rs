//! Intrinsic function dispatch table and resolvers
//!
//! Each CloudFormation intrinsic is registered here with the resolver that
//! rewrites it into a terraform expression and the set of functions allowed
//! to nest inside its argument tree. The nesting policy follows the
//! CloudFormation rules and is data-driven: the walker never hard-codes it.
//!
//! Resolvers always receive an already-resolved argument tree, never raw
//! template values.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::hcl::{is_expression, render_expr, Block};
use crate::names::pascal_to_snake;

/// A function resolver: consumes the owning configuration (for lookups) and
/// the resolved argument tree, and produces the equivalent terraform
/// expression.
pub type Resolver = fn(&Configuration, Value) -> Result<Value>;

/// A dispatch table entry: the resolver plus the functions permitted inside
/// its argument tree.
pub struct FunctionEntry {
    /// The resolver to invoke once the argument tree is resolved
    pub resolver: Resolver,
    /// Functions allowed to nest inside this function's arguments
    pub nested: &'static [&'static str],
}

/// The intrinsic function dispatch table.
///
/// An immutable value injected into [`Configuration`] at construction, so
/// tests can supply a minimal table instead of the full catalogue.
#[derive(Default)]
pub struct Dispatch {
    entries: HashMap<&'static str, FunctionEntry>,
}

impl Dispatch {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function.
    pub fn register(
        &mut self,
        name: &'static str,
        resolver: Resolver,
        nested: &'static [&'static str],
    ) {
        self.entries.insert(name, FunctionEntry { resolver, nested });
    }

    /// Look up a function entry by name.
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    /// The universal allow-list: every registered function, used at the top
    /// level of any argument tree.
    pub fn universal(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// The full catalogue of supported intrinsics.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register("Ref", reference, NONE);
        table.register("Fn::Base64", base64, STRING_NESTED);
        table.register("Fn::Cidr", cidr, CIDR_NESTED);
        table.register("Fn::FindInMap", find_in_map, FIND_IN_MAP_NESTED);
        table.register("Fn::GetAtt", get_att, GET_ATT_NESTED);
        table.register("Fn::GetAZs", get_azs, GET_AZS_NESTED);
        table.register("Fn::ImportValue", import_value, STRING_NESTED);
        table.register("Fn::Join", join, STRING_NESTED);
        table.register("Fn::Select", select, SELECT_NESTED);
        table.register("Fn::Split", split, STRING_NESTED);
        table.register("Fn::Sub", sub, STRING_NESTED);
        table.register("Fn::If", if_then_else, IF_NESTED);
        table.register("Fn::Equals", equals, CONDITION_NESTED);
        table.register("Fn::And", and, CONDITION_NESTED);
        table.register("Fn::Or", or, CONDITION_NESTED);
        table.register("Fn::Not", not, CONDITION_NESTED);
        table
    }
}

// Nesting policy per the CloudFormation intrinsic function reference.
// "Ref" appears for completeness: the walker resolves it before consulting
// any allow-list, so it is legal everywhere.
const NONE: &[&str] = &[];
const GET_ATT_NESTED: &[&str] = &["Ref"];
const GET_AZS_NESTED: &[&str] = &["Ref"];
const CIDR_NESTED: &[&str] = &["Ref", "Fn::Select"];
const FIND_IN_MAP_NESTED: &[&str] = &["Ref", "Fn::FindInMap"];
const SELECT_NESTED: &[&str] = &[
    "Ref",
    "Fn::FindInMap",
    "Fn::GetAtt",
    "Fn::GetAZs",
    "Fn::If",
    "Fn::Split",
];
const STRING_NESTED: &[&str] = &[
    "Ref",
    "Fn::Base64",
    "Fn::FindInMap",
    "Fn::GetAtt",
    "Fn::GetAZs",
    "Fn::If",
    "Fn::ImportValue",
    "Fn::Join",
    "Fn::Select",
    "Fn::Split",
    "Fn::Sub",
];
const IF_NESTED: &[&str] = &[
    "Ref",
    "Fn::Base64",
    "Fn::FindInMap",
    "Fn::GetAtt",
    "Fn::GetAZs",
    "Fn::If",
    "Fn::Join",
    "Fn::Select",
    "Fn::Sub",
];
const CONDITION_NESTED: &[&str] = &[
    "Ref",
    "Fn::And",
    "Fn::Equals",
    "Fn::FindInMap",
    "Fn::Not",
    "Fn::Or",
];

fn bad(function: &'static str, message: impl Into<String>) -> Error {
    Error::BadArgument {
        function,
        message: message.into(),
    }
}

fn pseudo_expression(function: &'static str, name: &str) -> Result<String> {
    match name {
        "Region" => Ok("data.aws_region.current.name".to_string()),
        "AccountId" => Ok("data.aws_caller_identity.current.account_id".to_string()),
        "Partition" => Ok("data.aws_partition.current.partition".to_string()),
        "URLSuffix" => Ok("data.aws_partition.current.dns_suffix".to_string()),
        other => Err(bad(
            function,
            format!("unsupported pseudo parameter AWS::{other}"),
        )),
    }
}

fn reference_expr(config: &Configuration, function: &'static str, name: &str) -> Result<String> {
    if let Some(pseudo) = name.strip_prefix("AWS::") {
        return pseudo_expression(function, pseudo);
    }

    let target = config
        .block_lookup(name)
        .ok_or_else(|| Error::LookupMiss {
            name: name.to_string(),
        })?;

    match target {
        Block::Variable(v) => Ok(format!("var.{}", v.name)),
        Block::Resource(r) => Ok(format!("{}.{}.id", r.resource_type, r.name)),
        Block::Data(d) => Ok(format!("data.{}.{}.id", d.data_type, d.name)),
        // block_lookup never yields outputs, so a name that only matches an
        // output block is simply not a reference target.
        Block::Output(_) => Err(Error::LookupMiss {
            name: name.to_string(),
        }),
    }
}

fn attribute_expr(
    config: &Configuration,
    function: &'static str,
    logical_id: &str,
    attribute: &str,
) -> Result<String> {
    let target = config
        .resource_lookup(logical_id)
        .ok_or_else(|| Error::LookupMiss {
            name: logical_id.to_string(),
        })?;

    let Block::Resource(resource) = target else {
        return Err(bad(
            function,
            format!("{logical_id} is not a resource"),
        ));
    };

    Ok(format!(
        "{}.{}.{}",
        resource.resource_type,
        resource.name,
        pascal_to_snake(attribute)
    ))
}

/// `Ref`: pseudo parameters become data-source expressions, `AWS::NoValue`
/// becomes null, and everything else resolves through the block registry.
pub fn reference(config: &Configuration, value: Value) -> Result<Value> {
    let name = value
        .as_str()
        .ok_or_else(|| bad("Ref", "argument must be a string"))?;

    if name == "AWS::NoValue" {
        return Ok(Value::Null);
    }

    reference_expr(config, "Ref", name).map(Value::String)
}

/// `Fn::GetAtt`: `[Logical, Attribute]` or `"Logical.Attribute"`.
pub fn get_att(config: &Configuration, value: Value) -> Result<Value> {
    let (logical_id, attribute) = match &value {
        Value::String(s) => {
            let (logical, attr) = s
                .split_once('.')
                .ok_or_else(|| bad("Fn::GetAtt", "expected Logical.Attribute"))?;
            (logical.to_string(), attr.to_string())
        }
        Value::Sequence(parts) if parts.len() >= 2 => {
            let mut names = Vec::with_capacity(parts.len());
            for part in parts {
                names.push(
                    part.as_str()
                        .ok_or_else(|| bad("Fn::GetAtt", "argument parts must be strings"))?,
                );
            }
            (names[0].to_string(), names[1..].join("."))
        }
        _ => {
            return Err(bad(
                "Fn::GetAtt",
                "expected [Logical, Attribute] or Logical.Attribute",
            ))
        }
    };

    attribute_expr(config, "Fn::GetAtt", &logical_id, &attribute).map(Value::String)
}

/// `Fn::Join`: `[delimiter, [items...]]` becomes `join("<d>", [...])`.
pub fn join(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::Join", "expected [delimiter, values]"));
    };
    if parts.len() != 2 {
        return Err(bad("Fn::Join", "expected exactly two arguments"));
    }

    let delimiter = parts[0]
        .as_str()
        .ok_or_else(|| bad("Fn::Join", "delimiter must be a string"))?;
    let values = render_expr(&parts[1])?;

    Ok(Value::String(format!("join(\"{delimiter}\", {values})")))
}

static SUB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

/// `Fn::Sub`: template string with `${...}` interpolations, optionally with
/// a substitution map. The result is a pre-quoted terraform template string.
pub fn sub(config: &Configuration, value: Value) -> Result<Value> {
    let (template, substitutions) = match value {
        Value::String(s) => (s, Mapping::new()),
        Value::Sequence(mut parts) if parts.len() == 2 => {
            let Value::Mapping(map) = parts.remove(1) else {
                return Err(bad("Fn::Sub", "second argument must be a mapping"));
            };
            let Value::String(template) = parts.remove(0) else {
                return Err(bad("Fn::Sub", "first argument must be a string"));
            };
            (template, map)
        }
        _ => return Err(bad("Fn::Sub", "expected a string or [string, mapping]")),
    };

    let mut out = String::with_capacity(template.len() + 16);
    let mut last = 0;
    for captures in SUB_RE.captures_iter(&template) {
        let whole = captures.get(0).expect("group 0 always present");
        let name = &captures[1];
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        // ${!Literal} is CloudFormation's escape for a literal ${Literal}.
        if let Some(literal) = name.strip_prefix('!') {
            out.push_str("${");
            out.push_str(literal);
            out.push('}');
            continue;
        }

        let expr = if let Some(local) = substitutions.get(name) {
            render_expr(local)?
        } else if let Some(pseudo) = name.strip_prefix("AWS::") {
            pseudo_expression("Fn::Sub", pseudo)?
        } else if let Some((logical, attr)) = name.split_once('.') {
            attribute_expr(config, "Fn::Sub", logical, attr)?
        } else {
            reference_expr(config, "Fn::Sub", name)?
        };
        out.push_str("${");
        out.push_str(&expr);
        out.push('}');
    }
    out.push_str(&template[last..]);

    Ok(Value::String(format!("\"{out}\"")))
}

/// `Fn::Select`: `[index, values]` becomes `element(values, index)`. The
/// index may itself be a resolved expression, e.g. a `Ref` to a numeric
/// parameter.
pub fn select(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::Select", "expected [index, values]"));
    };
    if parts.len() != 2 {
        return Err(bad("Fn::Select", "expected exactly two arguments"));
    }

    let index = match &parts[0] {
        Value::String(s) if is_expression(s) => s.clone(),
        other => numeric_argument("Fn::Select", other)?,
    };
    let values = render_expr(&parts[1])?;

    Ok(Value::String(format!("element({values}, {index})")))
}

/// `Fn::Split`: `[delimiter, source]` becomes `split("<d>", source)`.
pub fn split(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::Split", "expected [delimiter, source]"));
    };
    if parts.len() != 2 {
        return Err(bad("Fn::Split", "expected exactly two arguments"));
    }

    let delimiter = parts[0]
        .as_str()
        .ok_or_else(|| bad("Fn::Split", "delimiter must be a string"))?;
    let source = render_expr(&parts[1])?;

    Ok(Value::String(format!("split(\"{delimiter}\", {source})")))
}

/// `Fn::Base64` becomes `base64encode(...)`.
pub fn base64(_config: &Configuration, value: Value) -> Result<Value> {
    Ok(Value::String(format!("base64encode({})", render_expr(&value)?)))
}

/// `Fn::GetAZs` becomes the availability zones data source. The region
/// argument is ignored: the data source always reads the current provider
/// region.
pub fn get_azs(_config: &Configuration, value: Value) -> Result<Value> {
    if let Some(region) = value.as_str() {
        if !region.is_empty() {
            tracing::debug!("Fn::GetAZs region {region} ignored, using provider region");
        }
    }
    Ok(Value::String(
        "data.aws_availability_zones.available.names".to_string(),
    ))
}

/// `Fn::ImportValue` becomes a remote-state output lookup.
pub fn import_value(_config: &Configuration, value: Value) -> Result<Value> {
    let key = render_expr(&value)?;
    Ok(Value::String(format!(
        "data.terraform_remote_state.imports.outputs[{key}]"
    )))
}

/// `Fn::Cidr`: `[block, count, bits]` becomes `cidrsubnets(block, bits...)`
/// with `bits` repeated `count` times. The CloudFormation `cidrBits`
/// argument is passed through as terraform `newbits`, matching the original
/// converter's best-effort rendering.
pub fn cidr(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::Cidr", "expected [block, count, bits]"));
    };
    if parts.len() != 3 {
        return Err(bad("Fn::Cidr", "expected exactly three arguments"));
    }

    let ip_block = render_expr(&parts[0])?;
    let count = numeric_argument("Fn::Cidr", &parts[1])?;
    let bits = numeric_argument("Fn::Cidr", &parts[2])?;

    let count = count.parse::<usize>().map_err(|_| {
        bad("Fn::Cidr", format!("count must be a whole number, got {count}"))
    })?;
    let newbits = vec![bits; count].join(", ");

    Ok(Value::String(format!("cidrsubnets({ip_block}, {newbits})")))
}

/// `Fn::FindInMap`: `[MapName, Top, Second]` becomes a local-value index
/// expression. The converter does not emit the locals block itself.
pub fn find_in_map(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::FindInMap", "expected [map, top key, second key]"));
    };
    if parts.len() != 3 {
        return Err(bad("Fn::FindInMap", "expected exactly three arguments"));
    }

    let map_name = parts[0]
        .as_str()
        .ok_or_else(|| bad("Fn::FindInMap", "map name must be a string"))?;
    let top = render_expr(&parts[1])?;
    let second = render_expr(&parts[2])?;

    Ok(Value::String(format!(
        "local.{}[{top}][{second}]",
        pascal_to_snake(map_name)
    )))
}

/// `Fn::If`: `[condition, true value, false value]` becomes a conditional
/// expression over a local value.
pub fn if_then_else(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::If", "expected [condition, true value, false value]"));
    };
    if parts.len() != 3 {
        return Err(bad("Fn::If", "expected exactly three arguments"));
    }

    let condition = parts[0]
        .as_str()
        .ok_or_else(|| bad("Fn::If", "condition name must be a string"))?;
    let when_true = render_expr(&parts[1])?;
    let when_false = render_expr(&parts[2])?;

    Ok(Value::String(format!(
        "local.{} ? {when_true} : {when_false}",
        pascal_to_snake(condition)
    )))
}

/// `Fn::Equals` becomes `a == b`.
pub fn equals(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::Equals", "expected [a, b]"));
    };
    if parts.len() != 2 {
        return Err(bad("Fn::Equals", "expected exactly two arguments"));
    }
    Ok(Value::String(format!(
        "{} == {}",
        render_expr(&parts[0])?,
        render_expr(&parts[1])?
    )))
}

/// `Fn::And` becomes `alltrue([...])`.
pub fn and(_config: &Configuration, value: Value) -> Result<Value> {
    Ok(Value::String(format!(
        "alltrue({})",
        condition_list("Fn::And", &value)?
    )))
}

/// `Fn::Or` becomes `anytrue([...])`.
pub fn or(_config: &Configuration, value: Value) -> Result<Value> {
    Ok(Value::String(format!(
        "anytrue({})",
        condition_list("Fn::Or", &value)?
    )))
}

/// `Fn::Not` becomes `!(...)`.
pub fn not(_config: &Configuration, value: Value) -> Result<Value> {
    let Value::Sequence(parts) = &value else {
        return Err(bad("Fn::Not", "expected a single-element list"));
    };
    if parts.len() != 1 {
        return Err(bad("Fn::Not", "expected exactly one argument"));
    }
    Ok(Value::String(format!("!({})", render_expr(&parts[0])?)))
}

fn condition_list(function: &'static str, value: &Value) -> Result<String> {
    let Value::Sequence(parts) = value else {
        return Err(bad(function, "expected a list of conditions"));
    };
    if parts.len() < 2 {
        return Err(bad(function, "expected at least two conditions"));
    }
    render_expr(&Value::Sequence(parts.clone()))
}

fn numeric_argument(function: &'static str, value: &Value) -> Result<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() => {
            Ok(s.clone())
        }
        other => Err(bad(function, format!("expected a number, got {other:?}"))),
    }
}
