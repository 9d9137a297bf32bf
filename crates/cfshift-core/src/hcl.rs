//! Terraform block model and HCL rendering
//!
//! Blocks are the target configuration entities a template converts into:
//! resources, input variables, outputs, and data sources. Each variant
//! renders itself to HCL text; the argument trees they hold are plain
//! `serde_yaml` values so the resolution engine can rewrite them in place.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

/// A terraform configuration block.
#[derive(Debug, Clone)]
pub enum Block {
    /// A managed resource, converted from a CloudFormation resource
    Resource(Resource),
    /// An input variable, converted from a CloudFormation parameter
    Variable(Variable),
    /// An output value, converted from a CloudFormation output
    Output(Output),
    /// A data source, injected for pseudo-parameter lookups
    Data(Data),
}

/// A `resource` block.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Block name in terraform convention
    pub name: String,
    /// Terraform resource type, e.g. `aws_s3_bucket`
    pub resource_type: String,
    /// The CloudFormation logical ID this resource was derived from
    pub logical_id: String,
    /// Resource arguments, mutated in place by resolution
    pub arguments: Mapping,
}

/// A `variable` block.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Block name in terraform convention
    pub name: String,
    /// Variable attributes (description, type, default); never resolved
    pub arguments: Mapping,
}

/// An `output` block.
#[derive(Debug, Clone)]
pub struct Output {
    /// Block name in terraform convention
    pub name: String,
    /// Output attributes (value, description), mutated in place by resolution
    pub arguments: Mapping,
}

/// A `data` block.
#[derive(Debug, Clone)]
pub struct Data {
    /// Block name in terraform convention
    pub name: String,
    /// Terraform data source type, e.g. `aws_region`
    pub data_type: String,
    /// Data source arguments; never resolved
    pub arguments: Mapping,
}

impl Block {
    /// The block's terraform-convention name.
    pub fn name(&self) -> &str {
        match self {
            Block::Resource(r) => &r.name,
            Block::Variable(v) => &v.name,
            Block::Output(o) => &o.name,
            Block::Data(d) => &d.name,
        }
    }

    /// The block's type string: the resource or data source type, or the
    /// block keyword for variables and outputs.
    pub fn block_type(&self) -> &str {
        match self {
            Block::Resource(r) => &r.resource_type,
            Block::Variable(_) => "variable",
            Block::Output(_) => "output",
            Block::Data(d) => &d.data_type,
        }
    }

    /// The block's argument tree.
    pub fn arguments(&self) -> &Mapping {
        match self {
            Block::Resource(r) => &r.arguments,
            Block::Variable(v) => &v.arguments,
            Block::Output(o) => &o.arguments,
            Block::Data(d) => &d.arguments,
        }
    }

    /// Mutable access to the argument tree, for the variants the resolution
    /// engine operates on. Variables and data sources carry nothing
    /// resolvable and return `None`.
    pub fn resolvable_arguments_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Block::Resource(r) => Some(&mut r.arguments),
            Block::Output(o) => Some(&mut o.arguments),
            Block::Variable(_) | Block::Data(_) => None,
        }
    }

    /// The CloudFormation logical ID this block was derived from, for blocks
    /// that originate from a genuine source resource.
    pub fn source_origin(&self) -> Option<&str> {
        match self {
            Block::Resource(r) => Some(&r.logical_id),
            _ => None,
        }
    }

    /// Render the block to HCL text.
    pub fn write(&self) -> Result<String> {
        match self {
            Block::Resource(r) => r.write(),
            Block::Variable(v) => v.write(),
            Block::Output(o) => o.write(),
            Block::Data(d) => d.write(),
        }
    }
}

impl Resource {
    /// Render to a `resource` block.
    pub fn write(&self) -> Result<String> {
        let mut out = format!("resource \"{}\" \"{}\" {{\n", self.resource_type, self.name);
        render_body(&mut out, &self.arguments, 1)?;
        out.push_str("}\n");
        Ok(out)
    }
}

impl Variable {
    /// Render to a `variable` block. The `type` attribute holds a terraform
    /// type keyword and renders bare rather than quoted.
    pub fn write(&self) -> Result<String> {
        let mut out = format!("variable \"{}\" {{\n", self.name);
        for (key, value) in &self.arguments {
            let key = attribute_key(key)?;
            if key == "type" {
                let keyword = value.as_str().ok_or_else(|| Error::Render {
                    message: format!("variable {} has a non-string type", self.name),
                })?;
                out.push_str(&format!("  type = {keyword}\n"));
            } else {
                out.push_str(&format!("  {} = {}\n", render_key(key), render_expr(value)?));
            }
        }
        out.push_str("}\n");
        Ok(out)
    }
}

impl Output {
    /// Render to an `output` block.
    pub fn write(&self) -> Result<String> {
        let mut out = format!("output \"{}\" {{\n", self.name);
        render_body(&mut out, &self.arguments, 1)?;
        out.push_str("}\n");
        Ok(out)
    }
}

impl Data {
    /// Render to a `data` block.
    pub fn write(&self) -> Result<String> {
        let mut out = format!("data \"{}\" \"{}\" {{\n", self.data_type, self.name);
        render_body(&mut out, &self.arguments, 1)?;
        out.push_str("}\n");
        Ok(out)
    }
}

fn render_body(out: &mut String, arguments: &Mapping, indent: usize) -> Result<()> {
    let pad = "  ".repeat(indent);
    for (key, value) in arguments {
        let key = render_key(attribute_key(key)?);
        match value {
            Value::Mapping(nested) => {
                out.push_str(&format!("{pad}{key} = {{\n"));
                render_body(out, nested, indent + 1)?;
                out.push_str(&pad);
                out.push_str("}\n");
            }
            other => {
                out.push_str(&format!("{pad}{key} = {}\n", render_expr(other)?));
            }
        }
    }
    Ok(())
}

fn attribute_key(key: &Value) -> Result<&str> {
    key.as_str().ok_or_else(|| Error::Render {
        message: format!("non-string attribute key: {key:?}"),
    })
}

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid regex"));

// Strings the resolvers produce are terraform expressions and must render
// bare; everything else is a literal and gets quoted. Pure heuristic, same
// trade-off the original converter made.
static EXPR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:var\.|local\.|module\.|data\.|aws_[a-z0-9_]+\.|[a-z][a-z0-9_]*\(|!\(|\[)")
        .expect("valid regex")
});

fn render_key(key: &str) -> String {
    if IDENT_RE.is_match(key) {
        key.to_string()
    } else {
        quote_string(key)
    }
}

/// Render a value as a terraform expression fragment.
///
/// Shared between block rendering and the function resolvers, which compose
/// these fragments into larger expressions like `join("-", [...])`.
pub fn render_expr(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => {
            if is_pre_quoted(s) || is_expression(s) {
                Ok(s.clone())
            } else {
                Ok(quote_string(s))
            }
        }
        Value::Sequence(items) => {
            let rendered: Vec<String> = items.iter().map(render_expr).collect::<Result<_>>()?;
            Ok(format!("[{}]", rendered.join(", ")))
        }
        Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                entries.push(format!(
                    "{} = {}",
                    render_key(attribute_key(key)?),
                    render_expr(value)?
                ));
            }
            Ok(format!("{{ {} }}", entries.join(", ")))
        }
        other => Err(Error::Render {
            message: format!("cannot render value: {other:?}"),
        }),
    }
}

/// Whether a string should render bare as a terraform expression.
pub fn is_expression(s: &str) -> bool {
    EXPR_RE.is_match(s)
}

// Fn::Sub and the condition functions emit strings that already carry their
// own quoting or operators.
fn is_pre_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
