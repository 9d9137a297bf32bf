//! CloudFormation template conversion
//!
//! Parses a template document and builds the block registry: parameters
//! become input variables, resources become managed resources, outputs
//! become outputs, and pseudo-parameter usage injects the data sources the
//! resolvers refer to. Short-form intrinsic tags (`!Ref`, `!Sub`, ...) are
//! normalized to their long-form mappings before anything else looks at the
//! tree, so the resolution engine only ever sees plain mappings.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::hcl::{Block, Data, Output, Resource, Variable};
use crate::names::{pascal_to_snake, resource_type_to_terraform};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Template {
    parameters: Mapping,
    resources: Mapping,
    outputs: Mapping,
    mappings: Mapping,
    conditions: Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterDef {
    #[serde(rename = "Type")]
    parameter_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceDef {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(default)]
    properties: Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OutputDef {
    #[serde(default)]
    description: Option<String>,
    value: Value,
}

/// Convert a CloudFormation template document into the block registry.
///
/// The returned blocks are pre-resolution: their argument trees still hold
/// intrinsic invocations for [`crate::resolver`] to rewrite.
pub fn convert_template(source: &str) -> Result<Vec<Block>> {
    let document: Value = serde_yaml::from_str(source)?;
    let document = normalize_intrinsics(document);

    let mut pseudo = PseudoUsage::default();
    scan_pseudo_usage(&document, &mut pseudo);

    let template: Template = serde_yaml::from_value(document)?;

    if !template.mappings.is_empty() {
        tracing::warn!(
            "Mappings section is not converted; Fn::FindInMap resolves to local values you must supply"
        );
    }
    if !template.conditions.is_empty() {
        tracing::warn!(
            "Conditions section is not converted; condition functions resolve to local values you must supply"
        );
    }

    let mut blocks = Vec::new();

    for (logical_id, definition) in &template.parameters {
        let logical_id = logical_key(logical_id)?;
        let definition: ParameterDef = serde_yaml::from_value(definition.clone())?;
        blocks.push(Block::Variable(Variable {
            name: pascal_to_snake(logical_id),
            arguments: variable_arguments(&definition),
        }));
    }

    for (logical_id, definition) in &template.resources {
        let logical_id = logical_key(logical_id)?;
        let definition: ResourceDef = serde_yaml::from_value(definition.clone())?;
        blocks.push(Block::Resource(Resource {
            name: pascal_to_snake(logical_id),
            resource_type: resource_type_to_terraform(&definition.resource_type)?,
            logical_id: logical_id.to_string(),
            arguments: properties_mapping_to_snake(definition.properties),
        }));
    }

    blocks.extend(pseudo.data_blocks());

    for (logical_id, definition) in &template.outputs {
        let logical_id = logical_key(logical_id)?;
        let definition: OutputDef = serde_yaml::from_value(definition.clone())?;
        let mut arguments = Mapping::new();
        if let Some(description) = definition.description {
            arguments.insert("description".into(), description.into());
        }
        arguments.insert("value".into(), definition.value);
        blocks.push(Block::Output(Output {
            name: pascal_to_snake(logical_id),
            arguments,
        }));
    }

    tracing::info!("converted {} template entities", blocks.len());
    Ok(blocks)
}

fn logical_key(key: &Value) -> Result<&str> {
    key.as_str().ok_or_else(|| Error::Template {
        message: format!("non-string logical id: {key:?}"),
    })
}

fn variable_arguments(definition: &ParameterDef) -> Mapping {
    let mut arguments = Mapping::new();
    if let Some(description) = &definition.description {
        arguments.insert("description".into(), description.as_str().into());
    }
    arguments.insert(
        "type".into(),
        terraform_variable_type(&definition.parameter_type).into(),
    );
    if let Some(default) = &definition.default {
        arguments.insert("default".into(), default.clone());
    }
    arguments
}

fn terraform_variable_type(cf_type: &str) -> &'static str {
    match cf_type {
        "Number" => "number",
        "List<Number>" => "list(number)",
        t if t == "CommaDelimitedList" || t.starts_with("List<") => "list(string)",
        _ => "string",
    }
}

/// Rewrite YAML short-form intrinsic tags into long-form mappings:
/// `!Ref X` to `{"Ref": X}`, `!GetAtt A.B` to `{"Fn::GetAtt": A.B}`, and
/// any other `!Name` to `{"Fn::Name": ...}`.
fn normalize_intrinsics(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            let key = match name {
                "Ref" => "Ref".to_string(),
                other => format!("Fn::{other}"),
            };
            let mut map = Mapping::new();
            map.insert(key.into(), normalize_intrinsics(tagged.value));
            Value::Mapping(map)
        }
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, normalize_intrinsics(v)))
                .collect(),
        ),
        Value::Sequence(items) => {
            Value::Sequence(items.into_iter().map(normalize_intrinsics).collect())
        }
        scalar => scalar,
    }
}

/// Translate PascalCase property names to snake_case, recursively. Subtrees
/// holding an intrinsic invocation are left untouched: the resolver replaces
/// them wholesale, and Fn::Sub substitution maps must keep their source
/// names.
fn properties_to_snake(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            if contains_intrinsic(&map) {
                return Value::Mapping(map);
            }
            Value::Mapping(properties_mapping_to_snake(map))
        }
        Value::Sequence(items) => {
            Value::Sequence(items.into_iter().map(properties_to_snake).collect())
        }
        scalar => scalar,
    }
}

fn properties_mapping_to_snake(map: Mapping) -> Mapping {
    if contains_intrinsic(&map) {
        return map;
    }
    map.into_iter()
        .map(|(key, value)| {
            let key = match key {
                Value::String(s) => Value::String(pascal_to_snake(&s)),
                other => other,
            };
            (key, properties_to_snake(value))
        })
        .collect()
}

fn contains_intrinsic(map: &Mapping) -> bool {
    map.keys().any(|key| {
        key.as_str()
            .is_some_and(|k| k == "Ref" || k.starts_with("Fn::"))
    })
}

#[derive(Debug, Default)]
struct PseudoUsage {
    region: bool,
    account: bool,
    partition: bool,
    availability_zones: bool,
}

impl PseudoUsage {
    fn data_blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        if self.region {
            blocks.push(data_block("aws_region", "current", Mapping::new()));
        }
        if self.account {
            blocks.push(data_block("aws_caller_identity", "current", Mapping::new()));
        }
        if self.partition {
            blocks.push(data_block("aws_partition", "current", Mapping::new()));
        }
        if self.availability_zones {
            let mut arguments = Mapping::new();
            arguments.insert("state".into(), "available".into());
            blocks.push(data_block("aws_availability_zones", "available", arguments));
        }
        blocks
    }
}

fn data_block(data_type: &str, name: &str, arguments: Mapping) -> Block {
    Block::Data(Data {
        name: name.to_string(),
        data_type: data_type.to_string(),
        arguments,
    })
}

fn scan_pseudo_usage(value: &Value, usage: &mut PseudoUsage) {
    match value {
        Value::String(s) => {
            if s.contains("AWS::Region") {
                usage.region = true;
            }
            if s.contains("AWS::AccountId") {
                usage.account = true;
            }
            if s.contains("AWS::Partition") || s.contains("AWS::URLSuffix") {
                usage.partition = true;
            }
        }
        Value::Mapping(map) => {
            for (key, value) in map {
                if key.as_str() == Some("Fn::GetAZs") {
                    usage.availability_zones = true;
                }
                scan_pseudo_usage(value, usage);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                scan_pseudo_usage(item, usage);
            }
        }
        _ => {}
    }
}
