//! Intrinsic invocation resolution engine
//!
//! Walks a block's argument tree bottom-up and rewrites every intrinsic
//! invocation into its terraform expression. An invocation is a mapping
//! holding a `Ref` key or an `Fn::`-prefixed key; the first such key found
//! in insertion order wins and its result replaces the whole mapping,
//! discarding any sibling keys. `Fn::` keys must be members of the current
//! allow-list, and their argument trees are resolved under their own
//! allow-list from the dispatch table rather than the caller's.

use serde_yaml::Value;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::functions;

/// Maximum invocation nesting depth. Templates deeper than this are almost
/// certainly malformed or adversarial.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Resolve the argument trees of every resource and output block in the
/// registry, in place, under the universal allow-list. Variables and data
/// sources carry nothing resolvable and are skipped.
pub fn resolve_blocks(config: &mut Configuration) -> Result<()> {
    let universal = config.dispatch().universal();

    for index in 0..config.blocks().len() {
        let Some(arguments) = config.blocks_mut()[index].resolvable_arguments_mut() else {
            continue;
        };
        let taken = std::mem::take(arguments);

        let resolved = resolve_values(config, Value::Mapping(taken), &universal)?;
        let Value::Mapping(resolved) = resolved else {
            return Err(Error::Template {
                message: "block arguments resolved to a non-mapping value".to_string(),
            });
        };

        if let Some(arguments) = config.blocks_mut()[index].resolvable_arguments_mut() {
            *arguments = resolved;
        }
    }
    Ok(())
}

/// Resolve a single tree under the given allow-list.
///
/// Scalars pass through unchanged, sequences resolve element-wise with order
/// and length preserved, and mappings resolve per the invocation rules in
/// the module docs. Pure structural rewrite: no I/O, deterministic for a
/// given tree and registry state.
pub fn resolve_values(config: &Configuration, data: Value, allowed: &[&str]) -> Result<Value> {
    resolve_at(config, data, allowed, 0)
}

fn resolve_at(
    config: &Configuration,
    data: Value,
    allowed: &[&str],
    depth: usize,
) -> Result<Value> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(Error::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }

    match data {
        Value::Mapping(mut map) => {
            let keys: Vec<Value> = map.keys().cloned().collect();

            for key in keys {
                let marker = key.as_str().map(str::to_owned);
                let value = map.get(&key).cloned().unwrap_or(Value::Null);

                match marker.as_deref() {
                    // References short-circuit: the result replaces the
                    // whole mapping and later keys are never visited.
                    Some("Ref") => return functions::reference(config, value),

                    Some(name) if name.starts_with("Fn::") => {
                        if !allowed.iter().any(|f| *f == name) {
                            return Err(Error::IllegalFunctionContext {
                                function: name.to_string(),
                            });
                        }
                        let entry = config.dispatch().get(name).ok_or_else(|| {
                            Error::UnknownFunction {
                                function: name.to_string(),
                            }
                        })?;
                        // The argument tree is scoped by this function's own
                        // allow-list, never the caller's.
                        let argument = resolve_at(config, value, entry.nested, depth + 1)?;
                        return (entry.resolver)(config, argument);
                    }

                    // Plain attribute: resolve in place and keep walking.
                    _ => {
                        let resolved = resolve_at(config, value, allowed, depth + 1)?;
                        map.insert(key, resolved);
                    }
                }
            }
            Ok(Value::Mapping(map))
        }

        Value::Sequence(items) => {
            let resolved: Vec<Value> = items
                .into_iter()
                .map(|item| resolve_at(config, item, allowed, depth + 1))
                .collect::<Result<_>>()?;
            Ok(Value::Sequence(resolved))
        }

        scalar => Ok(scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::Dispatch;
    use crate::hcl::{Block, Resource, Variable};
    use serde_yaml::Mapping;

    fn passthrough(_config: &Configuration, value: Value) -> Result<Value> {
        Ok(value)
    }

    fn registry() -> Vec<Block> {
        vec![
            Block::Variable(Variable {
                name: "bucket_name_param".to_string(),
                arguments: Mapping::new(),
            }),
            Block::Resource(Resource {
                name: "logs_bucket".to_string(),
                resource_type: "aws_s3_bucket".to_string(),
                logical_id: "LogsBucket".to_string(),
                arguments: Mapping::new(),
            }),
        ]
    }

    fn standard_config() -> Configuration {
        Configuration::new("main.tf".into(), registry(), Dispatch::standard())
    }

    fn tree(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_scalars_pass_through() {
        let config = standard_config();
        for scalar in ["plain", "42", "true", "null"] {
            let value = tree(scalar);
            assert_eq!(
                resolve_values(&config, value.clone(), &[]).unwrap(),
                value
            );
        }
    }

    #[test]
    fn test_invocation_free_tree_is_preserved() {
        let config = standard_config();
        let value = tree("bucket: logs\ntags:\n  env: prod\nports: [80, 443]\n");
        let resolved = resolve_values(&config, value.clone(), &config.dispatch().universal());
        assert_eq!(resolved.unwrap(), value);
    }

    #[test]
    fn test_reference_replaces_whole_mapping() {
        let config = standard_config();
        let value = tree("Ref: BucketNameParam\nExtra: ignored\n");
        let resolved =
            resolve_values(&config, value, &config.dispatch().universal()).unwrap();
        assert_eq!(resolved, Value::String("var.bucket_name_param".to_string()));
    }

    #[test]
    fn test_reference_early_return_matches_lone_reference() {
        let config = standard_config();
        let universal = config.dispatch().universal();
        let with_sibling =
            resolve_values(&config, tree("Ref: BucketNameParam\nExtra: ignored\n"), &universal)
                .unwrap();
        let alone =
            resolve_values(&config, tree("Ref: BucketNameParam\n"), &universal).unwrap();
        assert_eq!(with_sibling, alone);
    }

    #[test]
    fn test_nested_invocations_resolve_bottom_up() {
        let config = standard_config();
        let value = tree("Fn::Join:\n  - \"-\"\n  - - prefix\n    - Ref: BucketNameParam\n");
        let resolved =
            resolve_values(&config, value, &config.dispatch().universal()).unwrap();
        assert_eq!(
            resolved,
            Value::String("join(\"-\", [\"prefix\", var.bucket_name_param])".to_string())
        );
    }

    #[test]
    fn test_sequence_order_and_length_preserved() {
        let config = standard_config();
        let value = tree("- a\n- Ref: BucketNameParam\n- b\n");
        let resolved =
            resolve_values(&config, value, &config.dispatch().universal()).unwrap();
        let Value::Sequence(items) = resolved else {
            panic!("expected a sequence");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Value::String("a".to_string()));
        assert_eq!(items[1], Value::String("var.bucket_name_param".to_string()));
        assert_eq!(items[2], Value::String("b".to_string()));
    }

    #[test]
    fn test_select_index_may_be_a_reference() {
        let config = standard_config();
        let value = tree("Fn::Select:\n  - Ref: BucketNameParam\n  - [a, b, c]\n");
        let resolved =
            resolve_values(&config, value, &config.dispatch().universal()).unwrap();
        assert_eq!(
            resolved,
            Value::String(
                "element([\"a\", \"b\", \"c\"], var.bucket_name_param)".to_string()
            )
        );
    }

    #[test]
    fn test_get_azs_region_may_be_a_reference() {
        let config = standard_config();
        let value = tree("Fn::GetAZs:\n  Ref: AWS::Region\n");
        let resolved =
            resolve_values(&config, value, &config.dispatch().universal()).unwrap();
        assert_eq!(
            resolved,
            Value::String("data.aws_availability_zones.available.names".to_string())
        );
    }

    #[test]
    fn test_disallowed_function_fails_with_offender_name() {
        let config = standard_config();
        // Fn::GetAtt only admits Ref in its argument tree.
        let value = tree("Fn::GetAtt:\n  - LogsBucket\n  - Fn::Join: [\"\", [A, rn]]\n");
        let err = resolve_values(&config, value, &config.dispatch().universal()).unwrap_err();
        match err {
            Error::IllegalFunctionContext { function } => assert_eq!(function, "Fn::Join"),
            other => panic!("expected IllegalFunctionContext, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_injected_table_scopes_nesting() {
        let mut table = Dispatch::new();
        table.register("Fn::Outer", passthrough, &[]);
        table.register("Fn::Inner", passthrough, &[]);
        let config = Configuration::new("main.tf".into(), vec![], table);

        let value = tree("Fn::Outer:\n  Fn::Inner: x\n");
        let err = resolve_values(&config, value, &["Fn::Outer", "Fn::Inner"]).unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalFunctionContext { function } if function == "Fn::Inner"
        ));
    }

    #[test]
    fn test_allowed_but_unregistered_function_fails_fast() {
        let config = standard_config();
        let value = tree("Fn::Bogus: x\n");
        let err = resolve_values(&config, value, &["Fn::Bogus"]).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownFunction { function } if function == "Fn::Bogus"
        ));
    }

    // Attribute keys preceding a marker are resolved in place, then the
    // marker discards the mapping wholesale. Preserved source behavior.
    #[test]
    fn test_attributes_before_marker_are_resolved_then_discarded() {
        let config = standard_config();
        let value = tree("name:\n  Ref: BucketNameParam\nFn::Join: [\"-\", [a, b]]\n");
        let resolved =
            resolve_values(&config, value, &config.dispatch().universal()).unwrap();
        assert_eq!(
            resolved,
            Value::String("join(\"-\", [\"a\", \"b\"])".to_string())
        );
    }

    #[test]
    fn test_nesting_depth_guard() {
        let config = standard_config();
        let mut value = Value::String("leaf".to_string());
        for _ in 0..(MAX_NESTING_DEPTH + 4) {
            let mut map = Mapping::new();
            map.insert("wrapped".into(), value);
            value = Value::Mapping(map);
        }
        let err = resolve_values(&config, value, &[]).unwrap_err();
        assert!(matches!(err, Error::NestingTooDeep { .. }));
    }

    #[test]
    fn test_resolve_blocks_skips_variables_and_rewrites_resources() {
        let mut arguments = Mapping::new();
        arguments.insert("bucket".into(), tree("Ref: BucketNameParam"));

        let mut variable_arguments = Mapping::new();
        variable_arguments.insert("type".into(), "string".into());

        let mut config = Configuration::new(
            "main.tf".into(),
            vec![
                Block::Variable(Variable {
                    name: "bucket_name_param".to_string(),
                    arguments: variable_arguments.clone(),
                }),
                Block::Resource(Resource {
                    name: "logs_bucket".to_string(),
                    resource_type: "aws_s3_bucket".to_string(),
                    logical_id: "LogsBucket".to_string(),
                    arguments,
                }),
            ],
            Dispatch::standard(),
        );

        resolve_blocks(&mut config).unwrap();

        let resource = config
            .blocks()
            .iter()
            .find(|b| matches!(b, Block::Resource(_)))
            .unwrap();
        assert_eq!(
            resource.arguments().get("bucket"),
            Some(&Value::String("var.bucket_name_param".to_string()))
        );

        // The variable block never passes through the resolver.
        let variable = config
            .blocks()
            .iter()
            .find(|b| matches!(b, Block::Variable(_)))
            .unwrap();
        assert_eq!(variable.arguments(), &variable_arguments);
    }
}
