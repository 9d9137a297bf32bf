//! The terraform configuration under construction
//!
//! A [`Configuration`] owns the ordered block registry produced by the
//! template converter, the dispatch table the resolution engine consults,
//! and the path the rendered HCL is written to. One instance per conversion
//! run; the registry and every argument tree are exclusively owned by it.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::functions::Dispatch;
use crate::hcl::Block;
use crate::names::pascal_to_snake;
use crate::resolver;

/// The target terraform configuration: the block registry plus everything
/// needed to resolve and write it.
pub struct Configuration {
    output_path: PathBuf,
    blocks: Vec<Block>,
    dispatch: Dispatch,
}

impl Configuration {
    /// Create a configuration over an already-converted block registry.
    ///
    /// The dispatch table is injected here so tests can supply a minimal
    /// catalogue; production callers use [`Dispatch::standard`].
    pub fn new(output_path: PathBuf, blocks: Vec<Block>, dispatch: Dispatch) -> Self {
        Self {
            output_path,
            blocks,
            dispatch,
        }
    }

    /// The blocks in registry order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// The injected function dispatch table.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Where [`save`](Self::save) writes the rendered configuration.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Find a block by source-style identifier, translated to terraform
    /// convention. Output blocks are never reference targets and are
    /// skipped. Returns the first match in registry order.
    pub fn block_lookup(&self, name: &str) -> Option<&Block> {
        let name = pascal_to_snake(name);
        tracing::debug!("searching for terraform block named {name}");

        self.blocks
            .iter()
            .filter(|block| !matches!(block, Block::Output(_)))
            .find(|block| block.name() == name)
    }

    /// Find a block by its original CloudFormation logical ID. Blocks that
    /// carry a source origin are matched on it; everything else falls back
    /// to direct name equality.
    pub fn resource_lookup(&self, logical_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| match block.source_origin() {
            Some(origin) => origin == logical_id,
            None => block.name() == logical_id,
        })
    }

    /// Resolve every block's argument tree, then render each block in
    /// registry order to the output path.
    ///
    /// A block that fails to render is logged with its full identity and
    /// current argument tree, and the failure aborts the remaining blocks.
    /// Blocks already written stay written; there is no rollback.
    pub fn save(&mut self) -> Result<()> {
        resolver::resolve_blocks(self)?;

        let mut file = File::create(&self.output_path)?;
        for block in &self.blocks {
            let text = match block.write() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(
                        "unable to write {} {} {:?}",
                        block.name(),
                        block.block_type(),
                        block.arguments()
                    );
                    return Err(e);
                }
            };
            file.write_all(text.as_bytes())?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcl::{Output, Resource, Variable};
    use serde_yaml::Mapping;

    fn resource(name: &str, logical_id: &str) -> Block {
        Block::Resource(Resource {
            name: name.to_string(),
            resource_type: "aws_s3_bucket".to_string(),
            logical_id: logical_id.to_string(),
            arguments: Mapping::new(),
        })
    }

    #[test]
    fn test_block_lookup_translates_names() {
        let config = Configuration::new(
            "main.tf".into(),
            vec![resource("logs_bucket", "LogsBucket")],
            Dispatch::new(),
        );
        assert!(config.block_lookup("LogsBucket").is_some());
        assert!(config.block_lookup("logs_bucket").is_some());
        assert!(config.block_lookup("Missing").is_none());
    }

    #[test]
    fn test_block_lookup_skips_outputs() {
        let config = Configuration::new(
            "main.tf".into(),
            vec![
                Block::Output(Output {
                    name: "shared".to_string(),
                    arguments: Mapping::new(),
                }),
                resource("shared", "Shared"),
            ],
            Dispatch::new(),
        );
        let found = config.block_lookup("Shared").unwrap();
        assert!(matches!(found, Block::Resource(_)));
    }

    #[test]
    fn test_resource_lookup_prefers_source_origin() {
        let config = Configuration::new(
            "main.tf".into(),
            vec![
                resource("logs_bucket", "LogsBucket"),
                Block::Variable(Variable {
                    name: "stage".to_string(),
                    arguments: Mapping::new(),
                }),
            ],
            Dispatch::new(),
        );

        // Resource matched on its logical ID, not its terraform name.
        let found = config.resource_lookup("LogsBucket").unwrap();
        assert_eq!(found.name(), "logs_bucket");

        // Blocks without a source origin fall back to name equality.
        let found = config.resource_lookup("stage").unwrap();
        assert!(matches!(found, Block::Variable(_)));
    }

    #[test]
    fn test_save_writes_blocks_in_registry_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.tf");

        let mut variable_args = Mapping::new();
        variable_args.insert("type".into(), "string".into());

        let mut config = Configuration::new(
            path.clone(),
            vec![
                Block::Variable(Variable {
                    name: "bucket_name_param".to_string(),
                    arguments: variable_args,
                }),
                resource("logs_bucket", "LogsBucket"),
            ],
            Dispatch::standard(),
        );
        config.save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let variable_at = text.find("variable \"bucket_name_param\"").unwrap();
        let resource_at = text.find("resource \"aws_s3_bucket\" \"logs_bucket\"").unwrap();
        assert!(variable_at < resource_at);
    }

    #[test]
    fn test_save_aborts_on_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.tf");

        let mut bad_arguments = Mapping::new();
        bad_arguments.insert(serde_yaml::Value::Number(1.into()), "x".into());

        let mut config = Configuration::new(
            path,
            vec![Block::Output(Output {
                name: "broken".to_string(),
                arguments: bad_arguments,
            })],
            Dispatch::standard(),
        );
        assert!(config.save().is_err());
    }
}
