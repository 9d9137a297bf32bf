//! cfshift Core Library
//!
//! This crate provides the core functionality for cfshift:
//! - CloudFormation template parsing and conversion
//! - Intrinsic function resolution (`Ref`, `Fn::*`) into terraform expressions
//! - Terraform block model and HCL rendering
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Template   │────▶│  Resolution │────▶│     HCL     │
//! │   (YAML)    │     │   Engine    │     │   Output    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cfshift_core::{convert, Configuration, Dispatch};
//!
//! let blocks = convert::convert_template(&template_source)?;
//! let mut config = Configuration::new("main.tf".into(), blocks, Dispatch::standard());
//! config.save()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod convert;
pub mod error;
pub mod functions;
pub mod hcl;
pub mod names;
pub mod resolver;

pub use config::Configuration;
pub use error::{Error, Result};
pub use functions::Dispatch;
pub use hcl::Block;
