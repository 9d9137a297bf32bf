//! Naming convention translation
//!
//! CloudFormation identifies everything in PascalCase; terraform uses
//! snake_case. Cross-references between blocks are matched through this
//! translation, so it must be deterministic and idempotent.

use crate::error::{Error, Result};

/// Convert a PascalCase identifier to snake_case.
///
/// Acronym runs collapse into a single word (`DNSName` becomes `dns_name`).
/// Input that is already snake_case passes through unchanged, so the
/// translation is idempotent.
pub fn pascal_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let boundary = match i.checked_sub(1).map(|p| chars[p]) {
                None => false,
                Some(prev) => {
                    prev.is_ascii_lowercase()
                        || prev.is_ascii_digit()
                        || (prev.is_ascii_uppercase()
                            && chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase()))
                }
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    out
}

/// Map a CloudFormation resource type to its terraform counterpart,
/// e.g. `AWS::S3::Bucket` to `aws_s3_bucket`.
///
/// The mapping is purely lexical. A handful of terraform types drop the
/// service prefix (`aws_instance`, not `aws_ec2_instance`); callers that
/// care can rename afterwards.
pub fn resource_type_to_terraform(cf_type: &str) -> Result<String> {
    let mut segments = cf_type.split("::");
    let vendor = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.collect();

    if vendor.is_empty() || rest.is_empty() {
        return Err(Error::Template {
            message: format!("not a CloudFormation resource type: {cf_type}"),
        });
    }

    let mut parts = vec![vendor.to_ascii_lowercase()];
    parts.extend(rest.iter().map(|s| pascal_to_snake(s)));
    Ok(parts.join("_"))
}
