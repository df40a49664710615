// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Splits a task/approval file into its YAML frontmatter and Markdown body,
//! and re-joins them deterministically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("file does not open with a `---` frontmatter fence")]
    MissingFence,
    #[error("frontmatter fence is not closed")]
    UnterminatedFence,
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Split `---\n<yaml>\n---\n<body>` into its two halves. The body is
/// returned with leading newlines trimmed, per the "body content" rule
/// used by the integrity hasher.
pub fn split(raw: &str) -> Result<(&str, &str), FrontmatterError> {
    let rest = raw.strip_prefix("---\n").ok_or(FrontmatterError::MissingFence)?;
    let end = rest
        .find("\n---\n")
        .or_else(|| rest.find("\n---").filter(|i| i + 4 == rest.len()))
        .ok_or(FrontmatterError::UnterminatedFence)?;
    let yaml = &rest[..end];
    let body_start = end + 4;
    let body = rest.get(body_start..).unwrap_or("");
    let body = body.strip_prefix('\n').unwrap_or(body);
    Ok((yaml, body.trim_start_matches('\n')))
}

/// Parse the frontmatter block into `T`.
pub fn parse<T: serde::de::DeserializeOwned>(raw: &str) -> Result<(T, String), FrontmatterError> {
    let (yaml, body) = split(raw)?;
    let value: T = serde_yaml::from_str(yaml)?;
    Ok((value, body.to_string()))
}

/// Render `value` as a frontmatter block followed by `body`, in the
/// canonical `---\n<yaml>\n---\n<body>` shape. `serde_yaml` preserves
/// struct field order, which keeps re-renders of the same value
/// byte-identical (required for the approval integrity hash).
pub fn render<T: serde::Serialize>(value: &T, body: &str) -> Result<String, FrontmatterError> {
    let yaml = serde_yaml::to_string(value)?;
    let yaml = yaml.trim_end_matches('\n');
    Ok(format!("---\n{yaml}\n---\n{body}"))
}

/// Everything after the closing fence, left-stripped of leading newlines —
/// the exact slice the integrity hash is computed over.
pub fn body_content(raw: &str) -> Result<&str, FrontmatterError> {
    split(raw).map(|(_, body)| body)
}

#[cfg(test)]
#[path = "frontmatter_tests.rs"]
mod tests;
