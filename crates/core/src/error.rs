// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error classification used by the persistence loop and state machine
//! retry policies.

use thiserror::Error;

/// How a failure should be handled by a retrying caller.
///
/// `Transient` failures are retried with backoff; `Fatal` failures end the
/// task immediately; `Invariant` violations indicate a programming bug and
/// are never expected to occur in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Transient,
    Fatal,
    Invariant,
}

/// Errors shared across crates for I/O against the vault filesystem.
#[derive(Debug, Error)]
pub enum VaultIoError {
    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed frontmatter in {path}: {reason}")]
    Frontmatter {
        path: std::path::PathBuf,
        reason: String,
    },
}

impl VaultIoError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Classify the underlying `io::Error` per the transient/fatal table:
    /// a crossed-device rename (`EXDEV`, raw os error 18) or full disk
    /// (`ENOSPC`, raw os error 28) is fatal, permission errors are fatal
    /// (not retried), and everything else is treated as transient. Raw
    /// error codes are matched directly rather than through
    /// `std::io::ErrorKind` variants, mirroring the `errno`-based checks
    /// the orchestrator this is ported from relies on.
    pub fn classify(&self) -> Classification {
        match self {
            Self::Io { source, .. } => {
                if source.kind() == std::io::ErrorKind::PermissionDenied
                    || source.kind() == std::io::ErrorKind::NotFound
                {
                    Classification::Fatal
                } else if matches!(source.raw_os_error(), Some(18) | Some(28)) {
                    Classification::Fatal
                } else {
                    Classification::Transient
                }
            }
            Self::Frontmatter { .. } => Classification::Fatal,
        }
    }
}
