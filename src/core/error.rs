//! Error handling for forge
//!
//! This module provides the error taxonomy shared by every layer of the crate
//! and the user-facing rendering used by the `forge` binary. The error system
//! follows two principles:
//! 1. **Strongly-typed errors** so callers can distinguish a scope violation
//!    from a malformed archive or a broken registry file
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Access**: [`ForgeError::AccessDenied`] for scope and approval violations
//! - **Packages**: [`ForgeError::InvalidPackageFile`], [`ForgeError::InvalidArchive`],
//!   [`ForgeError::ManifestInvalid`], [`ForgeError::InstallFailed`]
//! - **Registries**: [`ForgeError::RegistryFormatInvalid`], [`ForgeError::RegistryParse`],
//!   [`ForgeError::NameInvalid`], [`ForgeError::NotFound`]
//! - **Wrapped**: [`std::io::Error`], [`zip::result::ZipError`], [`serde_json::Error`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use forge_cli::core::{ForgeError, user_friendly_error};
//!
//! let error = ForgeError::AccessDenied {
//!     reason: "skill path is outside configured scope".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for forge operations.
///
/// Validation errors abort the current operation before any write happens and
/// are never retried automatically.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// A path or package failed a scope or approval check.
    ///
    /// Raised by the path authority when a target lies outside every declared
    /// scope, when a write is attempted on a read-only plugin registry, and by
    /// the install coordinator when a package was never approved.
    #[error("Access denied: {reason}")]
    AccessDenied {
        /// Which rule rejected the request
        reason: String,
    },

    /// A package file failed the static pre-archive checks (extension, type, size).
    #[error("Invalid package file {path}: {reason}")]
    InvalidPackageFile {
        /// The rejected file
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// A package archive has unsafe structure or exceeds a size ceiling.
    #[error("Invalid archive: {reason}")]
    InvalidArchive {
        /// The structural or size violation
        reason: String,
    },

    /// A package manifest is missing required fields or is malformed.
    #[error("Invalid package manifest: {reason}")]
    ManifestInvalid {
        /// What is missing or malformed
        reason: String,
    },

    /// A registry file (or import snippet) is valid JSON but not an object.
    #[error("Invalid MCP config format: {path} is not a JSON object")]
    RegistryFormatInvalid {
        /// The offending file, or a description of the snippet
        path: String,
    },

    /// A registry file could not be parsed as JSON.
    ///
    /// Fatal for the single operation; the file's content is left untouched.
    #[error("Failed to parse MCP config {path}")]
    RegistryParse {
        /// The unparseable file
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A server name violates the identifier pattern or is reserved.
    #[error("Invalid server name: {name}")]
    NameInvalid {
        /// The rejected name
        name: String,
    },

    /// A mutation target is absent from the expected collection.
    ///
    /// Toggle and allowed-tools edits report this as a value; callers that
    /// want a hard failure escalate with this variant.
    #[error("Server '{name}' not found in {scope}")]
    NotFound {
        /// The server that was looked up
        name: String,
        /// A description of the scope that was searched
        scope: String,
    },

    /// An installation failed after files may already have been extracted.
    ///
    /// Partially extracted files are not rolled back; the install directory is
    /// reported so the caller can retry or clean up.
    #[error("Installation failed; partial files may remain in {install_dir}")]
    InstallFailed {
        /// The directory that extraction targeted
        install_dir: PathBuf,
        /// The failure that ended the installation
        #[source]
        source: Box<ForgeError>,
    },

    /// The scope configuration could not be read or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// IO error from the standard library.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Archive container error from the `zip` crate.
    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ForgeError {
    /// Shorthand for an [`ForgeError::AccessDenied`] with the given reason.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`ForgeError::InvalidArchive`] with the given reason.
    pub fn invalid_archive(reason: impl Into<String>) -> Self {
        Self::InvalidArchive {
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`ForgeError::ManifestInvalid`] with the given reason.
    pub fn manifest_invalid(reason: impl Into<String>) -> Self {
        Self::ManifestInvalid {
            reason: reason.into(),
        }
    }

    /// Returns `true` for scope and approval violations, including ones
    /// wrapped by [`ForgeError::InstallFailed`].
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        match self {
            Self::AccessDenied { .. } => true,
            Self::InstallFailed { source, .. } => source.is_access_denied(),
            _ => false,
        }
    }
}

/// Result alias for core operations.
pub type ForgeResult<T> = std::result::Result<T, ForgeError>;

/// User-facing wrapper adding a suggestion and details to a [`ForgeError`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ForgeError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ForgeError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`ForgeError`] and [`std::io::Error`]; any other error is
/// rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<ForgeError>() {
        Ok(forge_error) => return create_error_context(forge_error),
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(ForgeError::access_denied(format!(
                    "file access: {error}"
                )))
                .with_suggestion("Check file ownership and permissions")
                .with_details("The operating system refused to read or write the file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(ForgeError::ConfigError {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(ForgeError::ConfigError {
        message,
    })
}

fn create_error_context(error: ForgeError) -> ErrorContext {
    match &error {
        ForgeError::AccessDenied { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Add the directory to skill_paths, registry_paths or project_roots in the file shown by 'forge config path'",
            )
            .with_details(
                "Only skill roots, registry paths and project roots listed in the forge config are accessible",
            ),
        ForgeError::InvalidPackageFile { .. } => ErrorContext::new(error)
            .with_suggestion("Select a .dxt or .mcpb file between 1 byte and 50 MiB"),
        ForgeError::InvalidArchive { .. } => ErrorContext::new(error)
            .with_details("Package archives are inspected before extraction; nothing was written")
            .with_suggestion("Rebuild the package without absolute or '..' entry paths"),
        ForgeError::ManifestInvalid { .. } => ErrorContext::new(error)
            .with_suggestion("Ensure manifest.json declares a 'name' and a 'server' object"),
        ForgeError::RegistryFormatInvalid { .. } | ForgeError::RegistryParse { .. } => {
            ErrorContext::new(error)
                .with_details("The file was left untouched")
                .with_suggestion("Fix the JSON syntax with 'forge mcp show <path>' and retry")
        }
        ForgeError::NameInvalid { .. } => ErrorContext::new(error).with_suggestion(
            "Server names may contain letters, digits, '.', '_' and '-' (1-80 characters)",
        ),
        ForgeError::InstallFailed { install_dir, .. } => {
            let details = format!("Remove {} manually before retrying", install_dir.display());
            ErrorContext::new(error).with_details(details)
        }
        _ => ErrorContext::new(error),
    }
}
