//! How the processor is started: directly, or through an interpreter.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const SCRIPT_EXTENSIONS: &[&str] = &["py", "pyw"];

/// Command line shape for the configured processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run the processor binary itself
    Standalone { program: PathBuf },
    /// Run `interpreter script ...`
    Interpreted { interpreter: String, script: PathBuf },
}

impl Invocation {
    /// Choose the shape for `processor`, resolving relative paths against `cwd`.
    ///
    /// `.py`/`.pyw` are scripts, `.exe` is standalone, any other absolute
    /// path is standalone and any other relative path is a script.
    pub fn for_processor(processor: &Path, interpreter: &str, cwd: &Path) -> Self {
        let extension = processor
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        let resolved = if processor.is_absolute() {
            processor.to_path_buf()
        } else {
            cwd.join(processor)
        };

        let is_script = match extension.as_deref() {
            Some(ext) if SCRIPT_EXTENSIONS.contains(&ext) => true,
            Some("exe") => false,
            _ => !processor.is_absolute(),
        };

        if is_script {
            Self::Interpreted {
                interpreter: interpreter.to_string(),
                script: resolved,
            }
        } else {
            Self::Standalone { program: resolved }
        }
    }

    /// Program to execute.
    pub fn program(&self) -> OsString {
        match self {
            Self::Standalone { program } => program.clone().into_os_string(),
            Self::Interpreted { interpreter, .. } => OsString::from(interpreter),
        }
    }

    /// Arguments preceding the positional handoff arguments.
    pub fn leading_args(&self) -> Vec<OsString> {
        match self {
            Self::Standalone { .. } => Vec::new(),
            Self::Interpreted { script, .. } => vec![script.clone().into_os_string()],
        }
    }
}
