use std::fmt;

/// Stages of one extraction attempt, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Authenticate,
    SelectFilter,
    Search,
    Export,
    DeclineConfirmation,
    OpenResults,
    Refresh,
    LocateDownload,
    Download,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::SelectFilter => "select filter",
            Self::Search => "search",
            Self::Export => "export",
            Self::DeclineConfirmation => "decline confirmation",
            Self::OpenResults => "open results",
            Self::Refresh => "settle and refresh",
            Self::LocateDownload => "locate download link",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
