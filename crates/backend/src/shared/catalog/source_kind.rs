use std::fmt;
use std::str::FromStr;

use crate::shared::errors::PipelineError;

/// Виды источников, которые принимает отчёт
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Video,
    Live,
    Msg,
    AccountBi,
    Leads,
    Dr,
    Spending,
    /// Справочник дилеров (уровень, название магазина)
    AccountBase,
}

impl SourceKind {
    pub const ALL: [SourceKind; 8] = [
        SourceKind::Video,
        SourceKind::Live,
        SourceKind::Msg,
        SourceKind::AccountBi,
        SourceKind::Leads,
        SourceKind::Dr,
        SourceKind::Spending,
        SourceKind::AccountBase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Video => "video",
            SourceKind::Live => "live",
            SourceKind::Msg => "msg",
            SourceKind::AccountBi => "account_bi",
            SourceKind::Leads => "leads",
            SourceKind::Dr => "dr",
            SourceKind::Spending => "spending",
            SourceKind::AccountBase => "account_base",
        }
    }

    pub fn is_dimension(&self) -> bool {
        matches!(self, SourceKind::AccountBase)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| PipelineError::InvalidRequest(format!("unknown source kind '{}'", s)))
    }
}
