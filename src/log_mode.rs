use serde::{Deserialize, Serialize};

/// Mode de journalisation du trafic observé
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogMode {
    /// Journal dans un fichier local
    #[default]
    File,
    /// Journal via systemd-journal
    SystemdJournal,
}

impl LogMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogMode::File => "fichier",
            LogMode::SystemdJournal => "systemd-journal",
        }
    }
}
