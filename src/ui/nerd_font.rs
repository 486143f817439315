/// Nerd font glyphs used in operator messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    // Status and feedback
    Check,   //
    Cross,   //
    Warning, //
    Info,    //

    // Transfer
    Download, //
    Upload,   //
    HardDrive, //
    Table,    //

    // Session
    Key,     //
    Link,    //
    Refresh, //
}

impl NerdFont {
    pub fn unicode(self) -> char {
        match self {
            Self::Check => '\u{f00c}',     // fa-check
            Self::Cross => '\u{f00d}',     // fa-times
            Self::Warning => '\u{f071}',   // fa-exclamation-triangle
            Self::Info => '\u{f05a}',      // fa-info-circle
            Self::Download => '\u{f019}',  // fa-download
            Self::Upload => '\u{f093}',    // fa-upload
            Self::HardDrive => '\u{f0a0}', // fa-hdd
            Self::Table => '\u{f0ce}',     // fa-table
            Self::Key => '\u{f084}',       // fa-key
            Self::Link => '\u{f0c1}',      // fa-link
            Self::Refresh => '\u{f021}',   // fa-refresh
        }
    }
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> Self {
        icon.unicode()
    }
}

impl From<NerdFont> for String {
    fn from(icon: NerdFont) -> Self {
        icon.unicode().to_string()
    }
}
