use crate::isolation::{Classification, Severity};
use colored::*;
use std::env;
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,   // Detect based on terminal
    Always, // Force colors on
    Never,  // Force colors off
}

impl ColorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    pub fn should_use_color(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => detect_color_support(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingConfig {
    pub color: ColorMode,
    /// ASCII table borders and no symbols.
    pub plain: bool,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            plain: false,
        }
    }
}

impl FormattingConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // no-color.org
        if env::var_os("NO_COLOR").is_some() {
            config.color = ColorMode::Never;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            config.color = ColorMode::Never;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v == "1") {
            config.color = ColorMode::Always;
        }

        config
    }

    pub fn plain() -> Self {
        Self {
            color: ColorMode::Never,
            plain: true,
        }
    }

    pub fn use_color(&self) -> bool {
        !self.plain && self.color.should_use_color()
    }

    /// Apply the color decision to the `colored` crate globally.
    pub fn apply(&self) {
        colored::control::set_override(self.use_color());
    }
}

/// Styles report text. Every method returns the text unchanged when color
/// is off.
#[derive(Debug, Clone, Copy)]
pub struct Styler {
    color: bool,
}

impl Styler {
    pub fn new(config: &FormattingConfig) -> Self {
        Self {
            color: config.use_color(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    fn paint(&self, text: &str, style: impl FnOnce(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn header(&self, text: &str) -> String {
        self.paint(text, |t| t.blue().bold())
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(text, |t| t.bold())
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(text, |t| t.dimmed())
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(text, |t| t.green())
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, |t| t.red().bold())
    }

    pub fn warning(&self, text: &str) -> String {
        self.paint(text, |t| t.yellow())
    }

    pub fn classification(&self, classification: Classification) -> String {
        let text = classification.as_str().to_uppercase();
        match classification {
            Classification::Violation => self.paint(&text, |t| t.red().bold()),
            Classification::Unknown => self.paint(&text, |t| t.magenta().bold()),
            Classification::Exempt => self.paint(&text, |t| t.cyan()),
            Classification::Safe => self.paint(&text, |t| t.green()),
        }
    }

    pub fn severity(&self, severity: Severity) -> String {
        let text = severity.as_str();
        match severity {
            Severity::Critical => self.paint(text, |t| t.red().bold()),
            Severity::High => self.paint(text, |t| t.red()),
            Severity::Medium => self.paint(text, |t| t.yellow()),
            Severity::Low => self.paint(text, |t| t.normal()),
        }
    }
}

fn detect_color_support() -> bool {
    if env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    std::io::stdout().is_terminal()
}
