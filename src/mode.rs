use serde::{Deserialize, Serialize};

/// The four timer presets.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Pomodoro,
    Short,
    Long,
    Custom,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Pomodoro, Mode::Short, Mode::Long, Mode::Custom];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pomodoro => "🎯 FOCUS TIME",
            Self::Short => "☕ SHORT BREAK",
            Self::Long => "🌴 LONG BREAK",
            Self::Custom => "⏱  CUSTOM",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pomodoro => "Pomodoro",
            Self::Short => "Short Break",
            Self::Long => "Long Break",
            Self::Custom => "Custom",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pomodoro => "pomodoro",
            Self::Short => "short",
            Self::Long => "long",
            Self::Custom => "custom",
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Self::Short | Self::Long)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pomodoro" | "focus" | "work" => Ok(Self::Pomodoro),
            "short" | "short_break" => Ok(Self::Short),
            "long" | "long_break" => Ok(Self::Long),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
