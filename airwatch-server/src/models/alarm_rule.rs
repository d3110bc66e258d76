use airwatch_api::SensorKind;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// How a rule compares a reading against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Above,
    Below,
}

impl Comparison {
    /// Strict comparison: equality never crosses either edge.
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Above => value > threshold,
            Self::Below => value < threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Above => ">",
            Self::Below => "<",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoundChannel {
    /// Clip looped while the rule stays triggered
    pub clip: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailChannel {
    /// Message template reference the sink renders
    pub template: Option<String>,
}

/// Live state of one rule, persisted alongside it so a restart does not
/// re-fire a repeat notification ahead of its cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleState {
    pub triggered: bool,
    /// True whenever the rule is untriggered and no recovery message is owed;
    /// reset to false exactly on the normal→triggered transition.
    pub recovery_notified: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_notification: Option<OffsetDateTime>,
}

impl Default for RuleState {
    fn default() -> Self {
        Self {
            triggered: false,
            recovery_notified: true,
            last_notification: None,
        }
    }
}

/// One monitored condition and its notification bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmRule {
    pub id: Uuid,
    pub sensor: SensorKind,
    pub comparison: Comparison,
    pub threshold: f64,
    /// Continuous audible alert, when bound
    #[serde(default)]
    pub sound: Option<SoundChannel>,
    /// Alert/recovery mail, when bound
    #[serde(default)]
    pub email: Option<EmailChannel>,
    pub enabled: bool,
    #[serde(default)]
    pub state: RuleState,
}

impl AlarmRule {
    pub fn new(sensor: SensorKind, comparison: Comparison, threshold: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sensor,
            comparison,
            threshold,
            sound: None,
            email: None,
            enabled: true,
            state: RuleState::default(),
        }
    }

    pub fn with_sound(mut self, clip: Option<String>) -> Self {
        self.sound = Some(SoundChannel { clip });
        self
    }

    pub fn with_email(mut self, template: Option<String>) -> Self {
        self.email = Some(EmailChannel { template });
        self
    }

    /// One-line summary, e.g. `pm25 > 100 µg/m³ → email`.
    pub fn describe(&self) -> String {
        let mut channels = Vec::new();
        if self.sound.is_some() {
            channels.push("sound");
        }
        if self.email.is_some() {
            channels.push("email");
        }
        let channels = if channels.is_empty() {
            "no channels".to_string()
        } else {
            channels.join(" + ")
        };

        format!(
            "{} {} {}{} → {}",
            self.sensor.name(),
            self.comparison.symbol(),
            self.threshold,
            self.sensor.unit(),
            channels
        )
    }
}
