use airwatch_api::SensorKind;
use async_trait::async_trait;
use uuid::Uuid;

/// What a templated message announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Alert,
    Recovery,
}

/// One decision the evaluation engine hands to the notification sink.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationIntent {
    /// Begin a continuous audible alert for the rule
    StartSound { rule_id: Uuid, clip: Option<String> },
    /// Stop the audible alert; a no-op when nothing is playing
    StopSound { rule_id: Uuid },
    /// Send one templated message carrying the value that crossed the threshold
    SendEmail {
        rule_id: Uuid,
        kind: EmailKind,
        sensor: SensorKind,
        value: f64,
        threshold: f64,
        template: Option<String>,
    },
}

/// Side-effect boundary: the engine decides when, implementations decide how.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, intent: NotificationIntent);
}

/// Sink that only writes log lines, the default wiring until a real
/// sound/email backend is attached.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, intent: NotificationIntent) {
        match intent {
            NotificationIntent::StartSound { rule_id, clip } => {
                tracing::info!(%rule_id, ?clip, "start continuous alert");
            }
            NotificationIntent::StopSound { rule_id } => {
                tracing::info!(%rule_id, "stop continuous alert");
            }
            NotificationIntent::SendEmail {
                rule_id,
                kind,
                sensor,
                value,
                threshold,
                ..
            } => {
                tracing::info!(
                    %rule_id,
                    ?kind,
                    "send email: {} is {}{}, threshold {}{}",
                    sensor.name(),
                    value,
                    sensor.unit(),
                    threshold,
                    sensor.unit()
                );
            }
        }
    }
}
