mod alarm_service;
mod collector_service;
mod notifier;

pub use alarm_service::{AlarmEngine, AlarmService};
pub use collector_service::{CollectorService, ConnectionFault};
pub use notifier::{EmailKind, LogNotifier, NotificationIntent, Notifier};
