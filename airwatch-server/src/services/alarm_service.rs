use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::sync::{Mutex, MutexGuard, oneshot};
use uuid::Uuid;

use crate::configs::Alarm;
use crate::models::{AlarmRule, Reading};
use crate::repositories::{ReadingRepository, RuleStore};
use crate::services::notifier::{EmailKind, NotificationIntent, Notifier};

/// Advances each rule's trigger/cooldown/recovery state machine.
///
/// Notification decisions happen only on condition transitions, so a rule
/// that stays over its threshold keeps alerting silently until the repeat
/// cooldown elapses. Single-writer by design: the transition logic is not
/// re-entrant, so all mutation is serialized through [`AlarmService`].
pub struct AlarmEngine {
    rules: Vec<AlarmRule>,
    cooldown: Duration,
    dirty: bool,
}

impl AlarmEngine {
    pub fn new(rules: Vec<AlarmRule>, cooldown: Duration) -> Self {
        Self {
            rules,
            cooldown,
            dirty: false,
        }
    }

    pub fn rules(&self) -> &[AlarmRule] {
        &self.rules
    }

    /// True when rule state changed since the last call; the caller persists
    /// the list when it is.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Evaluates one fresh reading against every enabled rule.
    pub fn evaluate(&mut self, reading: &Reading, now: OffsetDateTime) -> Vec<NotificationIntent> {
        let mut intents = Vec::new();

        for rule in self.rules.iter_mut().filter(|rule| rule.enabled) {
            let value = reading.value(rule.sensor);
            let condition = rule.comparison.holds(value, rule.threshold);

            if condition != rule.state.triggered {
                if condition {
                    rule.state.triggered = true;
                    rule.state.recovery_notified = false;
                    rule.state.last_notification = Some(now);

                    if let Some(sound) = &rule.sound {
                        intents.push(NotificationIntent::StartSound {
                            rule_id: rule.id,
                            clip: sound.clip.clone(),
                        });
                    }
                    if rule.email.is_some() {
                        intents.push(Self::email(rule, EmailKind::Alert, value));
                    }
                } else {
                    intents.extend(Self::settle(rule, Some(value)));
                }
                self.dirty = true;
            } else if condition && rule.email.is_some() {
                let due = rule
                    .state
                    .last_notification
                    .map_or(true, |last| now - last > self.cooldown);

                if due {
                    rule.state.last_notification = Some(now);
                    self.dirty = true;
                    intents.push(Self::email(rule, EmailKind::Alert, value));
                }
            }
        }

        intents
    }

    /// Stale or absent data: silence every triggered rule without claiming a
    /// recovery was observed.
    pub fn silence_all(&mut self) -> Vec<NotificationIntent> {
        let mut intents = Vec::new();

        for rule in self.rules.iter_mut() {
            if rule.state.triggered {
                intents.extend(Self::settle(rule, None));
                self.dirty = true;
            }
        }

        intents
    }

    pub fn add_rule(&mut self, rule: AlarmRule) {
        tracing::info!(rule = %rule.describe(), "alarm rule added");
        self.rules.push(rule);
        self.dirty = true;
    }

    /// Removes a rule; a triggered rule is settled first so its alert stops.
    pub fn remove_rule(&mut self, id: Uuid) -> Vec<NotificationIntent> {
        let Some(index) = self.rules.iter().position(|rule| rule.id == id) else {
            return Vec::new();
        };

        let mut rule = self.rules.remove(index);
        self.dirty = true;
        tracing::info!(rule = %rule.describe(), "alarm rule removed");

        if rule.state.triggered {
            Self::settle(&mut rule, None)
        } else {
            Vec::new()
        }
    }

    /// Enables or disables a rule in place.
    ///
    /// Disabling a triggered rule settles it, so re-enabling starts from the
    /// untriggered baseline and the next evaluation can re-fire cleanly.
    pub fn set_enabled(&mut self, id: Uuid, enabled: bool) -> Vec<NotificationIntent> {
        let Some(rule) = self.rules.iter_mut().find(|rule| rule.id == id) else {
            return Vec::new();
        };
        if rule.enabled == enabled {
            return Vec::new();
        }

        rule.enabled = enabled;
        self.dirty = true;

        if !enabled && rule.state.triggered {
            Self::settle(rule, None)
        } else {
            Vec::new()
        }
    }

    /// The triggered→normal transition. Always silences; owes at most one
    /// recovery message, and only when a recovered value was actually seen.
    fn settle(rule: &mut AlarmRule, recovered_value: Option<f64>) -> Vec<NotificationIntent> {
        let mut intents = vec![NotificationIntent::StopSound { rule_id: rule.id }];

        rule.state.triggered = false;
        if !rule.state.recovery_notified {
            if let Some(value) = recovered_value {
                if rule.email.is_some() {
                    intents.push(Self::email(rule, EmailKind::Recovery, value));
                }
            }
            rule.state.recovery_notified = true;
        }

        intents
    }

    fn email(rule: &AlarmRule, kind: EmailKind, value: f64) -> NotificationIntent {
        NotificationIntent::SendEmail {
            rule_id: rule.id,
            kind,
            sensor: rule.sensor,
            value,
            threshold: rule.threshold,
            template: rule.email.as_ref().and_then(|email| email.template.clone()),
        }
    }
}

/// Periodic evaluation driver: pulls the latest reading, applies the
/// freshness contract and forwards the engine's intents to the sink.
pub struct AlarmService {
    engine: Mutex<AlarmEngine>,
    alarm: Alarm,
    readings: Arc<ReadingRepository>,
    rule_store: RuleStore,
    notifier: Arc<dyn Notifier>,
}

impl AlarmService {
    pub fn new(
        alarm: Alarm,
        rule_store: RuleStore,
        readings: Arc<ReadingRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let rules = match rule_store.load() {
            Ok(rules) => rules,
            Err(e) => {
                tracing::error!("failed to load alarm rules, starting empty: {e}");
                Vec::new()
            }
        };
        tracing::info!(count = rules.len(), "alarm rules loaded");

        let cooldown = Duration::seconds(alarm.cooldown_secs);

        Self {
            engine: Mutex::new(AlarmEngine::new(rules, cooldown)),
            alarm,
            readings,
            rule_store,
            notifier,
        }
    }

    /// Spawns the evaluation tick; the returned sender stops it. Stop latency
    /// is bounded by the tick interval.
    pub fn start(self: Arc<Self>) -> oneshot::Sender<()> {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let service = self;

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(service.alarm.tick_secs));

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        tracing::info!("alarm evaluation stopped");
                        break;
                    }
                    _ = interval.tick() => service.tick().await,
                }
            }
        });

        stop_tx
    }

    /// One evaluation pass over the latest reading.
    pub async fn tick(&self) {
        let now = OffsetDateTime::now_utc();
        let latest = match self.readings.find_latest().await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!("latest-reading query failed: {e}");
                None
            }
        };

        let mut engine = self.engine.lock().await;
        let intents = match latest {
            Some(reading)
                if now - reading.time <= Duration::seconds(self.alarm.freshness_secs) =>
            {
                engine.evaluate(&reading, now)
            }
            // No row, a stale one, or a failed query: silence rather than
            // alert on unknown state.
            _ => engine.silence_all(),
        };

        self.flush(engine, intents).await;
    }

    pub async fn add_rule(&self, rule: AlarmRule) {
        let mut engine = self.engine.lock().await;
        engine.add_rule(rule);
        self.flush(engine, Vec::new()).await;
    }

    pub async fn remove_rule(&self, id: Uuid) {
        let mut engine = self.engine.lock().await;
        let intents = engine.remove_rule(id);
        self.flush(engine, intents).await;
    }

    pub async fn set_rule_enabled(&self, id: Uuid, enabled: bool) {
        let mut engine = self.engine.lock().await;
        let intents = engine.set_enabled(id, enabled);
        self.flush(engine, intents).await;
    }

    pub async fn rules(&self) -> Vec<AlarmRule> {
        self.engine.lock().await.rules().to_vec()
    }

    /// Persists the rule list when it changed, then delivers intents with the
    /// engine lock released. Persistence failures never block evaluation.
    async fn flush(&self, mut engine: MutexGuard<'_, AlarmEngine>, intents: Vec<NotificationIntent>) {
        if engine.take_dirty() {
            if let Err(e) = self.rule_store.save(engine.rules()) {
                tracing::warn!("failed to persist alarm rules: {e}");
            }
        }
        drop(engine);

        for intent in intents {
            self.notifier.notify(intent).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use airwatch_api::{Measurement, SensorKind};
    use async_trait::async_trait;

    use crate::configs::{Database, SchemaManager, Storage};
    use crate::models::Comparison;

    use super::*;

    const COOLDOWN: Duration = Duration::seconds(300);

    fn t0() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_750_000_000).unwrap()
    }

    fn reading(sensor: SensorKind, value: f64, time: OffsetDateTime) -> Reading {
        let mut measurement = Measurement {
            temperature: 20.0,
            humidity: 50.0,
            pm25: 10,
            noise: 40,
        };
        match sensor {
            SensorKind::Temperature => measurement.temperature = value as f32,
            SensorKind::Humidity => measurement.humidity = value as f32,
            SensorKind::Pm25 => measurement.pm25 = value as u16,
            SensorKind::Noise => measurement.noise = value as u8,
        }
        Reading::from_measurement(&measurement, time)
    }

    fn engine_with(rule: AlarmRule) -> AlarmEngine {
        AlarmEngine::new(vec![rule], COOLDOWN)
    }

    fn starts(intents: &[NotificationIntent]) -> usize {
        intents
            .iter()
            .filter(|intent| matches!(intent, NotificationIntent::StartSound { .. }))
            .count()
    }

    fn stops(intents: &[NotificationIntent]) -> usize {
        intents
            .iter()
            .filter(|intent| matches!(intent, NotificationIntent::StopSound { .. }))
            .count()
    }

    fn emails(intents: &[NotificationIntent], wanted: EmailKind) -> usize {
        intents
            .iter()
            .filter(
                |intent| matches!(intent, NotificationIntent::SendEmail { kind, .. } if *kind == wanted),
            )
            .count()
    }

    #[test]
    fn hysteresis_fires_once_per_transition() {
        let rule = AlarmRule::new(SensorKind::Temperature, Comparison::Above, 30.0)
            .with_sound(None)
            .with_email(None);
        let mut engine = engine_with(rule);

        let tick = |engine: &mut AlarmEngine, value: f64, at: i64| {
            engine.evaluate(
                &reading(SensorKind::Temperature, value, t0() + Duration::seconds(at)),
                t0() + Duration::seconds(at),
            )
        };

        let first = tick(&mut engine, 29.0, 0);
        assert!(first.is_empty());

        let second = tick(&mut engine, 31.0, 2);
        assert_eq!(starts(&second), 1);
        assert_eq!(emails(&second, EmailKind::Alert), 1);

        // Still over threshold: hysteresis, no new start.
        let third = tick(&mut engine, 31.0, 4);
        assert_eq!(starts(&third), 0);

        let fourth = tick(&mut engine, 29.0, 6);
        assert_eq!(stops(&fourth), 1);
        assert_eq!(emails(&fourth, EmailKind::Recovery), 1);

        // Back to normal stays quiet.
        let fifth = tick(&mut engine, 29.0, 8);
        assert!(fifth.is_empty());
    }

    #[test]
    fn equality_never_triggers() {
        let rule = AlarmRule::new(SensorKind::Temperature, Comparison::Above, 30.0)
            .with_sound(None);
        let mut engine = engine_with(rule);

        let intents = engine.evaluate(&reading(SensorKind::Temperature, 30.0, t0()), t0());
        assert!(intents.is_empty());
        assert!(!engine.rules()[0].state.triggered);
    }

    #[test]
    fn cooldown_limits_repeat_emails() {
        let rule =
            AlarmRule::new(SensorKind::Pm25, Comparison::Above, 100.0).with_email(None);
        let mut engine = engine_with(rule);

        // A sustained breach every 2 s for 10 minutes.
        let mut alert_emails = 0;
        for elapsed in (0..600).step_by(2) {
            let now = t0() + Duration::seconds(elapsed);
            let intents = engine.evaluate(&reading(SensorKind::Pm25, 120.0, now), now);
            alert_emails += emails(&intents, EmailKind::Alert);
        }

        // Once at the transition, once after the 300 s cooldown.
        assert_eq!(alert_emails, 2);
    }

    #[test]
    fn cooldown_survives_a_restart() {
        let mut rule =
            AlarmRule::new(SensorKind::Pm25, Comparison::Above, 100.0).with_email(None);
        rule.state.triggered = true;
        rule.state.recovery_notified = false;
        rule.state.last_notification = Some(t0());

        // Same state a reload from disk would restore.
        let mut engine = engine_with(rule);
        let now = t0() + Duration::seconds(2);
        let intents = engine.evaluate(&reading(SensorKind::Pm25, 120.0, now), now);

        assert!(intents.is_empty());
    }

    #[test]
    fn pm25_example_schedule() {
        // rule {sensor: pm25, comparison: >, threshold: 100, channels: [email]}
        let rule =
            AlarmRule::new(SensorKind::Pm25, Comparison::Above, 100.0).with_email(None);
        let mut engine = engine_with(rule);

        let stream = [80.0, 80.0, 120.0, 120.0, 80.0];
        let mut per_tick = Vec::new();
        for (index, value) in stream.iter().enumerate() {
            let now = t0() + Duration::seconds(2 * index as i64);
            per_tick.push(engine.evaluate(&reading(SensorKind::Pm25, *value, now), now));
        }

        assert!(per_tick[0].is_empty());
        assert!(per_tick[1].is_empty());
        assert_eq!(emails(&per_tick[2], EmailKind::Alert), 1);
        assert!(per_tick[3].is_empty());
        assert_eq!(stops(&per_tick[4]), 1);
        assert_eq!(emails(&per_tick[4], EmailKind::Recovery), 1);
    }

    #[test]
    fn stop_is_emitted_even_without_a_sound_channel() {
        let rule =
            AlarmRule::new(SensorKind::Noise, Comparison::Above, 70.0).with_email(None);
        let mut engine = engine_with(rule);

        engine.evaluate(&reading(SensorKind::Noise, 80.0, t0()), t0());
        let recovered = engine.evaluate(
            &reading(SensorKind::Noise, 60.0, t0() + Duration::seconds(2)),
            t0() + Duration::seconds(2),
        );

        assert_eq!(stops(&recovered), 1);
    }

    #[test]
    fn silence_resets_to_baseline_without_recovery_email() {
        let rule = AlarmRule::new(SensorKind::Pm25, Comparison::Above, 100.0)
            .with_sound(None)
            .with_email(None);
        let mut engine = engine_with(rule);

        engine.evaluate(&reading(SensorKind::Pm25, 120.0, t0()), t0());

        let silenced = engine.silence_all();
        assert_eq!(stops(&silenced), 1);
        assert_eq!(emails(&silenced, EmailKind::Recovery), 0);
        assert!(!engine.rules()[0].state.triggered);
        assert!(engine.rules()[0].state.recovery_notified);

        // Fresh data returns with the breach still present: full re-trigger.
        let now = t0() + Duration::seconds(400);
        let refired = engine.evaluate(&reading(SensorKind::Pm25, 120.0, now), now);
        assert_eq!(starts(&refired), 1);

        // Repeated silencing stays idempotent.
        engine.silence_all();
        assert!(engine.silence_all().is_empty());
    }

    #[test]
    fn disable_settles_and_reenable_refires() {
        let rule = AlarmRule::new(SensorKind::Humidity, Comparison::Below, 30.0)
            .with_sound(None);
        let id = rule.id;
        let mut engine = engine_with(rule);

        engine.evaluate(&reading(SensorKind::Humidity, 20.0, t0()), t0());
        assert!(engine.rules()[0].state.triggered);

        let disabled = engine.set_enabled(id, false);
        assert_eq!(stops(&disabled), 1);
        assert!(!engine.rules()[0].state.triggered);

        // Disabled rules are skipped entirely.
        let while_disabled = engine.evaluate(
            &reading(SensorKind::Humidity, 20.0, t0() + Duration::seconds(2)),
            t0() + Duration::seconds(2),
        );
        assert!(while_disabled.is_empty());

        assert!(engine.set_enabled(id, true).is_empty());
        let now = t0() + Duration::seconds(4);
        let refired = engine.evaluate(&reading(SensorKind::Humidity, 20.0, now), now);
        assert_eq!(starts(&refired), 1);
    }

    #[test]
    fn remove_while_triggered_stops_the_alert() {
        let rule = AlarmRule::new(SensorKind::Temperature, Comparison::Above, 30.0)
            .with_sound(None);
        let id = rule.id;
        let mut engine = engine_with(rule);

        engine.evaluate(&reading(SensorKind::Temperature, 35.0, t0()), t0());
        let removed = engine.remove_rule(id);

        assert_eq!(stops(&removed), 1);
        assert!(engine.rules().is_empty());

        // Removing an unknown id is a no-op.
        assert!(engine.remove_rule(id).is_empty());
    }

    #[test]
    fn state_changes_mark_the_engine_dirty() {
        let rule = AlarmRule::new(SensorKind::Temperature, Comparison::Above, 30.0);
        let mut engine = engine_with(rule);
        assert!(!engine.take_dirty());

        // A trigger with no channels still changes state.
        engine.evaluate(&reading(SensorKind::Temperature, 35.0, t0()), t0());
        assert!(engine.take_dirty());
        assert!(!engine.take_dirty());

        // A quiet tick does not.
        engine.evaluate(
            &reading(SensorKind::Temperature, 35.0, t0() + Duration::seconds(2)),
            t0() + Duration::seconds(2),
        );
        assert!(!engine.take_dirty());
    }

    struct CaptureNotifier(std::sync::Mutex<Vec<NotificationIntent>>);

    #[async_trait]
    impl Notifier for CaptureNotifier {
        async fn notify(&self, intent: NotificationIntent) {
            self.0.lock().unwrap().push(intent);
        }
    }

    async fn setup_service() -> (Arc<AlarmService>, Arc<ReadingRepository>, Arc<CaptureNotifier>) {
        let storage = Arc::new(
            Storage::new(
                Database {
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );
        let readings = Arc::new(ReadingRepository::new(storage));
        let notifier = Arc::new(CaptureNotifier(std::sync::Mutex::new(Vec::new())));

        let rules_path =
            std::env::temp_dir().join(format!("airwatch-rules-{}.json", Uuid::new_v4()));
        let service = Arc::new(AlarmService::new(
            Alarm {
                tick_secs: 2,
                freshness_secs: 3,
                cooldown_secs: 300,
                rules_path: rules_path.to_string_lossy().into_owned(),
            },
            RuleStore::new(rules_path),
            readings.clone(),
            notifier.clone(),
        ));

        (service, readings, notifier)
    }

    #[tokio::test]
    async fn test_stale_reading_never_starts_an_alert() {
        let (service, readings, notifier) = setup_service().await;
        service
            .add_rule(
                AlarmRule::new(SensorKind::Pm25, Comparison::Above, 100.0)
                    .with_sound(None)
                    .with_email(None),
            )
            .await;

        // Over threshold, but five seconds old.
        let stale_time = OffsetDateTime::now_utc() - Duration::seconds(5);
        readings
            .append(&reading(SensorKind::Pm25, 120.0, stale_time))
            .await
            .unwrap();

        service.tick().await;
        assert!(notifier.0.lock().unwrap().is_empty());

        // The same value within the freshness window does alert.
        readings
            .append(&reading(SensorKind::Pm25, 120.0, OffsetDateTime::now_utc()))
            .await
            .unwrap();
        service.tick().await;

        let intents = notifier.0.lock().unwrap();
        assert_eq!(starts(&intents), 1);
        assert_eq!(emails(&intents, EmailKind::Alert), 1);

        std::fs::remove_file(service.rule_store.path()).ok();
    }

    #[tokio::test]
    async fn test_empty_log_silences_a_triggered_rule() {
        let (service, readings, notifier) = setup_service().await;
        service
            .add_rule(AlarmRule::new(SensorKind::Noise, Comparison::Above, 70.0).with_sound(None))
            .await;

        readings
            .append(&reading(SensorKind::Noise, 85.0, OffsetDateTime::now_utc()))
            .await
            .unwrap();
        service.tick().await;
        assert_eq!(starts(&notifier.0.lock().unwrap()), 1);

        // The log is pruned away: no data at all must silence, never re-start.
        readings
            .delete_before(OffsetDateTime::now_utc() + Duration::seconds(1))
            .await
            .unwrap();
        service.tick().await;

        let intents = notifier.0.lock().unwrap();
        assert_eq!(stops(&intents), 1);

        std::fs::remove_file(service.rule_store.path()).ok();
    }

    #[tokio::test]
    async fn test_mutations_rewrite_the_rule_file() {
        let (service, _readings, _notifier) = setup_service().await;

        let rule = AlarmRule::new(SensorKind::Temperature, Comparison::Above, 30.0);
        let id = rule.id;
        service.add_rule(rule).await;

        let persisted = service.rule_store.load().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, id);

        service.remove_rule(id).await;
        assert!(service.rule_store.load().unwrap().is_empty());

        std::fs::remove_file(service.rule_store.path()).ok();
    }
}
