pub mod alarm_rule;
pub mod reading;

pub use alarm_rule::{AlarmRule, Comparison, EmailChannel, RuleState, SoundChannel};
pub use reading::{Reading, ReadingTable};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;
}
