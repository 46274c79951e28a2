use super::MailboxError;
use crate::config::Mailbox as MailboxCfg;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};

/// One-shot watering instruction relayed from the dashboard to the field device.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WateringCommand {
    pub watering: bool,
    /// seconds
    pub time: u32,
}

impl WateringCommand {
    pub fn new(watering: bool, time: u32) -> Self {
        Self { watering, time }
    }

    /// Builds a command from an untyped request body.
    ///
    /// `watering` has to be a JSON boolean and `time` a JSON number holding a whole
    /// number of seconds inside the configured bounds.
    pub fn from_json(body: &Value, cfg: &MailboxCfg) -> Result<Self, MailboxError> {
        let watering = body
            .get("watering")
            .and_then(Value::as_bool)
            .ok_or_else(|| MailboxError::Invalid("`watering` must be a boolean".to_owned()))?;

        let time = body
            .get("time")
            .filter(|time| time.is_number())
            .ok_or_else(|| MailboxError::Invalid("`time` must be a number".to_owned()))?;
        let secs = time
            .as_u64()
            .or_else(|| time.as_f64().filter(|f| *f >= 0. && f.fract() == 0.).map(|f| f as u64))
            .ok_or_else(|| MailboxError::Invalid("`time` must be a whole number of seconds".to_owned()))?;
        let secs = u32::try_from(secs).unwrap_or(u32::MAX);

        let cmd = Self::new(watering, secs);
        cmd.validate(cfg)?;
        Ok(cmd)
    }

    pub fn validate(&self, cfg: &MailboxCfg) -> Result<(), MailboxError> {
        if self.time < cfg.min_time_secs || self.time > cfg.max_time_secs {
            return Err(MailboxError::Invalid(format!(
                "`time` must be between {} and {} seconds",
                cfg.min_time_secs, cfg.max_time_secs
            )));
        }
        Ok(())
    }
}

impl Display for WateringCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.watering { "water" } else { "stop" };
        write!(f, "{} for {}s", action, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg() -> MailboxCfg {
        MailboxCfg { min_time_secs: 1, max_time_secs: 30 }
    }

    #[test]
    fn parses_well_formed_body() {
        let cmd = WateringCommand::from_json(&json!({"watering": true, "time": 10}), &cfg()).unwrap();
        assert_eq!(cmd, WateringCommand::new(true, 10));

        // integral floats are what a browser sends for `Number` values
        let cmd = WateringCommand::from_json(&json!({"watering": false, "time": 5.0}), &cfg()).unwrap();
        assert_eq!(cmd, WateringCommand::new(false, 5));
    }

    #[test]
    fn rejects_missing_or_mistyped_fields() {
        let bodies = [
            json!({"time": 10}),
            json!({"watering": true}),
            json!({"watering": "yes", "time": 10}),
            json!({"watering": true, "time": "10"}),
            json!({"watering": 1, "time": 10}),
            json!([true, 10]),
            json!(null),
        ];
        for body in bodies {
            let res = WateringCommand::from_json(&body, &cfg());
            assert!(matches!(res, Err(MailboxError::Invalid(_))), "{body} should be rejected");
        }
    }

    #[test]
    fn rejects_out_of_range_durations() {
        for time in [json!(0), json!(31), json!(-3), json!(2.5), json!(1e12)] {
            let body = json!({"watering": true, "time": time});
            assert!(WateringCommand::from_json(&body, &cfg()).is_err(), "{body} should be rejected");
        }
        let body = json!({"watering": true, "time": 30});
        assert!(WateringCommand::from_json(&body, &cfg()).is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(WateringCommand::new(true, 12).to_string(), "water for 12s");
    }
}
