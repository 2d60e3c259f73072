//! Farm settings model

use serde::{Deserialize, Serialize};

/// Gestation length bounds and default, in days (cattle).
pub const GESTATION_DAYS_DEFAULT: u32 = 283;
const GESTATION_DAYS_RANGE: (u32, u32) = (260, 310);

/// Weaning age bounds and default, in days.
pub const WEANING_AGE_DAYS_DEFAULT: u32 = 205;
const WEANING_AGE_DAYS_RANGE: (u32, u32) = (60, 400);

/// Breeding/pregnancy-check alert window bounds and default, in days.
pub const BREEDING_ALERT_DAYS_DEFAULT: u32 = 21;
const BREEDING_ALERT_DAYS_RANGE: (u32, u32) = (1, 90);

/// Withdrawal-period alert window bounds and default, in days.
pub const WITHDRAWAL_ALERT_DAYS_DEFAULT: u32 = 7;
const WITHDRAWAL_ALERT_DAYS_RANGE: (u32, u32) = (1, 60);

/// A person reachable about the farm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmContact {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Per-farm settings (a singleton record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmSettings {
    pub farm_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contacts: Vec<FarmContact>,
    /// Expected gestation length in days
    pub gestation_length_days: u32,
    /// Target weaning age in days
    pub weaning_age_days: u32,
    /// Days after service to alert for a pregnancy check
    pub breeding_alert_days: u32,
    /// Days before a withdrawal period ends to start alerting
    pub withdrawal_alert_days: u32,
    /// Last update timestamp (Unix ms), compared during sync arbitration
    pub updated_at: i64,
}

impl Default for FarmSettings {
    fn default() -> Self {
        Self {
            farm_name: String::new(),
            address: None,
            contacts: Vec::new(),
            gestation_length_days: GESTATION_DAYS_DEFAULT,
            weaning_age_days: WEANING_AGE_DAYS_DEFAULT,
            breeding_alert_days: BREEDING_ALERT_DAYS_DEFAULT,
            withdrawal_alert_days: WITHDRAWAL_ALERT_DAYS_DEFAULT,
            updated_at: 0,
        }
    }
}

impl FarmSettings {
    /// Clamp every policy value into its documented range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.gestation_length_days = clamp_policy(self.gestation_length_days, GESTATION_DAYS_RANGE);
        self.weaning_age_days = clamp_policy(self.weaning_age_days, WEANING_AGE_DAYS_RANGE);
        self.breeding_alert_days = clamp_policy(self.breeding_alert_days, BREEDING_ALERT_DAYS_RANGE);
        self.withdrawal_alert_days =
            clamp_policy(self.withdrawal_alert_days, WITHDRAWAL_ALERT_DAYS_RANGE);
        self
    }
}

const fn clamp_policy(value: u32, (min, max): (u32, u32)) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = FarmSettings::default();
        assert_eq!(settings.gestation_length_days, 283);
        assert_eq!(settings.weaning_age_days, 205);
        assert!(settings.contacts.is_empty());
    }

    #[test]
    fn test_clamped_pins_out_of_range_values() {
        let settings = FarmSettings {
            gestation_length_days: 10,
            weaning_age_days: 9999,
            breeding_alert_days: 0,
            withdrawal_alert_days: 61,
            ..FarmSettings::default()
        }
        .clamped();

        assert_eq!(settings.gestation_length_days, 260);
        assert_eq!(settings.weaning_age_days, 400);
        assert_eq!(settings.breeding_alert_days, 1);
        assert_eq!(settings.withdrawal_alert_days, 60);
    }

    #[test]
    fn test_clamped_keeps_in_range_values() {
        let settings = FarmSettings::default().clamped();
        assert_eq!(settings.gestation_length_days, GESTATION_DAYS_DEFAULT);
        assert_eq!(settings.withdrawal_alert_days, WITHDRAWAL_ALERT_DAYS_DEFAULT);
    }
}
