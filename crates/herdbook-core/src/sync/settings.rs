//! Remote farm-settings parsing and pull-first arbitration.

use serde::Deserialize;

use crate::error::Result;
use crate::models::{
    FarmContact, FarmSettings, BREEDING_ALERT_DAYS_DEFAULT, GESTATION_DAYS_DEFAULT,
    WEANING_AGE_DAYS_DEFAULT, WITHDRAWAL_ALERT_DAYS_DEFAULT,
};
use crate::remote::RemoteDocument;
use crate::util::normalize_text_option;

/// Lenient wire form of the settings document. Every field is optional so
/// documents written by older app versions still parse; missing values
/// fall back to defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteSettingsDoc {
    #[serde(default)]
    farm_name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    contacts: Option<Vec<FarmContact>>,
    /// Legacy single-contact fields, promoted into `contacts` when the
    /// structured list is absent
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    gestation_length_days: Option<u32>,
    #[serde(default)]
    weaning_age_days: Option<u32>,
    #[serde(default)]
    breeding_alert_days: Option<u32>,
    #[serde(default)]
    withdrawal_alert_days: Option<u32>,
    #[serde(default)]
    updated_at: Option<i64>,
}

impl RemoteSettingsDoc {
    fn into_settings(self) -> FarmSettings {
        let farm_name = normalize_text_option(self.farm_name).unwrap_or_default();

        let contacts = match self.contacts {
            Some(contacts) => contacts,
            None => legacy_contact(&farm_name, self.phone, self.email)
                .into_iter()
                .collect(),
        };

        FarmSettings {
            farm_name,
            address: normalize_text_option(self.address),
            contacts,
            gestation_length_days: self.gestation_length_days.unwrap_or(GESTATION_DAYS_DEFAULT),
            weaning_age_days: self.weaning_age_days.unwrap_or(WEANING_AGE_DAYS_DEFAULT),
            breeding_alert_days: self.breeding_alert_days.unwrap_or(BREEDING_ALERT_DAYS_DEFAULT),
            withdrawal_alert_days: self
                .withdrawal_alert_days
                .unwrap_or(WITHDRAWAL_ALERT_DAYS_DEFAULT),
            updated_at: self.updated_at.unwrap_or(0),
        }
        .clamped()
    }
}

fn legacy_contact(
    farm_name: &str,
    phone: Option<String>,
    email: Option<String>,
) -> Option<FarmContact> {
    let phone = normalize_text_option(phone);
    let email = normalize_text_option(email);
    if phone.is_none() && email.is_none() {
        return None;
    }

    let name = if farm_name.is_empty() {
        "Farm contact".to_string()
    } else {
        farm_name.to_string()
    };
    Some(FarmContact { name, phone, email })
}

/// Parse the remote settings document, filling defaults and clamping
/// policy values.
pub(crate) fn settings_from_document(document: &RemoteDocument) -> Result<FarmSettings> {
    let doc: RemoteSettingsDoc =
        serde_json::from_value(serde_json::Value::Object(document.clone()))?;
    Ok(doc.into_settings())
}

/// Decide whether the pulled remote settings replace the local ones.
///
/// Remote wins when its modification time is at least the local one; a
/// device that edited settings while offline keeps (and later uploads)
/// its newer copy.
pub(crate) fn choose_remote(
    local: Option<&FarmSettings>,
    remote: FarmSettings,
    remote_modified_at: i64,
) -> Option<FarmSettings> {
    match local {
        None => Some(remote),
        Some(local) if remote_modified_at >= local.updated_at => Some(remote),
        Some(_) => None,
    }
}
