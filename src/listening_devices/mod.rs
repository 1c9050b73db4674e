//! Registration of the playback setups answers are keyed by.
//!
//! A listener registers once, keeps the returned id and sends it with every
//! answer. The option lists are closed sets so results can be grouped.

use crate::survey_store::{
    DeviceStore, ListeningDevice, NewListeningDevice, CONNECTION_TYPES, DEVICE_TYPES, PRICE_TIERS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub device_type: Option<String>,
    pub connection_type: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub price_tier: Option<String>,
}

/// The values a registration may pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOptions {
    pub device_types: &'static [&'static str],
    pub connection_types: &'static [&'static str],
    pub price_tiers: &'static [&'static str],
}

pub fn device_options() -> DeviceOptions {
    DeviceOptions {
        device_types: DEVICE_TYPES,
        connection_types: CONNECTION_TYPES,
        price_tiers: PRICE_TIERS,
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn one_of(value: &str, allowed: &[&str], message: &str) -> Result<(), DeviceError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(DeviceError::BadRequest(message.to_string()))
    }
}

pub fn register_device<S: DeviceStore + ?Sized>(
    store: &S,
    registration: &DeviceRegistration,
) -> Result<ListeningDevice, DeviceError> {
    let (Some(device_type), Some(connection_type), Some(brand), Some(model), Some(price_tier)) = (
        required(&registration.device_type),
        required(&registration.connection_type),
        required(&registration.brand),
        required(&registration.model),
        required(&registration.price_tier),
    ) else {
        return Err(DeviceError::BadRequest("All fields are required".to_string()));
    };

    one_of(device_type, DEVICE_TYPES, "Invalid device type")?;
    one_of(connection_type, CONNECTION_TYPES, "Invalid connection type")?;
    one_of(price_tier, PRICE_TIERS, "Invalid price tier")?;

    let device = store.register_device(&NewListeningDevice {
        device_type: device_type.to_string(),
        connection_type: connection_type.to_string(),
        brand: brand.to_string(),
        model: model.to_string(),
        price_tier: price_tier.to_string(),
    })?;
    info!(
        "Registered {} device {} ({} {})",
        device.device_type, device.id, device.brand, device.model
    );
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey_store::SqliteSurveyStore;

    fn registration() -> DeviceRegistration {
        DeviceRegistration {
            device_type: Some("headphones".to_string()),
            connection_type: Some("wired".to_string()),
            brand: Some(" Sennheiser ".to_string()),
            model: Some("HD 600".to_string()),
            price_tier: Some("high_end".to_string()),
        }
    }

    #[test]
    fn registers_and_trims_free_text() {
        let store = SqliteSurveyStore::in_memory().unwrap();
        let device = register_device(&store, &registration()).unwrap();

        assert_eq!(device.brand, "Sennheiser");
        assert_eq!(device.price_tier, "high_end");
        assert_eq!(store.get_device(&device.id).unwrap(), Some(device));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let store = SqliteSurveyStore::in_memory().unwrap();
        let mut body = registration();
        body.model = Some("   ".to_string());
        let err = register_device(&store, &body).unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");

        let mut body = registration();
        body.device_type = None;
        assert!(matches!(
            register_device(&store, &body),
            Err(DeviceError::BadRequest(_))
        ));
    }

    #[test]
    fn values_outside_the_option_lists_are_rejected() {
        let store = SqliteSurveyStore::in_memory().unwrap();

        let mut body = registration();
        body.device_type = Some("gramophone".to_string());
        assert_eq!(
            register_device(&store, &body).unwrap_err().to_string(),
            "Invalid device type"
        );

        let mut body = registration();
        body.connection_type = Some("optical".to_string());
        assert_eq!(
            register_device(&store, &body).unwrap_err().to_string(),
            "Invalid connection type"
        );

        let mut body = registration();
        body.price_tier = Some("priceless".to_string());
        assert_eq!(
            register_device(&store, &body).unwrap_err().to_string(),
            "Invalid price tier"
        );
    }

    #[test]
    fn options_list_every_allowed_value() {
        let options = device_options();
        assert!(options.device_types.contains(&"iem"));
        assert!(options.connection_types.contains(&"bluetooth"));
        assert_eq!(options.price_tiers.len(), PRICE_TIERS.len());
    }
}
