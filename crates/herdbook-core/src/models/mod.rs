//! Data models for Herdbook

mod animal;
mod breeding;
mod health;
mod herd;
mod photo;
mod settings;
mod weight;

pub use animal::{Animal, AnimalId, AnimalStatus, Sex};
pub use breeding::{
    BreedingEvent, BreedingEventId, BreedingMethod, CalvingEvent, CalvingEventId, PregCheckResult,
};
pub use health::{HealthEvent, HealthEventId, HealthEventType};
pub use herd::{Herd, HerdAssignment, HerdAssignmentId, HerdId};
pub use photo::{Photo, PhotoAngle, PhotoId};
pub use settings::{
    FarmContact, FarmSettings, BREEDING_ALERT_DAYS_DEFAULT, GESTATION_DAYS_DEFAULT,
    WEANING_AGE_DAYS_DEFAULT, WITHDRAWAL_ALERT_DAYS_DEFAULT,
};
pub use weight::{WeightRecord, WeightRecordId};
