// Models module

pub mod availability;

// Re-export commonly used types
pub use availability::{
    AvailabilityMap, AvailabilityRecord, AvailabilityUpdate, UpdateAvailabilityRequest,
    UpdateAvailabilityResponse,
};
