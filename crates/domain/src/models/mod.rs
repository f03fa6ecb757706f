//! Domain models for RizAlert.

pub mod alerts_view;
pub mod configuration;
pub mod dashboard;
pub mod emergency;
pub mod emergency_alert;
pub mod lenient;
pub mod notification;
pub mod profile;
pub mod recent_ids;
pub mod report;
pub mod session;
pub mod siren;
pub mod user;

pub use configuration::EmergencySettings;
pub use emergency::{CaseType, Emergency, EmergencyStatus, ResponderRecord};
pub use emergency_alert::{AlertList, EmergencyAlert, PersonResponse};
pub use notification::Notification;
pub use recent_ids::RecentIdSet;
pub use session::{AdminSession, AuthState, SessionPrincipal};
pub use siren::{SirenAction, SirenStates, SirenType};
pub use user::{User, UserRole, UserStatus};
