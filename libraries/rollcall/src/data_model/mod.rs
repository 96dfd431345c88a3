#[path = "1-record.rs"]
mod record;

#[path = "2-schema.rs"]
mod schema;

#[path = "3-projection.rs"]
mod projection;

pub use record::*;
pub use schema::*;

pub const SETTINGS_TYPE: &str = "settings";
pub const ATTENDANCE_TYPE: &str = "attendance";
pub const DEFAULT_SETTINGS_ID: &str = "default_settings";
