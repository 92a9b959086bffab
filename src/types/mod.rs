// ABOUTME: Type-safe names and validated domain types.
// ABOUTME: Uses phantom types to keep platform object names apart at compile time.

mod app_id;
mod id;
mod image_ref;
mod labels;

pub use app_id::{AppId, AppIdError, AppName, MAX_APP_NAME_LEN};
pub use id::{BuildName, PodName, WorkloadName};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use labels::{APP_ID_LABEL, DEPLOYMENT_ID_LABEL, LabelParseError, Labels, Selector};
