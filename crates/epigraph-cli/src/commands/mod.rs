//! Command implementations.

pub mod calibration;
pub mod detect;
pub mod init;
pub mod inspect;
pub mod resolve;
pub mod snapshot;

pub use self::calibration::{execute_calibration, execute_outcome};
pub use self::detect::{execute_detect, execute_watch};
pub use self::init::execute_init;
pub use self::inspect::{execute_claims, execute_health, execute_stats};
pub use self::resolve::{execute_plan, execute_resolve, execute_resolve_contradiction};
pub use self::snapshot::{execute_export, execute_import};
