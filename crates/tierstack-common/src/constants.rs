//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Application name used in CLI output and state files.
pub const APP_NAME: &str = "tierstack";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tstk";

/// Region used when neither configuration nor flags name one.
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// File name of the realized-outputs state index.
pub const STATE_FILE_NAME: &str = "state.json";

/// Environment variable carrying the data-store identifier to the backend.
pub const ENV_TABLE_NAME: &str = "TODOTABLE_NAME";

/// Environment variable carrying the backend's discoverable name to the frontend.
pub const ENV_BACKEND_SERVICE_NAME: &str = "BACKEND_SERVICE_NAME";

/// Environment variable carrying the discovery namespace FQDN to the frontend.
pub const ENV_SERVICE_DISCOVERY_ENDPOINT: &str = "SERVICE_DISCOVERY_ENDPOINT";

/// Service principal allowed to assume task and execution roles.
pub const TASK_SERVICE_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Managed policy attached to the shared task-execution role.
pub const TASK_EXECUTION_MANAGED_POLICY: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// Action namespace of the keyed data store.
pub const DATA_STORE_ACTION_PREFIX: &str = "dynamodb:";

/// Default base directory when no home directory is available.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/tierstack";

/// Returns the data directory, preferring `$HOME/.tierstack`,
/// falling back to `/var/lib/tierstack`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".tierstack");
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default state file path.
pub fn default_state_file() -> PathBuf {
    data_dir().join(STATE_FILE_NAME)
}
