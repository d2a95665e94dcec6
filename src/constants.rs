// -
// Registry key defaults

/// Holds the maintenance page model; absent means "no maintenance"
pub(crate) const DEFAULT_MAINTENANCE_KEY: &str = "/config/_global/maintenance";

/// Per-service proxy buffering override, `<prefix>/<service name>`
pub(crate) const DEFAULT_BUFFERING_PREFIX: &str = "/config/nginx/buffering";

/// Dogu state, `<source>/<state node>`
pub(crate) const DEFAULT_STATE_SOURCE: &str = "/state";

/// Support category control keys
pub(crate) const DEFAULT_BLOCK_SUPPORT_CATEGORY_KEY: &str =
    "/config/_global/block_warpmenu_support_category";
pub(crate) const DEFAULT_DISABLED_SUPPORT_ENTRIES_KEY: &str =
    "/config/_global/disabled_warpmenu_support_entries";
pub(crate) const DEFAULT_ALLOWED_SUPPORT_ENTRIES_KEY: &str =
    "/config/_global/allowed_warpmenu_support_entries";

// -
// Model values

/// State assigned when the state lookup of a service fails
pub const STATE_NOT_READY: &str = "not ready";

pub const PROXY_BUFFERING_ON: &str = "on";
pub const PROXY_BUFFERING_OFF: &str = "off";

pub(crate) const DEFAULT_SUPPORT_CATEGORY: &str = "Support";

/// Pointer to the active version below a versioned registration
pub(crate) const CURRENT_VERSION_KEY: &str = "current";

// -
// Artifact file modes

pub(crate) const DEFAULT_FILE_MODE: u32 = 0o644;
pub(crate) const DEFAULT_MENU_FILE_MODE: u32 = 0o755;
