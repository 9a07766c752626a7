pub(crate) const SHOW_SERVER_VERSION_QUERY: &str = "SELECT sqlite_version()";

// Pseudo statements used to label connection-level failures.
pub(crate) const CONNECT_SQL: &str = "CONNECT sqlite";
pub(crate) const CLOSE_SQL: &str = "CLOSE sqlite";
