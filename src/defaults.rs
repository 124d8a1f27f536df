// Built-in configurations, used when no configuration file or resource is found.

// `tracing-subscriber` filter directives.
pub(crate) const TRACING_FILTER: &str = "info";

// Log specification in toml format.
pub(crate) const LOGSPEC_TOML: &str = r#"# Plain output with level, everything at info
global_level = "info"
"#;

// Properties for the stderr logger.
pub(crate) const STDERR_PROPERTIES: &str = "\
## Plain output with level, to stderr
handlers = stderr
.level = INFO
";
