use serde::de::DeserializeOwned;

use crate::environment::Environment;

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Base configuration file loaded for all environments.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
///
/// Example: `APP_BATCH__MAX_SIZE` sets the `batch.max_size` field.
const ENV_SEPARATOR: &str = "__";

/// Loads layered configuration from YAML files and environment variables.
///
/// Sources, later ones overriding earlier ones:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`
/// 3. environment variables prefixed with `APP`
///
/// Both files are optional so the service can be configured purely through its environment,
/// which is how it runs inside a function runtime.
pub fn load_config<T>(environment: Environment) -> Result<T, rust_cli_config::ConfigError>
where
    T: DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(|err| {
        rust_cli_config::ConfigError::Message(format!(
            "failed to determine the current directory: {err}"
        ))
    })?;
    let configuration_directory = base_path.join(CONFIGURATION_DIR);
    let environment_filename = format!("{environment}.yaml");

    let environment_source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    let settings = rust_cli_config::Config::builder()
        .add_source(
            rust_cli_config::File::from(configuration_directory.join(BASE_CONFIG_FILE))
                .required(false),
        )
        .add_source(
            rust_cli_config::File::from(configuration_directory.join(environment_filename))
                .required(false),
        )
        // E.g. `APP_TARGET__NEON__PROJECT_ID=proj-123` sets `target.neon.project_id`.
        .add_source(environment_source)
        .build()?;

    settings.try_deserialize::<T>()
}
