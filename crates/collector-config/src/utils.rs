// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, File};
use std::path::{Path, PathBuf};

use super::*;

/// A helper function that will search for all config files in the given directory and return them as a vec
/// of the paths.
///
/// Supported file extensions are:
/// - `.toml`.
/// - `.json`.
pub fn search_config_files<P: AsRef<Path>>(
    base_dir: P,
) -> cc_collector_utils::Result<Vec<PathBuf>> {
    // A pattern that covers all toml or json files in the config directory and subdirectories.
    let toml_pattern = format!("{}/**/*.toml", base_dir.as_ref().display());
    let json_pattern = format!("{}/**/*.json", base_dir.as_ref().display());
    tracing::trace!(
        "Loading config files from {} and {}",
        toml_pattern,
        json_pattern
    );
    let toml_files = glob::glob(&toml_pattern)?;
    let json_files = glob::glob(&json_pattern)?;
    toml_files
        .chain(json_files)
        .map(|v| v.map_err(cc_collector_utils::Error::from))
        .collect()
}

/// Prefix of the environment variables that override file settings.
const ENV_PREFIX: &str = "CC_COLLECTOR_";

/// Try to parse the [`CollectorConfig`] from the given config file(s).
///
/// Environment variables prefixed with `CC_COLLECTOR_` override the files.
/// Nested keys are separated by `__` and words by `_`, so
/// `CC_COLLECTOR_SOURCE_CHAIN__REQUEST_TIMEOUT` sets
/// `source-chain.request-timeout`.
pub fn parse_from_files(
    files: &[PathBuf],
) -> cc_collector_utils::Result<CollectorConfig> {
    parse_with_environment(files, std::env::vars())
}

fn parse_with_environment<I>(
    files: &[PathBuf],
    vars: I,
) -> cc_collector_utils::Result<CollectorConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut builder = Config::builder();
    for config_file in files {
        tracing::trace!("Loading config file: {}", config_file.display());
        // get file extension
        let ext = config_file
            .extension()
            .map(|e| e.to_str().unwrap_or(""))
            .unwrap_or("");
        let format = match ext {
            "toml" => config::FileFormat::Toml,
            "json" => config::FileFormat::Json,
            _ => {
                tracing::warn!("Unknown file extension: {}", ext);
                continue;
            }
        };
        builder = builder
            .add_source(File::from(config_file.as_path()).format(format));
    }

    // also merge in the environment, keyed the same way as the files.
    let builder = builder.add_source(
        config::Environment::default()
            .separator("__")
            .source(Some(environment_overrides(vars))),
    );
    let cfg = builder.build()?;
    // and finally deserialize the config and post-process it
    let config: Result<
        CollectorConfig,
        serde_path_to_error::Error<config::ConfigError>,
    > = serde_path_to_error::deserialize(cfg);
    match config {
        Ok(c) => postloading_process(c),
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

/// Strips [`ENV_PREFIX`] and turns `SOURCE_CHAIN__HTTP_ENDPOINT` into
/// `SOURCE-CHAIN__HTTP-ENDPOINT`, leaving the `__` nesting separator alone.
fn environment_overrides<I>(vars: I) -> config::Map<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            let key = key.to_uppercase();
            let key = key.strip_prefix(ENV_PREFIX)?;
            if key.is_empty() {
                return None;
            }
            let key = key
                .split("__")
                .map(|part| part.replace('_', "-"))
                .collect::<Vec<_>>()
                .join("__");
            Some((key, value))
        })
        .collect()
}

/// Load the configuration files and
///
/// Returns `Ok(CollectorConfig)` on success, or an error on failure.
///
/// it is the same as using the [`search_config_files`] and [`parse_from_files`] functions combined.
pub fn load<P: AsRef<Path>>(
    path: P,
) -> cc_collector_utils::Result<CollectorConfig> {
    parse_from_files(&search_config_files(path)?)
}

/// The postloading_process exists to validate configuration and warn about
/// settings that are legal but unlikely to work.
pub fn postloading_process(
    config: CollectorConfig,
) -> cc_collector_utils::Result<CollectorConfig> {
    tracing::trace!("Checking configration sanity ...");
    let signers = &config.signers;
    if signers.request_timeout() >= config.poll_interval() {
        tracing::warn!(
            "!!WARNING!!: signers.request-timeout ({} ms) is not shorter than
            poll-interval ({} ms), a single slow signer can stall every cycle",
            signers.request_timeout,
            config.poll_interval,
        );
    }
    if signers.max_concurrency < signers.threshold {
        tracing::warn!(
            "!!WARNING!!: signers.max-concurrency ({}) is below signers.threshold ({}),
            signatures will be collected in several rounds",
            signers.max_concurrency,
            signers.threshold,
        );
    }
    tracing::trace!("postloaded config: {:?}", config);
    Ok(config)
}
