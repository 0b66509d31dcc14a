//! File configuration for CLI defaults.
//!
//! The file lives at `$XDG_CONFIG_HOME/book-saver/config.toml` (or
//! `$HOME/.config/book-saver/config.toml`) and holds simple `key = value`
//! lines. Values given explicitly on the command line always win.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use book_saver_core::download::MAX_PAGE_RETRIES;
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};

use crate::cli::{Args, FormatArg};

const APP_DIR: &str = "book-saver";
const CONFIG_FILE: &str = "config.toml";
const MAX_PAGE_CEILING: u32 = 100_000;

/// Defaults read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    /// Default destination folder.
    pub(crate) output_dir: Option<PathBuf>,
    /// Default output format.
    pub(crate) format: Option<FormatArg>,
    /// Default retries per page.
    pub(crate) page_retries: Option<u8>,
    /// Default last page tried when the page count is unknown.
    pub(crate) page_ceiling: Option<u32>,
    /// HTTP connect timeout in seconds.
    pub(crate) connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub(crate) read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub(crate) verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against the CLI constraints.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(retries) = self.page_retries
            && u32::from(retries) > MAX_PAGE_RETRIES
        {
            bail!(
                "Invalid config value for `page_retries`: {retries}. Expected range: 0..={MAX_PAGE_RETRIES}"
            );
        }

        if let Some(ceiling) = self.page_ceiling
            && !(1..=MAX_PAGE_CEILING).contains(&ceiling)
        {
            bail!(
                "Invalid config value for `page_ceiling`: {ceiling}. Expected range: 1..={MAX_PAGE_CEILING}"
            );
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

/// Which arguments were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) format: bool,
    pub(crate) page_retries: bool,
    pub(crate) page_ceiling: bool,
    pub(crate) connect_timeout: bool,
    pub(crate) read_timeout: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

/// Parses the process arguments and records which values came from the command line.
pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    (args, sources_from_matches(&matches))
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        output_dir: is_commandline_value(matches, "output_dir"),
        format: is_commandline_value(matches, "format"),
        page_retries: is_commandline_value(matches, "page_retries"),
        page_ceiling: is_commandline_value(matches, "page_ceiling"),
        connect_timeout: is_commandline_value(matches, "connect_timeout"),
        read_timeout: is_commandline_value(matches, "read_timeout"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Fills arguments not given on the command line from the config file.
pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !cli_sources.output_dir
        && args.output_dir.is_none()
        && let Some(output_dir) = &file_config.output_dir
    {
        args.output_dir = Some(output_dir.clone());
    }

    if !cli_sources.format
        && let Some(format) = file_config.format
    {
        args.format = format;
    }

    if !cli_sources.page_retries
        && let Some(retries) = file_config.page_retries
    {
        args.page_retries = retries;
    }

    if !cli_sources.page_ceiling
        && let Some(ceiling) = file_config.page_ceiling
    {
        args.page_ceiling = ceiling;
    }

    if !cli_sources.connect_timeout && file_config.connect_timeout_secs.is_some() {
        args.connect_timeout = file_config.connect_timeout_secs;
    }

    if !cli_sources.read_timeout && file_config.read_timeout_secs.is_some() {
        args.read_timeout = file_config.read_timeout_secs;
    }

    if !cli_sources.verbose
        && !cli_sources.quiet
        && let Some(verbosity) = file_config.verbosity
    {
        apply_config_verbosity(&mut args, verbosity);
    }

    args
}

fn apply_config_verbosity(args: &mut Args, verbosity: VerbositySetting) {
    let (quiet, verbose) = match verbosity {
        VerbositySetting::Default => (false, 0),
        VerbositySetting::Verbose => (false, 1),
        VerbositySetting::Quiet => (true, 0),
        VerbositySetting::Debug => (false, 2),
    };
    args.quiet = quiet;
    args.verbose = verbose;
}

/// Default log level for the effective verbosity.
pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// `RUST_LOG` is ignored when verbosity was chosen on the command line.
pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/book-saver/config.toml`
/// 2. `$HOME/.config/book-saver/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file from the default path, if there is one.
pub(crate) fn load_default_file_config() -> Result<Option<FileConfig>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_file_config(&path).map(Some)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "format" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.format = Some(parse_format(&parsed).with_context(invalid)?);
            }
            "page_retries" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let retries = u8::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("page_retries out of range"))
                    .with_context(invalid)?;
                cfg.page_retries = Some(retries);
            }
            "page_ceiling" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let ceiling = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("page_ceiling out of range for u32"))
                    .with_context(invalid)?;
                cfg.page_ceiling = Some(ceiling);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_format(value: &str) -> Result<FormatArg> {
    match value {
        "pdf" => Ok(FormatArg::Pdf),
        "epub" => Ok(FormatArg::Epub),
        "images" => Ok(FormatArg::Images),
        _ => bail!("Expected one of: pdf, epub, images"),
    }
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const REF: &str = "https://example.com/b/book1";

    fn parse_with_sources(argv: &[&str]) -> (Args, CliValueSources) {
        let matches = Args::command().try_get_matches_from(argv).unwrap();
        let args = Args::from_arg_matches(&matches).unwrap();
        (args, sources_from_matches(&matches))
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let raw = r#"
# defaults for the laptop
output_dir = "/home/me/books"   # trailing comment
format = "epub"
page_retries = 2
"#;
        let cfg = parse_config_str(raw).unwrap();
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/home/me/books")));
        assert_eq!(cfg.format, Some(FormatArg::Epub));
        assert_eq!(cfg.page_retries, Some(2));
        assert!(cfg.page_ceiling.is_none());
        assert!(cfg.verbosity.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let raw = r#"
output_dir = "out"
format = "images"
page_retries = 0
page_ceiling = 400
connect_timeout_secs = 5
read_timeout_secs = 60
verbosity = "debug"
"#;
        let cfg = parse_config_str(raw).unwrap();
        assert_eq!(cfg.page_ceiling, Some(400));
        assert_eq!(cfg.connect_timeout_secs, Some(5));
        assert_eq!(cfg.read_timeout_secs, Some(60));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Debug));
    }

    #[test]
    fn test_parse_config_hash_inside_string_is_kept() {
        let cfg = parse_config_str(r#"output_dir = "books#1""#).unwrap();
        assert_eq!(cfg.output_dir, Some(PathBuf::from("books#1")));
    }

    #[test]
    fn test_parse_config_unknown_key_names_line() {
        let err = parse_config_str("format = \"pdf\"\nconcurrency = 4").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("concurrency"), "got: {message}");
        assert!(message.contains("line 2"), "got: {message}");
    }

    #[test]
    fn test_parse_config_missing_equals_rejected() {
        let err = parse_config_str("format \"pdf\"").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_config_out_of_range_values_rejected() {
        assert!(parse_config_str("page_retries = 6").is_err());
        assert!(parse_config_str("page_ceiling = 0").is_err());
        assert!(parse_config_str("read_timeout_secs = 0").is_err());
        assert!(parse_config_str("connect_timeout_secs = 3601").is_err());
        assert!(parse_config_str("page_retries = -1").is_err());
    }

    #[test]
    fn test_parse_config_bad_enum_values_rejected() {
        let err = parse_config_str("format = \"docx\"").unwrap_err();
        assert!(format!("{err:#}").contains("pdf, epub, images"));
        assert!(parse_config_str("verbosity = \"loud\"").is_err());
        assert!(parse_config_str("format = pdf").is_err(), "unquoted string");
    }

    #[test]
    fn test_apply_config_defaults_fills_unset_values() {
        let (args, sources) = parse_with_sources(&["book-saver", REF]);
        let cfg = FileConfig {
            output_dir: Some(PathBuf::from("/books")),
            format: Some(FormatArg::Images),
            page_retries: Some(3),
            page_ceiling: Some(250),
            connect_timeout_secs: Some(4),
            read_timeout_secs: Some(40),
            verbosity: Some(VerbositySetting::Quiet),
        };

        let args = apply_config_defaults(args, &sources, Some(&cfg));

        assert_eq!(args.output_dir, Some(PathBuf::from("/books")));
        assert_eq!(args.format, FormatArg::Images);
        assert_eq!(args.page_retries, 3);
        assert_eq!(args.page_ceiling, 250);
        assert_eq!(args.connect_timeout, Some(4));
        assert_eq!(args.read_timeout, Some(40));
        assert!(args.quiet);
    }

    #[test]
    fn test_apply_config_defaults_command_line_wins() {
        let (args, sources) = parse_with_sources(&[
            "book-saver",
            "-f",
            "pdf",
            "-r",
            "0",
            "-o",
            "here",
            "-v",
            REF,
        ]);
        let cfg = FileConfig {
            output_dir: Some(PathBuf::from("/books")),
            format: Some(FormatArg::Epub),
            page_retries: Some(4),
            verbosity: Some(VerbositySetting::Quiet),
            ..FileConfig::default()
        };

        let args = apply_config_defaults(args, &sources, Some(&cfg));

        assert_eq!(args.output_dir, Some(PathBuf::from("here")));
        assert_eq!(args.format, FormatArg::Pdf);
        assert_eq!(args.page_retries, 0);
        assert!(!args.quiet);
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn test_apply_config_defaults_without_file_is_identity() {
        let (args, sources) = parse_with_sources(&["book-saver", "-p", "2-4", REF]);
        let applied = apply_config_defaults(args.clone(), &sources, None);
        assert_eq!(applied.pages, args.pages);
        assert_eq!(applied.format, args.format);
    }

    #[test]
    fn test_resolve_default_log_level() {
        let args = Args::try_parse_from(["book-saver", REF]).unwrap();
        assert_eq!(resolve_default_log_level(&args), "info");
        let args = Args::try_parse_from(["book-saver", "-v", REF]).unwrap();
        assert_eq!(resolve_default_log_level(&args), "debug");
        let args = Args::try_parse_from(["book-saver", "-vv", REF]).unwrap();
        assert_eq!(resolve_default_log_level(&args), "trace");
        let args = Args::try_parse_from(["book-saver", "-q", REF]).unwrap();
        assert_eq!(resolve_default_log_level(&args), "error");
    }

    #[test]
    fn test_should_force_cli_log_level_only_for_explicit_flags() {
        let (_, sources) = parse_with_sources(&["book-saver", REF]);
        assert!(!should_force_cli_log_level(&sources));
        let (_, sources) = parse_with_sources(&["book-saver", "-q", REF]);
        assert!(should_force_cli_log_level(&sources));
    }
}
