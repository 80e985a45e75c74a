use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use flashpack::commands::{
    compose_command, init_config_command, package_command, publish_app_command,
    publish_fs_command, sections_command,
};
use flashpack::ConfigOverrides;
use flashpack_core::config::DEFAULT_CONFIG_FILE;
use flashpack_core::services::composer::CancelToken;
use log::{warn, Level, LevelFilter};

/// Factory image packaging CLI.
///
/// This CLI is a thin wrapper around `flashpack-core`. All substantive logic
/// lives in the library so it can be tested thoroughly and reused from other
/// build orchestrators.
#[derive(Parser, Debug)]
#[command(
    name = "flashpack",
    version,
    about = "Compose and publish factory flash images",
    long_about = None,
    arg_required_else_help = true
)]
struct Cli {
    /// Set the logging verbosity
    #[arg(short, long, value_enum, global = true, default_value_t = LogLevel::Info)]
    verbose: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a starter config using the chip's default partition layout.
    InitConfig {
        /// Config file to create (.json, .yaml or .yml).
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Board identifier used in published file names.
        #[arg(long)]
        board: String,

        /// Firmware version used in published file names.
        #[arg(long)]
        firmware_version: String,

        /// Chip id passed to the merge tool (e.g. esp32, esp32s3).
        #[arg(long, default_value = "esp32")]
        chip: String,

        #[arg(long, default_value = "dio")]
        flash_mode: String,

        #[arg(long, default_value = "40m")]
        flash_freq: String,

        #[arg(long, default_value = "4MB")]
        flash_size: String,
    },

    /// Locate and validate the factory image sections and print the layout.
    Sections {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compose the factory image into the build directory.
    Compose {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        #[command(flatten)]
        merge: MergeArgs,
    },

    /// Compose the factory image and publish firmware, factory image and ELF.
    Package {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        #[command(flatten)]
        merge: MergeArgs,

        /// Override the publish directory.
        #[arg(long)]
        output_dir: Option<String>,

        /// Emit the publish report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Publish the plain application binary.
    PublishApp {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Override the publish directory.
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Publish a filesystem image produced by a separate build step.
    PublishFs {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Filesystem image; defaults to `filesystem_image` from the config.
        #[arg(long)]
        image: Option<String>,

        /// Override the publish directory.
        #[arg(long)]
        output_dir: Option<String>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct MergeArgs {
    /// Merge with the built-in merger instead of the external tool.
    #[arg(long, default_value_t = false, conflicts_with = "merge_tool")]
    builtin: bool,

    /// External merge tool to run (overrides config and FLASHPACK_MERGE_TOOL).
    #[arg(long)]
    merge_tool: Option<String>,

    /// Seconds before the merge tool is killed.
    #[arg(long)]
    timeout: Option<u64>,
}

impl MergeArgs {
    fn overrides(self, output_dir: Option<String>) -> ConfigOverrides {
        ConfigOverrides {
            merge_tool: self.merge_tool,
            builtin: self.builtin,
            timeout_secs: self.timeout,
            output_dir,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output on stdout stays parseable.
    env_logger::Builder::from_env(Env::default())
        .filter_level(cli.verbose.into())
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let level = record.level();
            if level == Level::Info {
                writeln!(buf, "{}", record.args())
            } else {
                writeln!(buf, "{}: {}", record.level(), record.args())
            }
        })
        .init();

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(err) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!("Could not install Ctrl-C handler: {err}");
        }
    }

    match cli.command {
        Command::InitConfig {
            config,
            board,
            firmware_version,
            chip,
            flash_mode,
            flash_freq,
            flash_size,
        } => init_config_command(
            &config,
            &board,
            &firmware_version,
            &chip,
            &flash_mode,
            &flash_freq,
            &flash_size,
        ),
        Command::Sections { config, json } => sections_command(&config, json),
        Command::Compose { config, merge } => compose_command(&config, &merge.overrides(None), cancel),
        Command::Package { config, merge, output_dir, json } => {
            package_command(&config, &merge.overrides(output_dir), cancel, json)
        }
        Command::PublishApp { config, output_dir } => {
            publish_app_command(&config, &MergeArgs::default().overrides(output_dir))
        }
        Command::PublishFs { config, image, output_dir } => {
            publish_fs_command(&config, image.as_deref(), &MergeArgs::default().overrides(output_dir))
        }
    }
}
