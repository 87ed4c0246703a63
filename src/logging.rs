use log::{debug, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;
use log4rs::{Config, Handle};
use std::path::PathBuf;

/// Console verbosity, file logging (when requested) always records
/// everything down to `Trace`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, true) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }

    fn console_level(&self) -> Option<LevelFilter> {
        match self {
            Self::Quiet => None,
            Self::Normal => Some(LevelFilter::Info),
            Self::Verbose => Some(LevelFilter::Debug),
        }
    }
}

fn build_config(
    log_fp: Option<&PathBuf>,
    verbosity: Verbosity,
) -> anyhow::Result<Config> {
    let file_endcoder = Box::new(PatternEncoder::new(
        "[{f}::{L}][{d(%Y-%m-%d %H:%M:%S)}][{l}] {m}{n}",
    ));
    let console_encoder = Box::new(PatternEncoder::new("{h(>)} {m}{n}"));
    let stderr = ConsoleAppender::builder()
        .encoder(console_encoder)
        .target(Target::Stderr)
        .build();

    let mut config = Config::builder();
    let mut root_logger = Root::builder();
    if let Some(fp) = log_fp {
        let logfile = FileAppender::builder().encoder(file_endcoder).build(fp)?;
        config = config
            .appender(Appender::builder().build("logfile", Box::new(logfile)));
        root_logger = root_logger.appender("logfile");
    }
    if let Some(level) = verbosity.console_level() {
        config = config.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("stderr", Box::new(stderr)),
        );
        root_logger = root_logger.appender("stderr");
    }

    Ok(config.build(root_logger.build(LevelFilter::Trace))?)
}

pub fn init_logging_smart(
    log_fp: Option<&PathBuf>,
    verbosity: Verbosity,
) -> anyhow::Result<Handle> {
    let config = build_config(log_fp, verbosity)?;
    let handle = log4rs::init_config(config)?;
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");
    debug!("command line: {command_line}");
    Ok(handle)
}
