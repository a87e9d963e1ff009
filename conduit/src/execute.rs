//! Runs a pipeline from configuration information and caller-supplied assembly logic.

use std::time::{Duration, Instant};

use crossbeam_channel::{select, Sender};

use crate::communication::CancellationToken;
use crate::dataflow::Pipeline;
use crate::logging::{binary_logger, stderr_logger, DeadlineEvent, PipelineLogger};

/// The environment variable naming an address to stream binary event logs to.
pub const LOG_ADDR_VAR: &str = "CONDUIT_LOG_ADDR";

/// Configures the execution of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Signal the pipeline's token this long after execution starts.
    pub deadline: Option<Duration>,
    /// Stream bincode-encoded events to this TCP address.
    pub log_addr: Option<String>,
    /// Print events to stderr.
    pub verbose: bool,
}

impl Config {
    /// A configuration with no deadline and no logging.
    pub fn new() -> Self { Self::default() }

    /// Sets the deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Installs options into a [`getopts::Options`] struct that correspond
    /// to the parameters in the configuration.
    ///
    /// It is the caller's responsibility to ensure that the installed options
    /// do not conflict with any other options that may exist in `opts`, or
    /// that may be installed into `opts` in the future.
    ///
    /// This method is only available if the `getopts` feature is enabled, which
    /// it is by default.
    #[cfg(feature = "getopts")]
    pub fn install_options(opts: &mut getopts::Options) {
        opts.optopt("d", "deadline-ms", "cancel the pipeline after this many milliseconds", "MS");
        opts.optopt("l", "log-addr", "stream binary event logs to this address", "ADDR");
        opts.optflag("v", "verbose", "print pipeline events to stderr");
    }

    /// Instantiates a configuration based upon the parsed options in `matches`.
    ///
    /// The `matches` object must have been constructed from a
    /// [`getopts::Options`] which contained at least the options installed by
    /// [`Self::install_options`].
    ///
    /// This method is only available if the `getopts` feature is enabled, which
    /// it is by default.
    #[cfg(feature = "getopts")]
    pub fn from_matches(matches: &getopts::Matches) -> Result<Config, String> {
        let deadline = matches
            .opt_get::<u64>("deadline-ms")
            .map_err(|e| format!("invalid --deadline-ms: {}", e))?
            .map(Duration::from_millis);
        Ok(Config {
            deadline,
            log_addr: matches.opt_str("log-addr"),
            verbose: matches.opt_present("verbose"),
        })
    }

    /// Constructs a new configuration by parsing the supplied text arguments.
    ///
    /// Most commonly, callers supply `std::env::args()` as the iterator.
    ///
    /// This method is only available if the `getopts` feature is enabled, which
    /// it is by default.
    #[cfg(feature = "getopts")]
    pub fn from_args<I: Iterator<Item=String>>(args: I) -> Result<Config, String> {
        let mut opts = getopts::Options::new();
        Config::install_options(&mut opts);
        let matches = opts.parse(args).map_err(|e| e.to_string())?;
        Config::from_matches(&matches)
    }

    /// The logger this configuration asks for, if any.
    ///
    /// An explicit `log_addr` wins over the environment; `verbose` is used only when neither names
    /// an address.
    fn logger(&self, start: Instant) -> Result<Option<PipelineLogger>, String> {
        let addr = self.log_addr.clone().or_else(|| std::env::var(LOG_ADDR_VAR).ok());
        if let Some(addr) = addr {
            let stream = std::net::TcpStream::connect(&addr)
                .map_err(|e| format!("could not connect event logging to {}: {}", addr, e))?;
            eprintln!("enabled event logging to {}", addr);
            return Ok(Some(binary_logger(start, stream)));
        }
        Ok(self.verbose.then(|| stderr_logger(start)))
    }
}

/// Signals a token after a delay, unless disarmed first.
struct Deadline {
    disarm: Option<Sender<()>>,
    timer: Option<std::thread::JoinHandle<()>>,
}

impl Deadline {
    fn arm(token: CancellationToken, after: Duration, mut logger: Option<PipelineLogger>) -> Result<Self, String> {
        let (disarm, disarmed) = crossbeam_channel::bounded::<()>(0);
        let timer = std::thread::Builder::new()
            .name("conduit:deadline".to_owned())
            .spawn(move || {
                select! {
                    recv(disarmed) -> _ => { },
                    default(after) => {
                        if token.cancel() {
                            if let Some(logger) = logger.as_mut() {
                                logger.log(DeadlineEvent { after });
                            }
                        }
                    },
                }
            })
            .map_err(|e| format!("{:?}", e))?;
        Ok(Deadline { disarm: Some(disarm), timer: Some(timer) })
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        // Disconnecting wakes the timer if it is still waiting.
        self.disarm.take();
        if let Some(timer) = self.timer.take() {
            let _ = timer.join();
        }
    }
}

/// Executes a pipeline from a configuration and assembly logic.
///
/// The method allocates a [`CancellationToken`], wraps it in a [`Pipeline`] with whatever logging
/// `config` asks for, arms the deadline if there is one, and calls `func`. Once `func` returns,
/// the deadline is disarmed and every stage thread is joined; the result of `func` is returned
/// unless a stage panicked.
///
/// Because stage threads are joined, `func` should read or drop every stream it creates rather
/// than return one; an unread stream keeps its producer waiting until the deadline, if any.
///
/// # Examples
/// ```rust
/// use std::time::Duration;
/// use conduit::{collect, Config};
///
/// let total = conduit::execute(Config::new().deadline(Duration::from_secs(10)), |pipeline| {
///     let sources = (0 .. 3).map(|i| pipeline.generate(i * 10, 10)).collect::<Vec<_>>();
///     let mut merged = pipeline.merge(sources);
///     collect(&mut merged).into_iter().sum::<i64>()
/// }).unwrap();
///
/// assert_eq!(total, (0 .. 30).sum::<i64>());
/// ```
pub fn execute<T, F>(config: Config, func: F) -> Result<T, String>
where
    F: FnOnce(&Pipeline) -> T,
{
    let start = Instant::now();
    let token = CancellationToken::new();
    let logger = config.logger(start)?;

    let mut pipeline = Pipeline::new(token.clone());
    if let Some(logger) = logger.clone() {
        pipeline = pipeline.with_logger(logger);
    }

    let deadline = match config.deadline {
        Some(after) => Some(Deadline::arm(token, after, logger)?),
        None => None,
    };

    let result = func(&pipeline);
    drop(deadline);
    pipeline.join()?;
    Ok(result)
}

/// Executes a pipeline configured by command-line arguments.
///
/// The arguments are parsed by [`Config::from_args`]; see [`execute`] for the rest.
///
/// # Examples
/// ```rust
/// use conduit::collect;
///
/// let args = vec!["--deadline-ms".to_string(), "60000".to_string()];
/// let squares = conduit::execute_from_args(args.into_iter(), |pipeline| {
///     let mut squares = pipeline.transform(pipeline.generate(0, 4), |x| x * x);
///     collect(&mut squares)
/// }).unwrap();
///
/// assert_eq!(squares, vec![0, 1, 4, 9]);
/// ```
#[cfg(feature = "getopts")]
pub fn execute_from_args<I, T, F>(args: I, func: F) -> Result<T, String>
where
    I: Iterator<Item=String>,
    F: FnOnce(&Pipeline) -> T,
{
    let config = Config::from_args(args)?;
    execute(config, func)
}
