use clap::Args;
use log::LevelFilter;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use xiangqi::rules::Limits;

/// Anti-stalling thresholds, shared by the players and the arbiter refereeing them.
#[derive(Args, Clone, Debug)]
pub struct RuleArgs {
    #[arg(long, default_value_t = 12, help = "consecutive checks that lose the match")]
    pub perpetual_check: u32,

    #[arg(long, default_value_t = 60, help = "moves without progress before a draw")]
    pub no_progress: u32,

    #[arg(long, default_value_t = 120, help = "non-checking moves before a draw")]
    pub effective_moves: u32,

    #[arg(long, default_value_t = 300, help = "total moves before a draw")]
    pub total_moves: u32,
}

impl RuleArgs {
    pub fn limits(&self) -> Limits {
        Limits {
            perpetual_check: self.perpetual_check,
            no_progress: self.no_progress,
            effective_moves: self.effective_moves,
            total_moves: self.total_moves,
        }
    }
}

/// Time control, oracle budget and rules of a match.
#[derive(Args, Clone, Debug)]
pub struct MatchArgs {
    #[arg(long, default_value_t = 600, help = "seconds on each side's clock")]
    pub time: u64,

    #[arg(long, default_value_t = 2000, help = "milliseconds to wait for a suggested move")]
    pub oracle_timeout: u64,

    #[arg(long, default_value_t = 3, help = "search depth of the computer opponent")]
    pub depth: u32,

    #[command(flatten)]
    pub rules: RuleArgs,

    #[arg(long, default_value = "matches.jsonl", help = "file finished matches are appended to")]
    pub record: PathBuf,
}

impl MatchArgs {
    pub fn limits(&self) -> Limits {
        self.rules.limits()
    }

    pub fn time_control(&self) -> Duration {
        Duration::from_secs(self.time)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout)
    }
}

#[derive(Args, Clone, Debug)]
pub struct NetworkArgs {
    #[arg(short, long, default_value = "127.0.0.1")]
    pub ip: IpAddr,

    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,
}

impl NetworkArgs {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

#[derive(Args, Clone, Debug)]
pub struct LogArgs {
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    #[arg(long, default_value = "log.txt")]
    pub log_file: PathBuf,
}
