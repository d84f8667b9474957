use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "backup-monitor",
    version,
    about = "Start a database backup job and follow its progress until the archive is downloaded"
)]
pub struct Args {
    /// RON config file (defaults to ./backup.ron when present).
    #[arg(long, global = true, env = "BACKUP_MONITOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the backup service.
    #[arg(long, global = true, env = "BACKUP_SERVICE_URL")]
    pub base_url: Option<String>,

    /// Directory downloaded archives are written to.
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Where log output goes.
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a backup job and follow its event stream (Ctrl-C cancels).
    Start {
        #[command(flatten)]
        form: FormArgs,
        #[command(flatten)]
        db: DbArgs,
    },
    /// Check that the service can reach the database.
    TestDb {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Download (again) an archive produced by an earlier job.
    Download {
        #[arg(long)]
        archive_id: String,
        /// Schema name; the archive is saved as `<schema>.tar.gz`.
        #[arg(long)]
        schema: Option<String>,
        #[arg(long, env = "BACKUP_ARCHIVE_PASSWORD")]
        password: Option<String>,
        /// Print the download URL instead of fetching the archive.
        #[arg(long)]
        print_url: bool,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct FormArgs {
    /// Comma separated tenant ids.
    #[arg(long)]
    pub tenants: Option<String>,
    /// Target schema name.
    #[arg(long)]
    pub schema: Option<String>,
    /// Archive password.
    #[arg(long, env = "BACKUP_ARCHIVE_PASSWORD")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct DbArgs {
    #[arg(long)]
    pub db_host: Option<String>,
    #[arg(long)]
    pub db_port: Option<u16>,
    #[arg(long)]
    pub db_name: Option<String>,
    #[arg(long)]
    pub db_user: Option<String>,
    #[arg(long, env = "BACKUP_DB_PASSWORD")]
    pub db_password: Option<String>,
}

impl DbArgs {
    pub fn is_empty(&self) -> bool {
        self.db_host.is_none()
            && self.db_port.is_none()
            && self.db_name.is_none()
            && self.db_user.is_none()
            && self.db_password.is_none()
    }
}
