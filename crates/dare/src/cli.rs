//! Command-line definitions for dare

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::period::Period;

#[derive(Parser, Debug)]
#[command(name = "dare")]
#[command(about = "Connect to DARE - create, execute and schedule robots")]
#[command(version)]
#[command(after_help = r#"EXAMPLES:
    # Create a robot from a minilanguage file
    dare robot create --server http://localhost:8080/dare --file robot.mini

    # Create a robot from XML on standard input
    cat robot.xml | dare robot create --xml

    # Run it, then schedule it every two days
    dare robot execute <robot-code> http://example.org
    dare robot create-periodical <robot-code> 2d http://example.org

    # Inspect what was created
    dare robot list
    dare execution show <execution-code>

PERIODS:
    An amount followed by a unit: d, day, days; h, hour, hours;
    m, minute, minutes. Every two days: 2d, 2days, 48h.

CONFIGURATION:
    ~/.config/dare/config.toml: server, poll_interval_secs, max_polls,
    store_path, request_timeout_secs. DARE_SERVER and DARE_STORE override
    the file. Set RUST_LOG=debug to trace requests.
"#)]
pub struct Cli {
    /// Local store file (default: ~/.dare)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, inspect and run robots
    Robot {
        #[command(subcommand)]
        command: RobotCommand,
    },

    /// Show or delete an execution
    Execution {
        /// What to do with the execution
        #[arg(value_enum)]
        action: Action,

        /// The code of the execution
        code: String,
    },

    /// Show or delete a periodical execution
    Periodical {
        /// What to do with the periodical execution
        #[arg(value_enum)]
        action: Action,

        /// The code of the periodical execution
        code: String,
    },

    /// Execute a minilanguage robot once without registering it
    Execute {
        /// The url of the server that will execute the robot
        #[arg(long, short)]
        server: Option<String>,

        /// Read the robot from this file instead of standard input
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// The inputs the robot will be executed with
        inputs: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RobotCommand {
    /// List robots created by the user
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new robot from file or standard input
    Create {
        /// The url of the server on which the robot will be created
        #[arg(long, short)]
        server: Option<String>,

        /// Interpret the input as XML instead of minilanguage
        #[arg(long)]
        xml: bool,

        /// Read the robot from this file instead of standard input
        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Show information about a robot
    Show {
        /// The code of the robot
        code: String,

        /// Show only the XML of the robot
        #[arg(long, conflicts_with = "minilanguage")]
        xml: bool,

        /// Show only the minilanguage of the robot
        #[arg(long)]
        minilanguage: bool,
    },

    /// Delete a robot along with its executions and periodicals
    #[command(alias = "rm")]
    Delete {
        /// The code of the robot
        code: String,
    },

    /// Execute a robot
    Execute {
        /// The code of the robot
        code: String,

        /// The inputs the robot will be executed with
        inputs: Vec<String>,
    },

    /// Execute a robot periodically
    CreatePeriodical {
        /// The code of the robot
        code: String,

        /// How often to execute, e.g. 2d, 48h, 90m
        period: Period,

        /// The inputs the robot will be executed with
        inputs: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Show,
    Delete,
}
