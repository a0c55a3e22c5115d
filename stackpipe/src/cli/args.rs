//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stackpipe",
    about = "Symbolize, compress and stream sampled callchains",
    after_help = "\
EXAMPLES:
    stackpipe --outputs 'tcp 127.0.0.1_5000 127.0.0.1_5001' < samples.jsonl
    stackpipe --outputs 'pipe 5_6' --control 'pipe 3_4' --input samples.jsonl"
)]
pub struct Args {
    /// Output connections: `tcp <host>_<port>...` or `pipe <read>_<write>...`
    #[arg(long, env = "STACKPIPE_SERV_CONNECT", value_name = "INSTRUCTIONS")]
    pub outputs: String,

    /// Control channel: `pipe <read>_<write>` or `tcp <host>_<port>`
    #[arg(long, env = "STACKPIPE_CONNECT", value_name = "INSTRUCTIONS")]
    pub control: Option<String>,

    /// Newline-delimited JSON samples (stdin if omitted)
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory for the `<event kind>_callchains.json` artifact
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub artifact_dir: PathBuf,

    /// Interpreter used for python filter scripts
    #[arg(long, env = "STACKPIPE_PYTHON", default_value = "python3")]
    pub python: String,

    /// Suppress the end-of-run summary
    #[arg(short, long)]
    pub quiet: bool,
}
