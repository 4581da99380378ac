use clap::{Parser, Subcommand, ValueEnum};
use modump_core::DumpKind;

#[derive(Parser)]
#[command(name = "modump")]
#[command(about = "Capture a minidump of this process or of another running Mod Organizer instance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List running processes visible to this user
    List,
    /// Find another running instance of this executable
    Find,
    /// Write a minidump of this process or of the other instance
    Dump {
        /// How much memory content to include
        #[arg(short, long, value_enum, default_value_t = Kind::Mini)]
        kind: Kind,
        /// Target the other running instance instead of this process
        #[arg(long)]
        other: bool,
    },
    /// Print the environment snapshot
    Env,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Mini,
    Data,
    Full,
}

impl From<Kind> for DumpKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Mini => DumpKind::Mini,
            Kind::Data => DumpKind::Data,
            Kind::Full => DumpKind::Full,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    #[cfg(windows)]
    run(cli);

    #[cfg(not(windows))]
    {
        let _ = cli;
        eprintln!("modump only inspects Windows processes");
        std::process::exit(1);
    }
}

#[cfg(windows)]
fn run(cli: Cli) {
    use modump_core::{capture, env::Environment, process};

    match cli.command {
        Commands::List => {
            for record in process::running_processes() {
                println!("{:>6}  {}", record.pid, record.filename);
            }
        }
        Commands::Find => match process::find_sibling_pid() {
            Some(pid) => println!("found other process with pid {pid}"),
            None => {
                eprintln!("no other process found");
                std::process::exit(1);
            }
        },
        Commands::Dump { kind, other } => {
            let result = if other {
                capture::coredump_other(kind.into())
            } else {
                capture::coredump(kind.into())
            };

            if let Err(e) = result {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Env => {
            let environment = Environment::current();
            environment.log_summary();
            for module in environment.loaded_modules() {
                println!("{module}");
            }
        }
    }
}
