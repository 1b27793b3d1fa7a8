use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dotnet_add_content::{AddContentRequest, ContentError, ContentRunner, ContentTargetRequest, Outcome};

#[derive(Parser)]
#[command(name = "dotnet-add-content")]
#[command(about = "dotnet add-content CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 静默模式(仅输出错误)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Adds content includes inline or via props file, and optionally imports props into a .csproj
    AddContent {
        /// Path to a .csproj file or a directory containing one
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Path to the .props file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Glob or file pattern to include
        #[arg(short, long)]
        include: Option<String>,

        /// If set, overwrites the props file instead of appending
        #[arg(short, long)]
        overwrite: bool,
    },
    /// Create or update a .props file and/or import it into a .csproj
    ContentTarget {
        /// Path to the .props file
        #[arg(long)]
        file: PathBuf,

        /// Glob pattern of files to include
        #[arg(long)]
        include: Option<String>,

        /// Path to a .csproj file to import this props file into
        #[arg(long)]
        project: Option<PathBuf>,

        /// If set, overwrites the props file instead of appending
        #[arg(long)]
        overwrite: bool,
    },
}

/// 初始化日志，输出到 stderr，stdout 只保留结果提示
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "dotnet_add_content=debug"
    } else {
        "dotnet_add_content=warn"
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcomes = match run(cli.command) {
        Ok(outcomes) => outcomes,
        Err(ContentError::Usage(message)) => {
            // 参数错误只打印提示
            eprintln!("{}", message);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to update project files"),
    };

    if !cli.quiet {
        for outcome in &outcomes {
            println!("{}", outcome);
        }
    }

    Ok(())
}

/// 根据子命令构造请求并执行
fn run(command: Commands) -> Result<Vec<Outcome>, ContentError> {
    let runner = ContentRunner::new();

    match command {
        Commands::AddContent { project, file, include, overwrite } => {
            let request = AddContentRequest { project, file, include, overwrite };
            request.execute(&runner)
        }
        Commands::ContentTarget { file, include, project, overwrite } => {
            let request = ContentTargetRequest { file, include, project, overwrite };
            request.execute(&runner)
        }
    }
}
