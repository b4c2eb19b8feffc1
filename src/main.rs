use clap::Parser;
use tomatick::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), tomatick::AppError> {
    run(Cli::parse()).await
}
