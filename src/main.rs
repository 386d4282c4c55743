mod corpus;
mod error;
mod logging;
mod mail_reader;
mod pipeline;
mod settings;


use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = settings::Cli::parse();
    logging::setup_logger(cli.log_level())?;
    let settings = settings::load_settings(&cli)?;
    mail_reader::main(settings).await
}
