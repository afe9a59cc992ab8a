use anyhow::Result;
use recognizer::cli::{App, Args, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let config = Config::load(args.config.clone())?;
    let mut app = App::new(config);

    app.run(args).await?;

    Ok(())
}
