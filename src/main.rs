use anyhow::Result;

mod app;

fn main() -> Result<()> {
    let args = robust_copy::cli::parse();
    app::run(args)
}
