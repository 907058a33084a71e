mod app;
mod config;
mod console;

fn main() -> anyhow::Result<()> {
    app::run_app()
}
