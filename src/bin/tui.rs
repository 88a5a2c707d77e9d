use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    medialert::tui::run().await
}
