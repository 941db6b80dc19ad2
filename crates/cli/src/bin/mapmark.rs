use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    mapmark_cli::main_entry().await
}
