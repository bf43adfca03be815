#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    agreement_signing::run().await?;
    Ok(())
}
