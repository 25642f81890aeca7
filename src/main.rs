use anyhow::Result;

fn main() -> Result<()> {
    stowage::run()?;
    Ok(())
}
