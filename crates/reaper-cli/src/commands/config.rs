use std::path::Path;

use reaper_core::ReaperConfig;

pub fn check(path: &Path) -> anyhow::Result<()> {
    let (config, filters) = super::load(path)?;
    println!(
        "✓ {} is valid: {} region(s), {} filter(s), dry_run = {}",
        path.display(),
        config.regions.len(),
        filters.predicates().len(),
        config.dry_run
    );
    Ok(())
}

pub fn init(path: &Path, regions: &[String]) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let regions: Vec<&str> = regions.iter().map(String::as_str).collect();
    let config = ReaperConfig::scaffold(&regions);
    std::fs::write(path, config.to_toml_string()?)?;
    println!("✓ Generated {}", path.display());
    Ok(())
}
