pub fn decode(tag: &str) -> anyhow::Result<()> {
    let state = reaper_core::try_decode(tag)?;
    match state.stage() {
        None => println!("untracked"),
        Some(stage) => {
            println!("stage:      {stage}");
            match state.entered_at() {
                Some(at) => println!("entered at: {}", at.to_rfc3339()),
                None => println!("entered at: -"),
            }
            if let Some(metadata) = state.metadata() {
                println!("metadata:   {metadata}");
            }
        }
    }
    Ok(())
}
