use std::path::Path;

pub fn run(root: &Path, port: u16) -> anyhow::Result<()> {
    // Fail fast with a CLI-friendly message before starting the runtime
    super::load_config(root)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(standup_server::serve(root.to_path_buf(), port))
}
