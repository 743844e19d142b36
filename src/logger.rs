use anyhow::{Result, anyhow};
use ftail::Ftail;
use log::{LevelFilter, info};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// File log under the XDG state dir, console only for warnings and errors.
pub fn init_logger(verbose: bool) -> Result<()> {
    let logs_file = xdg::BaseDirectories::with_prefix(PKG_NAME)
        .place_state_file(format!("{}.log", PKG_NAME))
        .map_err(|e| anyhow!("Could not create logs dir: {}", e))?;

    let file_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    match Ftail::new()
        .console(LevelFilter::Warn)
        .single_file(&logs_file, true, file_level)
        .init()
    {
        Ok(_) => {
            info!("Logger initialized, writing to {}", logs_file.display());
            Ok(())
        }
        Err(e) => Err(anyhow!("Could not initialize logger: {}", e)),
    }
}
