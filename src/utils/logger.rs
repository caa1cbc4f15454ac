use colored::Colorize;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::io::Write;
use std::path::Path;

/// Initialize logging: our crate at `level`, dependencies at WARN.
/// When `log_file` is set, output goes there instead of stderr (colors off);
/// a file that cannot be created is a fatal setup error.
pub fn setup_logging(level: LevelFilter, log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder = Builder::from_default_env();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level);

    if let Some(path) = log_file {
        let file = std::fs::File::create(path).map_err(|e| {
            anyhow::anyhow!("failed to create log file {}: {}", path.display(), e)
        })?;
        colored::control::set_override(false);
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let target = record.target().to_string().white();
                    format!(
                        "[{} {} {}] {}",
                        name.cyan(),
                        level_str,
                        target,
                        record.args()
                    )
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .init();
    Ok(())
}
