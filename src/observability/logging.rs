use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter};

/// Initialize colored console logging to stderr at `level`. HTTP client
/// internals are capped at `warn`.
pub fn init_logging(level: Level) -> anyhow::Result<()> {
	let colors = ColoredLevelConfig::new()
		.error(Color::Red)
		.warn(Color::Yellow)
		.info(Color::Green)
		.debug(Color::Cyan)
		.trace(Color::BrightBlack);

	fern::Dispatch::new()
		.format(move |out, message, record| {
			out.finish(format_args!(
				"{} {:<5} [{}] {}",
				chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
				colors.color(record.level()),
				record.target(),
				message
			))
		})
		.level(level.to_level_filter())
		.level_for("reqwest", LevelFilter::Warn)
		.level_for("hyper", LevelFilter::Warn)
		.level_for("hyper_util", LevelFilter::Warn)
		.chain(std::io::stderr())
		.apply()
		.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

	Ok(())
}
