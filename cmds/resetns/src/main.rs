use anyhow::{Context, Result};
use clap::Parser;
use resetns::{command, command::ResetArgs, telemetry};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

fn main() -> Result<()> {
	// Usage errors exit here, before any file or network access
	let args = ResetArgs::parse();

	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")?;
	// The OTLP exporter needs a runtime context while it is built
	let _runtime_guard = runtime.enter();
	let _telemetry = telemetry::init(args.log_level, args.log_format)?;

	runtime.block_on(command::run(args, std::io::stdout()))
}
