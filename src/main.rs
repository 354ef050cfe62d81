//! Realty Aggregator command line
//!
//! `realty-aggregator [--demo] [kind] [id]` prints one catalog page of
//! `kind`, or the aggregated detail of `id`, as JSON. `--demo` answers from
//! the built-in offline provider instead of the configured one.

use realty_aggregator::mocks::DemoTransport;
use realty_aggregator::{AggregatorBuilder, EntityKind, Filters};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let mut args: Vec<String> = std::env::args().skip(1).collect();
	let demo = match args.iter().position(|arg| arg == "--demo") {
		Some(index) => {
			args.remove(index);
			true
		},
		None => false,
	};

	let kind: EntityKind = args
		.first()
		.map(|kind| kind.parse::<EntityKind>())
		.transpose()?
		.unwrap_or(EntityKind::Complex);

	let mut builder = AggregatorBuilder::from_config()?;
	if demo {
		builder = builder.with_transport(Arc::new(DemoTransport::new()));
	}
	let aggregator = builder.start()?;

	let output = match args.get(1) {
		Some(id) => serde_json::to_string_pretty(&aggregator.get_detail(kind, id, None).await?)?,
		None => serde_json::to_string_pretty(
			&aggregator.get_catalog(kind, &Filters::new(), 1, 20).await?,
		)?,
	};
	println!("{}", output);

	aggregator.shutdown();
	Ok(())
}
