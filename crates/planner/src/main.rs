use anyhow::Context;
use clap::Parser;
use planner::geometry::distance;
use store::System;

/// rp-plan-route plans a multi-hop route between two star systems under a
/// bounded per-jump range.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    logging: cli_common::LogArgs,

    #[clap(flatten)]
    database: cli_common::DatabaseArgs,

    /// The name of the starting system.
    start_system: String,

    /// The name of the destination system.
    end_system: String,

    /// The maximum jump range of the ship in light years.
    #[clap(long = "max-jump-range")]
    max_jump_range: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli_common::init_logging(&args.logging);

    let pool = args.database.connect("rp-plan-route").await?;

    let start = store::systems::lookup_system_by_name(&pool, &args.start_system)
        .await?
        .with_context(|| format!("start system '{}' not found", args.start_system))?;
    let goal = store::systems::lookup_system_by_name(&pool, &args.end_system)
        .await?
        .with_context(|| format!("end system '{}' not found", args.end_system))?;

    match planner::plan_route(&pool, &start, &goal, args.max_jump_range).await? {
        Some(route) => {
            print_route(&route);
            Ok(())
        }
        None => {
            println!("No route found.");
            std::process::exit(1);
        }
    }
}

fn print_route(route: &[System]) {
    println!("\n--- Route Plan ---");
    let mut total_distance = 0.0;
    for (jump, pair) in route.windows(2).enumerate() {
        let dist = distance(&pair[0], &pair[1]);
        total_distance += dist;
        println!(
            "Jump {:2}: {:<20} -> {:<20} ({:>6.2} LY)",
            jump + 1,
            pair[0].name,
            pair[1].name,
            dist
        );
    }
    println!("------------------");
    println!("Total Jumps: {}", route.len() - 1);
    println!("Total Distance: {total_distance:.2} LY\n");
}
