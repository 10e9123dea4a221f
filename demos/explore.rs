//! Generate the Markov chain of a small queueing network.
//!
//! Customers arrive at a router, which immediately sends them to one of two queues
//! (or drops them when both are full). The routing decision is a vanishing state.
//!
//! Run with:
//! ```bash
//! cargo run --release --example explore -- 10 --batched
//! ```

use clap::Parser;

use ssgen_rs::error::ModelError;
use ssgen_rs::explorer::{Explorer, ExplorerConfig, VanishingPolicy};
use ssgen_rs::model::{EventId, Model};
use ssgen_rs::partition::{PartitionStrategy, RefillPolicy};
use ssgen_rs::relation::{RelationBuilder, RelationConfig};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Capacity of each queue.
    #[arg(value_name = "INT", default_value = "5")]
    capacity: u32,

    /// Probability of routing a customer to the first queue.
    #[clap(long, value_name = "FLOAT", default_value = "0.7")]
    p: f64,

    /// Keep vanishing states instead of eliminating them.
    #[clap(long)]
    structural: bool,

    /// Use batched partitions.
    #[clap(long)]
    batched: bool,

    /// Generate the reachability graph instead of the Markov chain.
    #[clap(long)]
    unweighted: bool,

    /// Only discover the states.
    #[clap(long)]
    states_only: bool,

    /// Number of edges per relation batch.
    #[clap(long, value_name = "INT", default_value = "1024")]
    batch_size: usize,

    /// Print every edge of the generated relation.
    #[clap(long)]
    print: bool,
}

const ARRIVE: EventId = 0;
const SERVE_1: EventId = 1;
const SERVE_2: EventId = 2;
const ROUTE_1: EventId = 3;
const ROUTE_2: EventId = 4;
const DROP: EventId = 5;

/// State variables: `x1` and `x2` are the queue lengths, `x3` is set while a
/// customer waits at the router.
struct Router {
    capacity: u32,
    p: f64,
}

impl Model for Router {
    fn num_variables(&self) -> usize {
        3
    }

    fn initial_state(&self, _: usize, out: &mut [u32]) -> Result<f64, ModelError> {
        out[1..].fill(0);
        Ok(1.0)
    }

    fn enabled_events(&self, state: &[u32], timed: &mut Vec<EventId>, immediate: &mut Vec<EventId>) -> Result<(), ModelError> {
        let (q1, q2, routing) = (state[1], state[2], state[3] == 1);
        if routing {
            if q1 < self.capacity {
                immediate.push(ROUTE_1);
            }
            if q2 < self.capacity {
                immediate.push(ROUTE_2);
            }
            if q1 == self.capacity && q2 == self.capacity {
                immediate.push(DROP);
            }
            return Ok(());
        }
        timed.push(ARRIVE);
        if q1 > 0 {
            timed.push(SERVE_1);
        }
        if q2 > 0 {
            timed.push(SERVE_2);
        }
        Ok(())
    }

    fn next_state(&self, event: EventId, state: &[u32], out: &mut [u32]) -> Result<(), ModelError> {
        out.copy_from_slice(state);
        match event {
            ARRIVE => out[3] = 1,
            SERVE_1 => out[1] -= 1,
            SERVE_2 => out[2] -= 1,
            ROUTE_1 => (out[1], out[3]) = (out[1] + 1, 0),
            ROUTE_2 => (out[2], out[3]) = (out[2] + 1, 0),
            DROP => out[3] = 0,
            _ => return Err(ModelError::new(format!("unknown event {}", event))),
        }
        Ok(())
    }

    fn weight(&self, event: EventId, _: &[u32]) -> Result<f64, ModelError> {
        Ok(match event {
            ROUTE_1 => self.p,
            ROUTE_2 => 1.0 - self.p,
            _ => 1.0,
        })
    }

    fn rate(&self, event: EventId, _: &[u32]) -> Result<f64, ModelError> {
        Ok(match event {
            ARRIVE => 1.0,
            SERVE_1 => 0.8,
            _ => 0.5,
        })
    }

    fn check_assertions(&self, state: &[u32]) -> Result<bool, ModelError> {
        Ok(state[1] <= self.capacity && state[2] <= self.capacity)
    }

    fn event_name(&self, event: EventId) -> String {
        ["arrive", "serve1", "serve2", "route1", "route2", "drop"]
            .get(event)
            .map_or_else(|| format!("e{}", event), |s| s.to_string())
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let strategy = if args.batched {
        PartitionStrategy::Batched(RefillPolicy::Lazy)
    } else {
        PartitionStrategy::Single
    };
    let config = ExplorerConfig {
        tangible: strategy,
        vanishing: strategy,
        policy: if args.structural {
            VanishingPolicy::Structural
        } else {
            VanishingPolicy::Transitive
        },
        states_only: args.states_only,
        ..Default::default()
    };

    let model = Router {
        capacity: args.capacity,
        p: args.p,
    };
    let mut builder = RelationBuilder::new(
        RelationConfig::new(model.num_variables())
            .weighted(!args.unweighted)
            .batch_size(args.batch_size),
    );
    let mut explorer = Explorer::new(model, config);

    let stats = explorer.run(&mut builder)?;
    println!("{}", stats);

    if let Some(root) = builder.root() {
        println!("edges = {}", builder.edge_count(root));
        println!("total rate = {}", builder.total_weight(root));
        if args.print {
            for (from, to, weight) in builder.edges(root) {
                println!("  {:?} -> {:?}: {}", &from[1..], &to[1..], weight);
            }
        }
    }
    builder.check_invariants().map_err(|e| color_eyre::eyre::eyre!(e))?;

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
