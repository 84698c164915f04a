use clap::Parser;
use knapsack_eval::app::pipelines::{AggregatePipeline, GreedyPipeline, TrainPipeline};
use knapsack_eval::config::{Command, GenerateArgs, PrintCatalogArgs};
use knapsack_eval::core::catalog::{render_catalog, CatalogLoader};
use knapsack_eval::core::generate::generate_catalog;
use knapsack_eval::core::greedy;
use knapsack_eval::core::Storage;
use knapsack_eval::utils::logger;
use knapsack_eval::{CliConfig, EtlEngine, EvalError, LocalStorage, Result};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_logger(config.verbose, config.json_logs);

    tracing::debug!("CLI config: {:?}", config);
    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(config: CliConfig) -> Result<()> {
    let storage = LocalStorage::new(".".to_string());
    let monitor = config.monitor;

    match config.command {
        Command::Generate(args) => generate(&storage, &args).await,
        Command::Train(args) => {
            let pipeline = TrainPipeline::new(storage, args.to_job());
            let output_dir = EtlEngine::new_with_monitoring(pipeline, monitor)
                .run()
                .await?;
            tracing::info!("📁 Run files saved to: {}", output_dir);
            Ok(())
        }
        Command::Greedy(args) => {
            let pipeline = GreedyPipeline::new(storage, args.to_job());
            EtlEngine::new_with_monitoring(pipeline, monitor)
                .run()
                .await?;
            Ok(())
        }
        Command::Aggregate(args) => {
            let pipeline = AggregatePipeline::new(storage, args.to_job())?;
            EtlEngine::new_with_monitoring(pipeline, monitor)
                .run()
                .await?;
            Ok(())
        }
        Command::PrintCatalog(args) => print_catalog(&storage, &args).await,
    }
}

async fn generate(storage: &LocalStorage, args: &GenerateArgs) -> Result<()> {
    let spec = args.to_spec();
    spec.validate()?;

    let loaded = tokio::task::spawn_blocking(move || generate_catalog(&spec))
        .await
        .map_err(|e| EvalError::ProcessingError {
            message: format!("generation task failed: {}", e),
        })??;

    storage
        .write_file(&args.output_file, render_catalog(&loaded)?.as_bytes())
        .await?;

    tracing::info!(
        "✅ Generated {} items (total weight {}, total size {}) into {}",
        loaded.catalog.len(),
        loaded.catalog.total_weight(),
        loaded.catalog.total_size(),
        args.output_file
    );
    Ok(())
}

async fn print_catalog(storage: &LocalStorage, args: &PrintCatalogArgs) -> Result<()> {
    let loaded = CatalogLoader::new(storage).load(&args.input_file).await?;
    let baseline = greedy::select(&loaded.catalog, &loaded.limits)?;

    println!("Catalog: {}", args.input_file);
    println!("Objects: {}", loaded.catalog.len());
    println!(
        "Limits: max_weight {}, max_size {}",
        loaded.limits.max_weight, loaded.limits.max_size
    );
    println!(
        "Totals: weight {}, size {}, cost {}",
        loaded.catalog.total_weight(),
        loaded.catalog.total_size(),
        loaded.catalog.total_cost()
    );
    println!(
        "Greedy baseline: cost {} ({} items, weight {}, size {})",
        baseline.total_cost,
        baseline.selected.len(),
        baseline.total_weight,
        baseline.total_size
    );

    if args.items {
        println!("{:>6} {:>8} {:>8} {:>8} {:>10}", "index", "weight", "size", "cost", "density");
        for (index, item) in loaded.catalog.items.iter().enumerate() {
            println!(
                "{:>6} {:>8} {:>8} {:>8} {:>10.4}",
                index,
                item.weight,
                item.size,
                item.cost,
                item.density()
            );
        }
    }

    Ok(())
}
