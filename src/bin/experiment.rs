use anyhow::Context;
use clap::Parser;
use knapsack_eval::app::pipelines::{
    run_file_paths, AggregateJob, AggregatePipeline, TrainJob, TrainPipeline,
};
use knapsack_eval::config::toml_config::ExperimentConfig;
use knapsack_eval::core::aggregate::DEFAULT_RUN_PATTERN;
use knapsack_eval::core::catalog::{render_catalog, CatalogLoader};
use knapsack_eval::core::generate::generate_catalog;
use knapsack_eval::core::genetic::GeneticConfig;
use knapsack_eval::core::{greedy, AveragedCurve, Pipeline, Storage};
use knapsack_eval::utils::{logger, validation::Validate};
use knapsack_eval::{EtlEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "experiment")]
#[command(about = "Sweeps one genetic parameter and compares the averaged curves with the greedy baseline")]
struct Args {
    /// Path to TOML experiment file
    #[arg(short, long, default_value = "experiment.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Worker threads per training repetition, 0 uses all cores
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Dry run - show the planned runs without training
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting experiment runner");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = ExperimentConfig::from_file(&args.config)
        .with_context(|| format!("failed to load experiment file '{}'", args.config))?;
    config
        .validate()
        .context("experiment configuration is invalid")?;
    let sweep = config.sweep_configs()?;

    display_plan(&config, &sweep);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No training will occur");
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(".".to_string());

    if let Some(spec) = &config.catalog.generate {
        let spec = spec.clone();
        let loaded = tokio::task::spawn_blocking(move || generate_catalog(&spec))
            .await
            .context("catalog generation task failed")?
            .context("catalog generation failed")?;
        storage
            .write_file(&config.catalog.path, render_catalog(&loaded)?.as_bytes())
            .await
            .with_context(|| format!("failed to write catalog '{}'", config.catalog.path))?;
        tracing::info!(
            "🎲 Generated {} items into {}",
            loaded.catalog.len(),
            config.catalog.path
        );
    }

    let loaded = CatalogLoader::new(&storage)
        .load(&config.catalog.path)
        .await
        .with_context(|| format!("failed to load catalog '{}'", config.catalog.path))?;
    let baseline = greedy::select(&loaded.catalog, &loaded.limits)?;
    tracing::info!("📏 Greedy baseline: {}", baseline.total_cost);

    let mut run_files = Vec::new();
    for (label, genetic) in sweep {
        let job = TrainJob {
            catalog_path: config.catalog.path.clone(),
            label: label.clone(),
            repetitions: config.sweep.repetitions,
            seed: config.sweep.seed,
            genetic,
            output_dir: config.output.run_dir.clone(),
            check_difficulty: !config.catalog.skip_difficulty_check,
            workers: args.workers,
        };
        run_files.extend(run_file_paths(&job));

        tracing::info!("🧬 {} = {}", config.sweep.parameter.as_str(), label);
        let pipeline = TrainPipeline::new(storage.clone(), job);
        EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
            .run()
            .await
            .with_context(|| {
                format!(
                    "training failed for {} = {}",
                    config.sweep.parameter.as_str(),
                    label
                )
            })?;
    }

    let pipeline = AggregatePipeline::new(
        storage.clone(),
        AggregateJob {
            run_files,
            pattern: DEFAULT_RUN_PATTERN.to_string(),
            output_file: Some(config.output.summary_file.clone()),
            json_file: config.output.json_file.clone(),
        },
    )?;
    let runs = pipeline.extract().await?;
    let curves = pipeline.transform(runs).await?;
    report_against_baseline(&config, &curves, baseline.total_cost);
    let summary = pipeline.load(curves).await?;

    tracing::info!("✅ Experiment '{}' completed", config.experiment.name);
    println!("📁 Summary saved to: {}", summary);
    Ok(())
}

fn display_plan(config: &ExperimentConfig, sweep: &[(String, GeneticConfig)]) {
    tracing::info!("📋 Experiment: {}", config.experiment.name);
    if !config.experiment.description.is_empty() {
        tracing::info!("   {}", config.experiment.description);
    }
    match &config.catalog.generate {
        Some(spec) => tracing::info!(
            "   Catalog: generate {} objects (limits {}/{}) into {}",
            spec.number_of_objects,
            spec.max_weight,
            spec.max_size,
            config.catalog.path
        ),
        None => tracing::info!("   Catalog: {}", config.catalog.path),
    }
    tracing::info!(
        "   Sweep: {} over {} value(s), {} repetition(s) each, base seed {}",
        config.sweep.parameter.as_str(),
        sweep.len(),
        config.sweep.repetitions,
        config.sweep.seed
    );
    for (label, genetic) in sweep {
        tracing::info!(
            "   - {}: population {}, tournament {}, crossover {}, mutation {}, {} generations",
            label,
            genetic.population_size,
            genetic.tournament_size,
            genetic.crossover_probability,
            genetic.mutation_probability,
            genetic.generation_limit
        );
    }
    tracing::info!("   Runs: {}", config.output.run_dir);
    tracing::info!("   Summary: {}", config.output.summary_file);
}

fn report_against_baseline(config: &ExperimentConfig, curves: &[AveragedCurve], baseline: u64) {
    println!(
        "{:>12} {:>14} {:>10}",
        config.sweep.parameter.as_str(),
        "final average",
        "vs greedy"
    );
    for curve in curves {
        let last = curve.values.last().copied().unwrap_or(0.0);
        let ratio = if baseline == 0 {
            f64::NAN
        } else {
            last / baseline as f64
        };
        println!("{:>12} {:>14.2} {:>10.3}", curve.parameter, last, ratio);
    }

    let best = curves.iter().max_by(|a, b| {
        let a = a.values.last().copied().unwrap_or(0.0);
        let b = b.values.last().copied().unwrap_or(0.0);
        a.total_cmp(&b)
    });
    if let Some(best) = best {
        tracing::info!(
            "🏆 Best {}: {} (final average {:.2}, greedy baseline {})",
            config.sweep.parameter.as_str(),
            best.parameter,
            best.values.last().copied().unwrap_or(0.0),
            baseline
        );
    }
}
