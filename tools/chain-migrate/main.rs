use chain_migrate::prelude::*;
use chain_migrate::save;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use semver::Version;
use std::fs;
use std::time::Instant;

/// Migrates chain save files to the current node schemas
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a chain, migrate it and write it back in the current format
    Migrate {
        /// Path to the chain save file
        chain_path: String,
        /// Path to the node schema JSON served by the backend
        #[arg(short, long)]
        schemas: String,
        /// Where to write the migrated chain (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
        /// Release version to stamp on the written file
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        app_version: String,
        /// Migration lock of the previous release to verify the schemas against
        #[arg(long)]
        lock: Option<String>,
    },
    /// Print what a save file contains without migrating its nodes
    Inspect {
        /// Path to the chain save file
        chain_path: String,
    },
    /// Print the global order in which node migrations are applied
    Plan {
        /// Path to the node schema JSON served by the backend
        #[arg(short, long)]
        schemas: String,
    },
    /// Record the current migration history of every schema
    Lock {
        /// Path to the node schema JSON served by the backend
        #[arg(short, long)]
        schemas: String,
        /// Where to write the lock file
        #[arg(short, long, default_value = "migrations.lock.json")]
        output: String,
    },
    /// Check that the schemas only appended migrations since a lock was written
    Verify {
        /// Path to the node schema JSON served by the backend
        #[arg(short, long)]
        schemas: String,
        /// Path to the lock file
        #[arg(short, long, default_value = "migrations.lock.json")]
        lock: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Migrate {
            chain_path,
            schemas,
            output,
            app_version,
            lock,
        } => run_migrate(&chain_path, &schemas, output, &app_version, lock),
        Command::Inspect { chain_path } => run_inspect(&chain_path),
        Command::Plan { schemas } => run_plan(&schemas),
        Command::Lock { schemas, output } => run_lock(&schemas, &output),
        Command::Verify { schemas, lock } => run_verify(&schemas, &lock),
    };

    if let Err(e) = result {
        exit_with_error(&e.to_string());
    }
}

fn read_file(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e).into())
}

fn load_schemas(path: &str) -> Result<Vec<NodeSchema>> {
    let json = read_file(path)?;
    Ok(SchemaDocument::from_json(&json)?.into_schemas()?)
}

fn run_migrate(
    chain_path: &str,
    schemas_path: &str,
    output: Option<String>,
    app_version: &str,
    lock_path: Option<String>,
) -> Result<()> {
    let total_start = Instant::now();
    let app_version = Version::parse(app_version)?;

    let mut builder = Migrator::builder(load_schemas(schemas_path)?);
    if let Some(lock_path) = lock_path {
        builder = builder.with_lock(MigrationLock::from_json(&read_file(&lock_path)?)?);
    }
    let migrator = builder.build()?;

    let raw = read_file(chain_path)?;
    let migrate_start = Instant::now();
    let loaded = migrator.load(&raw)?;
    let migrate_duration = migrate_start.elapsed();

    if loaded.tampered_with {
        eprintln!("Warning: '{}' was modified outside the editor", chain_path);
    }
    for schema_id in &loaded.report.unknown_schemas {
        eprintln!("Warning: unknown node type '{}' was left as-is", schema_id);
    }

    let saved = migrator.save(&loaded.graph, &app_version)?;
    match output {
        Some(path) => fs::write(&path, saved)?,
        None => println!("{}", saved),
    }

    eprintln!("\n--- Migration Summary ---");
    eprintln!(
        "Written By:           {}",
        loaded
            .version
            .as_ref()
            .map_or("pre-versioning release".to_string(), Version::to_string)
    );
    eprintln!("Legacy Steps Run:     {}", loaded.report.legacy_steps);
    eprintln!("Node Migrations:      {}", loaded.report.node_migrations);
    eprintln!("Migrated Nodes:       {}", loaded.report.migrated_nodes);
    eprintln!("Nodes / Edges:        {} / {}", loaded.graph.nodes.len(), loaded.graph.edges.len());
    eprintln!("Migration:            {:?}", migrate_duration);
    eprintln!("Total Execution:      {:?}", total_start.elapsed());
    Ok(())
}

fn run_inspect(chain_path: &str) -> Result<()> {
    let parsed = save::parse(&read_file(chain_path)?)?;
    println!(
        "Version:        {}",
        parsed
            .version
            .as_ref()
            .map_or("none (pre-versioning)".to_string(), Version::to_string)
    );
    println!("Timestamp:      {}", parsed.timestamp.as_deref().unwrap_or("-"));
    println!("Tampered With:  {}", parsed.tampered_with);
    println!("Legacy Steps:   {} of {}", parsed.legacy_steps_run, LEGACY_MIGRATION_COUNT);
    println!("Nodes:          {}", parsed.content.nodes.len());
    println!("Edges:          {}", parsed.content.edges.len());

    let counts = parsed
        .content
        .nodes
        .iter()
        .map(Node::schema_id)
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    for (schema_id, count) in counts {
        println!("  {:>4} x {}", count, schema_id);
    }
    Ok(())
}

fn run_plan(schemas_path: &str) -> Result<()> {
    let migrator = Migrator::new(load_schemas(schemas_path)?)?;
    for (position, task) in migrator.plan().tasks().iter().enumerate() {
        println!("{:>4}  {}  {}", position, task.key(), task.migration.kind());
    }
    Ok(())
}

fn run_lock(schemas_path: &str, output: &str) -> Result<()> {
    let registry = SchemaMigrationRegistry::new(load_schemas(schemas_path)?);
    let lock = MigrationLock::from_registry(&registry)?;
    fs::write(output, serde_json::to_string_pretty(&lock)?)?;
    println!(
        "Locked the migrations of {} schemas to '{}'",
        lock.schemata.len(),
        output
    );
    Ok(())
}

fn run_verify(schemas_path: &str, lock_path: &str) -> Result<()> {
    let registry = SchemaMigrationRegistry::new(load_schemas(schemas_path)?);
    let lock = MigrationLock::from_json(&read_file(lock_path)?)?;
    lock.verify(&registry)?;
    registry.plan()?;
    println!("All {} locked schemas only appended migrations", lock.schemata.len());
    Ok(())
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
