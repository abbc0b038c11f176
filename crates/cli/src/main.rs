//! `supermarket`: sales reports over the supermarket document store.
//!
//! # Commands
//!
//! - `report <name>`: run a report (`sales-with-products`, `detailed-sales`,
//!   `sales-by-category`) and print the envelope as JSON.
//! - `pipeline <name>`: explain a report's aggregation stages.
//! - `list`, `get`, `products-by-category`, `sales-by-customer`: catalog reads.
//! - `import <file>`: replace collections with the contents of a JSON fixture.
//!
//! Store selection comes from `SUPERMARKET_*` variables; the global flags
//! override them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use supermarket_core::{CategoryId, CustomerId, ProductId, SaleId, SupplierId};
use supermarket_infra::{
    Catalog, DocumentStore, Fixture, ReportRunner, StoreConfig, StoreKind, import_fixture,
    open_store,
};
use supermarket_parties::{Customer, Supplier};
use supermarket_products::{Category, Product};
use supermarket_reports::ReportKind;
use supermarket_sales::Sale;

mod output;

#[derive(Parser, Debug)]
#[command(name = "supermarket")]
#[command(about = "Sales reports over the supermarket document store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Store backend (mongodb, memory)
    #[arg(long = "store", global = true, env = "SUPERMARKET_STORE")]
    kind: Option<StoreKind>,

    /// MongoDB connection string
    #[arg(long, global = true, env = "SUPERMARKET_MONGO_URI")]
    mongo_uri: Option<String>,

    /// Database name
    #[arg(long, global = true, env = "SUPERMARKET_DATABASE")]
    database: Option<String>,

    /// JSON fixture loaded into the memory store at startup
    #[arg(long, global = true, env = "SUPERMARKET_FIXTURE")]
    fixture: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the aggregation pipeline behind a report
    Pipeline {
        name: ReportKind,
        /// Print only the JSON pipeline
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that read or write the document store.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Run a report and print its rows
    Report {
        /// sales-with-products, detailed-sales or sales-by-category
        name: ReportKind,
        /// Only this customer's sales (sales-with-products only)
        #[arg(long)]
        customer: Option<i64>,
    },
    /// List every record of a collection
    List { collection: CollectionArg },
    /// Fetch one record by id
    Get { collection: CollectionArg, id: i64 },
    /// Products of one category
    ProductsByCategory { id: i64 },
    /// Sales of one customer
    SalesByCustomer { id: i64 },
    /// Replace collections with the contents of a JSON fixture
    Import { file: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CollectionArg {
    #[value(alias = "categories")]
    Categorias,
    #[value(alias = "suppliers")]
    Proveedores,
    #[value(alias = "customers")]
    Clientes,
    #[value(alias = "products")]
    Productos,
    #[value(alias = "sales")]
    Ventas,
}

impl StoreArgs {
    fn store_config(&self) -> anyhow::Result<StoreConfig> {
        let mut config = StoreConfig::from_env().context("invalid store configuration")?;
        if let Some(kind) = self.kind {
            config.kind = kind;
        }
        if let Some(uri) = &self.mongo_uri {
            config.mongo_uri = uri.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(fixture) = &self.fixture {
            config.fixture = Some(fixture.clone());
        }
        config.validate().context("invalid store configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    supermarket_observability::init();

    let cli = Cli::parse();
    match cli.command {
        // Explaining a pipeline needs no store.
        Commands::Pipeline { name, json } => explain(name, json),
        Commands::Store(command) => {
            let config = cli.store.store_config()?;
            let store = open_store(&config)
                .await
                .with_context(|| format!("failed to open {} store", config.kind))?;
            info!(backend = store.backend(), database = %config.database, "store opened");
            run(command, store).await
        }
    }
}

fn explain(report: ReportKind, json_only: bool) -> anyhow::Result<()> {
    let explain = report.explain();
    if !json_only {
        let title = format!(
            "{} ({} stages on `{}`)",
            explain.report,
            explain.steps.len(),
            explain.collection
        );
        output::print_steps(&title, &explain.steps)?;
    }
    output::print_json(&explain.pipeline)
}

async fn run(command: StoreCommand, store: Arc<dyn DocumentStore>) -> anyhow::Result<()> {
    match command {
        StoreCommand::Report { name, customer } => {
            let runner = ReportRunner::new(store);
            match (name, customer) {
                (ReportKind::SalesWithProducts, None) => {
                    output::print_json(&runner.sales_with_products().await?)
                }
                (ReportKind::SalesWithProducts, Some(id)) => output::print_json(
                    &runner
                        .sales_with_products_for_customer(CustomerId::new(id))
                        .await?,
                ),
                (_, Some(_)) => bail!("--customer only applies to {}", ReportKind::SalesWithProducts),
                (ReportKind::DetailedSales, None) => output::print_json(&runner.detailed_sales().await?),
                (ReportKind::SalesByCategory, None) => {
                    output::print_json(&runner.sales_by_category().await?)
                }
            }
        }
        StoreCommand::List { collection } => {
            let catalog = Catalog::new(store);
            match collection {
                CollectionArg::Categorias => output::print_json(&catalog.list::<Category>().await?),
                CollectionArg::Proveedores => output::print_json(&catalog.list::<Supplier>().await?),
                CollectionArg::Clientes => output::print_json(&catalog.list::<Customer>().await?),
                CollectionArg::Productos => output::print_json(&catalog.list::<Product>().await?),
                CollectionArg::Ventas => output::print_json(&catalog.list::<Sale>().await?),
            }
        }
        StoreCommand::Get { collection, id } => {
            let catalog = Catalog::new(store);
            match collection {
                CollectionArg::Categorias => {
                    output::print_json(&catalog.get::<Category>(CategoryId::new(id)).await?)
                }
                CollectionArg::Proveedores => {
                    output::print_json(&catalog.get::<Supplier>(SupplierId::new(id)).await?)
                }
                CollectionArg::Clientes => {
                    output::print_json(&catalog.get::<Customer>(CustomerId::new(id)).await?)
                }
                CollectionArg::Productos => {
                    output::print_json(&catalog.get::<Product>(ProductId::new(id)).await?)
                }
                CollectionArg::Ventas => {
                    output::print_json(&catalog.get::<Sale>(SaleId::new(id)).await?)
                }
            }
        }
        StoreCommand::ProductsByCategory { id } => {
            let catalog = Catalog::new(store);
            output::print_json(&catalog.products_by_category(CategoryId::new(id)).await?)
        }
        StoreCommand::SalesByCustomer { id } => {
            let catalog = Catalog::new(store);
            output::print_json(&catalog.sales_by_customer(CustomerId::new(id)).await?)
        }
        StoreCommand::Import { file } => {
            let fixture = Fixture::from_path(&file)?;
            let summary = import_fixture(store.as_ref(), &fixture).await?;
            info!(file = %file.display(), documents = summary.total(), "import finished");
            output::print_json(&summary)
        }
    }
}
