use std::io::{self, Write};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{ArgAction, Args, Parser, Subcommand};
use freight_desk::{
    config::{self, AppConfig},
    models::{parse_date, Customer, EntityStatus, Lifecycle, PageRequest, Port, Quotation, Record, StatusFilter},
    services::{
        AppServices, AutoConfirm, ConfirmationPrompt, DateRange, EntityFacade, JobOrderRow, JocRow, ListFilters,
        MutationOutcome, TextFilter,
    },
};
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;
    let prompt: Box<dyn ConfirmationPrompt> = if cli.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(StdinPrompt)
    };
    let out = Output {
        json: cli.json,
        prompt: prompt.as_ref(),
    };
    let services = &context.services;

    match cli.command {
        Commands::Quotation(command) => match command {
            QuotationCommands::Common(common) => handle_lifecycle(&context, &services.quotations, common, &out).await?,
            QuotationCommands::Copy(args) => {
                let copy = services
                    .quotations
                    .copy(&args.key)
                    .await
                    .with_context(|| format!("failed to copy quotation {}", args.key))?;
                out.record(&copy)?;
            }
        },
        Commands::Jo(command) => match command {
            RecordCommands::List(args) => {
                let (page, filters) = context.list_request(&args)?;
                let rows = services.job_order_rows(page, &filters).await?;
                out.rows(&rows, render_job_order_row)?;
            }
            other => handle_record(&services.job_orders, other, &out).await?,
        },
        Commands::Joc(command) => match command {
            LifecycleCommands::List(args) => {
                let (page, filters) = context.list_request(&args)?;
                let rows = services.joc_rows(page, &filters).await?;
                out.rows(&rows, render_joc_row)?;
            }
            other => handle_lifecycle(&context, &services.jocs, other, &out).await?,
        },
        Commands::Customer(command) => match command {
            RecordCommands::List(args) => list_records(&context, &services.customers, &args, &out).await?,
            other => handle_record(&services.customers, other, &out).await?,
        },
        Commands::Port(command) => match command {
            RecordCommands::List(args) => list_records(&context, &services.ports, &args, &out).await?,
            other => handle_record(&services.ports, other, &out).await?,
        },
        Commands::Print(command) => match command {
            PrintCommands::Quotation(args) => print_json(&services.print_quotation(&args.key).await?)?,
            PrintCommands::Jo(args) => print_json(&services.print_job_order(&args.key).await?)?,
            PrintCommands::Joc(args) => print_json(&services.print_joc(&args.key).await?)?,
        },
    }

    if !cli.json {
        if let Some(notification) = services.notifications.latest() {
            println!("{}", notification.message);
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "freight-cli", about = "Freight back-office operator CLI", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Answer yes to every confirmation"
    )]
    yes: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Quotation(QuotationCommands),
    #[command(subcommand)]
    Jo(RecordCommands),
    #[command(subcommand)]
    Joc(LifecycleCommands),
    #[command(subcommand)]
    Customer(RecordCommands),
    #[command(subcommand)]
    Port(RecordCommands),
    #[command(subcommand)]
    Print(PrintCommands),
}

#[derive(Subcommand)]
enum QuotationCommands {
    #[command(flatten)]
    Common(LifecycleCommands),
    /// Copy a quotation under a new number
    Copy(KeyArgs),
}

#[derive(Subcommand)]
enum LifecycleCommands {
    List(ListArgs),
    Show(KeyArgs),
    Delete(KeyArgs),
    Execute(KeyArgs),
    Cancel(KeyArgs),
}

#[derive(Subcommand)]
enum RecordCommands {
    List(ListArgs),
    Show(KeyArgs),
    Delete(KeyArgs),
}

#[derive(Subcommand)]
enum PrintCommands {
    Quotation(KeyArgs),
    Jo(KeyArgs),
    Joc(KeyArgs),
}

#[derive(Args)]
struct KeyArgs {
    #[arg(help = "Record number, e.g. QUO-0001")]
    key: String,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value_t = 1, help = "Server page, starting at 1")]
    page: u64,
    #[arg(long, help = "Rows per page; capped by max_page_size")]
    limit: Option<u64>,
    #[arg(long, help = "Field searched by --search", default_value = "customer")]
    field: String,
    #[arg(long, help = "Case-insensitive text searched on the fetched page only")]
    search: Option<String>,
    #[arg(long, help = "all, InProgress, Executed or Cancel")]
    status: Option<String>,
    #[arg(long, requires = "until", help = "First creation date of the period")]
    from: Option<String>,
    #[arg(long, requires = "from", help = "Last creation date of the period")]
    until: Option<String>,
}

struct CliContext {
    config: AppConfig,
    services: AppServices,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);
        debug!(target: "freight_cli", api = %config.api_base_url, "starting");
        let services = AppServices::connect(config.clone()).context("failed to set up backend access")?;
        Ok(Self { config, services })
    }

    fn list_request(&self, args: &ListArgs) -> Result<(PageRequest, ListFilters)> {
        let page = PageRequest::new(args.page, self.config.page_size(args.limit));
        let status = match &args.status {
            Some(raw) => raw
                .parse::<StatusFilter>()
                .map_err(|_| anyhow!("unknown status filter '{}'", raw))?,
            None => StatusFilter::All,
        };
        let period = match (&args.from, &args.until) {
            (Some(from), Some(until)) => {
                let from = parse_date(from).ok_or_else(|| anyhow!("invalid --from date '{}'", from))?;
                let until = parse_date(until).ok_or_else(|| anyhow!("invalid --until date '{}'", until))?;
                Some(DateRange::new(from, until)?)
            }
            _ => None,
        };
        let filters = ListFilters {
            text: args.search.as_ref().map(|value| TextFilter::new(args.field.clone(), value.clone())),
            status,
            period,
        };
        Ok((page, filters))
    }
}

struct StdinPrompt;

#[async_trait]
impl ConfirmationPrompt for StdinPrompt {
    async fn confirm(&self, question: &str) -> bool {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            print!("{} [y/N] ", question);
            if io::stdout().flush().is_err() {
                return false;
            }
            let mut answer = String::new();
            if io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

struct Output<'a> {
    json: bool,
    prompt: &'a dyn ConfirmationPrompt,
}

impl Output<'_> {
    fn record<E: Record + Render>(&self, record: &E) -> Result<()> {
        if self.json {
            return print_json(record);
        }
        println!("{}", record.line());
        Ok(())
    }

    fn rows<T: Serialize>(&self, rows: &[T], render: fn(&T) -> String) -> Result<()> {
        if self.json {
            return print_json(&rows);
        }
        if rows.is_empty() {
            println!("No records.");
        }
        for row in rows {
            println!("{}", render(row));
        }
        Ok(())
    }

    fn outcome<T>(&self, outcome: &MutationOutcome<T>) {
        if matches!(outcome, MutationOutcome::Declined) && !self.json {
            println!("Cancelled; nothing was changed.");
        }
    }
}

async fn list_records<E: Record + Render>(
    context: &CliContext,
    facade: &EntityFacade<E>,
    args: &ListArgs,
    out: &Output<'_>,
) -> Result<()> {
    let (page, filters) = context.list_request(args)?;
    let page = facade.list(page, &filters).await?;
    if out.json {
        return print_json(&page);
    }
    out.rows(&page.data, |record: &E| record.line())?;
    println!(
        "Page {} of {} ({} records)",
        page.pagination.current_page, page.pagination.total_page, page.pagination.total
    );
    Ok(())
}

async fn handle_record<E: Record + Render>(
    facade: &EntityFacade<E>,
    command: RecordCommands,
    out: &Output<'_>,
) -> Result<()> {
    match command {
        RecordCommands::List(_) => bail!("list is handled per entity"),
        RecordCommands::Show(args) => {
            let record = facade
                .get(&args.key)
                .await
                .with_context(|| format!("failed to load {} {}", E::KIND.label(), args.key))?;
            out.record(&record)
        }
        RecordCommands::Delete(args) => {
            let outcome = facade.delete(&args.key, out.prompt).await?;
            out.outcome(&outcome);
            Ok(())
        }
    }
}

async fn handle_lifecycle<E: Lifecycle + Render>(
    context: &CliContext,
    facade: &EntityFacade<E>,
    command: LifecycleCommands,
    out: &Output<'_>,
) -> Result<()> {
    let target = match command {
        LifecycleCommands::List(args) => return list_records(context, facade, &args, out).await,
        LifecycleCommands::Show(args) => return handle_record(facade, RecordCommands::Show(args), out).await,
        LifecycleCommands::Delete(args) => return handle_record(facade, RecordCommands::Delete(args), out).await,
        LifecycleCommands::Execute(args) => (args, EntityStatus::Executed),
        LifecycleCommands::Cancel(args) => (args, EntityStatus::Cancel),
    };
    let (args, status) = target;
    let outcome = facade.set_status(&args.key, status, out.prompt).await?;
    out.outcome(&outcome);
    if let MutationOutcome::Applied(record) = outcome {
        out.record(&record)?;
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line rendering for plain output.
trait Render {
    fn line(&self) -> String;
}

impl Render for Quotation {
    fn line(&self) -> String {
        format!(
            "- {} • {} • {} {} {} → {} • sales {} • {}",
            self.quo_no, self.customer, self.quotation_type, self.delivery, self.loading, self.discharge, self.sales,
            self.status
        )
    }
}

impl Render for freight_desk::models::Joc {
    fn line(&self) -> String {
        format!(
            "- {} • MBL {} • {} • {} → {} • {} JO • {}",
            self.joc_no,
            self.no_mbl,
            self.vessel,
            self.loading,
            self.discharge,
            self.jo_no.len(),
            self.status
        )
    }
}

impl Render for freight_desk::models::JobOrder {
    fn line(&self) -> String {
        format!(
            "- {} • quotation {} • {} → {} • {}",
            self.jo_no, self.quo_no, self.shipper, self.consignee, self.vessel
        )
    }
}

impl Render for Customer {
    fn line(&self) -> String {
        format!("- {} • {} • {}", self.customer_code, self.partner_name, self.unit)
    }
}

impl Render for Port {
    fn line(&self) -> String {
        format!("- {} • {} {}", self.port_code, self.port_name, self.caption)
    }
}

fn render_job_order_row(row: &JobOrderRow) -> String {
    format!(
        "{} • sales {} • {} {} → {} • {}",
        row.job_order.line(),
        row.sales,
        row.quotation_type,
        row.loading,
        row.discharge,
        row.customer_name
    )
}

fn render_joc_row(row: &JocRow) -> String {
    let members: Vec<String> = row
        .members
        .iter()
        .map(|m| format!("{} ({})", m.jo_no, m.shipper))
        .collect();
    format!("{} • {}", row.joc.line(), members.join(", "))
}
