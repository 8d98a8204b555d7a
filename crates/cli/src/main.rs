//! `fmx`: query a FileMaker Web Publishing Engine from the command line.

mod auth;
mod formatter;

use {
    anyhow::{bail, Context, Result},
    clap::{Args, Parser, Subcommand},
    filemaker_client::{
        config::Options,
        query::{Criterion, FindRequest},
        Layout, RequestOptions, Resolve, Server, SortOrder,
    },
    formatter::{ColorMode, OutputFormat},
    indexmap::IndexMap,
    std::{path::PathBuf, sync::Arc},
    tracing::debug,
    tracing_subscriber::EnvFilter,
};

#[derive(Debug, Parser)]
#[command(name = "fmx", version, about = "FileMaker XML Web Publishing client")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Config file; defaults to the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override group from the config file (repeatable, applied in order)
    #[arg(long = "profile", global = true)]
    profiles: Vec<String>,

    #[arg(long, env = "FMX_HOST", global = true)]
    host: Option<String>,

    #[arg(long, global = true)]
    port: Option<u16>,

    #[arg(long, env = "FMX_ACCOUNT", global = true)]
    account: Option<String>,

    #[arg(long, env = "FMX_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    #[arg(long, short = 'd', global = true)]
    database: Option<String>,

    #[arg(long, short = 'l', global = true)]
    layout: Option<String>,

    /// Talk plain HTTP
    #[arg(long, global = true)]
    no_ssl: bool,

    /// Log every request sent
    #[arg(long, global = true)]
    log_actions: bool,

    #[arg(long, value_enum, default_value = "json", global = true)]
    format: OutputFormat,

    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorMode,
}

#[derive(Debug, Args)]
struct PageArgs {
    /// Most records to return
    #[arg(long)]
    max: Option<usize>,

    /// Records to skip
    #[arg(long)]
    skip: Option<usize>,

    /// Sort field; prefix with `-` to sort descending (repeatable)
    #[arg(long = "sort", allow_hyphen_values = true)]
    sort: Vec<String>,
}

impl PageArgs {
    fn request(&self) -> RequestOptions {
        let mut request = RequestOptions::default();
        request.max_records = self.max;
        request.skip_records = self.skip;
        for field in &self.sort {
            request = match field.strip_prefix('-') {
                Some(field) => request.sort(field, SortOrder::Descend),
                None => request.sort(field.as_str(), SortOrder::Ascend),
            };
        }
        request
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List databases
    Databases,
    /// List layouts of the database
    Layouts,
    /// List scripts of the database
    Scripts,
    /// Every record of the layout
    All {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Find records by `field=value` pairs; repeat a field to match any of its values
    Find {
        #[arg(required = true)]
        criteria: Vec<String>,

        /// Omit the matching records instead
        #[arg(long)]
        omit: bool,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Layout field definitions and counts, without records
    View,
    /// Field controls and value lists of the layout
    LayoutMeta,
    /// Size of the found set for `field=value` pairs
    Count {
        #[arg(required = true)]
        criteria: Vec<String>,
    },
    /// Store the account's password in the system keyring
    Login,
    /// Remove the account's password from the system keyring
    Logout,
}

/// Groups `field=value` pairs into one find request.
fn parse_criteria(pairs: &[String], omit: bool) -> Result<FindRequest> {
    let mut fields: IndexMap<String, Vec<String>> = IndexMap::new();
    for pair in pairs {
        let Some((field, value)) = pair.split_once('=') else {
            bail!("criteria must look like field=value, got {pair:?}");
        };
        fields
            .entry(field.trim().to_string())
            .or_default()
            .push(value.to_string());
    }

    let mut request = FindRequest::new();
    for (field, mut values) in fields {
        let criterion = if values.len() == 1 {
            Criterion::One(values.remove(0))
        } else {
            Criterion::Any(values)
        };
        request = request.field(field, criterion);
    }
    Ok(if omit { request.omit() } else { request })
}

struct App {
    server: Server,
    args: GlobalArgs,
}

impl App {
    fn new(args: GlobalArgs) -> Result<Self> {
        let chain = Arc::new(auth::load_config(args.config.as_deref())?);
        let mut local = Options {
            host: args.host.clone(),
            port: args.port,
            account_name: args.account.clone(),
            password: args.password.clone(),
            use_groups: args.profiles.clone(),
            ..Options::default()
        };
        if args.no_ssl {
            local.ssl = Some(false);
        }
        if args.log_actions {
            local.log_actions = Some(true);
        }

        let effective = chain.resolve(&local);
        if local.password.is_none() && effective.password.is_empty() {
            local.password =
                auth::resolve_password(None, &effective.account_name, &effective.host);
        }
        debug!(host = %effective.host, account = %effective.account_name, "resolved connection");

        Ok(Self {
            server: Server::with_resolver(chain, local),
            args,
        })
    }

    fn database_name(&self) -> Result<String> {
        let resolved = self.server.connection(self.server.options());
        self.args
            .database
            .clone()
            .or_else(|| resolved.options().database.clone())
            .context("no database given; pass --database or set one in the config")
    }

    fn layout(&self) -> Result<Layout> {
        let resolved = self.server.connection(self.server.options());
        let layout = self
            .args
            .layout
            .clone()
            .or_else(|| resolved.options().layout.clone())
            .context("no layout given; pass --layout or set one in the config")?;
        Ok(self.server.database(self.database_name()?).layout(layout))
    }

    fn print(&self, value: &impl serde::Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let colorize = self.args.color.should_colorize();
        println!("{}", formatter::render(&value, self.args.format, colorize)?);
        Ok(())
    }

    fn stored_password(&self) -> Result<auth::StoredPassword> {
        let resolved = self.server.connection(self.server.options());
        let options = resolved.options();
        if options.account_name.is_empty() {
            bail!("no account given; pass --account or set account_name in the config");
        }
        auth::StoredPassword::for_account(&options.account_name, &options.host)
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Databases => self.print(&self.server.databases().await?),
            Command::Layouts => {
                let database = self.server.database(self.database_name()?);
                self.print(&database.layouts().await?)
            }
            Command::Scripts => {
                let database = self.server.database(self.database_name()?);
                self.print(&database.scripts().await?)
            }
            Command::All { page } => {
                let found = self.layout()?.all(page.request()).await?;
                self.print(&found)?;
                self.summary(found.len(), found.foundset_count(), found.total_count());
                Ok(())
            }
            Command::Find {
                criteria,
                omit,
                page,
            } => {
                let request = parse_criteria(&criteria, omit)?;
                let found = self.layout()?.find(request, page.request()).await?;
                self.print(&found)?;
                self.summary(found.len(), found.foundset_count(), found.total_count());
                Ok(())
            }
            Command::View => {
                let view = self.layout()?.view(RequestOptions::default()).await?;
                self.print(&serde_json::json!({
                    "fields": view.field_names(),
                    "total_count": view.total_count(),
                    "product": view.meta().product(),
                }))
            }
            Command::LayoutMeta => self.print(self.layout()?.meta().await?.as_ref()),
            Command::Count { criteria } => {
                let count = self.layout()?.count(parse_criteria(&criteria, false)?).await?;
                self.print(&count)
            }
            Command::Login => {
                let stored = self.stored_password()?;
                let password = rpassword::prompt_password(format!("Password for {}: ", stored.user()))
                    .context("Failed to read password")?;
                stored.save(&password)?;
                eprintln!("Stored password for {}", stored.user());
                Ok(())
            }
            Command::Logout => {
                let stored = self.stored_password()?;
                if stored.forget()? {
                    eprintln!("Removed password for {}", stored.user());
                } else {
                    eprintln!("No password stored for {}", stored.user());
                }
                Ok(())
            }
        }
    }

    fn summary(&self, shown: usize, found: usize, total: usize) {
        if self.args.format == OutputFormat::Pretty {
            let colorize = self.args.color.should_colorize();
            eprintln!("{}", formatter::format_counts(shown, found, total, colorize));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let app = App::new(cli.global)?;
    app.run(cli.command).await
}
