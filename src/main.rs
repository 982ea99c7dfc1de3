use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use xpns::cli::expenses::ExpenseFields;
use xpns::core::expense::Category;
use xpns::core::log::init_logging;
use xpns::core::period::Period;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Credentials {
    email: String,
    #[arg(short, long)]
    password: String,
}

#[derive(Args)]
struct FieldArgs {
    /// Title of the expense
    #[arg(short, long)]
    title: Option<String>,
    /// Amount spent
    #[arg(short, long)]
    amount: Option<f64>,
    /// Category, e.g. food-drinks, transport, home-bills
    #[arg(short = 'k', long)]
    category: Option<Category>,
    /// Currency code, defaults to the configured currency
    #[arg(short = 'u', long)]
    currency: Option<String>,
    /// Date of the expense as YYYY-MM-DD, defaults to now
    #[arg(short, long)]
    date: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl From<FieldArgs> for ExpenseFields {
    fn from(args: FieldArgs) -> Self {
        ExpenseFields {
            title: args.title,
            amount: args.amount,
            category: args.category,
            currency: args.currency,
            date: args.date,
            description: args.description,
        }
    }
}

impl From<Commands> for xpns::AppCommand {
    fn from(cmd: Commands) -> xpns::AppCommand {
        match cmd {
            Commands::Register(c) => xpns::AppCommand::Register {
                email: c.email,
                password: c.password,
            },
            Commands::Login(c) => xpns::AppCommand::Login {
                email: c.email,
                password: c.password,
            },
            Commands::Logout => xpns::AppCommand::Logout,
            Commands::Whoami => xpns::AppCommand::Whoami,
            Commands::Add(fields) => xpns::AppCommand::Add(fields.into()),
            Commands::Edit { id, fields } => xpns::AppCommand::Edit {
                id,
                fields: fields.into(),
            },
            Commands::Delete { id } => xpns::AppCommand::Delete { id },
            Commands::Show { id } => xpns::AppCommand::Show { id },
            Commands::List {
                search,
                prefix,
                category,
            } => xpns::AppCommand::List {
                search,
                prefix,
                categories: category,
            },
            Commands::Recent { count } => xpns::AppCommand::Recent { count },
            Commands::Summary { currency } => xpns::AppCommand::Summary { currency },
            Commands::Chart { month, currency } => xpns::AppCommand::Chart { month, currency },
            Commands::Convert { amount, from, to } => {
                xpns::AppCommand::Convert { amount, from, to }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create an account and sign in
    Register(Credentials),
    /// Sign in to an existing account
    Login(Credentials),
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Record a new expense
    Add(FieldArgs),
    /// Change an existing expense
    Edit {
        /// Expense id or a unique prefix of it
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete an expense
    Delete { id: String },
    /// Show one expense
    Show { id: String },
    /// List expenses, optionally filtered
    List {
        /// Case-insensitive text contained in the title
        #[arg(short, long)]
        search: Option<String>,
        /// Case-sensitive title prefix
        #[arg(short, long, conflicts_with = "search")]
        prefix: Option<String>,
        /// Only show these categories
        #[arg(short = 'k', long)]
        category: Vec<Category>,
    },
    /// Show the most recent expenses
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Display spending for today, this week and this month
    Summary {
        #[arg(short = 'u', long)]
        currency: Option<String>,
    },
    /// Display the category and daily breakdown of a month
    Chart {
        /// Month as YYYY-MM, defaults to the current month
        #[arg(short, long)]
        month: Option<Period>,
        #[arg(short = 'u', long)]
        currency: Option<String>,
    },
    /// Convert an amount between currencies
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => xpns::cli::setup::run(cli.config_path.as_deref()),
        Some(cmd) => xpns::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
