pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::ListingFilter;

#[derive(Parser)]
#[command(name = "campus-thrift")]
#[command(about = "A campus resale marketplace", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/campus-thrift/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage accounts and points
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage listings
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },
    /// Talk to buyers and sellers
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Close deals
    Trade {
        #[command(subcommand)]
        action: TradeAction,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create an account
    Add { username: String },
    /// Show balance, transactions and hearted items
    Show { username: String },
    /// Add points to an account
    Credit { username: String, amount: u64 },
    /// Take points from an account
    Debit { username: String, amount: u64 },
    /// Close an account; it can no longer earn, spend or trade
    Deactivate { username: String },
    /// List hearted listings that are still for sale
    Hearted { username: String },
}

#[derive(Subcommand)]
pub enum ItemAction {
    /// List unsold listings, boosted first
    List,
    /// List listings with a running boost
    Boosted,
    /// Create a listing
    Add {
        /// Seller's username
        #[arg(short, long)]
        seller: String,
        title: String,
        price: u64,
        /// Price when new (defaults to the asking price)
        #[arg(short, long)]
        original: Option<u64>,
    },
    /// List one seller's listings
    Mine {
        #[arg(short, long)]
        seller: String,
        #[arg(long, value_enum, default_value_t = ListingStatus::Active)]
        status: ListingStatus,
    },
    /// Change a listing's title or prices
    Edit {
        #[arg(short, long)]
        seller: String,
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        price: Option<u64>,
        #[arg(short, long)]
        original: Option<u64>,
    },
    /// Show a listing and count the view
    Show { id: i64 },
    /// Spend points to boost a listing
    Boost {
        #[arg(short, long)]
        seller: String,
        id: i64,
    },
    /// Heart or un-heart a listing
    Heart {
        #[arg(short, long)]
        user: String,
        id: i64,
    },
    /// Mark a listing sold without recording a buyer
    Sell { id: i64 },
    /// Take a listing off the market
    Withdraw {
        #[arg(short, long)]
        seller: String,
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ChatAction {
    /// Start a conversation with a listing's seller
    Open {
        #[arg(short, long)]
        user: String,
        item: i64,
        /// Opening message
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Send a message
    Send {
        #[arg(short, long)]
        user: String,
        chat: String,
        text: String,
    },
    /// Mark a conversation read
    Read {
        #[arg(short, long)]
        user: String,
        chat: String,
    },
    /// Print a conversation
    Show {
        #[arg(short, long)]
        user: String,
        chat: String,
    },
    /// List conversations, most recent first
    List {
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
pub enum TradeAction {
    /// Sell a listing to a buyer and reward both sides
    Complete {
        item: i64,
        #[arg(short, long)]
        buyer: String,
    },
    /// Trades a user bought or sold in, most recent first
    History { username: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ListingStatus {
    Active,
    Sold,
    Inactive,
    All,
}

impl From<ListingStatus> for ListingFilter {
    fn from(status: ListingStatus) -> Self {
        match status {
            ListingStatus::Active => ListingFilter::Active,
            ListingStatus::Sold => ListingFilter::Sold,
            ListingStatus::Inactive => ListingFilter::Inactive,
            ListingStatus::All => ListingFilter::All,
        }
    }
}
