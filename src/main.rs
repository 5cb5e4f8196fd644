use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campus_thrift::app::AppContext;
use campus_thrift::cli::{
    commands, ChatAction, Cli, Commands, ItemAction, TradeAction, UserAction,
};
use campus_thrift::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::User { action } => match action {
            UserAction::Add { username } => commands::add_user(&ctx, &username)?,
            UserAction::Show { username } => commands::show_user(&ctx, &username)?,
            UserAction::Credit { username, amount } => {
                commands::credit(&ctx, &username, amount)?
            }
            UserAction::Debit { username, amount } => commands::debit(&ctx, &username, amount)?,
            UserAction::Deactivate { username } => commands::deactivate_user(&ctx, &username)?,
            UserAction::Hearted { username } => commands::list_hearted(&ctx, &username)?,
        },
        Commands::Item { action } => match action {
            ItemAction::List => commands::list_items(&ctx)?,
            ItemAction::Boosted => commands::list_boosted(&ctx)?,
            ItemAction::Add {
                seller,
                title,
                price,
                original,
            } => commands::add_item(&ctx, &seller, &title, price, original)?,
            ItemAction::Mine { seller, status } => {
                commands::list_seller_items(&ctx, &seller, status.into())?
            }
            ItemAction::Edit {
                seller,
                id,
                title,
                price,
                original,
            } => commands::edit_item(&ctx, &seller, id, title.as_deref(), price, original)?,
            ItemAction::Show { id } => commands::show_item(&ctx, id)?,
            ItemAction::Boost { seller, id } => commands::boost_item(&ctx, &seller, id)?,
            ItemAction::Heart { user, id } => commands::heart_item(&ctx, &user, id)?,
            ItemAction::Sell { id } => commands::sell_item(&ctx, id)?,
            ItemAction::Withdraw { seller, id } => commands::withdraw_item(&ctx, &seller, id)?,
        },
        Commands::Chat { action } => match action {
            ChatAction::Open {
                user,
                item,
                message,
            } => commands::open_chat(&ctx, &user, item, message.as_deref())?,
            ChatAction::Send { user, chat, text } => {
                commands::send_message(&ctx, &user, &chat, &text)?
            }
            ChatAction::Read { user, chat } => commands::read_chat(&ctx, &user, &chat)?,
            ChatAction::Show { user, chat } => commands::show_chat(&ctx, &user, &chat)?,
            ChatAction::List { user } => commands::list_chats(&ctx, &user)?,
        },
        Commands::Trade { action } => match action {
            TradeAction::Complete { item, buyer } => {
                commands::complete_trade(&ctx, item, &buyer)?
            }
            TradeAction::History { username } => commands::trade_history(&ctx, &username)?,
        },
    }

    Ok(())
}
